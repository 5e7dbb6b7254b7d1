pub mod material_location;
pub mod tray;

pub use material_location::{
    Entity as MaterialLocation, Model as MaterialLocationModel, SlotStatus,
};
pub use tray::{Entity as Tray, Model as TrayModel};
