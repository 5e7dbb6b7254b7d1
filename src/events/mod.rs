use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with the receiving half of a bounded channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after a committed change without waiting for channel
    /// space. A full or closed channel drops the event with a warning.
    pub fn send_or_log(&self, event: Event) {
        let kind = event.kind();
        let reason = match self.sender.try_send(event) {
            Ok(()) => return,
            Err(TrySendError::Full(_)) => "full",
            Err(TrySendError::Closed(_)) => "closed",
        };
        counter!("wms_events.dropped", 1, "kind" => kind, "reason" => reason);
        warn!(event = kind, reason, "Dropping domain event");
    }
}

/// Domain events emitted after a tray or slot change has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TrayRegistered {
        tray_id: String,
        capacity: i32,
    },
    TrayUpdated {
        tray_id: String,
    },
    TrayDeleted {
        tray_id: String,
        slots_removed: u64,
    },
    TrayCapacityChanged {
        tray_id: String,
        old_capacity: i32,
        new_capacity: i32,
    },
    SlotsInitialized {
        tray_id: String,
        created: u64,
    },
    ItemPlaced {
        tray_id: String,
        slot_index: i32,
        item_id: String,
        previous_item_id: Option<String>,
    },
    SlotCleared {
        tray_id: String,
        slot_index: i32,
        previous_item_id: Option<String>,
        replacement: Option<String>,
    },
    SlotDeleted {
        slot_id: i32,
        tray_id: String,
        slot_index: i32,
    },
    SlotsBatchUpdated {
        slot_ids: Vec<i32>,
    },
    SlotsBatchCleared {
        slot_ids: Vec<i32>,
    },
    TrayCleared {
        tray_id: String,
        slots_cleared: u64,
    },
}

impl Event {
    /// Stable short name, used as a log field and metric label
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TrayRegistered { .. } => "tray_registered",
            Event::TrayUpdated { .. } => "tray_updated",
            Event::TrayDeleted { .. } => "tray_deleted",
            Event::TrayCapacityChanged { .. } => "tray_capacity_changed",
            Event::SlotsInitialized { .. } => "slots_initialized",
            Event::ItemPlaced { .. } => "item_placed",
            Event::SlotCleared { .. } => "slot_cleared",
            Event::SlotDeleted { .. } => "slot_deleted",
            Event::SlotsBatchUpdated { .. } => "slots_batch_updated",
            Event::SlotsBatchCleared { .. } => "slots_batch_cleared",
            Event::TrayCleared { .. } => "tray_cleared",
        }
    }
}

/// An event as it leaves the processing loop
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

// Drains the channel until every sender is dropped, logging each event.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let kind = event.kind();
        counter!("wms_events.processed", 1, "kind" => kind);

        let envelope = EventEnvelope {
            received_at: Utc::now(),
            event,
        };
        match serde_json::to_string(&envelope) {
            Ok(payload) => info!(event = kind, %payload, "Domain event"),
            Err(e) => debug!(event = kind, error = %e, "Domain event (unserializable)"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (sender, mut rx) = EventSender::channel(4);
        sender
            .send(Event::TrayUpdated {
                tray_id: "AGV1".into(),
            })
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(Event::TrayUpdated {
                tray_id: "AGV1".into()
            })
        );
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (sender, rx) = EventSender::channel(1);
        drop(rx);

        assert!(sender
            .send(Event::SlotsBatchCleared { slot_ids: vec![5] })
            .await
            .is_err());
        // Must not panic or propagate
        sender.send_or_log(Event::SlotsBatchCleared { slot_ids: vec![5] });
    }

    #[tokio::test]
    async fn send_or_log_does_not_wait_on_full_channel() {
        let (sender, mut rx) = EventSender::channel(1);
        sender.send_or_log(Event::TrayUpdated {
            tray_id: "AGV1".into(),
        });
        // No consumer is draining; this must return instead of blocking
        sender.send_or_log(Event::TrayUpdated {
            tray_id: "AGV2".into(),
        });

        assert_eq!(
            rx.recv().await,
            Some(Event::TrayUpdated {
                tray_id: "AGV1".into()
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let value = serde_json::to_value(Event::ItemPlaced {
            tray_id: "AGV1".into(),
            slot_index: 2,
            item_id: "ITEM7".into(),
            previous_item_id: None,
        })
        .unwrap();
        assert_eq!(value["type"], "item_placed");
        assert_eq!(value["slot_index"], 2);
    }

    #[tokio::test]
    async fn process_events_stops_when_senders_drop() {
        let (sender, rx) = EventSender::channel(4);
        let handle = tokio::spawn(process_events(rx));
        sender
            .send(Event::TrayRegistered {
                tray_id: "AGV1".into(),
                capacity: 3,
            })
            .await
            .unwrap();
        drop(sender);
        handle.await.unwrap();
    }
}
