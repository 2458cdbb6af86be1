use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::BookingEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for booking notifications, one channel per provider.
/// Fire-and-forget: the engine publishes after commit and never awaits
/// listeners, so a slow dispatcher cannot stall a booking.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<BookingEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a provider. Creates the channel if needed.
    pub fn subscribe(&self, provider_id: Ulid) -> broadcast::Receiver<BookingEvent> {
        let sender = self
            .channels
            .entry(provider_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Publish an event. No-op if nobody is listening.
    pub fn send(&self, provider_id: Ulid, event: &BookingEvent) {
        if let Some(sender) = self.channels.get(&provider_id) {
            let _ = sender.send(event.clone());
        }
    }

    pub fn remove(&self, provider_id: &Ulid) {
        self.channels.remove(provider_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use chrono::NaiveDate;

    fn sample_appointment(provider_id: Ulid) -> Appointment {
        Appointment {
            id: Ulid::new(),
            customer_id: Ulid::new(),
            provider_id,
            shop_id: Ulid::new(),
            service_id: Ulid::new(),
            date: NaiveDate::parse_from_str("2026-03-02", "%Y-%m-%d").unwrap(),
            slot: Slot::new(600, 630),
            status: AppointmentStatus::Pending,
            notes: None,
            cancelled_by: None,
            cancel_reason: None,
            version: 1,
        }
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let provider = Ulid::new();
        let mut rx = hub.subscribe(provider);

        let event = BookingEvent::Created {
            appointment: sample_appointment(provider),
        };
        hub.send(provider, &event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        let provider = Ulid::new();
        // No subscriber — should not panic
        hub.send(
            provider,
            &BookingEvent::Created {
                appointment: sample_appointment(provider),
            },
        );
    }
}
