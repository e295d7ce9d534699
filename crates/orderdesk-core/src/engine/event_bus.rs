//! Broadcast channel for desk events.

use orderdesk_types::DeskEvent;
use tokio::sync::broadcast;

/// Fan-out bus carrying [`DeskEvent`]s to every subscriber.
///
/// Cloning shares the underlying channel. Publishing with no subscribers is
/// not an error worth handling, so callers discard the result with `.ok()`.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<DeskEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<DeskEvent> {
		self.sender.subscribe()
	}

	pub fn publish(
		&self,
		event: DeskEvent,
	) -> Result<usize, broadcast::error::SendError<DeskEvent>> {
		self.sender.send(event)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderdesk_types::OrderEvent;

	#[tokio::test]
	async fn test_publish_reaches_every_subscriber() {
		let bus = EventBus::new(8);
		let mut first = bus.subscribe();
		let mut second = bus.clone().subscribe();

		let event = DeskEvent::Order(OrderEvent::OrdersRefreshed { count: 3 });
		assert_eq!(bus.publish(event.clone()).unwrap(), 2);
		assert_eq!(first.recv().await.unwrap(), event);
		assert_eq!(second.recv().await.unwrap(), event);
	}

	#[test]
	fn test_publish_without_subscribers_fails() {
		let bus = EventBus::new(8);
		assert!(bus
			.publish(DeskEvent::Order(OrderEvent::OrdersRefreshed { count: 0 }))
			.is_err());
	}
}
