//! The order desk engine.
//!
//! [`OrderDesk`] ties the store, the transition engine, the checklist and the
//! side-effect dispatcher together. It keeps the live order set in a cache fed
//! by the store subscription and publishes every change on the event bus.

pub mod event_bus;

use crate::checklist::{ChecklistError, ChecklistTracker};
use crate::handlers::{DispatchReport, SideEffectDispatcher};
use crate::orders::{OrderStore, OrderStoreError};
use crate::projection::{project, OrderBoard};
use crate::state::{
	suggest_transition, OrderStateError, OrderStateMachine, SuggestedTransition,
	TransitionContext,
};
use chrono::{DateTime, Duration, Utc};
use orderdesk_config::Config;
use orderdesk_notification::NotificationService;
use orderdesk_payment::PaymentService;
use orderdesk_storage::StorageService;
use orderdesk_types::{truncate_id, DeskEvent, Order, OrderEvent, OrderStatus};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum DeskError {
	#[error(transparent)]
	State(#[from] OrderStateError),
	#[error(transparent)]
	Checklist(#[from] ChecklistError),
	#[error(transparent)]
	Store(#[from] OrderStoreError),
}

impl DeskError {
	/// True when the referenced order does not exist.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			DeskError::State(OrderStateError::NotFound(_))
				| DeskError::Checklist(ChecklistError::NotFound(_))
				| DeskError::Store(OrderStoreError::NotFound(_))
		)
	}
}

/// A status change that has been written. Its side effects may still be
/// running.
#[derive(Debug)]
pub struct CommittedTransition {
	pub order_id: String,
	pub from: OrderStatus,
	pub to: OrderStatus,
	pub at: DateTime<Utc>,
	/// Resolves once every side effect has run.
	pub side_effects: JoinHandle<DispatchReport>,
}

#[derive(Clone)]
pub struct OrderDesk {
	/// Desk configuration.
	pub(crate) config: Config,
	pub(crate) storage: Arc<StorageService>,
	pub(crate) store: Arc<OrderStore>,
	pub(crate) state_machine: Arc<OrderStateMachine>,
	pub(crate) checklist: Arc<ChecklistTracker>,
	pub(crate) dispatcher: Arc<SideEffectDispatcher>,
	pub(crate) event_bus: event_bus::EventBus,
	/// Live order set, newest first.
	orders: Arc<watch::Sender<Arc<Vec<Order>>>>,
}

impl OrderDesk {
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		notification: Arc<NotificationService>,
		payment: Arc<PaymentService>,
	) -> Self {
		let event_bus = event_bus::EventBus::new(config.desk.event_capacity);
		let store = Arc::new(OrderStore::new(storage.clone()));
		let state_machine = Arc::new(OrderStateMachine::new(
			store.clone(),
			config.desk.fallback_admin_label.clone(),
		));
		let checklist = Arc::new(ChecklistTracker::new(store.clone()));
		let dispatcher = Arc::new(SideEffectDispatcher::new(
			payment,
			notification,
			storage.clone(),
			event_bus.clone(),
		));
		let (orders, _) = watch::channel(Arc::new(Vec::new()));

		Self {
			config,
			storage,
			store,
			state_machine,
			checklist,
			dispatcher,
			event_bus,
			orders: Arc::new(orders),
		}
	}

	/// Keeps the order cache current until Ctrl-C.
	pub async fn run(&self) -> Result<(), DeskError> {
		self.run_until(async {
			tokio::signal::ctrl_c().await.ok();
		})
		.await
	}

	/// Keeps the order cache current until `shutdown` resolves or the store
	/// closes its change feed.
	pub async fn run_until<F>(&self, shutdown: F) -> Result<(), DeskError>
	where
		F: Future<Output = ()>,
	{
		let since = self.window_start();
		tracing::info!(desk = %self.config.desk.id, since = %since, "Subscribing to orders");
		let mut subscription = self.store.subscribe_orders(since);
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				next = subscription.next() => match next {
					Some(Ok(orders)) => self.replace_orders(orders),
					Some(Err(e)) => {
						tracing::warn!(error = %e, "Order query failed, keeping previous snapshot");
					},
					None => {
						tracing::info!("Order feed closed");
						break;
					},
				},
				_ = &mut shutdown => {
					tracing::info!("Stopping order desk");
					break;
				},
			}
		}
		Ok(())
	}

	/// Reloads the order window once and returns how many orders it holds.
	pub async fn refresh(&self) -> Result<usize, DeskError> {
		let orders = self.store.query_since(self.window_start()).await?;
		let count = orders.len();
		self.replace_orders(orders);
		Ok(count)
	}

	/// Moves an order to `target`, then runs its side effects in the
	/// background.
	///
	/// The order is read from the store, never from the cache, so a repeated
	/// request sees the status the previous one wrote and runs no side
	/// effects again.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), to = %target))]
	pub async fn transition(
		&self,
		order_id: &str,
		target: OrderStatus,
		context: TransitionContext,
	) -> Result<CommittedTransition, DeskError> {
		let transition = self
			.state_machine
			.request_transition(order_id, target, context)
			.await?;

		self.event_bus
			.publish(DeskEvent::Order(OrderEvent::StatusChanged {
				order_id: transition.order_id.clone(),
				from: transition.from,
				to: transition.to,
			}))
			.ok();

		Ok(CommittedTransition {
			order_id: transition.order_id.clone(),
			from: transition.from,
			to: transition.to,
			at: transition.at,
			side_effects: self.dispatcher.dispatch(transition),
		})
	}

	/// Deletes an order and cascades to its group session in the background.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn delete_order(&self, order_id: &str) -> Result<JoinHandle<DispatchReport>, DeskError> {
		let order = self.store.get_order(order_id).await?;
		self.store.delete_order(order_id).await?;
		tracing::info!("Order deleted");

		self.event_bus
			.publish(DeskEvent::Order(OrderEvent::Deleted {
				order_id: order_id.to_string(),
			}))
			.ok();

		Ok(self.dispatcher.dispatch_deletion(order, Utc::now()))
	}

	/// Flips the availability tick of one line item.
	pub async fn toggle_item(&self, order_id: &str, index: usize) -> Result<bool, DeskError> {
		let checked = self.checklist.toggle(order_id, index).await?;
		self.event_bus
			.publish(DeskEvent::Order(OrderEvent::ChecklistToggled {
				order_id: order_id.to_string(),
				index,
				checked,
			}))
			.ok();
		Ok(checked)
	}

	pub async fn next_action(&self, order_id: &str) -> Result<Option<SuggestedTransition>, DeskError> {
		let order = self.order(order_id).await?;
		Ok(suggest_transition(&order))
	}

	/// An order from the cache, or from the store when not cached.
	pub async fn order(&self, order_id: &str) -> Result<Order, DeskError> {
		match self.cached_order(order_id) {
			Some(order) => Ok(order),
			None => Ok(self.store.get_order(order_id).await?),
		}
	}

	/// Board projection of the cached orders.
	pub fn board(&self) -> OrderBoard {
		project(&self.orders())
	}

	pub fn orders(&self) -> Arc<Vec<Order>> {
		self.orders.borrow().clone()
	}

	/// Receives every new snapshot of the live order set.
	pub fn watch_orders(&self) -> watch::Receiver<Arc<Vec<Order>>> {
		self.orders.subscribe()
	}

	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	fn window_start(&self) -> DateTime<Utc> {
		let window = i64::try_from(self.config.desk.order_window_hours)
			.ok()
			.and_then(Duration::try_hours)
			.unwrap_or_else(Duration::zero);
		Utc::now() - window
	}

	fn cached_order(&self, order_id: &str) -> Option<Order> {
		self.orders
			.borrow()
			.iter()
			.find(|order| order.id == order_id)
			.cloned()
	}

	fn replace_orders(&self, orders: Vec<Order>) {
		let count = orders.len();
		self.orders.send_replace(Arc::new(orders));
		tracing::debug!(count, "Order cache refreshed");
		self.event_bus
			.publish(DeskEvent::Order(OrderEvent::OrdersRefreshed { count }))
			.ok();
	}
}
