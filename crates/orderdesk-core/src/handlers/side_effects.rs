//! Side effects of committed transitions and deletions.
//!
//! Effects run after the status write, in the order the transition table
//! lists them. Each one stands alone: a failure is logged, published as a
//! [`SideEffectEvent`] and recorded in the [`DispatchReport`], and the next
//! effect still runs. Nothing here can undo or fail the status change.
//!
//! Inputs come from the order snapshot taken when the transition was
//! requested, never from a reloaded copy.

use crate::directory::{
	BusinessDirectory, CustomerDirectory, GroupSessions, SESSION_REASON_ORDER_CANCELLED,
	SESSION_REASON_ORDER_DELETED,
};
use crate::engine::event_bus::EventBus;
use crate::state::{rule_for, SideEffect, Transition, DELETION_EFFECTS};
use chrono::{DateTime, Utc};
use orderdesk_notification::NotificationService;
use orderdesk_payment::PaymentService;
use orderdesk_storage::StorageService;
use orderdesk_types::{
	truncate_id, DeskEvent, NotificationKind, NotificationPayload, NotificationRequest, Order,
	RefundRequest, SideEffectEvent, UnavailableItem,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum SideEffectError {
	#[error("Refund failed: {0}")]
	Refund(String),
	#[error("Notification failed: {0}")]
	Notification(String),
	#[error("Group session cascade failed: {0}")]
	SessionCascade(String),
	#[error("Fulfillment issue update failed: {0}")]
	FulfillmentIssue(String),
}

enum Outcome {
	Done,
	/// Preconditions not met, nothing attempted.
	Skipped,
}

/// What happened to each side effect of one transition or deletion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
	pub completed: Vec<SideEffect>,
	pub skipped: Vec<SideEffect>,
	pub failed: Vec<(SideEffect, String)>,
	/// Amount the gateway confirmed as refunded; zero when no refund went through.
	pub refund_amount: Decimal,
}

impl DispatchReport {
	fn record(&mut self, effect: SideEffect, result: Result<Outcome, SideEffectError>) {
		match result {
			Ok(Outcome::Done) => self.completed.push(effect),
			Ok(Outcome::Skipped) => self.skipped.push(effect),
			Err(e) => self.failed.push((effect, e.to_string())),
		}
	}

	pub fn has_failures(&self) -> bool {
		!self.failed.is_empty()
	}

	pub fn failed(&self, effect: SideEffect) -> bool {
		self.failed.iter().any(|(failed, _)| *failed == effect)
	}
}

/// Runs the side effects of transitions and deletions.
pub struct SideEffectDispatcher {
	payment: Arc<PaymentService>,
	notification: Arc<NotificationService>,
	businesses: BusinessDirectory,
	customers: CustomerDirectory,
	sessions: GroupSessions,
	event_bus: EventBus,
}

impl SideEffectDispatcher {
	pub fn new(
		payment: Arc<PaymentService>,
		notification: Arc<NotificationService>,
		storage: Arc<StorageService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			payment,
			notification,
			businesses: BusinessDirectory::new(storage.clone()),
			customers: CustomerDirectory::new(storage.clone()),
			sessions: GroupSessions::new(storage),
			event_bus,
		}
	}

	/// Runs the effects of `transition` on a separate task.
	pub fn dispatch(self: &Arc<Self>, transition: Transition) -> JoinHandle<DispatchReport> {
		let dispatcher = Arc::clone(self);
		tokio::spawn(async move { dispatcher.run(&transition).await })
	}

	/// Runs the effects of deleting `order` on a separate task.
	pub fn dispatch_deletion(
		self: &Arc<Self>,
		order: Order,
		at: DateTime<Utc>,
	) -> JoinHandle<DispatchReport> {
		let dispatcher = Arc::clone(self);
		tokio::spawn(async move { dispatcher.run_deletion(&order, at).await })
	}

	/// Runs the effects of `transition` in table order.
	///
	/// Re-applying the current status runs nothing.
	#[instrument(skip_all, fields(order_id = %truncate_id(&transition.order_id), to = %transition.to))]
	pub async fn run(&self, transition: &Transition) -> DispatchReport {
		let mut report = DispatchReport::default();
		if transition.is_same_status() {
			return report;
		}

		let order = &transition.snapshot;
		let items = &transition.unavailable_items;
		for effect in rule_for(transition.to).side_effects {
			let result = match effect {
				SideEffect::CancelGroupSession => {
					self.cancel_group_session(order, SESSION_REASON_ORDER_CANCELLED, transition.at)
						.await
				},
				SideEffect::NotifyCancelled => {
					let reason = transition.cancellation_reason().unwrap_or_default();
					self.notify_cancelled(order, reason).await
				},
				SideEffect::RefundUnavailable => match self.refund_unavailable(order, items).await {
					Ok(Some(amount)) => {
						report.refund_amount = amount;
						Ok(Outcome::Done)
					},
					Ok(None) => Ok(Outcome::Skipped),
					Err(e) => Err(e),
				},
				SideEffect::NotifyAcceptedWithUnavailable => {
					self.notify_accepted_with_unavailable(order, items, report.refund_amount)
						.await
				},
				SideEffect::RecordFulfillmentIssue => {
					self.record_fulfillment_issue(order, items, transition.at).await
				},
				SideEffect::NotifyReady => self.notify_ready(order).await,
			};
			report.record(*effect, result);
		}

		if report.has_failures() {
			tracing::warn!(failed = report.failed.len(), "Side effects finished with failures");
		}
		report
	}

	/// Runs the effects of an admin deletion of `order`.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order.id)))]
	pub async fn run_deletion(&self, order: &Order, at: DateTime<Utc>) -> DispatchReport {
		let mut report = DispatchReport::default();
		for effect in DELETION_EFFECTS {
			let result = match effect {
				SideEffect::CancelGroupSession => {
					self.cancel_group_session(order, SESSION_REASON_ORDER_DELETED, at)
						.await
				},
				_ => Ok(Outcome::Skipped),
			};
			report.record(*effect, result);
		}
		report
	}

	async fn cancel_group_session(
		&self,
		order: &Order,
		reason: &str,
		at: DateTime<Utc>,
	) -> Result<Outcome, SideEffectError> {
		let Some(session_id) = order.group_session_id.as_deref() else {
			return Ok(Outcome::Skipped);
		};

		match self.sessions.cancel(session_id, reason, at).await {
			Ok(()) => {
				tracing::info!(session_id = %truncate_id(session_id), reason, "Group session cancelled");
				self.publish(SideEffectEvent::SessionCancelled {
					order_id: order.id.clone(),
					session_id: session_id.to_string(),
				});
				Ok(Outcome::Done)
			},
			Err(e) => {
				// Order state is already correct; operators only see a log line.
				tracing::warn!(session_id = %truncate_id(session_id), error = %e, "Failed to cancel group session");
				self.publish(SideEffectEvent::SessionCascadeFailed {
					order_id: order.id.clone(),
					session_id: session_id.to_string(),
					error: e.to_string(),
				});
				Err(SideEffectError::SessionCascade(e.to_string()))
			},
		}
	}

	/// Requests a refund of the unavailable items of a card-paid order.
	/// Returns the amount the gateway confirmed, or `None` when no refund
	/// applies.
	async fn refund_unavailable(
		&self,
		order: &Order,
		items: &[UnavailableItem],
	) -> Result<Option<Decimal>, SideEffectError> {
		if items.is_empty() || !order.is_refundable() {
			return Ok(None);
		}
		let request =
			RefundRequest::new(order.id.clone(), order.payment_intent_id.clone(), items.to_vec());
		if request.amount.is_zero() {
			return Ok(None);
		}

		let amount = request.amount;
		match self.payment.request_partial_refund(&request).await {
			Ok(receipt) => {
				let confirmed = receipt.refund_amount;
				if confirmed != amount {
					tracing::warn!(
						requested = %amount,
						confirmed = %confirmed,
						"Gateway refunded a different amount than requested"
					);
				}
				self.publish(SideEffectEvent::RefundIssued {
					order_id: order.id.clone(),
					amount: confirmed,
				});
				Ok(Some(confirmed))
			},
			Err(e) => {
				tracing::error!(amount = %amount, error = %e, "Partial refund failed, manual refund required");
				self.publish(SideEffectEvent::RefundFailed {
					order_id: order.id.clone(),
					amount,
					error: e.to_string(),
				});
				Err(SideEffectError::Refund(e.to_string()))
			},
		}
	}

	async fn record_fulfillment_issue(
		&self,
		order: &Order,
		items: &[UnavailableItem],
		at: DateTime<Utc>,
	) -> Result<Outcome, SideEffectError> {
		let Some(business_id) = order.business_id.as_deref().filter(|_| !items.is_empty()) else {
			return Ok(Outcome::Skipped);
		};

		match self
			.businesses
			.increment_fulfillment_issues(business_id, 1, at)
			.await
		{
			Ok(()) => {
				self.publish(SideEffectEvent::FulfillmentIssueRecorded {
					order_id: order.id.clone(),
					business_id: business_id.to_string(),
				});
				Ok(Outcome::Done)
			},
			Err(e) => {
				tracing::error!(business_id = %truncate_id(business_id), error = %e, "Failed to record fulfillment issue");
				self.publish(SideEffectEvent::FulfillmentIssueFailed {
					order_id: order.id.clone(),
					business_id: business_id.to_string(),
					error: e.to_string(),
				});
				Err(SideEffectError::FulfillmentIssue(e.to_string()))
			},
		}
	}

	async fn notify_cancelled(&self, order: &Order, reason: &str) -> Result<Outcome, SideEffectError> {
		let Some(token) = self
			.recipient(order, NotificationKind::OrderCancelled)
			.await?
		else {
			return Ok(Outcome::Skipped);
		};
		let payload = NotificationPayload::OrderCancelled {
			reason: reason.to_string(),
		};
		self.send(order, token, payload).await
	}

	async fn notify_accepted_with_unavailable(
		&self,
		order: &Order,
		items: &[UnavailableItem],
		refund_amount: Decimal,
	) -> Result<Outcome, SideEffectError> {
		if items.is_empty() {
			return Ok(Outcome::Skipped);
		}
		let Some(token) = self
			.recipient(order, NotificationKind::OrderAcceptedWithUnavailable)
			.await?
		else {
			return Ok(Outcome::Skipped);
		};
		let payload = NotificationPayload::OrderAcceptedWithUnavailable {
			unavailable_items: items.iter().map(|item| item.product_name.clone()).collect(),
			refund_amount,
		};
		self.send(order, token, payload).await
	}

	async fn notify_ready(&self, order: &Order) -> Result<Outcome, SideEffectError> {
		let Some(token) = self.recipient(order, NotificationKind::OrderReady).await? else {
			return Ok(Outcome::Skipped);
		};
		let payload = NotificationPayload::OrderReady {
			has_table_service: self.has_table_service(order).await,
			is_dine_in: order.is_dine_in(),
		};
		self.send(order, token, payload).await
	}

	/// Push token of the ordering customer. Guests have none.
	async fn recipient(
		&self,
		order: &Order,
		kind: NotificationKind,
	) -> Result<Option<String>, SideEffectError> {
		let Some(customer_id) = order.customer_id.as_deref() else {
			return Ok(None);
		};
		self.customers.push_token(customer_id).await.map_err(|e| {
			self.notification_failed(order, kind, &e.to_string());
			SideEffectError::Notification(e.to_string())
		})
	}

	/// Unknown or unreadable businesses count as having no table service.
	async fn has_table_service(&self, order: &Order) -> bool {
		let Some(business_id) = order.business_id.as_deref() else {
			return false;
		};
		match self.businesses.get_business(business_id).await {
			Ok(business) => business.has_table_service,
			Err(e) => {
				tracing::warn!(business_id = %truncate_id(business_id), error = %e, "Business lookup failed");
				false
			},
		}
	}

	async fn send(
		&self,
		order: &Order,
		recipient_token: String,
		payload: NotificationPayload,
	) -> Result<Outcome, SideEffectError> {
		let kind = payload.kind();
		let request = NotificationRequest {
			order_id: order.id.clone(),
			recipient_token,
			business_name: order.business_name.clone().unwrap_or_default(),
			payload,
		};

		match self.notification.send(&request).await {
			Ok(_) => {
				self.publish(SideEffectEvent::NotificationSent {
					order_id: order.id.clone(),
					kind,
				});
				Ok(Outcome::Done)
			},
			Err(e) => {
				self.notification_failed(order, kind, &e.to_string());
				Err(SideEffectError::Notification(e.to_string()))
			},
		}
	}

	fn notification_failed(&self, order: &Order, kind: NotificationKind, error: &str) {
		tracing::warn!(kind = %kind, error, "Customer notification failed");
		self.publish(SideEffectEvent::NotificationFailed {
			order_id: order.id.clone(),
			kind,
			error: error.to_string(),
		});
	}

	fn publish(&self, event: SideEffectEvent) {
		self.event_bus.publish(DeskEvent::SideEffect(event)).ok();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::TransitionContext;
	use async_trait::async_trait;
	use mockall::mock;
	use orderdesk_notification::{NotificationError, NotificationInterface};
	use orderdesk_payment::{PaymentError, RefundInterface};
	use orderdesk_storage::implementations::memory::MemoryStorage;
	use orderdesk_types::{
		Business, Collection, ConfigSchema, GroupSession, GroupSessionStatus, LineItem,
		NoticeLevel, NotificationReceipt, OrderStatus, PaymentMethod, PaymentStatus,
		RefundReceipt, UnavailableLine, ValidationError,
	};
	use rust_decimal_macros::dec;
	use serde_json::json;
	use std::sync::Mutex;
	use tokio::sync::broadcast;

	mock! {
		RefundGateway {}

		#[async_trait]
		impl RefundInterface for RefundGateway {
			fn config_schema(&self) -> Box<dyn ConfigSchema>;

			async fn request_partial_refund(
				&self,
				request: &RefundRequest,
			) -> Result<RefundReceipt, PaymentError>;
		}
	}

	struct NoConfig;

	impl ConfigSchema for NoConfig {
		fn validate(&self, _config: &toml::Value) -> Result<(), ValidationError> {
			Ok(())
		}
	}

	/// Records every request; fails every send when `fail` is set.
	struct RecordingNotifier {
		sent: Arc<Mutex<Vec<NotificationRequest>>>,
		fail: bool,
	}

	#[async_trait]
	impl NotificationInterface for RecordingNotifier {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(NoConfig)
		}

		async fn send(
			&self,
			request: &NotificationRequest,
		) -> Result<NotificationReceipt, NotificationError> {
			if self.fail {
				return Err(NotificationError::Network("connection refused".to_string()));
			}
			self.sent.lock().unwrap().push(request.clone());
			Ok(NotificationReceipt { delivered: true })
		}
	}

	struct Fixture {
		storage: Arc<StorageService>,
		dispatcher: SideEffectDispatcher,
		sent: Arc<Mutex<Vec<NotificationRequest>>>,
		events: broadcast::Receiver<DeskEvent>,
	}

	impl Fixture {
		async fn new(gateway: MockRefundGateway, notifier_fails: bool) -> Self {
			let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
			storage
				.store(Collection::Users, "cust-1", &json!({"pushToken": "tok-1"}))
				.await
				.unwrap();
			storage
				.store(
					Collection::Businesses,
					"biz-1",
					&json!({"name": "Corner Deli", "hasTableService": true}),
				)
				.await
				.unwrap();
			storage
				.store(Collection::GroupSessions, "sess-1", &json!({"status": "active"}))
				.await
				.unwrap();

			let sent = Arc::new(Mutex::new(Vec::new()));
			let notifier = RecordingNotifier {
				sent: sent.clone(),
				fail: notifier_fails,
			};
			let event_bus = EventBus::new(64);
			let events = event_bus.subscribe();
			let dispatcher = SideEffectDispatcher::new(
				Arc::new(PaymentService::new(Box::new(gateway))),
				Arc::new(NotificationService::new(Box::new(notifier))),
				storage.clone(),
				event_bus,
			);
			Self {
				storage,
				dispatcher,
				sent,
				events,
			}
		}

		fn sent(&self) -> Vec<NotificationRequest> {
			self.sent.lock().unwrap().clone()
		}

		fn events(&mut self) -> Vec<DeskEvent> {
			let mut events = Vec::new();
			while let Ok(event) = self.events.try_recv() {
				events.push(event);
			}
			events
		}

		async fn business(&self) -> Business {
			self.storage
				.retrieve(Collection::Businesses, "biz-1")
				.await
				.unwrap()
		}

		async fn session(&self) -> GroupSession {
			self.storage
				.retrieve(Collection::GroupSessions, "sess-1")
				.await
				.unwrap()
		}
	}

	fn order(status: OrderStatus) -> Order {
		let mut order = Order::new("order-abc123", Utc::now());
		order.status = status;
		order.customer_id = Some("cust-1".to_string());
		order.business_id = Some("biz-1".to_string());
		order.business_name = Some("Corner Deli".to_string());
		order.items = vec![
			LineItem {
				product_id: "p-bread".to_string(),
				name: "Bread".to_string(),
				quantity: 1,
				price: dec!(2.50),
				note: None,
				selected_options: Vec::new(),
			},
			LineItem {
				product_id: "p-x".to_string(),
				name: "X".to_string(),
				quantity: 1,
				price: dec!(5),
				note: None,
				selected_options: Vec::new(),
			},
		];
		order
	}

	fn card_paid(mut order: Order) -> Order {
		order.payment_method = PaymentMethod::Card;
		order.payment_status = PaymentStatus::Paid;
		order.payment_intent_id = Some("pi_42".to_string());
		order
	}

	fn transition(snapshot: Order, to: OrderStatus, context: TransitionContext) -> Transition {
		let unavailable_items = if to == OrderStatus::Accepted {
			context
				.unavailable_items
				.iter()
				.map(UnavailableItem::from)
				.collect()
		} else {
			Vec::new()
		};
		Transition {
			order_id: snapshot.id.clone(),
			from: snapshot.status,
			to,
			at: Utc::now(),
			snapshot,
			context,
			unavailable_items,
		}
	}

	fn missing_x() -> TransitionContext {
		TransitionContext::accept_with_shortages(vec![UnavailableLine {
			index: 1,
			name: "X".to_string(),
			quantity: 1,
			price: dec!(5),
		}])
	}

	#[tokio::test]
	async fn test_card_refund_success_reaches_notification() {
		let mut gateway = MockRefundGateway::new();
		gateway
			.expect_request_partial_refund()
			.withf(|request| {
				request.amount == dec!(5)
					&& request.payment_intent_id.as_deref() == Some("pi_42")
					&& request.unavailable_items[0].position_number == 2
			})
			.times(1)
			.returning(|request| {
				Ok(RefundReceipt {
					refunded: true,
					refund_amount: request.amount,
				})
			});
		let mut fixture = Fixture::new(gateway, false).await;

		let order = card_paid(order(OrderStatus::Pending));
		let report = fixture
			.dispatcher
			.run(&transition(order, OrderStatus::Accepted, missing_x()))
			.await;

		assert_eq!(report.refund_amount, dec!(5));
		assert_eq!(
			report.completed,
			vec![
				SideEffect::RefundUnavailable,
				SideEffect::NotifyAcceptedWithUnavailable,
				SideEffect::RecordFulfillmentIssue,
			]
		);

		let sent = fixture.sent();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].recipient_token, "tok-1");
		assert_eq!(
			sent[0].payload,
			NotificationPayload::OrderAcceptedWithUnavailable {
				unavailable_items: vec!["X".to_string()],
				refund_amount: dec!(5),
			}
		);
		assert_eq!(fixture.business().await.fulfillment_issues, 1);

		let notices: Vec<_> = fixture.events().iter().filter_map(|e| e.notice()).collect();
		assert!(notices.iter().any(|n| n.level == NoticeLevel::Success));
	}

	#[tokio::test]
	async fn test_notification_carries_confirmed_refund_amount() {
		let mut gateway = MockRefundGateway::new();
		gateway
			.expect_request_partial_refund()
			.withf(|request| request.amount == dec!(5))
			.times(1)
			.returning(|_| {
				Ok(RefundReceipt {
					refunded: true,
					refund_amount: dec!(3),
				})
			});
		let mut fixture = Fixture::new(gateway, false).await;

		let order = card_paid(order(OrderStatus::Pending));
		let report = fixture
			.dispatcher
			.run(&transition(order, OrderStatus::Accepted, missing_x()))
			.await;

		assert_eq!(report.refund_amount, dec!(3));
		assert_eq!(
			fixture.sent()[0].payload,
			NotificationPayload::OrderAcceptedWithUnavailable {
				unavailable_items: vec!["X".to_string()],
				refund_amount: dec!(3),
			}
		);
		assert!(fixture.events().iter().any(|event| matches!(
			event,
			DeskEvent::SideEffect(SideEffectEvent::RefundIssued { amount, .. }) if *amount == dec!(3)
		)));
	}

	#[tokio::test]
	async fn test_refund_failure_still_notifies_with_zero() {
		let mut gateway = MockRefundGateway::new();
		gateway
			.expect_request_partial_refund()
			.times(1)
			.returning(|_| Err(PaymentError::Gateway("card processor unavailable".to_string())));
		let mut fixture = Fixture::new(gateway, false).await;

		let order = card_paid(order(OrderStatus::Pending));
		let report = fixture
			.dispatcher
			.run(&transition(order, OrderStatus::Accepted, missing_x()))
			.await;

		assert!(report.failed(SideEffect::RefundUnavailable));
		assert_eq!(report.refund_amount, Decimal::ZERO);
		assert!(report
			.completed
			.contains(&SideEffect::NotifyAcceptedWithUnavailable));
		assert!(report.completed.contains(&SideEffect::RecordFulfillmentIssue));

		let sent = fixture.sent();
		assert_eq!(
			sent[0].payload,
			NotificationPayload::OrderAcceptedWithUnavailable {
				unavailable_items: vec!["X".to_string()],
				refund_amount: Decimal::ZERO,
			}
		);

		let warning = fixture
			.events()
			.iter()
			.filter_map(|e| e.notice())
			.find(|n| n.level == NoticeLevel::Warning)
			.unwrap();
		assert!(warning.message.contains("manually"));
	}

	#[tokio::test]
	async fn test_cash_order_is_never_refunded() {
		let mut gateway = MockRefundGateway::new();
		gateway.expect_request_partial_refund().times(0);
		let fixture = Fixture::new(gateway, false).await;

		let report = fixture
			.dispatcher
			.run(&transition(order(OrderStatus::Pending), OrderStatus::Accepted, missing_x()))
			.await;

		assert_eq!(report.skipped, vec![SideEffect::RefundUnavailable]);
		assert_eq!(fixture.sent().len(), 1);
		assert_eq!(fixture.business().await.fulfillment_issues, 1);
	}

	#[tokio::test]
	async fn test_accept_without_shortages_runs_nothing() {
		let fixture = Fixture::new(MockRefundGateway::new(), false).await;

		let report = fixture
			.dispatcher
			.run(&transition(
				card_paid(order(OrderStatus::Pending)),
				OrderStatus::Accepted,
				TransitionContext::default(),
			))
			.await;

		assert!(report.completed.is_empty());
		assert_eq!(report.skipped.len(), 3);
		assert!(fixture.sent().is_empty());
		assert_eq!(fixture.business().await.fulfillment_issues, 0);
	}

	#[tokio::test]
	async fn test_cancel_cascades_even_when_notification_fails() {
		let mut fixture = Fixture::new(MockRefundGateway::new(), true).await;
		let mut order = order(OrderStatus::Preparing);
		order.group_session_id = Some("sess-1".to_string());

		let report = fixture
			.dispatcher
			.run(&transition(
				order,
				OrderStatus::Cancelled,
				TransitionContext::cancel("Out of stock"),
			))
			.await;

		assert_eq!(report.completed, vec![SideEffect::CancelGroupSession]);
		assert!(report.failed(SideEffect::NotifyCancelled));

		let session = fixture.session().await;
		assert_eq!(session.status, GroupSessionStatus::Cancelled);
		assert!(session.closed_at.is_some());
		assert_eq!(session.cancellation_reason.as_deref(), Some("order_cancelled"));

		let error = fixture
			.events()
			.iter()
			.filter_map(|e| e.notice())
			.find(|n| n.level == NoticeLevel::Error)
			.unwrap();
		assert!(error.message.contains("order_cancelled"));
	}

	#[tokio::test]
	async fn test_cancel_notifies_with_reason() {
		let fixture = Fixture::new(MockRefundGateway::new(), false).await;

		let report = fixture
			.dispatcher
			.run(&transition(
				order(OrderStatus::Pending),
				OrderStatus::Cancelled,
				TransitionContext::cancel("Closed early"),
			))
			.await;

		assert_eq!(report.skipped, vec![SideEffect::CancelGroupSession]);
		let sent = fixture.sent();
		assert_eq!(sent[0].business_name, "Corner Deli");
		assert_eq!(
			sent[0].payload,
			NotificationPayload::OrderCancelled {
				reason: "Closed early".to_string()
			}
		);
	}

	#[tokio::test]
	async fn test_ready_reports_table_service() {
		let fixture = Fixture::new(MockRefundGateway::new(), false).await;
		let mut order = order(OrderStatus::Preparing);
		order.fulfillment = orderdesk_types::FulfillmentType::DineIn;

		fixture
			.dispatcher
			.run(&transition(order, OrderStatus::Ready, TransitionContext::default()))
			.await;

		assert_eq!(
			fixture.sent()[0].payload,
			NotificationPayload::OrderReady {
				has_table_service: true,
				is_dine_in: true,
			}
		);
	}

	#[tokio::test]
	async fn test_guest_orders_get_no_notification() {
		let fixture = Fixture::new(MockRefundGateway::new(), false).await;
		let mut order = order(OrderStatus::Preparing);
		order.customer_id = None;

		let report = fixture
			.dispatcher
			.run(&transition(order, OrderStatus::Ready, TransitionContext::default()))
			.await;

		assert_eq!(report.skipped, vec![SideEffect::NotifyReady]);
		assert!(fixture.sent().is_empty());
	}

	#[tokio::test]
	async fn test_same_status_runs_nothing() {
		let fixture = Fixture::new(MockRefundGateway::new(), false).await;
		let report = fixture
			.dispatcher
			.run(&transition(
				order(OrderStatus::Ready),
				OrderStatus::Ready,
				TransitionContext::default(),
			))
			.await;

		assert_eq!(report, DispatchReport::default());
		assert!(fixture.sent().is_empty());
	}

	#[tokio::test]
	async fn test_deletion_without_session_makes_no_cascade() {
		let fixture = Fixture::new(MockRefundGateway::new(), false).await;

		let report = fixture
			.dispatcher
			.run_deletion(&order(OrderStatus::Pending), Utc::now())
			.await;

		assert_eq!(report.skipped, vec![SideEffect::CancelGroupSession]);
		assert_eq!(fixture.session().await.status, GroupSessionStatus::Active);
	}

	#[tokio::test]
	async fn test_deletion_cascades_with_distinct_reason() {
		let fixture = Fixture::new(MockRefundGateway::new(), false).await;
		let mut order = order(OrderStatus::Pending);
		order.group_session_id = Some("sess-1".to_string());

		let report = fixture.dispatcher.run_deletion(&order, Utc::now()).await;

		assert_eq!(report.completed, vec![SideEffect::CancelGroupSession]);
		assert_eq!(
			fixture.session().await.cancellation_reason.as_deref(),
			Some("order_deleted")
		);
	}

	#[tokio::test]
	async fn test_missing_session_fails_quietly() {
		let mut fixture = Fixture::new(MockRefundGateway::new(), false).await;
		let mut order = order(OrderStatus::Pending);
		order.group_session_id = Some("sess-gone".to_string());

		let report = fixture.dispatcher.run_deletion(&order, Utc::now()).await;

		assert!(report.failed(SideEffect::CancelGroupSession));
		assert!(fixture.events().iter().all(|e| e.notice().is_none()));
	}
}
