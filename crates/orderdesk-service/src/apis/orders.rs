//! Order desk endpoints.
//!
//! Status changes answer as soon as the status write is committed; refunds
//! and notifications continue in the background and report through the
//! event bus.

use super::APIError;
use chrono::{DateTime, Utc};
use orderdesk_core::projection::OrderBoard;
use orderdesk_core::{OrderDesk, SuggestedTransition, TransitionContext};
use orderdesk_types::{truncate_id, Order, OrderStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
	pub status: String,
	#[serde(flatten)]
	pub context: TransitionContext,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResponse {
	pub order_id: String,
	pub from: OrderStatus,
	pub to: OrderStatus,
	pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextActionResponse {
	pub order_id: String,
	pub next_action: Option<SuggestedTransition>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistResponse {
	pub order_id: String,
	pub index: usize,
	pub checked: bool,
}

pub fn get_board(desk: &OrderDesk) -> OrderBoard {
	desk.board()
}

pub async fn get_order(desk: &OrderDesk, order_id: &str) -> Result<Order, APIError> {
	Ok(desk.order(order_id).await?)
}

pub async fn get_next_action(desk: &OrderDesk, order_id: &str) -> Result<NextActionResponse, APIError> {
	let next_action = desk.next_action(order_id).await?;
	Ok(NextActionResponse {
		order_id: order_id.to_string(),
		next_action,
	})
}

pub async fn change_status(
	desk: &OrderDesk,
	order_id: &str,
	request: StatusChangeRequest,
) -> Result<StatusChangeResponse, APIError> {
	let target: OrderStatus = request.status.parse()?;
	info!(order_id = %truncate_id(order_id), to = %target, "Status change requested");

	let committed = desk.transition(order_id, target, request.context).await?;
	Ok(StatusChangeResponse {
		order_id: committed.order_id,
		from: committed.from,
		to: committed.to,
		changed_at: committed.at,
	})
}

pub async fn toggle_checklist_item(
	desk: &OrderDesk,
	order_id: &str,
	index: usize,
) -> Result<ChecklistResponse, APIError> {
	let checked = desk.toggle_item(order_id, index).await?;
	Ok(ChecklistResponse {
		order_id: order_id.to_string(),
		index,
		checked,
	})
}

pub async fn delete_order(desk: &OrderDesk, order_id: &str) -> Result<(), APIError> {
	desk.delete_order(order_id).await?;
	info!(order_id = %truncate_id(order_id), "Order deleted via API");
	Ok(())
}
