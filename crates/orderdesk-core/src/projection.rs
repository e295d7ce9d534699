//! Board projection of the live order set.
//!
//! Pure functions of the orders passed in. `served` is folded into the
//! completed column here and only here; stored orders keep their status.

use crate::checklist::{checklist_state, count_checked, ChecklistState};
use crate::state::{suggest_transition, SuggestedTransition};
use orderdesk_types::{Order, OrderStatus};
use rust_decimal::Decimal;
use serde::Serialize;

/// One order as shown on the board.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCard {
	pub order: Order,
	pub display_number: String,
	pub checked_count: usize,
	pub checklist: ChecklistState,
	pub next_action: Option<SuggestedTransition>,
}

impl BoardCard {
	fn from_order(order: &Order) -> Self {
		Self {
			display_number: order.display_number(),
			checked_count: count_checked(order),
			checklist: checklist_state(order),
			next_action: suggest_transition(order),
			order: order.clone(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardStats {
	pub total: usize,
	/// Pending and accepted orders.
	pub pending: usize,
	pub preparing: usize,
	pub ready: usize,
	pub on_the_way: usize,
	/// Delivered and served orders.
	pub completed: usize,
	pub cancelled: usize,
	/// Sum of totals of delivered orders.
	pub revenue: Decimal,
	/// Revenue over the completed count, zero when nothing is completed.
	pub average_order_value: Decimal,
}

/// Kanban columns in board order, plus stats over the whole set.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBoard {
	pub pending: Vec<BoardCard>,
	pub preparing: Vec<BoardCard>,
	pub ready: Vec<BoardCard>,
	pub on_the_way: Vec<BoardCard>,
	pub completed: Vec<BoardCard>,
	pub stats: BoardStats,
}

/// Column an order is shown in, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
	Pending,
	Preparing,
	Ready,
	OnTheWay,
	Completed,
}

pub fn column_for(status: OrderStatus) -> Option<Column> {
	match status {
		OrderStatus::Pending | OrderStatus::Accepted => Some(Column::Pending),
		OrderStatus::Preparing => Some(Column::Preparing),
		OrderStatus::Ready => Some(Column::Ready),
		OrderStatus::OnTheWay => Some(Column::OnTheWay),
		OrderStatus::Delivered | OrderStatus::Served => Some(Column::Completed),
		OrderStatus::Completed | OrderStatus::Cancelled => None,
	}
}

/// Builds the board for `orders`, keeping their relative order in each column.
pub fn project(orders: &[Order]) -> OrderBoard {
	let mut board = OrderBoard::default();
	for order in orders {
		let Some(column) = column_for(order.status) else {
			continue;
		};
		let cards = match column {
			Column::Pending => &mut board.pending,
			Column::Preparing => &mut board.preparing,
			Column::Ready => &mut board.ready,
			Column::OnTheWay => &mut board.on_the_way,
			Column::Completed => &mut board.completed,
		};
		cards.push(BoardCard::from_order(order));
	}
	board.stats = stats(orders);
	board
}

pub fn stats(orders: &[Order]) -> BoardStats {
	let count = |column: Column| {
		orders
			.iter()
			.filter(|order| column_for(order.status) == Some(column))
			.count()
	};

	let revenue: Decimal = orders
		.iter()
		.filter(|order| order.status == OrderStatus::Delivered)
		.map(|order| order.total)
		.sum();
	let completed = count(Column::Completed);
	let average_order_value = if completed == 0 {
		Decimal::ZERO
	} else {
		(revenue / Decimal::from(completed)).round_dp(2)
	};

	BoardStats {
		total: orders.len(),
		pending: count(Column::Pending),
		preparing: count(Column::Preparing),
		ready: count(Column::Ready),
		on_the_way: count(Column::OnTheWay),
		completed,
		cancelled: orders
			.iter()
			.filter(|order| order.status == OrderStatus::Cancelled)
			.count(),
		revenue,
		average_order_value,
	}
}
