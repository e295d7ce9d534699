//! Documents the order core reads or nudges but does not own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Business record as seen by the order core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Business {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub has_table_service: bool,
	/// Running count of orders accepted with shortages.
	#[serde(default)]
	pub fulfillment_issues: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_fulfillment_issue_at: Option<DateTime<Utc>>,
}

/// Customer account fields needed for notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub push_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GroupSessionStatus {
	Active,
	Closed,
	Cancelled,
}

/// A shared dine-in ordering session at one table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupSession {
	pub status: GroupSessionStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub business_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub table_number: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub closed_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cancellation_reason: Option<String>,
}
