//! Field-level write operations.
//!
//! Orders are never overwritten wholesale. Each mutation is a list of
//! [`FieldWrite`]s addressed by dotted path (`statusHistory.ready`,
//! `checkedItems.3`) and applied atomically to one document by the store.
//! Removing a field is an explicit [`FieldOp::Delete`], distinct from
//! setting it to `null`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// What to do at a field path.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
	/// Replace the value, creating intermediate maps as needed.
	Set(Value),
	/// Remove the field. Removing an absent field is not an error.
	Delete,
	/// Add to a numeric field, treating an absent field as zero.
	Increment(i64),
}

/// One operation against one field of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
	/// Dotted path from the document root.
	pub path: String,
	pub op: FieldOp,
}

impl FieldWrite {
	pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
		Self {
			path: path.into(),
			op: FieldOp::Set(value.into()),
		}
	}

	pub fn delete(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			op: FieldOp::Delete,
		}
	}

	pub fn increment(path: impl Into<String>, by: i64) -> Self {
		Self {
			path: path.into(),
			op: FieldOp::Increment(by),
		}
	}

	/// Sets `path` to `at` in RFC 3339 form, the encoding timestamps are
	/// stored with.
	pub fn timestamp(path: impl Into<String>, at: DateTime<Utc>) -> Self {
		Self::set(path, at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
	}

	/// Splits the path into its segments.
	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.path.split('.')
	}
}

/// Finds the write targeting `path`, if any.
pub fn find_write<'a>(writes: &'a [FieldWrite], path: &str) -> Option<&'a FieldWrite> {
	writes.iter().find(|w| w.path == path)
}
