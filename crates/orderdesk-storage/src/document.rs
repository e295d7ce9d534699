//! Application of field writes to JSON documents.

use crate::StorageError;
use orderdesk_types::{FieldOp, FieldWrite};
use serde_json::{Map, Value};

/// Applies `writes` in order to `doc`.
///
/// On error `doc` is left unchanged: the writes are applied to a copy that
/// replaces `doc` only once every write succeeded.
pub fn apply_writes(doc: &mut Value, writes: &[FieldWrite]) -> Result<(), StorageError> {
	let mut working = doc.clone();
	for write in writes {
		apply_write(&mut working, write)?;
	}
	*doc = working;
	Ok(())
}

fn invalid(write: &FieldWrite, reason: impl Into<String>) -> StorageError {
	StorageError::InvalidPath {
		path: write.path.clone(),
		reason: reason.into(),
	}
}

fn apply_write(doc: &mut Value, write: &FieldWrite) -> Result<(), StorageError> {
	let segments: Vec<&str> = write.segments().collect();
	if segments.iter().any(|s| s.is_empty()) {
		return Err(invalid(write, "empty path segment"));
	}
	let (leaf, parents) = segments
		.split_last()
		.ok_or_else(|| invalid(write, "empty path"))?;

	if let FieldOp::Delete = write.op {
		// Deleting under a missing parent is a no-op.
		let mut current = &mut *doc;
		for segment in parents {
			match current.get_mut(*segment) {
				Some(next) => current = next,
				None => return Ok(()),
			}
		}
		if let Some(map) = current.as_object_mut() {
			map.remove(*leaf);
		}
		return Ok(());
	}

	let mut current = as_map(doc).ok_or_else(|| invalid(write, "document root is not a map"))?;
	for segment in parents {
		let next = current
			.entry(segment.to_string())
			.or_insert_with(|| Value::Object(Map::new()));
		current = as_map(next)
			.ok_or_else(|| invalid(write, format!("'{}' is not a map", segment)))?;
	}

	match &write.op {
		FieldOp::Set(value) => {
			current.insert(leaf.to_string(), value.clone());
		},
		FieldOp::Increment(by) => {
			let updated = match current.get(*leaf) {
				None | Some(Value::Null) => Value::from(*by),
				Some(Value::Number(n)) => {
					if let Some(i) = n.as_i64() {
						Value::from(i.saturating_add(*by))
					} else {
						let f = n.as_f64().unwrap_or_default();
						Value::from(f + *by as f64)
					}
				},
				Some(_) => return Err(invalid(write, "cannot increment a non-numeric field")),
			};
			current.insert(leaf.to_string(), updated);
		},
		FieldOp::Delete => {},
	}
	Ok(())
}

fn as_map(value: &mut Value) -> Option<&mut Map<String, Value>> {
	value.as_object_mut()
}
