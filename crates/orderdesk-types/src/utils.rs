//! Formatting helpers.

/// Shortens an identifier for log lines and notices.
///
/// Ids of eight characters or fewer are returned unchanged.
pub fn truncate_id(id: &str) -> String {
	if id.chars().count() <= 8 {
		id.to_string()
	} else {
		let head: String = id.chars().take(8).collect();
		format!("{}..", head)
	}
}
