//! Document collections known to the store.

use std::str::FromStr;

/// Collections the core reads or writes.
///
/// Keys in the storage backend are `<collection>:<document id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
	/// Customer orders.
	Orders,
	/// Business records (name, table service, fulfillment-issue counter).
	Businesses,
	/// Customer accounts, read for push tokens.
	Users,
	/// Shared dine-in ordering sessions.
	GroupSessions,
}

impl Collection {
	/// Returns the collection name as stored.
	pub fn as_str(&self) -> &'static str {
		match self {
			Collection::Orders => "orders",
			Collection::Businesses => "businesses",
			Collection::Users => "users",
			Collection::GroupSessions => "groupSessions",
		}
	}

	/// Returns an iterator over all collections.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::Businesses,
			Self::Users,
			Self::GroupSessions,
		]
		.into_iter()
	}

	/// Builds the backend key for a document in this collection.
	pub fn key(&self, id: &str) -> String {
		format!("{}:{}", self.as_str(), id)
	}
}

impl FromStr for Collection {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Collection::all().find(|c| c.as_str() == s).ok_or(())
	}
}

impl From<Collection> for &'static str {
	fn from(collection: Collection) -> Self {
		collection.as_str()
	}
}
