//! Shared types for the OrderDesk order-management core.
//!
//! Every crate in the workspace speaks in terms of these types: the order
//! document and its lifecycle status, the field-level write operations the
//! document store understands, the payloads handed to the notification and
//! refund services, and the events published to operators.

/// Business, customer and group-session documents read by the core.
pub mod directory;
/// Events published on the desk event bus and the operator notices they map to.
pub mod events;
/// Notification payloads sent to customers.
pub mod notification;
/// The order document, its line items and lifecycle status.
pub mod order;
/// Partial refund requests and receipts.
pub mod refund;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Document collections known to the store.
pub mod storage;
/// Field-level write operations against stored documents.
pub mod update;
/// Small helpers shared across crates.
pub mod utils;
/// Configuration validation for pluggable implementations.
pub mod validation;

pub use directory::*;
pub use events::*;
pub use notification::*;
pub use order::*;
pub use refund::*;
pub use registry::*;
pub use storage::*;
pub use update::*;
pub use utils::truncate_id;
pub use validation::*;
