//! Export state management
//!
//! Marker math and marker persistence.

pub mod marker;
pub mod store;

pub use marker::{day_epoch, format_marker, marker_from_epoch, parse_marker, pending_days};
pub use store::MarkerStore;
