//! Strongly-typed domain types.
//!
//! Element, river and series indices share the same representation but
//! must never be mixed up; the newtypes here make that a compile error.

mod indices;

pub use indices::{ElementIndex, RiverIndex, SeriesIndex};
