//! Contact debouncing.

mod confirm;

pub use confirm::*;
