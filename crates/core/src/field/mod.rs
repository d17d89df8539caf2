//! Windowed strand field

mod store;

pub use store::{FieldStore, Slice};
