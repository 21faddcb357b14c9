mod columns;
mod lines;

pub use columns::{ColumnModel, ColumnTracker};
pub use lines::LineReconstructor;
