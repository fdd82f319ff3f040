//! Read-only statistics over a single numeric column.

pub mod descriptive;
