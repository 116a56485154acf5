//! Repository layer abstractions and store implementations.
//!
//! # Responsibility
//! - Define the async task store contract consumed by controllers.
//! - Isolate SQLite and document encoding details from controllers.
//!
//! # Invariants
//! - Repository writes enforce `Task::validate()` before persistence.
//! - `get_task` reports absence as `Ok(None)`, never as an error.

pub mod memory_repo;
pub mod task_repo;
