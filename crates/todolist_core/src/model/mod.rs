//! Domain model for the to-do list core.
//!
//! # Responsibility
//! - Define the task record used by repositories and controllers.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId` and owned by one user.
//! - Deletion is a hard delete; there are no tombstones.

pub mod task;
