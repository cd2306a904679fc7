//! Domain model for the `students` record set.
//!
//! # Responsibility
//! - Define the record shape returned by every store backend.
//! - Validate raw form input before anything reaches a store.
//!
//! # Invariants
//! - `id` and `created_at` are assigned by the store, never by callers.
//! - Uniqueness of `registration_no` is enforced by the store, not here.

pub mod student;
