//! Read-side query pipelines over normalized collections.
//!
//! # Responsibility
//! - Express joined, filtered, sorted and paginated views as ordered stages.
//! - Execute those stages through keyed lookups with in-memory assembly, so
//!   no relational join engine is required from the store.
//!
//! # Invariants
//! - Stages run strictly in declaration order.
//! - Lookups are inner joins: a document whose reference does not resolve is
//!   dropped, never emitted half-populated.

pub mod pipeline;
pub mod saved_questions;
