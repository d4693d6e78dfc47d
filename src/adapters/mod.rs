//! Backend adapters.
//!
//! One adapter per store, each owning a single long-lived connection for its
//! lifetime and exposing the same timed-operation contract so the two
//! backends can be compared query for query.

pub mod document;
pub mod relational;
