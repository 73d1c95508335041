//! Network layer for the remote record service.
//!
//! `types` holds the record model and its wire encoding; `api` holds the
//! `RecordApi` seam and its `reqwest` implementation.

pub mod api;
pub mod types;
