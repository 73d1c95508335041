//! Client-side state owned by explicit instances.
//!
//! DESIGN
//! ======
//! `records` keeps the local snapshot of remote records in sync with the
//! service; `conversation` drives chat exchanges. The two share no state.
//! `draft` holds the value-level edit model both record flows use.

pub mod conversation;
pub mod draft;
pub mod records;

#[cfg(test)]
pub(crate) mod test_helpers;
