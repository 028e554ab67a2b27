//! Session tracking
//!
//! Every accepted job owns one [`SessionRecord`] in the [`SessionStore`].
//! The record is written only by the job's own task (directly, or through
//! the progress normalizer acting for it) and read by pollers as detached
//! snapshots.
//!
//! # Module Organization
//!
//! - [`types`] - ids, the status state machine and the record itself
//! - [`store`] - the internally synchronized store

pub mod store;
pub mod types;

pub use store::{SessionStats, SessionStore};
pub use types::{ProgressSnapshot, SessionId, SessionRecord, SessionStatus};
