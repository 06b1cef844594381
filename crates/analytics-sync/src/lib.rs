//! Downstream sinks for Meridian.
//!
//! Unified profiles are pushed to two external sinks: a tabular analytics
//! store and an email marketing platform. Pushes are best-effort and
//! asynchronous; the preference write that triggers one never waits for or
//! fails because of it. Delivery failures come back as
//! [`SyncOutcome::Failed`] values and stop at the log.

mod error;
mod sync;

pub use error::SyncError;
pub use sync::{spawn_push, AnalyticsSync, RecordFields, SyncKind, SyncOutcome, TokenConfig};
