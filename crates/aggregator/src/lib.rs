//! Unified profile aggregation for Meridian.
//!
//! This crate is the coordination layer of the identity core: it joins the
//! identity provider's live profile, tenant-sharded preference records, and
//! caller-supplied overrides into one downstream-shaped profile, and hands
//! the result to the analytics/marketing sinks in the background.
//!
//! # Architecture
//!
//! ```text
//! Preference write (controller / resolver)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   PREFERENCE SERVICE                        │
//! │                                                             │
//! │  1. Upsert the tenant's local account (fail fast)           │
//! │         ↓                                                   │
//! │  2. Upsert the preference record                            │
//! │         ↓                                                   │
//! │  3. Spawn the sync trigger (never awaited by the caller)    │
//! │        • fetch identity provider profile                    │
//! │        • join preference records + local account            │
//! │        • merge: provider < record < overrides               │
//! │        • push to analytics store + marketing platform       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures inside step 3 are logged with the identifying keys and
//! swallowed; only steps 1 and 2 can fail the caller.

mod builder;
mod error;
mod merge;
mod service;

// Public exports
pub use builder::{PreferenceAggregator, UnifiedProfile};
pub use error::{AggregatorError, Result};
pub use service::{PreferenceService, PreferenceWrite};

// Re-export commonly used types from dependencies
pub use analytics_sync::{AnalyticsSync, RecordFields, SyncKind, SyncOutcome, TokenConfig};
pub use database::{
    IdentitySelector, LocalAccountUpsert, PreferenceRecord, PreferenceUpsert, PurgeSummary,
};
pub use identity_client::{HttpIdentityClient, Profile, ProfileSource, StaticProfiles, Tenant};
