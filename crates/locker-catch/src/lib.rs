//! Catch tracking for game-bot notifications.
//!
//! Extracts who caught what from notification text, resolves the catcher to a
//! guild member and keeps durable daily/all-time counters.

pub mod catch_aggregator;
pub mod catch_text;
pub mod counter_store;
pub mod identity_resolver;

pub use catch_aggregator::{is_catch_notification, CatchAggregator, CatchRecord};
pub use catch_text::{
    combined_text, extract_fallback_name, extract_identity_hint, extract_subject_name,
    is_catch_text, CATCH_SUBJECT_FALLBACK,
};
pub use counter_store::{CatchCounts, CounterStore, LeaderboardScope, SnapshotLoadOutcome};
pub use identity_resolver::{
    lookup_member, resolve_catcher, CatcherResolution, MemberDirectory, ResolutionSource,
};
