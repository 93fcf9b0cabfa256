//! Timed per-channel write locks with reaction-based early release.

pub mod lock_state_machine;

pub use lock_state_machine::{
    LockPolicy, LockRecord, LockStateMachine, LockStatus, AUTO_TIMEOUT_REASON,
    DEFAULT_RELEASE_GLYPH,
};
