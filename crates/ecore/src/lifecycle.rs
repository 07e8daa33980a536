//! Lifecycle state machine: `active -> soft_deleted -> archived -> purged`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The on-disk `state` byte (0 active, 1 soft, 2 archived, 3 purged).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LifecycleState {
    /// Normal, visible entity.
    Active = 0,
    /// Soft-deleted; restorable.
    SoftDeleted = 1,
    /// Archived; reachable only via temporal queries, not restorable to active directly.
    Archived = 2,
    /// Purged; record removed, id tombstoned.
    Purged = 3,
}

impl LifecycleState {
    /// Decode the on-disk state byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Active),
            1 => Some(Self::SoftDeleted),
            2 => Some(Self::Archived),
            3 => Some(Self::Purged),
            _ => None,
        }
    }

    /// Encode to the on-disk state byte.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// The `lifecycle:state:<s>` tag value for this state.
    pub fn tag_value(self) -> &'static str {
        match self {
            Self::Active => "lifecycle:state:active",
            Self::SoftDeleted => "lifecycle:state:soft_deleted",
            Self::Archived => "lifecycle:state:archived",
            Self::Purged => "lifecycle:state:purged",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::SoftDeleted => write!(f, "soft_deleted"),
            Self::Archived => write!(f, "archived"),
            Self::Purged => write!(f, "purged"),
        }
    }
}

/// A lifecycle transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// `active -> soft_deleted`
    SoftDelete,
    /// `soft_deleted -> active`
    Restore,
    /// `soft_deleted -> archived`
    Archive,
    /// `soft_deleted | archived -> purged` (requires confirmation token upstream)
    Purge,
}

/// Error returned for an illegal transition. Maps to the `Conflict` error
/// class in the repository's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal lifecycle transition: {event:?} from {from}")]
pub struct IllegalTransition {
    /// The state the entity was in.
    pub from: LifecycleState,
    /// The transition that was attempted.
    pub event: LifecycleEvent,
}

impl LifecycleState {
    /// Apply an event, yielding the resulting state or an [`IllegalTransition`].
    ///
    /// ```text
    /// active ──soft_delete──▶ soft_deleted ──restore──▶ active
    ///                            │
    ///                            └──archive──▶ archived ──purge──▶ purged
    /// soft_deleted ──purge──▶ purged
    /// ```
    pub fn transition(self, event: LifecycleEvent) -> Result<Self, IllegalTransition> {
        use LifecycleEvent::*;
        use LifecycleState::*;
        match (self, event) {
            (Active, SoftDelete) => Ok(SoftDeleted),
            (SoftDeleted, Restore) => Ok(Active),
            (SoftDeleted, Archive) => Ok(Archived),
            (SoftDeleted, Purge) => Ok(Purged),
            (Archived, Purge) => Ok(Purged),
            (from, event) => Err(IllegalTransition { from, event }),
        }
    }
}
