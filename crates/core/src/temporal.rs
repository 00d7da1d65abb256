//! System-versioned ("temporal") record metadata.
//!
//! Every directory entity carries a [`TemporalRecord`]. History is kept as
//! closed validity windows; the currently effective version of a logical
//! entity is the single row whose `sys_end` is the open sentinel. Nothing is
//! physically deleted: deletion is a transition to [`SysStatus::Deleted`].

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::concurrency::ConcurrencyStamp;
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};

/// 9999-12-31T23:59:59Z, the conventional "not yet closed" end of a window.
const SYS_END_OPEN_SECS: i64 = 253_402_300_799;

/// The sentinel `sys_end` of the currently effective version.
pub fn sys_end_open() -> DateTime<Utc> {
    DateTime::from_timestamp(SYS_END_OPEN_SECS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Lifecycle state of a record version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SysStatus {
    #[default]
    Active,
    Inactive,
    Locked,
    Deleted,
}

impl SysStatus {
    pub const ALL: [SysStatus; 4] = [
        SysStatus::Active,
        SysStatus::Inactive,
        SysStatus::Locked,
        SysStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SysStatus::Active => "Active",
            SysStatus::Inactive => "Inactive",
            SysStatus::Locked => "Locked",
            SysStatus::Deleted => "Deleted",
        }
    }

    /// Storage code (the column is an integer).
    pub fn code(&self) -> i32 {
        match self {
            SysStatus::Active => 0,
            SysStatus::Inactive => 1,
            SysStatus::Locked => 2,
            SysStatus::Deleted => 3,
        }
    }

    pub fn from_code(code: i32) -> DomainResult<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| DomainError::validation(format!("unknown SysStatus code {code}")))
    }
}

impl core::fmt::Display for SysStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SysStatus {
    type Err = DomainError;

    /// Variant names are matched exactly (case-sensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("'{s}' is not a valid SysStatus")))
    }
}

/// Lifecycle status and validity window of one record version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalRecord {
    pub sys_status: SysStatus,
    /// Actor who wrote this version.
    pub sys_user: String,
    /// Inclusive start of the validity window.
    pub sys_start: DateTime<Utc>,
    /// Exclusive end of the validity window, or [`sys_end_open`].
    pub sys_end: DateTime<Utc>,
}

impl Default for TemporalRecord {
    fn default() -> Self {
        Self {
            sys_status: SysStatus::Active,
            sys_user: String::new(),
            sys_start: DateTime::<Utc>::default(),
            sys_end: sys_end_open(),
        }
    }
}

impl TemporalRecord {
    /// A fresh, open, active version written by `actor` at `at`.
    pub fn opened(actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            sys_status: SysStatus::Active,
            sys_user: actor.into(),
            sys_start: at,
            sys_end: sys_end_open(),
        }
    }

    /// Whether this is the currently effective version.
    pub fn is_open(&self) -> bool {
        self.sys_end >= sys_end_open()
    }

    /// Currently effective and not a deletion tombstone.
    pub fn is_live(&self) -> bool {
        self.is_open() && self.sys_status != SysStatus::Deleted
    }

    /// Whether `instant` falls inside `[sys_start, sys_end)`.
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        self.sys_start <= instant && instant < self.sys_end
    }

    /// Close this version at `at`.
    pub fn close(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_open() {
            return Err(DomainError::invariant("version is already closed"));
        }
        if at <= self.sys_start {
            return Err(DomainError::invalid_argument(format!(
                "version cannot close at {at}, it starts at {}",
                self.sys_start
            )));
        }
        self.sys_end = at;
        Ok(())
    }

    /// The open metadata of the version that follows this one.
    pub fn successor(&self, status: SysStatus, actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            sys_status: status,
            sys_user: actor.into(),
            sys_start: at,
            sys_end: sys_end_open(),
        }
    }
}

/// A directory entity that carries temporal metadata.
pub trait Temporal: Entity + Clone {
    /// Human-readable entity kind used in errors and spans.
    const KIND: &'static str;

    fn temporal(&self) -> &TemporalRecord;

    fn temporal_mut(&mut self) -> &mut TemporalRecord;

    /// Optimistic concurrency token, for entities that carry one.
    fn concurrency_stamp(&self) -> Option<&ConcurrencyStamp> {
        None
    }

    /// Issue a new concurrency token (no-op for stamp-less entities).
    fn refresh_concurrency_stamp(&mut self) {}
}
