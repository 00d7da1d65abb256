//! System-versioned row storage.
//!
//! A [`TemporalTable`] keeps every version of every logical entity. Writes
//! never overwrite: they close the current row at the write instant and
//! append its successor, so each business key has at most one open row and
//! its closed rows tile the timeline without gaps.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use domainid_core::{DomainError, DomainResult, ExpectedStamp, SysStatus, Temporal, TemporalRecord};

/// In-memory versioned table keyed by business key.
#[derive(Debug)]
pub struct TemporalTable<E: Temporal> {
    rows: RwLock<HashMap<E::Key, Vec<E>>>,
}

impl<E: Temporal> Default for TemporalTable<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Temporal> TemporalTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, HashMap<E::Key, Vec<E>>>> {
        self.rows
            .read()
            .map_err(|_| DomainError::store(format!("{} table lock poisoned", E::KIND)))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, HashMap<E::Key, Vec<E>>>> {
        self.rows
            .write()
            .map_err(|_| DomainError::store(format!("{} table lock poisoned", E::KIND)))
    }

    /// Store the first version of `entity`, opened by `actor` at `at`.
    ///
    /// A deletion tombstone is closed and superseded by a row with a fresh
    /// concurrency stamp; any other current version is a conflict.
    pub fn insert(&self, mut entity: E, actor: &str, at: DateTime<Utc>) -> DomainResult<E> {
        let key = entity.key();
        let mut rows = self.write()?;
        let versions = rows.entry(key.clone()).or_default();

        if let Some(current) = versions.iter_mut().find(|row| row.temporal().is_open()) {
            if current.temporal().sys_status != SysStatus::Deleted {
                tracing::warn!(kind = E::KIND, key = ?key, "insert over a current version");
                return Err(DomainError::conflict(format!(
                    "{} {key:?} already has a current version",
                    E::KIND
                )));
            }
            current.temporal_mut().close(at)?;
            entity.refresh_concurrency_stamp();
        }

        *entity.temporal_mut() = TemporalRecord::opened(actor, at);
        versions.push(entity.clone());
        Ok(entity)
    }

    /// Replace the current version of `entity`'s key with `entity`.
    ///
    /// The current row keeps its status, is closed at `at`, and the new row
    /// gets a fresh concurrency stamp.
    pub fn revise(
        &self,
        entity: E,
        expected: &ExpectedStamp,
        actor: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<E> {
        let key = entity.key();
        self.advance(&key, expected, at, |current| {
            let mut next = entity;
            *next.temporal_mut() =
                current.temporal().successor(current.temporal().sys_status, actor, at);
            next
        })
    }

    /// Move the current version of `key` to `status` (soft delete, lock,
    /// restore), closing the old row and opening exactly one new row.
    pub fn transition(
        &self,
        key: &E::Key,
        status: SysStatus,
        expected: &ExpectedStamp,
        actor: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<E> {
        self.advance(key, expected, at, |current| {
            let mut next = current.clone();
            *next.temporal_mut() = current.temporal().successor(status, actor, at);
            next
        })
    }

    fn advance(
        &self,
        key: &E::Key,
        expected: &ExpectedStamp,
        at: DateTime<Utc>,
        successor: impl FnOnce(&E) -> E,
    ) -> DomainResult<E> {
        let mut rows = self.write()?;
        let versions = rows
            .get_mut(key)
            .ok_or_else(|| DomainError::not_found(format!("{} {key:?}", E::KIND)))?;
        let index = versions
            .iter()
            .position(|row| row.temporal().is_open())
            .ok_or_else(|| DomainError::not_found(format!("current {} {key:?}", E::KIND)))?;

        if let Err(err) = expected.check(versions[index].concurrency_stamp()) {
            tracing::warn!(kind = E::KIND, key = ?key, "stale concurrency stamp");
            return Err(err);
        }

        let mut next = successor(&versions[index]);
        versions[index].temporal_mut().close(at)?;
        next.refresh_concurrency_stamp();
        versions.push(next.clone());
        Ok(next)
    }

    /// The open version of `key`, including a deletion tombstone.
    pub fn current(&self, key: &E::Key) -> DomainResult<Option<E>> {
        let rows = self.read()?;
        Ok(rows
            .get(key)
            .and_then(|versions| versions.iter().find(|row| row.temporal().is_open()))
            .cloned())
    }

    /// The open, non-deleted version of `key`.
    pub fn find_live(&self, key: &E::Key) -> DomainResult<Option<E>> {
        Ok(self.current(key)?.filter(|row| row.temporal().is_live()))
    }

    /// Every live row, in no particular order.
    pub fn live(&self) -> DomainResult<Vec<E>> {
        let rows = self.read()?;
        Ok(rows
            .values()
            .flatten()
            .filter(|row| row.temporal().is_live())
            .cloned()
            .collect())
    }

    /// All versions of `key`, oldest first.
    pub fn history(&self, key: &E::Key) -> DomainResult<Vec<E>> {
        let rows = self.read()?;
        Ok(rows.get(key).cloned().unwrap_or_default())
    }

    /// The version of `key` whose window covers `instant`.
    pub fn as_of(&self, key: &E::Key, instant: DateTime<Utc>) -> DomainResult<Option<E>> {
        let rows = self.read()?;
        Ok(rows
            .get(key)
            .and_then(|versions| versions.iter().find(|row| row.temporal().covers(instant)))
            .cloned())
    }
}
