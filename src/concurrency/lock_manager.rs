use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rand::Rng;
use tracing::debug;

use crate::common::{DbError, PageId, Result, TransactionId, LOCK_TIMEOUT_MAX_MS};

/// Page lock modes. A page is held in at most one mode at a time:
/// either any number of shared holders or exactly one exclusive holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

struct LockEntry {
    mode: LockMode,
    holders: Vec<TransactionId>,
}

#[derive(Default)]
struct LockTable {
    /// page -> current mode and its (non-empty) holder set
    page_locks: HashMap<PageId, LockEntry>,
    /// transaction -> pages it currently locks; agrees with `page_locks`
    held_by: HashMap<TransactionId, HashSet<PageId>>,
}

impl LockTable {
    fn record(&mut self, tid: TransactionId, pid: PageId) {
        self.held_by.entry(tid).or_default().insert(pid);
    }
}

/// Page-granularity strict two-phase lock manager.
///
/// The whole lock table lives behind a single mutex; waiters block on
/// one condvar that every release broadcasts to. There are no per-page
/// queues and no fairness guarantee. Progress comes from the deadlock
/// detector: each request draws a random timeout from
/// `[0, LOCK_TIMEOUT_MAX_MS)` at its first call, and any wakeup past
/// that deadline aborts the transaction.
#[derive(Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock on `pid` for `tid` in the given mode, blocking
    /// while another transaction holds a conflicting lock.
    ///
    /// Grant rules:
    /// - an exclusive holder re-requesting any mode succeeds immediately
    ///   (exclusive subsumes shared);
    /// - shared requests join existing shared holders;
    /// - a sole shared holder requesting exclusive upgrades in place.
    ///
    /// Fails with `TransactionAborted` once the wait outlives the
    /// request's random timeout.
    pub fn acquire_lock(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> Result<()> {
        let start = Instant::now();
        let timeout =
            Duration::from_millis(rand::thread_rng().gen_range(0..LOCK_TIMEOUT_MAX_MS));

        let mut table = self.table.lock();
        loop {
            {
                let LockTable {
                    page_locks,
                    held_by,
                } = &mut *table;

                match page_locks.entry(pid) {
                    Entry::Vacant(slot) => {
                        slot.insert(LockEntry {
                            mode,
                            holders: vec![tid],
                        });
                        held_by.entry(tid).or_default().insert(pid);
                        return Ok(());
                    }
                    Entry::Occupied(mut slot) => {
                        let entry = slot.get_mut();
                        match entry.mode {
                            LockMode::Exclusive => {
                                if entry.holders.first() == Some(&tid) {
                                    return Ok(());
                                }
                            }
                            LockMode::Shared => {
                                if mode == LockMode::Shared {
                                    if !entry.holders.contains(&tid) {
                                        entry.holders.push(tid);
                                    }
                                    held_by.entry(tid).or_default().insert(pid);
                                    return Ok(());
                                }
                                if entry.holders == [tid] {
                                    entry.mode = LockMode::Exclusive;
                                    held_by.entry(tid).or_default().insert(pid);
                                    return Ok(());
                                }
                            }
                        }
                    }
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                debug!(%tid, %pid, "lock wait exceeded timeout, presuming deadlock");
                return Err(DbError::TransactionAborted);
            }
            // woken by any release or by the deadline; the loop retries
            // the grant and re-checks the elapsed time either way
            let _ = self.released.wait_for(&mut table, timeout - elapsed);
        }
    }

    /// Releases `tid`'s lock on one page and wakes all waiters.
    pub fn release_lock(&self, tid: TransactionId, pid: PageId) {
        let mut table = self.table.lock();
        Self::remove(&mut table, tid, pid);
        self.released.notify_all();
    }

    /// Releases every lock `tid` holds and wakes all waiters.
    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        let pages: Vec<PageId> = table
            .held_by
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default();
        for pid in pages {
            Self::remove(&mut table, tid, pid);
        }
        self.released.notify_all();
    }

    fn remove(table: &mut LockTable, tid: TransactionId, pid: PageId) {
        if let Some(pages) = table.held_by.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                table.held_by.remove(&tid);
            }
        }
        if let Some(entry) = table.page_locks.get_mut(&pid) {
            entry.holders.retain(|holder| *holder != tid);
            if entry.holders.is_empty() {
                table.page_locks.remove(&pid);
            }
        }
    }

    /// Returns whether `tid` currently holds a lock on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.table
            .lock()
            .held_by
            .get(&tid)
            .map(|pages| pages.contains(&pid))
            .unwrap_or(false)
    }

    /// Returns the pages `tid` currently locks. The buffer pool walks
    /// this set at commit/abort to flush or discard each touched page.
    pub fn pages_held_by(&self, tid: TransactionId) -> Vec<PageId> {
        self.table
            .lock()
            .held_by
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }
}
