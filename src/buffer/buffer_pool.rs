use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::common::{DbError, PageId, Result, TransactionId};
use crate::concurrency::{LockManager, LockMode};
use crate::storage::HeapPage;
use crate::tuple::Tuple;

/// Access permission requested when fetching a page. Read-only access
/// takes a shared lock, read-write access an exclusive lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

/// Handle to the single in-memory copy of a cached page. The outer
/// 2PL lock serializes logical access per transaction; the inner mutex
/// only guards the bytes while a caller reads or mutates them.
pub type SharedPage = Arc<Mutex<HeapPage>>;

/// BufferPool caches up to a fixed number of heap pages in memory and
/// mediates all page access on behalf of transactions.
///
/// Fetching a page first acquires the page lock through the lock
/// manager (shared or exclusive per the requested permission), then
/// serves the page from the cache or reads it from its heap file on a
/// miss, evicting a clean victim when the cache is full.
///
/// Recovery discipline is NO-STEAL + FORCE: a dirty page is never
/// written before its transaction commits (so aborting is just dropping
/// the cached copy), and commit writes through every page the
/// transaction dirtied.
pub struct BufferPool {
    capacity: usize,
    catalog: Arc<Catalog>,
    lock_manager: LockManager,
    cache: Mutex<HashMap<PageId, SharedPage>>,
}

impl BufferPool {
    /// Creates a buffer pool that caches up to `capacity` pages.
    pub fn new(capacity: usize, catalog: Arc<Catalog>) -> Self {
        Self {
            capacity,
            catalog,
            lock_manager: LockManager::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Returns the number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.cache.lock().len()
    }

    /// Fetches a page with the given permission on behalf of `tid`.
    ///
    /// Blocks in the lock manager while a conflicting lock is held and
    /// propagates `TransactionAborted` if the wait times out. On a miss
    /// with a full cache, a clean page is evicted first; if every cached
    /// page is dirty the fetch fails with `AllPagesDirty` (NO-STEAL
    /// forbids flushing uncommitted data to make room).
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> Result<SharedPage> {
        let mode = match perm {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        };
        self.lock_manager.acquire_lock(tid, pid, mode)?;

        let mut cache = self.cache.lock();
        if let Some(page) = cache.get(&pid) {
            return Ok(Arc::clone(page));
        }

        if cache.len() >= self.capacity {
            self.evict(&mut cache)?;
        }

        let file = self.catalog.database_file(pid.table_id())?;
        let page = Arc::new(Mutex::new(file.read_page(pid)?));
        cache.insert(pid, Arc::clone(&page));
        trace!(%tid, %pid, "page miss, read from disk");
        Ok(page)
    }

    /// Discards any clean page to make room. Victim choice is whatever
    /// the map iteration yields first.
    fn evict(&self, cache: &mut HashMap<PageId, SharedPage>) -> Result<()> {
        let victim = cache
            .iter()
            .find(|(_, page)| page.lock().dirtier().is_none())
            .map(|(&pid, _)| pid);

        match victim {
            Some(pid) => {
                trace!(%pid, "evicting clean page");
                cache.remove(&pid);
                Ok(())
            }
            None => {
                debug!("eviction failed: every cached page is dirty");
                Err(DbError::AllPagesDirty)
            }
        }
    }

    /// Inserts a tuple into the given table on behalf of `tid`.
    ///
    /// The heap file acquires the needed exclusive locks through
    /// `get_page`; every page it reports back is marked dirty with `tid`
    /// and (re)inserted into the cache so later fetches see the update.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: u32, tuple: Tuple) -> Result<()> {
        let file = self.catalog.database_file(table_id)?;
        let dirtied = file.insert_tuple(self, tid, tuple)?;
        self.remember_dirtied(tid, dirtied);
        Ok(())
    }

    /// Deletes a tuple from the table owning its record id, symmetric to
    /// `insert_tuple`.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        let file = self.catalog.database_file(rid.page_id().table_id())?;
        let dirtied = file.delete_tuple(self, tid, tuple)?;
        self.remember_dirtied(tid, dirtied);
        Ok(())
    }

    fn remember_dirtied(&self, tid: TransactionId, pages: Vec<SharedPage>) {
        let mut cache = self.cache.lock();
        for shared in pages {
            let pid = {
                let mut page = shared.lock();
                page.mark_dirty(Some(tid));
                page.id()
            };
            cache.insert(pid, shared);
        }
    }

    /// Writes every dirty cached page to disk and clears its dirty bit.
    ///
    /// For tests and shutdown only: flushing mid-transaction writes
    /// uncommitted data and breaks the NO-STEAL discipline.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pids: Vec<PageId> = self.cache.lock().keys().copied().collect();
        for pid in pids {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Writes one page through to its heap file if it is cached and
    /// dirty; no-op otherwise. The page stays cached.
    pub(crate) fn flush_page(&self, pid: PageId) -> Result<()> {
        let Some(shared) = self.cache.lock().get(&pid).cloned() else {
            return Ok(());
        };
        let mut page = shared.lock();
        if page.dirtier().is_some() {
            let file = self.catalog.database_file(pid.table_id())?;
            file.write_page(&page)?;
            page.mark_dirty(None);
            trace!(%pid, "flushed page");
        }
        Ok(())
    }

    /// Writes every page `tid` holds a lock on.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        for pid in self.lock_manager.pages_held_by(tid) {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Drops a page from the cache without flushing it.
    pub fn discard_page(&self, pid: PageId) {
        self.cache.lock().remove(&pid);
    }

    /// Releases `tid`'s lock on a single page before end of transaction.
    ///
    /// Risky: doing this gives up two-phase locking for that page, so
    /// callers must know the page cannot be touched again.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release_lock(tid, pid);
    }

    /// Returns whether `tid` currently holds a lock on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds_lock(tid, pid)
    }

    /// Ends a transaction. On commit, every page the transaction locked
    /// is flushed (FORCE). On abort, every dirty cached copy is dropped,
    /// which restores the pre-transaction state because NO-STEAL
    /// guarantees the disk still holds the last committed bytes. All of
    /// the transaction's locks are then released.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        debug!(%tid, commit, "transaction complete");
        for pid in self.lock_manager.pages_held_by(tid) {
            if commit {
                self.flush_page(pid)?;
            } else {
                let dirty = self
                    .cache
                    .lock()
                    .get(&pid)
                    .map(|page| page.lock().dirtier().is_some())
                    .unwrap_or(false);
                if dirty {
                    self.discard_page(pid);
                }
            }
        }
        self.lock_manager.release_all(tid);
        Ok(())
    }
}
