use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::{BufferPool, Permissions, SharedPage};
use crate::common::{DbError, PageId, Result, TransactionId, PAGE_SIZE};
use crate::tuple::{Tuple, TupleDesc};

use super::page::HeapPage;

/// HeapFile stores one table as an unordered sequence of fixed-size
/// heap pages in a single on-disk file. The file's length is always an
/// exact multiple of the page size; appending a page extends it.
///
/// All page access on the read and mutation paths goes through the
/// buffer pool, which owns the single in-memory copy of each cached
/// page and acquires the page lock on behalf of the transaction.
pub struct HeapFile {
    file: Mutex<std::fs::File>,
    path: PathBuf,
    table_id: u32,
    desc: TupleDesc,
    page_size: usize,
}

impl HeapFile {
    /// Opens (creating if absent) a heap file with the default page size.
    pub fn new<P: AsRef<Path>>(path: P, desc: TupleDesc) -> Result<Self> {
        Self::with_page_size(path, desc, PAGE_SIZE)
    }

    /// Opens a heap file with an explicit page size. This is a test hook:
    /// small pages make multi-page behavior cheap to exercise. Production
    /// callers use `new`.
    pub fn with_page_size<P: AsRef<Path>>(
        path: P,
        desc: TupleDesc,
        page_size: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if HeapPage::slot_count(page_size, &desc) == 0 {
            return Err(DbError::Corrupt(format!(
                "tuple width {} does not fit a {}-byte page",
                desc.size(),
                page_size
            )));
        }

        // The table id derives from the canonical path, so reopening the
        // same file always yields the same id.
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        canonical.hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        Ok(Self {
            file: Mutex::new(file),
            path: canonical,
            table_id,
            desc,
            page_size,
        })
    }

    /// Returns the table id (hash of the canonical file path).
    pub fn id(&self) -> u32 {
        self.table_id
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of whole pages currently in the file.
    pub fn num_pages(&self) -> Result<usize> {
        let len = self.file.lock().metadata()?.len();
        Ok(len as usize / self.page_size)
    }

    /// Reads the page at `pid.page_no()` off disk.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        let mut buf = vec![0u8; self.page_size];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(
                pid.page_no() as u64 * self.page_size as u64,
            ))?;
            file.read_exact(&mut buf)?;
        }
        HeapPage::new(pid, &buf, self.desc.clone(), self.page_size)
    }

    /// Writes the page's current image at its offset, extending the file
    /// if the page lies past the current end.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let data = page.page_data();
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(
            page.id().page_no() as u64 * self.page_size as u64,
        ))?;
        file.write_all(&data)?;
        file.flush()?;
        Ok(())
    }

    /// Inserts a tuple into the first page with a free slot, fetching
    /// candidate pages through the buffer pool with write permission.
    /// If every page is full, the file is first extended with an empty
    /// page; the insert then goes through the buffer pool like any
    /// other, so the new page participates in locking and commit/abort
    /// handling. Returns the single page that was dirtied.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: Tuple,
    ) -> Result<Vec<SharedPage>> {
        let num_pages = self.num_pages()?;
        for page_no in 0..num_pages {
            let pid = PageId::new(self.table_id, page_no as u32);
            let shared = pool.get_page(tid, pid, Permissions::ReadWrite)?;
            let mut page = shared.lock();
            if page.num_empty_slots() > 0 {
                page.insert_tuple(tuple)?;
                drop(page);
                return Ok(vec![shared]);
            }
        }

        // All pages full: extend the file with an empty page on disk,
        // then insert through the buffer pool so the new page is locked
        // and its pre-insert image is what abort rolls back to.
        let pid = PageId::new(self.table_id, num_pages as u32);
        let empty = HeapPage::new(
            pid,
            &HeapPage::empty_page_data(self.page_size),
            self.desc.clone(),
            self.page_size,
        )?;
        self.write_page(&empty)?;

        let shared = pool.get_page(tid, pid, Permissions::ReadWrite)?;
        shared.lock().insert_tuple(tuple)?;
        Ok(vec![shared])
    }

    /// Deletes a tuple from the page named by its record id, fetched
    /// through the buffer pool with write permission. Returns the single
    /// page that was dirtied.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<SharedPage>> {
        let rid = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        if rid.page_id().table_id() != self.table_id {
            return Err(DbError::WrongTable(self.table_id));
        }

        let shared = pool.get_page(tid, rid.page_id(), Permissions::ReadWrite)?;
        shared.lock().delete_tuple(tuple)?;
        Ok(vec![shared])
    }

    /// Returns a page-by-page cursor over the file's tuples on behalf of
    /// `tid`. Every page is requested through the buffer pool with read
    /// permission. The cursor starts closed; call `open` first.
    pub fn iter(self: &Arc<Self>, pool: Arc<BufferPool>, tid: TransactionId) -> HeapFileIterator {
        HeapFileIterator {
            file: Arc::clone(self),
            pool,
            tid,
            open: false,
            page_no: 0,
            buffered: VecDeque::new(),
        }
    }
}

/// Cursor over all tuples of a heap file, in page order then slot order.
///
/// The cursor copies each page's tuples out while holding the page for
/// as short a time as possible; it never retains a page reference across
/// calls, so the buffer pool stays the sole owner of cached pages.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    tid: TransactionId,
    open: bool,
    page_no: usize,
    buffered: VecDeque<Tuple>,
}

impl HeapFileIterator {
    /// Positions the cursor before the first tuple of page 0.
    pub fn open(&mut self) -> Result<()> {
        self.open = true;
        self.page_no = 0;
        self.buffered = if self.file.num_pages()? > 0 {
            self.load_page(0)?
        } else {
            VecDeque::new()
        };
        Ok(())
    }

    fn load_page(&self, page_no: usize) -> Result<VecDeque<Tuple>> {
        let pid = PageId::new(self.file.id(), page_no as u32);
        let shared = self
            .pool
            .get_page(self.tid, pid, Permissions::ReadOnly)?;
        let page = shared.lock();
        Ok(page.iter().cloned().collect())
    }

    /// Reports whether another tuple is available, advancing through
    /// pages as needed. Total: exhaustion is a `false` return, never an
    /// error.
    pub fn has_next(&mut self) -> Result<bool> {
        if !self.open {
            return Ok(false);
        }
        while self.buffered.is_empty() {
            if self.page_no + 1 >= self.file.num_pages()? {
                return Ok(false);
            }
            self.page_no += 1;
            self.buffered = self.load_page(self.page_no)?;
        }
        Ok(true)
    }

    /// Returns the next tuple, or `Exhausted` past the end.
    pub fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(DbError::Exhausted);
        }
        self.buffered.pop_front().ok_or(DbError::Exhausted)
    }

    /// Restarts the cursor from page 0.
    pub fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    pub fn close(&mut self) {
        self.open = false;
        self.buffered.clear();
    }
}
