use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{DbError, Result, TransactionId};
use crate::storage::{HeapFile, HeapFileIterator};
use crate::tuple::{Tuple, TupleDesc};

use super::operator::OpIterator;

/// Sequential scan over one table's heap file. The emitted descriptor
/// is the table's with every field name prefixed by the scan alias, so
/// columns of self-joined tables stay distinguishable.
pub struct SeqScan {
    pool: Arc<BufferPool>,
    file: Arc<HeapFile>,
    tid: TransactionId,
    desc: TupleDesc,
    iter: Option<HeapFileIterator>,
}

impl SeqScan {
    /// Fails with `NoSuchTable` if `table_id` is not in the catalog.
    pub fn new(
        pool: Arc<BufferPool>,
        tid: TransactionId,
        table_id: u32,
        alias: &str,
    ) -> Result<Self> {
        let file = pool.catalog().database_file(table_id)?;
        let desc = file.desc().prefixed(alias);
        Ok(Self {
            pool,
            file,
            tid,
            desc,
            iter: None,
        })
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> Result<()> {
        let mut iter = self.file.iter(Arc::clone(&self.pool), self.tid);
        iter.open()?;
        self.iter = Some(iter);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        match &mut self.iter {
            Some(iter) => iter.has_next(),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> Result<Tuple> {
        match &mut self.iter {
            Some(iter) => iter.next(),
            None => Err(DbError::Exhausted),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        match &mut self.iter {
            Some(iter) => iter.rewind(),
            None => Err(DbError::Exhausted),
        }
    }

    fn close(&mut self) {
        if let Some(iter) = &mut self.iter {
            iter.close();
        }
        self.iter = None;
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn children(&mut self) -> Vec<&mut dyn OpIterator> {
        Vec::new()
    }

    fn set_children(&mut self, children: Vec<Box<dyn OpIterator>>) {
        debug_assert!(children.is_empty(), "a scan has no children");
    }
}
