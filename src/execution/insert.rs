use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{DbError, Result, TransactionId};
use crate::tuple::{Field, FieldType, Tuple, TupleDesc};

use super::operator::OpIterator;

/// Inserts every tuple drawn from the child into a table, routing each
/// insert through the buffer pool. Emits a single one-field tuple with
/// the number of inserted rows, then is exhausted.
pub struct Insert {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    table_id: u32,
    desc: TupleDesc,
    done: bool,
    opened: bool,
}

impl Insert {
    /// Fails with `SchemaMismatch` if the child's descriptor differs
    /// from the destination table's.
    pub fn new(
        pool: Arc<BufferPool>,
        tid: TransactionId,
        child: Box<dyn OpIterator>,
        table_id: u32,
    ) -> Result<Self> {
        let table_desc = pool.catalog().tuple_desc(table_id)?;
        if child.tuple_desc() != &table_desc {
            return Err(DbError::SchemaMismatch);
        }
        Ok(Self {
            pool,
            tid,
            child,
            table_id,
            desc: TupleDesc::with_types(&[FieldType::Int]),
            done: false,
            opened: false,
        })
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.done = false;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self.opened && !self.done)
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(DbError::Exhausted);
        }

        let mut count = 0;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            self.pool.insert_tuple(self.tid, self.table_id, tuple)?;
            count += 1;
        }
        self.done = true;
        Ok(Tuple::new(self.desc.clone(), vec![Field::Int(count)]))
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn children(&mut self) -> Vec<&mut dyn OpIterator> {
        vec![self.child.as_mut()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 1, "insert takes exactly one child");
        self.child = children.remove(0);
    }
}
