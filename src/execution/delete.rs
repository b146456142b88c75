use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{DbError, Result, TransactionId};
use crate::tuple::{Field, FieldType, Tuple, TupleDesc};

use super::operator::OpIterator;

/// Deletes every tuple drawn from the child from the table it lives in,
/// routing each delete through the buffer pool. Emits a single
/// one-field tuple with the number of deleted rows, then is exhausted.
pub struct Delete {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    desc: TupleDesc,
    done: bool,
    opened: bool,
}

impl Delete {
    pub fn new(pool: Arc<BufferPool>, tid: TransactionId, child: Box<dyn OpIterator>) -> Self {
        Self {
            pool,
            tid,
            child,
            desc: TupleDesc::with_types(&[FieldType::Int]),
            done: false,
            opened: false,
        }
    }
}

impl OpIterator for Delete {
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
            self.pool.delete_tuple(self.tid, &tuple)?;
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
        assert_eq!(children.len(), 1, "delete takes exactly one child");
        self.child = children.remove(0);
    }
}
