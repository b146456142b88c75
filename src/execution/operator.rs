use crate::common::{DbError, Result};
use crate::tuple::{Tuple, TupleDesc};

/// A node in a query execution tree, exposing a pull iterator.
///
/// Contract:
/// - `has_next` is total and idempotent: calling it repeatedly between
///   `next`s is free, and exhaustion is a `false` return, not an error;
/// - `next` on an unopened or exhausted operator fails with `Exhausted`;
/// - `rewind` restarts the operator from its first tuple;
/// - parents own their children; `children`/`set_children` let a caller
///   rewrite the tree before it is opened.
pub trait OpIterator {
    fn open(&mut self) -> Result<()>;

    fn has_next(&mut self) -> Result<bool>;

    fn next(&mut self) -> Result<Tuple>;

    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self);

    /// Descriptor of the tuples this operator emits.
    fn tuple_desc(&self) -> &TupleDesc;

    fn children(&mut self) -> Vec<&mut dyn OpIterator>;

    fn set_children(&mut self, children: Vec<Box<dyn OpIterator>>);
}

/// Takes the memoized lookahead tuple, failing with `Exhausted` when
/// there is none. Shared by every operator's `next`.
pub(crate) fn take_lookahead(slot: &mut Option<Tuple>) -> Result<Tuple> {
    slot.take().ok_or(DbError::Exhausted)
}

/// An operator over an in-memory list of tuples. Used to replay
/// materialized results (aggregates, sorted runs) and as a convenient
/// leaf in tests.
pub struct TupleIterator {
    desc: TupleDesc,
    tuples: Vec<Tuple>,
    pos: usize,
    opened: bool,
}

impl TupleIterator {
    pub fn new(desc: TupleDesc, tuples: Vec<Tuple>) -> Self {
        Self {
            desc,
            tuples,
            pos: 0,
            opened: false,
        }
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> Result<()> {
        self.pos = 0;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self.opened && self.pos < self.tuples.len())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(DbError::Exhausted);
        }
        let tuple = self.tuples[self.pos].clone();
        self.pos += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn children(&mut self) -> Vec<&mut dyn OpIterator> {
        Vec::new()
    }

    fn set_children(&mut self, _children: Vec<Box<dyn OpIterator>>) {}
}
