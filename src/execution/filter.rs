use crate::common::{DbError, Result};
use crate::tuple::{Tuple, TupleDesc};

use super::operator::{take_lookahead, OpIterator};
use super::predicate::Predicate;

/// Relational select: passes through only the child tuples that satisfy
/// the predicate. Emits the child's descriptor unchanged.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
    desc: TupleDesc,
    lookahead: Option<Tuple>,
    opened: bool,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        let desc = child.tuple_desc().clone();
        Self {
            predicate,
            child,
            desc,
            lookahead: None,
            opened: false,
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            if self.predicate.filter(&tuple)? {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Ok(false);
        }
        if self.lookahead.is_none() {
            self.lookahead = self.fetch_next()?;
        }
        Ok(self.lookahead.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(DbError::Exhausted);
        }
        take_lookahead(&mut self.lookahead)
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()?;
        self.lookahead = None;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
        self.lookahead = None;
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn children(&mut self) -> Vec<&mut dyn OpIterator> {
        vec![self.child.as_mut()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 1, "filter takes exactly one child");
        self.child = children.remove(0);
    }
}
