use crate::common::{DbError, Result};
use crate::tuple::{Tuple, TupleDesc};

use super::operator::{take_lookahead, OpIterator};
use super::predicate::JoinPredicate;

/// Nested-loops join. For every left tuple the right child is drained
/// and then rewound, emitting the concatenation of each matching pair.
/// Output order is stable: left order outer, right order inner.
pub struct Join {
    predicate: JoinPredicate,
    left: Box<dyn OpIterator>,
    right: Box<dyn OpIterator>,
    desc: TupleDesc,
    current_left: Option<Tuple>,
    lookahead: Option<Tuple>,
    opened: bool,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        left: Box<dyn OpIterator>,
        right: Box<dyn OpIterator>,
    ) -> Self {
        let desc = TupleDesc::merge(left.tuple_desc(), right.tuple_desc());
        Self {
            predicate,
            left,
            right,
            desc,
            current_left: None,
            lookahead: None,
            opened: false,
        }
    }

    pub fn predicate(&self) -> &JoinPredicate {
        &self.predicate
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            if self.current_left.is_none() {
                if !self.left.has_next()? {
                    return Ok(None);
                }
                self.current_left = Some(self.left.next()?);
            }

            // current_left was just filled if it was empty
            let left = match &self.current_left {
                Some(tuple) => tuple,
                None => return Ok(None),
            };

            while self.right.has_next()? {
                let right = self.right.next()?;
                if self.predicate.matches(left, &right)? {
                    return Ok(Some(Tuple::merge(left, &right)));
                }
            }

            self.right.rewind()?;
            self.current_left = None;
        }
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> Result<()> {
        self.left.open()?;
        self.right.open()?;
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
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = None;
        self.lookahead = None;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
        self.current_left = None;
        self.lookahead = None;
        self.left.close();
        self.right.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn children(&mut self) -> Vec<&mut dyn OpIterator> {
        vec![self.left.as_mut(), self.right.as_mut()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 2, "join takes exactly two children");
        self.right = children.remove(1);
        self.left = children.remove(0);
    }
}
