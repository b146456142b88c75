use std::cmp::Ordering;

use crate::common::{DbError, Result};
use crate::tuple::{Tuple, TupleDesc};

use super::operator::{OpIterator, TupleIterator};

/// Sorts the child's tuples in memory by one field when opened, then
/// replays them. The sort is stable, so ties keep child order.
pub struct OrderBy {
    field: usize,
    ascending: bool,
    child: Box<dyn OpIterator>,
    desc: TupleDesc,
    sorted: Option<TupleIterator>,
}

impl OrderBy {
    pub fn new(field: usize, ascending: bool, child: Box<dyn OpIterator>) -> Self {
        let desc = child.tuple_desc().clone();
        Self {
            field,
            ascending,
            child,
            desc,
            sorted: None,
        }
    }
}

impl OpIterator for OrderBy {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;

        let mut tuples = Vec::new();
        while self.child.has_next()? {
            tuples.push(self.child.next()?);
        }

        let field = self.field;
        let ascending = self.ascending;
        tuples.sort_by(|a, b| {
            let ord = match (a.field(field), b.field(field)) {
                (Some(x), Some(y)) => x.compare_to(y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });

        let mut sorted = TupleIterator::new(self.desc.clone(), tuples);
        sorted.open()?;
        self.sorted = Some(sorted);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        match &mut self.sorted {
            Some(sorted) => sorted.has_next(),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> Result<Tuple> {
        match &mut self.sorted {
            Some(sorted) => sorted.next(),
            None => Err(DbError::Exhausted),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        match &mut self.sorted {
            Some(sorted) => sorted.rewind(),
            None => Err(DbError::Exhausted),
        }
    }

    fn close(&mut self) {
        self.sorted = None;
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn children(&mut self) -> Vec<&mut dyn OpIterator> {
        vec![self.child.as_mut()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 1, "order-by takes exactly one child");
        self.child = children.remove(0);
    }
}
