use crate::common::{DbError, Result};
use crate::tuple::{TdItem, Tuple, TupleDesc};

use super::operator::{take_lookahead, OpIterator};

/// Projection: reindexes each child tuple down to the selected fields,
/// in the given order.
pub struct Project {
    fields: Vec<usize>,
    child: Box<dyn OpIterator>,
    desc: TupleDesc,
    lookahead: Option<Tuple>,
    opened: bool,
}

impl Project {
    /// Fails if any selected index is out of range for the child.
    pub fn new(fields: Vec<usize>, child: Box<dyn OpIterator>) -> Result<Self> {
        let child_desc = child.tuple_desc();
        let items: Result<Vec<TdItem>> = fields
            .iter()
            .map(|&i| {
                Ok(TdItem::new(
                    child_desc.field_type(i)?,
                    child_desc.field_name(i)?.map(str::to_string),
                ))
            })
            .collect();
        Ok(Self {
            desc: TupleDesc::new(items?),
            fields,
            child,
            lookahead: None,
            opened: false,
        })
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if !self.child.has_next()? {
            return Ok(None);
        }
        let tuple = self.child.next()?;
        let fields: Result<Vec<_>> = self
            .fields
            .iter()
            .map(|&i| {
                tuple
                    .field(i)
                    .cloned()
                    .ok_or_else(|| DbError::NoSuchField(format!("field index {i}")))
            })
            .collect();
        Ok(Some(Tuple::new(self.desc.clone(), fields?)))
    }
}

impl OpIterator for Project {
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
        assert_eq!(children.len(), 1, "project takes exactly one child");
        self.child = children.remove(0);
    }
}
