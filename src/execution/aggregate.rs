use std::collections::HashMap;
use std::fmt;

use crate::common::{DbError, Result};
use crate::tuple::{Field, FieldType, TdItem, Tuple, TupleDesc};

use super::operator::{OpIterator, TupleIterator};

/// Aggregate functions. Integer fields support all of them; string
/// fields only COUNT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
            AggregateOp::Sum => "SUM",
            AggregateOp::Avg => "AVG",
            AggregateOp::Count => "COUNT",
        };
        write!(f, "{}", s)
    }
}

/// Incrementally folds tuples into per-group aggregate values.
trait Aggregator {
    fn merge(&mut self, tuple: &Tuple) -> Result<()>;

    /// The accumulated results: one `(group, value)` tuple per group, or
    /// a single `(value)` tuple when not grouping.
    fn results(&self) -> TupleIterator;
}

/// The group key for one incoming tuple: the value of the group-by
/// field, or None when not grouping.
fn group_key(tuple: &Tuple, group_field: Option<usize>) -> Result<Option<Field>> {
    match group_field {
        Some(i) => Ok(Some(
            tuple
                .field(i)
                .cloned()
                .ok_or_else(|| DbError::NoSuchField(format!("group field {i}")))?,
        )),
        None => Ok(None),
    }
}

fn int_value(tuple: &Tuple, field: usize) -> Result<i32> {
    match tuple.field(field) {
        Some(Field::Int(v)) => Ok(*v),
        Some(_) => Err(DbError::UnsupportedAggregate(format!(
            "field {field} is not an integer"
        ))),
        None => Err(DbError::NoSuchField(format!("aggregate field {field}"))),
    }
}

/// Aggregates an integer field. Results are kept as ready-to-emit
/// tuples in group arrival order; AVG additionally keeps running
/// count and sum per group so each merge is O(1).
struct IntAggregator {
    group_field: Option<usize>,
    agg_field: usize,
    op: AggregateOp,
    desc: TupleDesc,
    results: Vec<Tuple>,
    counts: HashMap<Option<Field>, i32>,
    sums: HashMap<Option<Field>, i32>,
}

impl IntAggregator {
    fn new(group_field: Option<usize>, agg_field: usize, op: AggregateOp, desc: TupleDesc) -> Self {
        Self {
            group_field,
            agg_field,
            op,
            desc,
            results: Vec::new(),
            counts: HashMap::new(),
            sums: HashMap::new(),
        }
    }

    fn fold(&mut self, key: &Option<Field>, current: i32, value: i32) -> i32 {
        match self.op {
            AggregateOp::Count => current + 1,
            AggregateOp::Min => current.min(value),
            AggregateOp::Max => current.max(value),
            AggregateOp::Sum => current + value,
            AggregateOp::Avg => {
                let count = self.counts.entry(key.clone()).or_insert(0);
                *count += 1;
                let sum = self.sums.entry(key.clone()).or_insert(0);
                *sum += value;
                *sum / *count
            }
        }
    }
}

impl Aggregator for IntAggregator {
    fn merge(&mut self, tuple: &Tuple) -> Result<()> {
        let value = int_value(tuple, self.agg_field)?;
        let key = group_key(tuple, self.group_field)?;
        let value_slot = if self.group_field.is_some() { 1 } else { 0 };

        let existing = match &key {
            None => (!self.results.is_empty()).then_some(0),
            Some(k) => self
                .results
                .iter()
                .position(|row| row.field(0) == Some(k)),
        };

        match existing {
            Some(row) => {
                let current = match self.results[row].field(value_slot) {
                    Some(Field::Int(v)) => *v,
                    _ => 0,
                };
                let updated = self.fold(&key, current, value);
                self.results[row].set_field(value_slot, Field::Int(updated));
            }
            None => {
                // first tuple of this group
                let initial = match self.op {
                    AggregateOp::Count => 1,
                    _ => value,
                };
                let row = match &key {
                    Some(k) => Tuple::new(
                        self.desc.clone(),
                        vec![k.clone(), Field::Int(initial)],
                    ),
                    None => Tuple::new(self.desc.clone(), vec![Field::Int(initial)]),
                };
                self.results.push(row);
                self.counts.insert(key.clone(), 1);
                self.sums.insert(key, value);
            }
        }
        Ok(())
    }

    fn results(&self) -> TupleIterator {
        TupleIterator::new(self.desc.clone(), self.results.clone())
    }
}

/// Aggregates a string field; only COUNT is meaningful.
struct StrAggregator {
    group_field: Option<usize>,
    desc: TupleDesc,
    results: Vec<Tuple>,
}

impl StrAggregator {
    fn new(group_field: Option<usize>, op: AggregateOp, desc: TupleDesc) -> Result<Self> {
        if op != AggregateOp::Count {
            return Err(DbError::UnsupportedAggregate(format!(
                "{op} over a string field"
            )));
        }
        Ok(Self {
            group_field,
            desc,
            results: Vec::new(),
        })
    }
}

impl Aggregator for StrAggregator {
    fn merge(&mut self, tuple: &Tuple) -> Result<()> {
        let key = group_key(tuple, self.group_field)?;
        let value_slot = if self.group_field.is_some() { 1 } else { 0 };

        let existing = match &key {
            None => (!self.results.is_empty()).then_some(0),
            Some(k) => self
                .results
                .iter()
                .position(|row| row.field(0) == Some(k)),
        };

        match existing {
            Some(row) => {
                let current = match self.results[row].field(value_slot) {
                    Some(Field::Int(v)) => *v,
                    _ => 0,
                };
                self.results[row].set_field(value_slot, Field::Int(current + 1));
            }
            None => {
                let row = match key {
                    Some(k) => Tuple::new(self.desc.clone(), vec![k, Field::Int(1)]),
                    None => Tuple::new(self.desc.clone(), vec![Field::Int(1)]),
                };
                self.results.push(row);
            }
        }
        Ok(())
    }

    fn results(&self) -> TupleIterator {
        TupleIterator::new(self.desc.clone(), self.results.clone())
    }
}

/// Grouping aggregate operator. The grouping is built when the operator
/// is opened by draining the child; the results then replay as either
/// `(group, value)` per group or a single `(value)` tuple.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
    desc: TupleDesc,
    results: Option<TupleIterator>,
}

impl Aggregate {
    /// Fails if either field index is out of range for the child's
    /// descriptor, or a non-COUNT op is requested over a string field.
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        let child_desc = child.tuple_desc();
        let agg_type = child_desc.field_type(agg_field)?;
        if agg_type == FieldType::Str && op != AggregateOp::Count {
            return Err(DbError::UnsupportedAggregate(format!(
                "{op} over a string field"
            )));
        }

        let agg_name = format!(
            "{}({})",
            op,
            child_desc.field_name(agg_field)?.unwrap_or("null")
        );
        let desc = match group_field {
            Some(g) => TupleDesc::new(vec![
                TdItem::new(
                    child_desc.field_type(g)?,
                    child_desc.field_name(g)?.map(str::to_string),
                ),
                TdItem::new(FieldType::Int, Some(agg_name)),
            ]),
            None => TupleDesc::new(vec![TdItem::new(FieldType::Int, Some(agg_name))]),
        };

        Ok(Self {
            child,
            agg_field,
            group_field,
            op,
            desc,
            results: None,
        })
    }

    fn build(&mut self) -> Result<TupleIterator> {
        let agg_type = self.child.tuple_desc().field_type(self.agg_field)?;
        let mut aggregator: Box<dyn Aggregator> = match agg_type {
            FieldType::Int => Box::new(IntAggregator::new(
                self.group_field,
                self.agg_field,
                self.op,
                self.desc.clone(),
            )),
            FieldType::Str => Box::new(StrAggregator::new(
                self.group_field,
                self.op,
                self.desc.clone(),
            )?),
        };

        while self.child.has_next()? {
            let tuple = self.child.next()?;
            aggregator.merge(&tuple)?;
        }
        Ok(aggregator.results())
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        let mut results = self.build()?;
        results.open()?;
        self.results = Some(results);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        match &mut self.results {
            Some(results) => results.has_next(),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> Result<Tuple> {
        match &mut self.results {
            Some(results) => results.next(),
            None => Err(DbError::Exhausted),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        match &mut self.results {
            Some(results) => results.rewind(),
            None => Err(DbError::Exhausted),
        }
    }

    fn close(&mut self) {
        self.results = None;
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn children(&mut self) -> Vec<&mut dyn OpIterator> {
        vec![self.child.as_mut()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 1, "aggregate takes exactly one child");
        self.child = children.remove(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_source(values: &[i32]) -> Box<dyn OpIterator> {
        let desc = TupleDesc::with_names(&[FieldType::Int], &["v"]);
        let tuples = values
            .iter()
            .map(|&v| Tuple::new(desc.clone(), vec![Field::Int(v)]))
            .collect();
        Box::new(TupleIterator::new(desc, tuples))
    }

    fn grouped_source(rows: &[(&str, i32)]) -> Box<dyn OpIterator> {
        let desc = TupleDesc::with_names(&[FieldType::Str, FieldType::Int], &["g", "v"]);
        let tuples = rows
            .iter()
            .map(|&(g, v)| Tuple::new(desc.clone(), vec![Field::from(g), Field::Int(v)]))
            .collect();
        Box::new(TupleIterator::new(desc, tuples))
    }

    fn drain(op: &mut dyn OpIterator) -> Vec<Tuple> {
        let mut out = Vec::new();
        while op.has_next().unwrap() {
            out.push(op.next().unwrap());
        }
        out
    }

    #[test]
    fn test_count_no_grouping() {
        let mut agg = Aggregate::new(int_source(&[5, 6, 7]), 0, None, AggregateOp::Count).unwrap();
        agg.open().unwrap();
        let rows = drain(&mut agg);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field(0), Some(&Field::Int(3)));
    }

    #[test]
    fn test_avg_truncates() {
        let mut agg = Aggregate::new(int_source(&[2, 4, 5]), 0, None, AggregateOp::Avg).unwrap();
        agg.open().unwrap();
        let rows = drain(&mut agg);
        // floor(11 / 3) = 3
        assert_eq!(rows[0].field(0), Some(&Field::Int(3)));
    }

    #[test]
    fn test_min_max_sum() {
        for (op, expected) in [
            (AggregateOp::Min, 2),
            (AggregateOp::Max, 9),
            (AggregateOp::Sum, 18),
        ] {
            let mut agg = Aggregate::new(int_source(&[9, 2, 7]), 0, None, op).unwrap();
            agg.open().unwrap();
            let rows = drain(&mut agg);
            assert_eq!(rows[0].field(0), Some(&Field::Int(expected)), "{op}");
        }
    }

    #[test]
    fn test_grouped_sum_in_arrival_order() {
        let mut agg = Aggregate::new(
            grouped_source(&[("a", 1), ("b", 10), ("a", 2), ("b", 20)]),
            1,
            Some(0),
            AggregateOp::Sum,
        )
        .unwrap();
        agg.open().unwrap();
        let rows = drain(&mut agg);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field(0), Some(&Field::from("a")));
        assert_eq!(rows[0].field(1), Some(&Field::Int(3)));
        assert_eq!(rows[1].field(0), Some(&Field::from("b")));
        assert_eq!(rows[1].field(1), Some(&Field::Int(30)));
    }

    #[test]
    fn test_grouped_avg_running_update() {
        let mut agg = Aggregate::new(
            grouped_source(&[("a", 1), ("a", 2), ("a", 4)]),
            1,
            Some(0),
            AggregateOp::Avg,
        )
        .unwrap();
        agg.open().unwrap();
        let rows = drain(&mut agg);
        // floor(7 / 3) = 2
        assert_eq!(rows[0].field(1), Some(&Field::Int(2)));
    }

    #[test]
    fn test_string_count_by_group() {
        let desc = TupleDesc::with_names(&[FieldType::Int, FieldType::Str], &["k", "s"]);
        let tuples = [(1, "x"), (1, "y"), (2, "z")]
            .iter()
            .map(|&(k, s)| Tuple::new(desc.clone(), vec![Field::Int(k), Field::from(s)]))
            .collect();
        let child = Box::new(TupleIterator::new(desc, tuples));

        let mut agg = Aggregate::new(child, 1, Some(0), AggregateOp::Count).unwrap();
        agg.open().unwrap();
        let rows = drain(&mut agg);
        assert_eq!(rows[0].field(1), Some(&Field::Int(2)));
        assert_eq!(rows[1].field(1), Some(&Field::Int(1)));
    }

    #[test]
    fn test_string_sum_rejected() {
        let desc = TupleDesc::with_names(&[FieldType::Str], &["s"]);
        let child = Box::new(TupleIterator::new(desc, Vec::new()));
        assert!(matches!(
            Aggregate::new(child, 0, None, AggregateOp::Sum),
            Err(DbError::UnsupportedAggregate(_))
        ));
    }
}
