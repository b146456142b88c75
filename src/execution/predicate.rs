use std::fmt;

use crate::common::{DbError, Result};
use crate::tuple::{Field, Tuple};

/// Comparison operators usable in filter and join predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Equals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    NotEquals,
    /// Substring containment for strings; equality for integers.
    Like,
}

impl Op {
    /// Applies the operator to two field values. Fields of different
    /// types never satisfy an ordered comparison.
    pub fn apply(&self, lhs: &Field, rhs: &Field) -> bool {
        match self {
            Op::Equals => lhs == rhs,
            Op::NotEquals => lhs != rhs,
            Op::Like => match (lhs, rhs) {
                (Field::Str(value), Field::Str(pattern)) => value.contains(pattern.as_str()),
                _ => lhs == rhs,
            },
            Op::GreaterThan | Op::GreaterThanOrEq | Op::LessThan | Op::LessThanOrEq => {
                match lhs.compare_to(rhs) {
                    Some(ord) => match self {
                        Op::GreaterThan => ord.is_gt(),
                        Op::GreaterThanOrEq => ord.is_ge(),
                        Op::LessThan => ord.is_lt(),
                        Op::LessThanOrEq => ord.is_le(),
                        _ => unreachable!("outer match covers the ordered operators"),
                    },
                    None => false,
                }
            }
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Equals => "=",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEq => ">=",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::NotEquals => "<>",
            Op::Like => "LIKE",
        };
        write!(f, "{}", s)
    }
}

/// Compares one field of a tuple against a literal.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: Op,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: Op, operand: Field) -> Self {
        Self { field, op, operand }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn operand(&self) -> &Field {
        &self.operand
    }

    /// Returns whether the tuple satisfies the predicate.
    pub fn filter(&self, tuple: &Tuple) -> Result<bool> {
        let value = tuple
            .field(self.field)
            .ok_or_else(|| DbError::NoSuchField(format!("field index {}", self.field)))?;
        Ok(self.op.apply(value, &self.operand))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f[{}] {} {}", self.field, self.op, self.operand)
    }
}

/// Compares a field of a left tuple against a field of a right tuple.
#[derive(Debug, Clone)]
pub struct JoinPredicate {
    left_field: usize,
    op: Op,
    right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: Op, right_field: usize) -> Self {
        Self {
            left_field,
            op,
            right_field,
        }
    }

    pub fn left_field(&self) -> usize {
        self.left_field
    }

    pub fn right_field(&self) -> usize {
        self.right_field
    }

    /// Returns whether the pair of tuples satisfies the predicate.
    pub fn matches(&self, left: &Tuple, right: &Tuple) -> Result<bool> {
        let lhs = left
            .field(self.left_field)
            .ok_or_else(|| DbError::NoSuchField(format!("left field {}", self.left_field)))?;
        let rhs = right
            .field(self.right_field)
            .ok_or_else(|| DbError::NoSuchField(format!("right field {}", self.right_field)))?;
        Ok(self.op.apply(lhs, rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{FieldType, TupleDesc};

    fn tuple(v: i32) -> Tuple {
        Tuple::new(
            TupleDesc::with_types(&[FieldType::Int]),
            vec![Field::Int(v)],
        )
    }

    #[test]
    fn test_op_apply_int() {
        assert!(Op::Equals.apply(&Field::Int(1), &Field::Int(1)));
        assert!(Op::GreaterThan.apply(&Field::Int(2), &Field::Int(1)));
        assert!(Op::LessThanOrEq.apply(&Field::Int(1), &Field::Int(1)));
        assert!(Op::NotEquals.apply(&Field::Int(1), &Field::Int(2)));
        assert!(!Op::GreaterThan.apply(&Field::Int(1), &Field::Int(1)));
    }

    #[test]
    fn test_op_apply_across_types() {
        // different types: never ordered, never equal
        assert!(!Op::Equals.apply(&Field::Int(1), &Field::from("1")));
        assert!(!Op::LessThan.apply(&Field::Int(1), &Field::from("z")));
        assert!(Op::NotEquals.apply(&Field::Int(1), &Field::from("1")));
    }

    #[test]
    fn test_like() {
        assert!(Op::Like.apply(&Field::from("database"), &Field::from("base")));
        assert!(!Op::Like.apply(&Field::from("database"), &Field::from("basis")));
        assert!(Op::Like.apply(&Field::Int(3), &Field::Int(3)));
    }

    #[test]
    fn test_predicate_filter() {
        let pred = Predicate::new(0, Op::GreaterThan, Field::Int(1));
        assert!(!pred.filter(&tuple(1)).unwrap());
        assert!(pred.filter(&tuple(2)).unwrap());

        let bad = Predicate::new(5, Op::Equals, Field::Int(1));
        assert!(matches!(
            bad.filter(&tuple(1)),
            Err(DbError::NoSuchField(_))
        ));
    }
}
