//! Pull-based query execution operators.
//!
//! Every operator implements [`OpIterator`]: a tree is assembled from
//! owned children, opened, and drained tuple by tuple from the root.
//! A one-tuple lookahead in each operator keeps `has_next` idempotent
//! between `next` calls.

mod aggregate;
mod delete;
mod filter;
mod insert;
mod join;
mod operator;
mod order_by;
mod predicate;
mod project;
mod seq_scan;

pub use aggregate::{Aggregate, AggregateOp};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use operator::{OpIterator, TupleIterator};
pub use order_by::OrderBy;
pub use predicate::{JoinPredicate, Op, Predicate};
pub use project::Project;
pub use seq_scan::SeqScan;
