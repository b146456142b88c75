//! Relic - a small disk-backed relational engine
//!
//! This crate implements the core of a relational storage and execution
//! engine: tables persist as fixed-size pages on disk, a bounded page
//! cache serves them under strict two-phase locking, and queries run as
//! pull-based operator trees over that cache.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//!
//! - **Tuple Model** (`tuple`): Typed rows and their schemas
//!   - `Field`/`FieldType`: a closed set of fixed-width value types
//!   - `TupleDesc`: ordered field descriptors with serialized size
//!   - `Tuple`: a row with an optional on-disk record id
//!
//! - **Storage Layer** (`storage`): Page organization and disk I/O
//!   - `HeapPage`: fixed-size page with a slot-occupancy bitmap
//!   - `HeapFile`: one table as a sequence of heap pages in one file
//!
//! - **Concurrency** (`concurrency`): Page-granularity strict 2PL
//!   - `LockManager`: S/X locks with timeout-based deadlock resolution
//!
//! - **Buffer Pool** (`buffer`): Bounded page cache
//!   - `BufferPool`: fetch-under-lock, NO-STEAL eviction, FORCE commit
//!
//! - **Catalog** (`catalog`): Table registry and schema file loader
//!
//! - **Execution** (`execution`): Pull-based operator algebra
//!   - scans, filters, joins, aggregates, inserts, deletes, and friends
//!
//! - **Optimizer** (`optimizer`): Selectivity estimation
//!   - `IntHistogram`: fixed-width integer histogram
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relic::db::Database;
//! use relic::execution::{OpIterator, SeqScan};
//! use relic::storage::HeapFile;
//! use relic::tuple::{Field, FieldType, Tuple, TupleDesc};
//! use relic::TransactionId;
//!
//! # fn main() -> relic::Result<()> {
//! let db = Database::new();
//! let desc = TupleDesc::with_names(&[FieldType::Int], &["id"]);
//! let file = Arc::new(HeapFile::new("people.dat", desc.clone())?);
//! let table_id = file.id();
//! db.catalog().add_table(file, "people", "id");
//!
//! let tid = TransactionId::new();
//! let row = Tuple::new(desc, vec![Field::Int(1)]);
//! db.buffer_pool().insert_tuple(tid, table_id, row)?;
//!
//! let mut scan = SeqScan::new(Arc::clone(db.buffer_pool()), tid, table_id, "p")?;
//! scan.open()?;
//! while scan.has_next()? {
//!     println!("{}", scan.next()?);
//! }
//! db.buffer_pool().transaction_complete(tid, true)?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
pub mod db;
pub mod execution;
pub mod optimizer;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{DbError, PageId, RecordId, Result, SlotId, TransactionId};
