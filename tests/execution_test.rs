//! End-to-end operator tests: scan, filter, join, aggregate, insert,
//! delete, project, and order-by over real heap files.

use std::sync::Arc;

use relic::db::Database;
use relic::execution::{
    Aggregate, AggregateOp, Delete, Filter, Insert, Join, JoinPredicate, Op, OpIterator,
    Predicate, Project, SeqScan, TupleIterator,
};
use relic::storage::HeapFile;
use relic::tuple::{Field, FieldType, Tuple, TupleDesc};
use relic::{DbError, TransactionId};
use tempfile::TempDir;

fn int_desc() -> TupleDesc {
    TupleDesc::with_names(&[FieldType::Int], &["id"])
}

fn pair_desc() -> TupleDesc {
    TupleDesc::with_names(&[FieldType::Int, FieldType::Str], &["id", "name"])
}

/// Registers a table and commits the given rows into it.
fn load_table(db: &Database, dir: &TempDir, name: &str, desc: &TupleDesc, rows: Vec<Tuple>) -> u32 {
    let file = Arc::new(HeapFile::new(dir.path().join(name), desc.clone()).unwrap());
    let table_id = file.id();
    db.catalog().add_table_named(file, name);

    let tid = TransactionId::new();
    for row in rows {
        db.buffer_pool().insert_tuple(tid, table_id, row).unwrap();
    }
    db.buffer_pool().transaction_complete(tid, true).unwrap();
    table_id
}

fn int_rows(desc: &TupleDesc, values: &[i32]) -> Vec<Tuple> {
    values
        .iter()
        .map(|&v| Tuple::new(desc.clone(), vec![Field::Int(v)]))
        .collect()
}

fn drain(op: &mut dyn OpIterator) -> Vec<Tuple> {
    let mut out = Vec::new();
    while op.has_next().unwrap() {
        out.push(op.next().unwrap());
    }
    out
}

fn first_ints(tuples: &[Tuple]) -> Vec<i32> {
    tuples
        .iter()
        .map(|t| match t.field(0) {
            Some(Field::Int(v)) => *v,
            other => panic!("expected int, got {other:?}"),
        })
        .collect()
}

#[test]
fn test_scan_yields_insertion_order() {
    let dir = TempDir::new().unwrap();
    let db = Database::new();
    let desc = int_desc();
    let table_id = load_table(&db, &dir, "a.dat", &desc, int_rows(&desc, &[1, 2, 3]));

    let tid = TransactionId::new();
    let mut scan = SeqScan::new(Arc::clone(db.buffer_pool()), tid, table_id, "a").unwrap();
    scan.open().unwrap();
    let rows = drain(&mut scan);
    assert_eq!(first_ints(&rows), vec![1, 2, 3]);
    assert!(!scan.has_next().unwrap());
    assert!(matches!(scan.next(), Err(DbError::Exhausted)));
    scan.close();

    db.buffer_pool().transaction_complete(tid, true).unwrap();
}

#[test]
fn test_scan_prefixes_field_names_with_alias() {
    let dir = TempDir::new().unwrap();
    let db = Database::new();
    let desc = pair_desc();
    let table_id = load_table(&db, &dir, "p.dat", &desc, Vec::new());

    let tid = TransactionId::new();
    let scan = SeqScan::new(Arc::clone(db.buffer_pool()), tid, table_id, "p").unwrap();
    assert_eq!(scan.tuple_desc().field_name(0).unwrap(), Some("p.id"));
    assert_eq!(scan.tuple_desc().field_name(1).unwrap(), Some("p.name"));
}

#[test]
fn test_scan_unknown_table() {
    let db = Database::new();
    let tid = TransactionId::new();
    assert!(matches!(
        SeqScan::new(Arc::clone(db.buffer_pool()), tid, 12345, "x"),
        Err(DbError::NoSuchTable(_))
    ));
}

#[test]
fn test_filter_greater_than() {
    let dir = TempDir::new().unwrap();
    let db = Database::new();
    let desc = int_desc();
    let table_id = load_table(&db, &dir, "a.dat", &desc, int_rows(&desc, &[1, 2, 3]));

    let tid = TransactionId::new();
    let scan = SeqScan::new(Arc::clone(db.buffer_pool()), tid, table_id, "a").unwrap();
    let mut filter = Filter::new(
        Predicate::new(0, Op::GreaterThan, Field::Int(1)),
        Box::new(scan),
    );

    filter.open().unwrap();
    assert_eq!(first_ints(&drain(&mut filter)), vec![2, 3]);

    filter.rewind().unwrap();
    assert_eq!(first_ints(&drain(&mut filter)), vec![2, 3]);
    filter.close();

    db.buffer_pool().transaction_complete(tid, true).unwrap();
}

#[test]
fn test_nested_loops_join() {
    let dir = TempDir::new().unwrap();
    let db = Database::new();

    let a_desc = int_desc();
    let a = load_table(&db, &dir, "a.dat", &a_desc, int_rows(&a_desc, &[1, 2, 3]));

    let b_desc = pair_desc();
    let b_rows = [(2, "x"), (3, "y"), (4, "z")]
        .iter()
        .map(|&(id, name)| Tuple::new(b_desc.clone(), vec![Field::Int(id), Field::from(name)]))
        .collect();
    let b = load_table(&db, &dir, "b.dat", &b_desc, b_rows);

    let tid = TransactionId::new();
    let pool = db.buffer_pool();
    let left = SeqScan::new(Arc::clone(pool), tid, a, "a").unwrap();
    let right = SeqScan::new(Arc::clone(pool), tid, b, "b").unwrap();
    let mut join = Join::new(
        JoinPredicate::new(0, Op::Equals, 0),
        Box::new(left),
        Box::new(right),
    );

    assert_eq!(join.tuple_desc().num_fields(), 3);
    assert_eq!(join.tuple_desc().field_name(1).unwrap(), Some("b.id"));

    join.open().unwrap();
    let rows = drain(&mut join);
    join.close();

    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].fields(),
        &[Field::Int(2), Field::Int(2), Field::from("x")]
    );
    assert_eq!(
        rows[1].fields(),
        &[Field::Int(3), Field::Int(3), Field::from("y")]
    );

    db.buffer_pool().transaction_complete(tid, true).unwrap();
}

#[test]
fn test_count_and_avg() {
    let dir = TempDir::new().unwrap();
    let db = Database::new();
    let desc = int_desc();
    let table_id = load_table(&db, &dir, "a.dat", &desc, int_rows(&desc, &[2, 4, 5]));
    let tid = TransactionId::new();

    let scan = SeqScan::new(Arc::clone(db.buffer_pool()), tid, table_id, "a").unwrap();
    let mut count = Aggregate::new(Box::new(scan), 0, None, AggregateOp::Count).unwrap();
    count.open().unwrap();
    assert_eq!(first_ints(&drain(&mut count)), vec![3]);
    count.close();

    let scan = SeqScan::new(Arc::clone(db.buffer_pool()), tid, table_id, "a").unwrap();
    let mut avg = Aggregate::new(Box::new(scan), 0, None, AggregateOp::Avg).unwrap();
    avg.open().unwrap();
    // floor(11 / 3) = 3
    assert_eq!(first_ints(&drain(&mut avg)), vec![3]);
    avg.close();

    db.buffer_pool().transaction_complete(tid, true).unwrap();
}

#[test]
fn test_insert_operator_reports_count() {
    let dir = TempDir::new().unwrap();
    let db = Database::new();
    let desc = int_desc();
    let table_id = load_table(&db, &dir, "a.dat", &desc, Vec::new());

    let tid = TransactionId::new();
    let source = TupleIterator::new(desc.clone(), int_rows(&desc, &[7, 8, 9]));
    let mut insert = Insert::new(
        Arc::clone(db.buffer_pool()),
        tid,
        Box::new(source),
        table_id,
    )
    .unwrap();

    insert.open().unwrap();
    let report = insert.next().unwrap();
    assert_eq!(report.field(0), Some(&Field::Int(3)));
    assert!(!insert.has_next().unwrap());
    assert!(matches!(insert.next(), Err(DbError::Exhausted)));
    insert.close();
    db.buffer_pool().transaction_complete(tid, true).unwrap();

    let reader = TransactionId::new();
    let mut scan = SeqScan::new(Arc::clone(db.buffer_pool()), reader, table_id, "a").unwrap();
    scan.open().unwrap();
    assert_eq!(first_ints(&drain(&mut scan)), vec![7, 8, 9]);
    scan.close();
    db.buffer_pool().transaction_complete(reader, true).unwrap();
}

#[test]
fn test_insert_operator_rejects_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let db = Database::new();
    let table_id = load_table(&db, &dir, "a.dat", &int_desc(), Vec::new());

    let tid = TransactionId::new();
    let source = TupleIterator::new(pair_desc(), Vec::new());
    assert!(matches!(
        Insert::new(Arc::clone(db.buffer_pool()), tid, Box::new(source), table_id),
        Err(DbError::SchemaMismatch)
    ));
}

#[test]
fn test_delete_operator_removes_filtered_rows() {
    let dir = TempDir::new().unwrap();
    let db = Database::new();
    let desc = int_desc();
    let table_id = load_table(&db, &dir, "a.dat", &desc, int_rows(&desc, &[1, 2, 3, 4]));

    // DELETE FROM a WHERE id > 2
    let tid = TransactionId::new();
    let scan = SeqScan::new(Arc::clone(db.buffer_pool()), tid, table_id, "a").unwrap();
    let filter = Filter::new(
        Predicate::new(0, Op::GreaterThan, Field::Int(2)),
        Box::new(scan),
    );
    let mut delete = Delete::new(Arc::clone(db.buffer_pool()), tid, Box::new(filter));

    delete.open().unwrap();
    let report = delete.next().unwrap();
    assert_eq!(report.field(0), Some(&Field::Int(2)));
    delete.close();
    db.buffer_pool().transaction_complete(tid, true).unwrap();

    let reader = TransactionId::new();
    let mut scan = SeqScan::new(Arc::clone(db.buffer_pool()), reader, table_id, "a").unwrap();
    scan.open().unwrap();
    assert_eq!(first_ints(&drain(&mut scan)), vec![1, 2]);
    scan.close();
    db.buffer_pool().transaction_complete(reader, true).unwrap();
}

#[test]
fn test_project_reindexes_fields() {
    let desc = pair_desc();
    let rows = vec![
        Tuple::new(desc.clone(), vec![Field::Int(1), Field::from("a")]),
        Tuple::new(desc.clone(), vec![Field::Int(2), Field::from("b")]),
    ];
    let source = TupleIterator::new(desc, rows);

    let mut project = Project::new(vec![1], Box::new(source)).unwrap();
    assert_eq!(project.tuple_desc().num_fields(), 1);
    assert_eq!(project.tuple_desc().field_name(0).unwrap(), Some("name"));

    project.open().unwrap();
    let rows = drain(&mut project);
    assert_eq!(rows[0].fields(), &[Field::from("a")]);
    assert_eq!(rows[1].fields(), &[Field::from("b")]);
}

#[test]
fn test_order_by_descending() {
    let desc = int_desc();
    let source = TupleIterator::new(desc.clone(), int_rows(&desc, &[3, 1, 2]));

    let mut order_by = relic::execution::OrderBy::new(0, false, Box::new(source));
    order_by.open().unwrap();
    assert_eq!(first_ints(&drain(&mut order_by)), vec![3, 2, 1]);
}

#[test]
fn test_set_children_rewrites_tree() {
    let desc = int_desc();
    let original = TupleIterator::new(desc.clone(), int_rows(&desc, &[1, 2, 3]));
    let mut filter = Filter::new(
        Predicate::new(0, Op::GreaterThanOrEq, Field::Int(0)),
        Box::new(original),
    );
    assert_eq!(filter.children().len(), 1);

    // swap in a different source before opening
    let replacement = TupleIterator::new(desc.clone(), int_rows(&desc, &[5]));
    filter.set_children(vec![Box::new(replacement)]);

    filter.open().unwrap();
    assert_eq!(first_ints(&drain(&mut filter)), vec![5]);
}
