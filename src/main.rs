use std::sync::Arc;

use relic::db::Database;
use relic::execution::{
    Aggregate, AggregateOp, Filter, Op, OpIterator, Predicate, SeqScan,
};
use relic::storage::HeapFile;
use relic::tuple::{Field, FieldType, Tuple, TupleDesc};
use relic::TransactionId;

fn main() -> relic::Result<()> {
    tracing_subscriber::fmt::init();

    println!("Relic - a small disk-backed relational engine");
    println!("=============================================\n");

    let dir = std::env::temp_dir().join("relic-demo");
    std::fs::create_dir_all(&dir)?;

    let db = Database::new();
    let desc = TupleDesc::with_names(&[FieldType::Int, FieldType::Str], &["id", "name"]);
    let file = Arc::new(HeapFile::new(dir.join("people.dat"), desc.clone())?);
    let table_id = file.id();
    db.catalog().add_table(file, "people", "id");
    println!("Created table 'people' (id = {})", table_id);

    // Load a few rows in one transaction.
    let loader = TransactionId::new();
    for (id, name) in [(1, "ada"), (2, "brian"), (3, "grace"), (4, "edsger")] {
        let row = Tuple::new(desc.clone(), vec![Field::Int(id), Field::from(name)]);
        db.buffer_pool().insert_tuple(loader, table_id, row)?;
    }
    db.buffer_pool().transaction_complete(loader, true)?;
    println!("Inserted 4 rows and committed\n");

    // SELECT * FROM people WHERE id > 1
    let reader = TransactionId::new();
    let pool = Arc::clone(db.buffer_pool());
    let scan = SeqScan::new(Arc::clone(&pool), reader, table_id, "p")?;
    let mut filter = Filter::new(
        Predicate::new(0, Op::GreaterThan, Field::Int(1)),
        Box::new(scan),
    );

    filter.open()?;
    println!("people with id > 1:");
    while filter.has_next()? {
        println!("  {}", filter.next()?);
    }
    filter.close();

    // SELECT COUNT(name) FROM people
    let scan = SeqScan::new(Arc::clone(&pool), reader, table_id, "p")?;
    let mut count = Aggregate::new(Box::new(scan), 1, None, AggregateOp::Count)?;
    count.open()?;
    while count.has_next()? {
        println!("\nrow count: {}", count.next()?);
    }
    count.close();

    db.buffer_pool().transaction_complete(reader, true)?;

    std::fs::remove_dir_all(&dir).ok();
    println!("\nDemo completed successfully!");
    Ok(())
}
