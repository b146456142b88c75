//! Table registry: maps table names and ids to heap files, schemas, and
//! primary-key columns.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;

use crate::common::{DbError, Result};
use crate::storage::HeapFile;
use crate::tuple::{FieldType, TdItem, TupleDesc};

#[derive(Default)]
struct CatalogInner {
    files: HashMap<u32, Arc<HeapFile>>,
    names: HashMap<u32, String>,
    pkeys: HashMap<u32, String>,
}

/// The catalog keeps three aligned maps keyed by table id: the backing
/// heap file, the table name, and the primary-key column (empty string
/// if none). All three are mutated together under one mutex.
#[derive(Default)]
pub struct Catalog {
    inner: Mutex<CatalogInner>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table. If the name is already mapped, the previous
    /// entry is removed first: the last table added under a name wins.
    pub fn add_table(&self, file: Arc<HeapFile>, name: &str, pkey: &str) {
        let mut inner = self.inner.lock();

        let previous = inner
            .names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(&id, _)| id);
        if let Some(id) = previous {
            inner.files.remove(&id);
            inner.names.remove(&id);
            inner.pkeys.remove(&id);
        }

        let id = file.id();
        inner.files.insert(id, file);
        inner.names.insert(id, name.to_string());
        inner.pkeys.insert(id, pkey.to_string());
    }

    /// Registers a table with no primary key.
    pub fn add_table_named(&self, file: Arc<HeapFile>, name: &str) {
        self.add_table(file, name, "");
    }

    /// Registers a table under a randomly generated unique name.
    pub fn add_table_anonymous(&self, file: Arc<HeapFile>) {
        let name: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        self.add_table_named(file, &name);
    }

    /// Resolves a table name to its id.
    pub fn table_id(&self, name: &str) -> Result<u32> {
        let inner = self.inner.lock();
        inner
            .names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(&id, _)| id)
            .ok_or_else(|| DbError::NoSuchTable(name.to_string()))
    }

    /// Returns the schema of the given table.
    pub fn tuple_desc(&self, table_id: u32) -> Result<TupleDesc> {
        Ok(self.database_file(table_id)?.desc().clone())
    }

    /// Returns the heap file backing the given table.
    pub fn database_file(&self, table_id: u32) -> Result<Arc<HeapFile>> {
        self.inner
            .lock()
            .files
            .get(&table_id)
            .cloned()
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {table_id}")))
    }

    /// Returns the table's primary-key column name, empty if none.
    pub fn primary_key(&self, table_id: u32) -> Result<String> {
        self.inner
            .lock()
            .pkeys
            .get(&table_id)
            .cloned()
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {table_id}")))
    }

    pub fn table_name(&self, table_id: u32) -> Result<String> {
        self.inner
            .lock()
            .names
            .get(&table_id)
            .cloned()
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {table_id}")))
    }

    /// Returns the ids of all registered tables.
    pub fn table_ids(&self) -> Vec<u32> {
        self.inner.lock().files.keys().copied().collect()
    }

    /// Removes every table from the catalog.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.files.clear();
        inner.names.clear();
        inner.pkeys.clear();
    }

    /// Loads table definitions from a schema file with one table per
    /// line: `NAME (COL TYPE [pk], COL TYPE [pk], ...)`. Each table's
    /// heap file is `<name>.dat` next to the schema file.
    pub fn load_schema(&self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let open = line
                .find('(')
                .ok_or_else(|| DbError::InvalidCatalog(line.to_string()))?;
            let close = line
                .rfind(')')
                .ok_or_else(|| DbError::InvalidCatalog(line.to_string()))?;
            let name = line[..open].trim();
            if name.is_empty() || close < open {
                return Err(DbError::InvalidCatalog(line.to_string()));
            }

            let mut items = Vec::new();
            let mut pkey = String::new();
            for column in line[open + 1..close].split(',') {
                let mut parts = column.split_whitespace();
                let col_name = parts
                    .next()
                    .ok_or_else(|| DbError::InvalidCatalog(line.to_string()))?;
                let type_name = parts
                    .next()
                    .ok_or_else(|| DbError::InvalidCatalog(line.to_string()))?;
                let field_type = FieldType::parse(type_name).ok_or_else(|| {
                    DbError::InvalidCatalog(format!("unknown type '{type_name}' in: {line}"))
                })?;
                match parts.next() {
                    Some("pk") => pkey = col_name.to_string(),
                    Some(other) => {
                        return Err(DbError::InvalidCatalog(format!(
                            "unknown annotation '{other}' in: {line}"
                        )))
                    }
                    None => {}
                }
                items.push(TdItem::new(field_type, Some(col_name.to_string())));
            }
            if items.is_empty() {
                return Err(DbError::InvalidCatalog(line.to_string()));
            }

            let desc = TupleDesc::new(items);
            let file = Arc::new(HeapFile::new(base.join(format!("{name}.dat")), desc)?);
            info!(table = name, id = file.id(), "loaded table from schema file");
            self.add_table(file, name, &pkey);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::FieldType;
    use std::io::Write as _;

    fn table_file(dir: &Path, name: &str) -> Arc<HeapFile> {
        let desc = TupleDesc::with_names(&[FieldType::Int], &["id"]);
        Arc::new(HeapFile::new(dir.join(name), desc).unwrap())
    }

    #[test]
    fn test_add_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new();
        let file = table_file(dir.path(), "users.dat");
        let id = file.id();

        catalog.add_table(file, "users", "id");

        assert_eq!(catalog.table_id("users").unwrap(), id);
        assert_eq!(catalog.table_name(id).unwrap(), "users");
        assert_eq!(catalog.primary_key(id).unwrap(), "id");
        assert_eq!(catalog.tuple_desc(id).unwrap().num_fields(), 1);
        assert!(matches!(
            catalog.table_id("orders"),
            Err(DbError::NoSuchTable(_))
        ));
    }

    #[test]
    fn test_name_collision_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new();
        let old = table_file(dir.path(), "old.dat");
        let new = table_file(dir.path(), "new.dat");
        let (old_id, new_id) = (old.id(), new.id());

        catalog.add_table_named(old, "t");
        catalog.add_table_named(new, "t");

        assert_eq!(catalog.table_id("t").unwrap(), new_id);
        assert!(catalog.database_file(old_id).is_err());
        assert_eq!(catalog.table_ids(), vec![new_id]);
    }

    #[test]
    fn test_anonymous_tables_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new();
        catalog.add_table_anonymous(table_file(dir.path(), "a.dat"));
        catalog.add_table_anonymous(table_file(dir.path(), "b.dat"));
        assert_eq!(catalog.table_ids().len(), 2);
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new();
        catalog.add_table_named(table_file(dir.path(), "t.dat"), "t");
        catalog.clear();
        assert!(catalog.table_ids().is_empty());
        assert!(catalog.table_id("t").is_err());
    }

    #[test]
    fn test_load_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("catalog.txt");
        let mut f = std::fs::File::create(&schema_path).unwrap();
        writeln!(f, "users (id int pk, name string)").unwrap();
        writeln!(f, "orders (id int pk, user_id int)").unwrap();

        let catalog = Catalog::new();
        catalog.load_schema(&schema_path).unwrap();

        let users = catalog.table_id("users").unwrap();
        assert_eq!(catalog.primary_key(users).unwrap(), "id");
        let desc = catalog.tuple_desc(users).unwrap();
        assert_eq!(desc.field_type(1).unwrap(), FieldType::Str);
        assert!(dir.path().join("users.dat").exists());
        assert!(catalog.table_id("orders").is_ok());
    }

    #[test]
    fn test_load_schema_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("catalog.txt");
        std::fs::write(&schema_path, "users id int\n").unwrap();

        let catalog = Catalog::new();
        assert!(matches!(
            catalog.load_schema(&schema_path),
            Err(DbError::InvalidCatalog(_))
        ));
    }
}
