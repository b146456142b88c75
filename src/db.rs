use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::DEFAULT_POOL_SIZE;

/// One database instance: a catalog plus the buffer pool serving it.
///
/// There are no process-wide singletons; everything that needs the
/// catalog or the pool receives a cloned `Arc` handle from here, so
/// multiple independent databases can coexist (which the tests rely on).
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    /// Creates a database with the default buffer pool capacity.
    pub fn new() -> Self {
        Self::with_pool_capacity(DEFAULT_POOL_SIZE)
    }

    /// Creates a database whose buffer pool caches up to `capacity`
    /// pages.
    pub fn with_pool_capacity(capacity: usize) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(capacity, Arc::clone(&catalog)));
        Self {
            catalog,
            buffer_pool,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
