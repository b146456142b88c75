use thiserror::Error;

use super::types::PageId;

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transaction aborted: lock wait timed out")]
    TransactionAborted,

    #[error("no such table: {0}")]
    NoSuchTable(String),

    #[error("no such field: {0}")]
    NoSuchField(String),

    #[error("no more elements")]
    Exhausted,

    #[error("page {0} has no empty slots")]
    PageFull(PageId),

    #[error("tuple schema does not match the table schema")]
    SchemaMismatch,

    #[error("tuple is not stored on page {0}")]
    NotOnPage(PageId),

    #[error("slot {0} is already empty")]
    SlotAlreadyEmpty(u16),

    #[error("tuple does not belong to table {0}")]
    WrongTable(u32),

    #[error("tuple has no record id")]
    MissingRecordId,

    #[error("all pages in the buffer pool are dirty")]
    AllPagesDirty,

    #[error("corrupt page: {0}")]
    Corrupt(String),

    #[error("unsupported aggregate: {0}")]
    UnsupportedAggregate(String),

    #[error("invalid catalog entry: {0}")]
    InvalidCatalog(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
