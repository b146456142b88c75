mod field;
mod field_type;
mod schema;
mod tuple;

pub use field::Field;
pub use field_type::FieldType;
pub use schema::{TdItem, TupleDesc};
pub use tuple::Tuple;
