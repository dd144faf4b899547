//! Response flattening
//!
//! Turns one page of nested provider records into flat rows per entity.
//! Declared child collections become their own rows linked to the parent by
//! a foreign key; nested objects become `parent__child` columns.

mod flattener;
mod types;

pub use flattener::{flatten, flatten_records, NESTED_SEPARATOR, SCALAR_FIELD};
pub use types::{ChildSchema, EntityInfo, EntitySchema, FlatRecord, ParentRef};

#[cfg(test)]
mod tests;
