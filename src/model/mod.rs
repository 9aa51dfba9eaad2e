//! Catalog snapshot model and metadata extraction

mod builder;
mod collection;
mod elements;
pub mod message;
mod partition;
mod snapshot;

pub use builder::{build_snapshot, ExtractOptions};
pub(crate) use builder::{
    apply_primary_key_nullability, apply_table_options, check_state, column_state,
    default_from_clause, foreign_key_state, index_name, index_state, table_from_create,
    trigger_from_create, view_from_create,
};
pub use collection::{Named, NamedCollection};
pub use elements::*;
pub use partition::{PartitionDefinition, PartitionKind, PartitionSpec, PartitionState};
pub use snapshot::{DatabaseSnapshot, SchemaSnapshot, TableState};
