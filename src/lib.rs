// rframe - Label-Based Selection over Remote Data Stores
// Index descriptors compile to backend-native queries

pub mod error;
pub mod types;
pub mod interval;
pub mod query;
pub mod interfaces;
pub mod collection;
pub mod schema;
pub mod frame;
pub mod indexer;

// Re-export main types
pub use error::{FrameError, Result};
pub use types::{Document, IndexDescriptor, IndexKind, Label, Labels};
pub use interval::{normalize, Canonical, Interval};
pub use query::{CompiledQuery, Param, Params, QueryTarget};
pub use interfaces::{
    Connection, ConnectionKind, DatasourceInterface, DocumentCollection, DocumentInterface,
    InterfaceRegistry, RestClient, RestConfig, RestInterface,
};
pub use collection::MemoryCollection;
pub use schema::{ColumnType, EntitySchema, TableSchema};
pub use frame::{Column, ConcatOutcome, Frame};
pub use indexer::{AtIndexer, LocIndexer};
