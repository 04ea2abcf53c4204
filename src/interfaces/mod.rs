//! Datasource Interfaces
//!
//! An interface compiles index descriptors + labels into a `CompiledQuery`
//! bound to one backend connection, and performs writes on it.
//!
//! Design:
//! - Closed set of descriptor kinds, dispatched in `compile_query`
//! - Per-kind hooks default to `UnsupportedIndexKind`; a backend overrides
//!   the kinds it can serve
//! - `InterfaceRegistry` maps a `ConnectionKind` to a factory

mod docstore;
mod rest;

pub use docstore::{to_filter, DocumentCollection, DocumentInterface};
pub use rest::{RestClient, RestConfig, RestInterface};

use crate::error::{FrameError, Result};
use crate::query::{CompiledQuery, Params};
use crate::types::{Document, IndexDescriptor, IndexKind, Label};
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Backend interface trait
pub trait DatasourceInterface: Send + Sync {
    /// Interface name used in error reports
    fn name(&self) -> &'static str;

    /// Wrap compiled params into a query on this interface's connection
    fn bind(&self, params: Params) -> CompiledQuery;

    fn compile_value(&self, _name: &str, _label: &Label) -> Result<CompiledQuery> {
        Err(unsupported(self.name(), IndexKind::Value))
    }

    fn compile_interpolating(&self, _name: &str, _label: &Label) -> Result<CompiledQuery> {
        Err(unsupported(self.name(), IndexKind::Interpolating))
    }

    fn compile_interval(&self, _name: &str, _label: &Label) -> Result<CompiledQuery> {
        Err(unsupported(self.name(), IndexKind::Interval))
    }

    /// Compile one descriptor. Composite children are compiled recursively
    /// and only the key named after each child is merged into the result.
    fn compile_query(&self, index: &IndexDescriptor, label: &Label) -> Result<CompiledQuery> {
        match index {
            IndexDescriptor::Value { name } => self.compile_value(name, label),
            IndexDescriptor::Interpolating { name } => self.compile_interpolating(name, label),
            IndexDescriptor::Interval { name } => self.compile_interval(name, label),
            IndexDescriptor::Composite { children, .. } => {
                let mut params = Params::new();
                for (child, child_label) in children.iter().zip(label.components(children)) {
                    let query = self.compile_query(child, &child_label)?;
                    if let Some(param) = query.params().get(child.name()) {
                        params.insert(child.name(), param.clone());
                    }
                }
                Ok(self.bind(params))
            }
        }
    }

    fn insert(&self, doc: &Document) -> Result<()>;

    /// Replace the stored document identified by `key`
    fn update(&self, _key: &Params, _doc: &Document) -> Result<()> {
        Err(FrameError::Update(format!("{} does not support updates", self.name())))
    }
}

fn unsupported(interface: &'static str, kind: IndexKind) -> FrameError {
    FrameError::UnsupportedIndexKind { interface, kind }
}

// ============ CONNECTIONS ============

/// Kind of backend connection, the registry key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    Rest,
    Documents,
}

/// A shared handle to a backend
#[derive(Clone)]
pub enum Connection {
    Rest(Arc<RestClient>),
    Documents(Arc<dyn DocumentCollection>),
}

impl Connection {
    /// REST connection from an `http://` or `https://` URL
    pub fn from_url(url: &str) -> Result<Self> {
        Ok(Connection::Rest(Arc::new(RestConfig::new(url).build()?)))
    }

    pub fn kind(&self) -> ConnectionKind {
        match self {
            Connection::Rest(_) => ConnectionKind::Rest,
            Connection::Documents(_) => ConnectionKind::Documents,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connection::Rest(client) => write!(f, "Rest({})", client.url()),
            Connection::Documents(collection) => write!(f, "Documents({})", collection.name()),
        }
    }
}

// ============ REGISTRY ============

pub type InterfaceFactory = fn(&Connection) -> Result<Arc<dyn DatasourceInterface>>;

/// Connection kind → interface factory
pub struct InterfaceRegistry {
    factories: DashMap<ConnectionKind, InterfaceFactory>,
}

impl InterfaceRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self { factories: DashMap::new() }
    }

    /// Registry serving the REST and document-store interfaces
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(ConnectionKind::Rest, RestInterface::factory);
        registry.register(ConnectionKind::Documents, DocumentInterface::factory);
        registry
    }

    /// Process-wide registry with the default interfaces
    pub fn global() -> &'static InterfaceRegistry {
        static GLOBAL: OnceLock<InterfaceRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_defaults)
    }

    /// Register (or replace) the factory for a connection kind
    pub fn register(&self, kind: ConnectionKind, factory: InterfaceFactory) {
        self.factories.insert(kind, factory);
    }

    pub fn resolve(&self, connection: &Connection) -> Result<Arc<dyn DatasourceInterface>> {
        let kind = connection.kind();
        let factory = self
            .factories
            .get(&kind)
            .map(|entry| *entry.value())
            .ok_or_else(|| FrameError::UnsupportedBackend(format!("no interface registered for {kind:?} connections")))?;
        factory(connection)
    }
}

impl Default for InterfaceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
