use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dss_layout::ModuleDescriptor;
use dss_types::ModuleId;

use crate::call::Call;
use crate::context::StorageContext;
use crate::error::OperationResult;

/// An operation handler. Handlers only touch state through the context.
pub type Handler = Arc<dyn Fn(&mut StorageContext<'_>) -> OperationResult + Send + Sync>;

/// Which handler a call resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Operation(String),
    Fallback,
    Receive,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(name) => f.write_str(name),
            Self::Fallback => f.write_str("<fallback>"),
            Self::Receive => f.write_str("<receive>"),
        }
    }
}

/// Logic that interprets an owner's words: a layout plus an explicit
/// operation table with optional fallback and receive handlers.
///
/// A module keeps no state of its own. The same module can be bound to any
/// number of owners.
#[derive(Clone)]
pub struct CodeModule {
    id: ModuleId,
    name: String,
    descriptor: Arc<ModuleDescriptor>,
    operations: BTreeMap<String, Handler>,
    fallback: Option<Handler>,
    receive: Option<Handler>,
}

impl CodeModule {
    pub fn new(id: ModuleId, name: impl Into<String>, descriptor: ModuleDescriptor) -> Self {
        Self {
            id,
            name: name.into(),
            descriptor: Arc::new(descriptor),
            operations: BTreeMap::new(),
            fallback: None,
            receive: None,
        }
    }

    /// A module whose id is derived from its name.
    pub fn named(name: &str, descriptor: ModuleDescriptor) -> Self {
        Self::new(ModuleId::derive(name), name, descriptor)
    }

    /// Register an operation. A later registration under the same name
    /// replaces the earlier one.
    pub fn operation<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut StorageContext<'_>) -> OperationResult + Send + Sync + 'static,
    {
        self.operations.insert(name.into(), Arc::new(handler));
        self
    }

    /// Catch-all for calls that match no operation.
    pub fn fallback<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut StorageContext<'_>) -> OperationResult + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// Handler for calls without payload.
    pub fn receive<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut StorageContext<'_>) -> OperationResult + Send + Sync + 'static,
    {
        self.receive = Some(Arc::new(handler));
        self
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &Arc<ModuleDescriptor> {
        &self.descriptor
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn has_receive(&self) -> bool {
        self.receive.is_some()
    }

    /// Pick the handler for `call`.
    ///
    /// An exact operation match wins. Anything else goes to `fallback` if
    /// the module has one. Without a fallback, only a call without payload
    /// can still land, on `receive`.
    pub fn resolve(&self, call: &Call) -> Option<(Route, Handler)> {
        if let Some(selector) = &call.selector {
            if let Some(handler) = self.operations.get(selector) {
                return Some((Route::Operation(selector.clone()), Arc::clone(handler)));
            }
        }
        if let Some(handler) = &self.fallback {
            return Some((Route::Fallback, Arc::clone(handler)));
        }
        match &self.receive {
            Some(handler) if !call.has_payload() => Some((Route::Receive, Arc::clone(handler))),
            _ => None,
        }
    }
}

impl fmt::Debug for CodeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeModule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("variables", &self.descriptor.len())
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .field("receive", &self.receive.is_some())
            .finish()
    }
}
