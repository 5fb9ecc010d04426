use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};

use crate::database::Store;
use crate::filter::Query;
use crate::model::{Instance, Meta};

/// What the controller is doing for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    List,
    Find,
    Create,
    Update,
    Delete,
    RelationshipQuery,
    RelationshipUpdate,
}

impl Action {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Action::Create | Action::Update | Action::Delete | Action::RelationshipUpdate
        )
    }
}

/// The parts of the HTTP request hooks may inspect.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub params: HashMap<String, String>,
}

impl RawRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Per-request state handed to every hook. Created when a controller method
/// starts and dropped when it returns.
pub struct Context {
    pub action: Action,
    pub meta: Arc<Meta>,
    /// The resource being read or written. For updates this already carries
    /// the requested changes.
    pub model: Option<Box<dyn Instance>>,
    /// Stored state before an update was applied.
    pub original: Option<Box<dyn Instance>>,
    pub query: Option<Query>,
    pub relationship: Option<String>,
    pub request: RawRequest,
    pub store: Arc<dyn Store>,
    /// Resources mounted in the same group, by plural name.
    pub resources: Arc<HashMap<String, Arc<Meta>>>,

    // Type-safe storage for hooks to hand data to later hooks
    metadata: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    pub start_time: Instant,
}

impl Context {
    pub fn new(action: Action, meta: Arc<Meta>, request: RawRequest, store: Arc<dyn Store>) -> Self {
        Self {
            action,
            meta,
            model: None,
            original: None,
            query: None,
            relationship: None,
            request,
            store,
            resources: Arc::new(HashMap::new()),
            metadata: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    pub fn with_resources(mut self, resources: Arc<HashMap<String, Arc<Meta>>>) -> Self {
        self.resources = resources;
        self
    }

    /// Store typed metadata - compile-time type safety
    pub fn set_metadata<T: Send + Sync + 'static>(&mut self, data: T) {
        self.metadata.insert(TypeId::of::<T>(), Box::new(data));
    }

    /// Retrieve typed metadata - compile-time type safety
    pub fn get_metadata<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.metadata
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    pub fn has_metadata<T: Send + Sync + 'static>(&self) -> bool {
        self.metadata.contains_key(&TypeId::of::<T>())
    }

    pub fn execution_time(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("action", &self.action)
            .field("model", &self.meta.plural)
            .field("instance", &self.model)
            .field("query", &self.query)
            .field("relationship", &self.relationship)
            .field("method", &self.request.method)
            .field("uri", &self.request.uri)
            .finish()
    }
}
