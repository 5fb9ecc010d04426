// Binds the controllers of several models under one path prefix and one
// store. The group owns the plural name map that requests are dispatched by.

mod routes;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;

use crate::config::normalize_prefix;
use crate::controller::{Controller, Scope};
use crate::database::Store;

pub struct Group {
    scope: Scope,
    controllers: HashMap<String, Arc<Controller>>,
}

impl Group {
    pub fn new(prefix: impl Into<String>, store: Arc<dyn Store>) -> Self {
        Self {
            scope: Scope::new(store, normalize_prefix(&prefix.into())),
            controllers: HashMap::new(),
        }
    }

    /// Register a controller under its model's plural name. A second
    /// controller for the same plural replaces the first.
    pub fn add(mut self, controller: Controller) -> Self {
        let plural = controller.meta().plural.clone();
        tracing::debug!(prefix = %self.scope.prefix, resource = %plural, "Registered resource");
        self.scope.mount(Arc::clone(controller.meta()));
        if self.controllers.insert(plural.clone(), Arc::new(controller)).is_some() {
            tracing::warn!(resource = %plural, "Replaced an existing controller");
        }
        self
    }

    pub fn controller(&self, plural: &str) -> Option<&Arc<Controller>> {
        self.controllers.get(plural)
    }

    /// Registered plural names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.controllers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The axum router serving every registered resource.
    pub fn router(self) -> Router {
        routes::router(Arc::new(self))
    }
}
