use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::executor::aggregators_helper::{
    AggregateImpl, AvgImpl, CountImpl, MaxImpl, MinImpl, SumImpl,
};

/// Case-insensitive registry of aggregates.
#[derive(Default)]
pub struct AggregateRegistry {
    by_name: HashMap<String, Arc<dyn AggregateImpl>>,
}

// A single shared default registry; user aggregates live in scopes, not
// here.
static DEFAULT_REGISTRY: Lazy<AggregateRegistry> =
    Lazy::new(AggregateRegistry::default_registry);

impl AggregateRegistry {
    pub fn new() -> Self {
        Self { by_name: HashMap::new() }
    }

    pub fn register<I: AggregateImpl + 'static>(&mut self, impl_: I) {
        self.by_name.insert(impl_.name().to_string(), Arc::new(impl_));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AggregateImpl>> {
        self.by_name.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&name.to_ascii_lowercase())
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn global() -> &'static AggregateRegistry {
        &DEFAULT_REGISTRY
    }

    pub fn default_registry() -> Self {
        let mut registry = Self::new();
        registry.register(CountImpl);
        registry.register(SumImpl);
        registry.register(AvgImpl);
        registry.register(MinImpl);
        registry.register(MaxImpl);
        registry
    }
}
