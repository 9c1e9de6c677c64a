//! Registry of demonstration selectors and named metrics
//!
//! Built by the caller and handed to the teleprompters; there is no
//! process-wide instance.

use crate::selector::{
    BootstrapStrategy, DemonstrationSelector, DiverseSelector, RecentSelector,
    RepresentativeSelector, TopKSelector, DEFAULT_DIVERSITY_THRESHOLD, DEFAULT_NUM_CLUSTERS,
};
use forge_core::Metric;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct Registry {
    selectors: HashMap<BootstrapStrategy, Arc<dyn DemonstrationSelector>>,
    metrics: HashMap<String, Arc<dyn Metric>>,
}

impl Registry {
    /// Empty registry; selection falls back to TopK for every strategy
    pub fn new() -> Self {
        Self::default()
    }

    /// All four built-in selectors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_selector(Arc::new(TopKSelector));
        registry.register_selector(Arc::new(DiverseSelector::new(DEFAULT_DIVERSITY_THRESHOLD)));
        registry.register_selector(Arc::new(RecentSelector));
        registry.register_selector(Arc::new(RepresentativeSelector::new(DEFAULT_NUM_CLUSTERS)));
        registry
    }

    /// Replaces any selector already registered for the same strategy
    pub fn register_selector(&mut self, selector: Arc<dyn DemonstrationSelector>) {
        self.selectors.insert(selector.strategy(), selector);
    }

    pub fn selector(&self, strategy: BootstrapStrategy) -> Option<Arc<dyn DemonstrationSelector>> {
        self.selectors.get(&strategy).cloned()
    }

    /// Registered under `metric.name()`
    pub fn register_metric(&mut self, metric: Arc<dyn Metric>) {
        self.metrics.insert(metric.name(), metric);
    }

    pub fn metric(&self, name: &str) -> Option<Arc<dyn Metric>> {
        self.metrics.get(name).cloned()
    }

    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metrics.keys().cloned().collect();
        names.sort();
        names
    }
}
