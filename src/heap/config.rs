//! Collector and allocator tuning.

use std::str::FromStr;

use tracing::warn;

/// Heap configuration.
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Live bytes before the first collection is advised.
    pub initial_gc_threshold: usize,
    /// After a collection the next threshold is live bytes times this factor.
    pub growth_factor: usize,
    /// Hard cap on live bytes. Exceeding it is an out-of-memory condition.
    pub max_heap_bytes: Option<usize>,
    /// Registry slots reserved up front.
    pub initial_capacity: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            initial_gc_threshold: 1024 * 1024,
            growth_factor: 2,
            max_heap_bytes: None,
            initial_capacity: 256,
        }
    }
}

impl HeapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_gc_threshold(mut self, bytes: usize) -> Self {
        self.initial_gc_threshold = bytes;
        self
    }

    pub fn with_growth_factor(mut self, factor: usize) -> Self {
        self.growth_factor = factor.max(1);
        self
    }

    pub fn with_max_heap_bytes(mut self, bytes: usize) -> Self {
        self.max_heap_bytes = Some(bytes);
        self
    }

    pub fn with_initial_capacity(mut self, slots: usize) -> Self {
        self.initial_capacity = slots;
        self
    }

    /// Defaults overlaid with `BLADE_GC_THRESHOLD`, `BLADE_GC_GROWTH` and
    /// `BLADE_HEAP_LIMIT` from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(threshold) = parse_var(&lookup, "BLADE_GC_THRESHOLD") {
            config.initial_gc_threshold = threshold;
        }
        if let Some(factor) = parse_var::<usize>(&lookup, "BLADE_GC_GROWTH") {
            config.growth_factor = factor.max(1);
        }
        if let Some(limit) = parse_var(&lookup, "BLADE_HEAP_LIMIT") {
            config.max_heap_bytes = Some(limit);
        }
        config
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring malformed heap setting");
            None
        }
    }
}
