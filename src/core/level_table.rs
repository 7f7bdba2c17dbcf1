//! Global and per-component verbosity thresholds

use super::log_level::LogLevel;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};

/// Threshold table shared by every logger derived from the same root
///
/// Thresholds are raw ranks so that any integer can be configured: a
/// negative threshold silences everything, a threshold of 9 or more lets
/// everything through.
#[derive(Debug)]
pub struct LevelTable {
    global: AtomicI32,
    components: RwLock<HashMap<String, i32>>,
}

impl LevelTable {
    pub fn new(level: impl Into<i32>) -> Self {
        Self {
            global: AtomicI32::new(level.into()),
            components: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_level(&self, level: impl Into<i32>) {
        self.global.store(level.into(), Ordering::Relaxed);
    }

    /// Current global threshold rank
    pub fn level(&self) -> i32 {
        self.global.load(Ordering::Relaxed)
    }

    pub fn set_component_level(&self, component: impl Into<String>, level: impl Into<i32>) {
        self.components.write().insert(component.into(), level.into());
    }

    pub fn component_level(&self, component: &str) -> Option<i32> {
        self.components.read().get(component).copied()
    }

    /// Remove a component override, returning it to the global threshold
    pub fn clear_component_level(&self, component: &str) -> Option<i32> {
        self.components.write().remove(component)
    }

    /// An override for `component` replaces the global threshold entirely.
    pub fn is_loggable(&self, level: LogLevel, component: &str) -> bool {
        if !component.is_empty() {
            if let Some(threshold) = self.component_level(component) {
                return level.rank() <= threshold;
            }
        }
        level.rank() <= self.level()
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}
