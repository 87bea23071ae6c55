//! Execution backend configuration.
//!
//! A [`BackendConfig`] is a plain value describing how the inference engine
//! should execute: how many CPU worker threads it may use and which hardware
//! delegate (if any) the graph is offloaded to. Mutating the configuration on
//! a live classifier invalidates its engine handle and triggers a rebuild;
//! the configuration itself never talks to hardware.

use serde::{Deserialize, Serialize};

/// Alternate hardware execution backends a model graph can be offloaded to.
///
/// Selecting a delegate here does not validate hardware availability; an
/// unavailable delegate surfaces as `ClassifierError::EngineInit` when the
/// engine handle is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DelegateKind {
    /// General-purpose CPU execution, no delegate attached.
    #[default]
    None,
    /// GPU-accelerated delegate (CUDA execution provider).
    Gpu,
    /// Platform neural-accelerator delegate (CoreML execution provider).
    Accelerator,
}

impl std::fmt::Display for DelegateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DelegateKind::None => write!(f, "cpu"),
            DelegateKind::Gpu => write!(f, "gpu"),
            DelegateKind::Accelerator => write!(f, "accelerator"),
        }
    }
}

/// Configuration for the execution backend of an inference engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Number of CPU worker threads for general-purpose execution (>= 1).
    pub thread_count: usize,
    /// Hardware delegate the graph is offloaded to.
    pub delegate: DelegateKind,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            thread_count: 1,
            delegate: DelegateKind::None,
        }
    }
}

impl BackendConfig {
    /// Creates a new configuration with default values (single-threaded CPU).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the CPU worker thread count.
    pub fn with_thread_count(mut self, threads: usize) -> Self {
        self.thread_count = threads;
        self
    }

    /// Sets the hardware delegate.
    pub fn with_delegate(mut self, delegate: DelegateKind) -> Self {
        self.delegate = delegate;
        self
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), crate::errors::ClassifierError> {
        if self.thread_count == 0 {
            return Err(crate::errors::ClassifierError::invalid_config(
                "thread_count must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_single_threaded_cpu() {
        let config = BackendConfig::default();
        assert_eq!(config.thread_count, 1);
        assert_eq!(config.delegate, DelegateKind::None);
    }

    #[test]
    fn builder_methods_chain() {
        let config = BackendConfig::new()
            .with_thread_count(4)
            .with_delegate(DelegateKind::Gpu);
        assert_eq!(config.thread_count, 4);
        assert_eq!(config.delegate, DelegateKind::Gpu);
    }

    #[test]
    fn zero_threads_is_rejected() {
        let config = BackendConfig::new().with_thread_count(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = BackendConfig::new()
            .with_thread_count(2)
            .with_delegate(DelegateKind::Accelerator);
        let json = serde_json::to_string(&config).unwrap();
        let back: BackendConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
