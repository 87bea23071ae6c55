//! Inference engine integration.
//!
//! An [`EngineHandle`] owns the association between one model artifact and
//! one backend configuration. It exposes a single synchronous `run`
//! operation, records wall-clock timing of the last run, and supports being
//! torn down and rebuilt when the backend configuration changes. At most one
//! handle is live per classifier instance.
//!
//! Engines are created through an [`EngineFactory`], so the execution
//! backend itself stays pluggable; [`OrtEngine`] over ONNX Runtime is the
//! production implementation.

pub mod ort_engine;

pub use ort_engine::{OrtEngine, OrtEngineFactory};

use crate::backend::BackendConfig;
use crate::errors::{ClassifierError, ClassifierResult};
use crate::model::ModelArtifact;
use crate::tensor::InputTensorBuffer;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A compiled execution graph bound to a backend configuration.
///
/// `run` is synchronous and blocking, with no internal retries; dropping an
/// engine releases every backend resource it owns (delegate handles
/// included).
pub trait InferenceEngine {
    /// Executes the model against the prepared input buffer and returns the
    /// raw output tensor as per-class scores.
    fn run(&mut self, input: &InputTensorBuffer) -> ClassifierResult<Vec<f32>>;

    /// Name of the model the engine was built from, used for error context.
    fn model_name(&self) -> &str;
}

/// Builds engines from a model artifact and a backend configuration.
///
/// Construction is O(model size) and happens only at classifier creation
/// and on configuration changes, never per frame.
pub trait EngineFactory {
    /// The engine type this factory produces.
    type Engine: InferenceEngine;

    /// Compiles `artifact` for execution under `config`.
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::EngineInit` when the backend or delegate
    /// cannot be constructed (for example, requested hardware is
    /// unavailable) and `ClassifierError::ModelLoad` when the artifact bytes
    /// are not a valid model.
    fn create(
        &self,
        artifact: &Arc<ModelArtifact>,
        config: &BackendConfig,
    ) -> ClassifierResult<Self::Engine>;
}

/// Owns one live engine and the timing of its last run.
///
/// The handle is never used after [`close`](Self::close): `run` on a closed
/// handle fails fast with `ClassifierError::Inference`. `close` is
/// idempotent; the first call releases the engine's resources and every
/// later call is a no-op.
#[derive(Debug)]
pub struct EngineHandle<E: InferenceEngine> {
    engine: Option<E>,
    model_name: String,
    last_run: Option<Duration>,
}

impl<E: InferenceEngine> EngineHandle<E> {
    /// Builds a handle over `factory`'s engine for `artifact` + `config`.
    pub fn build<F>(
        factory: &F,
        artifact: &Arc<ModelArtifact>,
        config: &BackendConfig,
    ) -> ClassifierResult<Self>
    where
        F: EngineFactory<Engine = E>,
    {
        let engine = factory.create(artifact, config)?;
        let model_name = engine.model_name().to_string();
        Ok(Self {
            engine: Some(engine),
            model_name,
            last_run: None,
        })
    }

    /// Runs inference against `input`, blocking until it completes.
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::Inference` if the handle was closed or the
    /// underlying execution call fails.
    pub fn run(&mut self, input: &InputTensorBuffer) -> ClassifierResult<Vec<f32>> {
        let engine = self.engine.as_mut().ok_or_else(|| {
            ClassifierError::inference_context(&self.model_name, "engine handle used after close")
        })?;

        let started = Instant::now();
        let output = engine.run(input)?;
        self.last_run = Some(started.elapsed());
        Ok(output)
    }

    /// Releases the engine's backend resources.
    ///
    /// Safe to call multiple times; only the first call after construction
    /// releases anything.
    pub fn close(&mut self) {
        if self.engine.take().is_some() {
            tracing::debug!(model = %self.model_name, "closed inference engine handle");
        }
    }

    /// Returns true once the handle has been closed.
    pub fn is_closed(&self) -> bool {
        self.engine.is_none()
    }

    /// Wall-clock duration of the most recent successful `run`, if any.
    pub fn last_run_duration(&self) -> Option<Duration> {
        self.last_run
    }

    /// Name of the model this handle executes.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}


#[cfg(test)]
mod tests {
    use super::stub::StubFactory;
    use super::*;

    fn artifact() -> (tempfile::TempDir, Arc<ModelArtifact>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stub.onnx");
        std::fs::write(&path, b"stub model bytes").unwrap();
        let artifact = Arc::new(ModelArtifact::open(&path).unwrap());
        (dir, artifact)
    }

    fn buffer() -> InputTensorBuffer {
        InputTensorBuffer::new(2, 2, 1).unwrap()
    }

    #[test]
    fn run_returns_engine_scores_and_records_timing() {
        let factory = StubFactory::new(vec![0.9, 0.1]);
        let (_dir, artifact) = artifact();
        let mut handle = EngineHandle::build(&factory, &artifact, &BackendConfig::new()).unwrap();

        assert!(handle.last_run_duration().is_none());
        let scores = handle.run(&buffer()).unwrap();
        assert_eq!(scores, vec![0.9, 0.1]);
        assert!(handle.last_run_duration().is_some());
        assert_eq!(factory.counters.runs(), 1);
    }

    #[test]
    fn close_releases_exactly_once() {
        let factory = StubFactory::new(vec![1.0]);
        let (_dir, artifact) = artifact();
        let mut handle = EngineHandle::build(&factory, &artifact, &BackendConfig::new()).unwrap();

        handle.close();
        handle.close();
        handle.close();
        assert!(handle.is_closed());
        assert_eq!(factory.counters.drops(), 1);
    }

    #[test]
    fn run_after_close_fails_with_inference_error() {
        let factory = StubFactory::new(vec![1.0]);
        let (_dir, artifact) = artifact();
        let mut handle = EngineHandle::build(&factory, &artifact, &BackendConfig::new()).unwrap();
        handle.close();

        let result = handle.run(&buffer());
        assert!(matches!(result, Err(ClassifierError::Inference { .. })));
    }

    #[test]
    fn failed_build_surfaces_engine_init() {
        let factory = StubFactory::new(vec![1.0]);
        factory.fail_next_build();
        let (_dir, artifact) = artifact();
        let result = EngineHandle::build(&factory, &artifact, &BackendConfig::new());
        assert!(matches!(result, Err(ClassifierError::EngineInit { .. })));
    }
}
