//! The image classifier.
//!
//! [`ImageClassifier`] ties the pipeline together: it owns the memory-mapped
//! model artifact, the reusable input tensor buffer, the live engine handle,
//! and the ranking configuration. A frame flows through
//! [`classify_frame`](ImageClassifier::classify_frame): the input builder
//! fills the buffer, the engine executes the model, the output interpreter
//! turns the raw tensor into scores, and the ranker surfaces the top-K
//! predictions.
//!
//! Lifecycle: `Ready` after construction, `Ready` again after every backend
//! reconfiguration (full teardown and rebuild of the engine handle), and
//! `Closed` after [`close`](ImageClassifier::close). Every operation except
//! `close` fails with `ClassifierError::NotInitialized` once closed.
//!
//! All mutating operations take `&mut self`, so exclusive access is
//! compiler-enforced; callers that share a classifier across threads must
//! serialize through their own lock.

use crate::backend::{BackendConfig, DelegateKind};
use crate::engine::{EngineFactory, EngineHandle, OrtEngineFactory};
use crate::errors::{ClassifierError, ClassifierResult};
use crate::model::ModelArtifact;
use crate::ranking::{IdentityInterpreter, OutputInterpreter, Prediction, TopK};
use crate::tensor::{self, Float32Encoder, InputTensorBuffer, PixelEncoder};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default number of ranked results surfaced per frame.
pub const DEFAULT_TOP_K: usize = 3;

/// Classifies single images against a pre-trained model.
///
/// Generic over the engine factory so tests can substitute a counting stub;
/// production code uses the [`OrtEngineFactory`] default.
pub struct ImageClassifier<F: EngineFactory = OrtEngineFactory> {
    factory: F,
    artifact: Option<Arc<ModelArtifact>>,
    config: BackendConfig,
    handle: Option<EngineHandle<F::Engine>>,
    buffer: Option<InputTensorBuffer>,
    encoder: Box<dyn PixelEncoder>,
    interpreter: Box<dyn OutputInterpreter>,
    ranker: TopK,
    last_inference: Option<Duration>,
}

impl<F: EngineFactory> std::fmt::Debug for ImageClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageClassifier")
            .field("config", &self.config)
            .field("top_k", &self.ranker.k())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<F: EngineFactory> ImageClassifier<F> {
    /// Classifies one frame and returns the ranked top-K predictions.
    ///
    /// Blocks the calling thread for the full duration of inference; no
    /// internal retries, no partial results.
    pub fn classify_frame(&mut self, image: &image::RgbImage) -> ClassifierResult<Vec<Prediction>> {
        let buffer = self
            .buffer
            .as_mut()
            .ok_or_else(|| ClassifierError::not_initialized("classify_frame"))?;
        tensor::build_input(image, buffer, self.encoder.as_ref())?;

        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| ClassifierError::not_initialized("classify_frame"))?;
        let raw = handle.run(buffer)?;
        self.last_inference = handle.last_run_duration();

        let scores = self.interpreter.interpret(&raw)?;
        let predictions = self.ranker.rank(&scores);

        debug!(
            model = %handle.model_name(),
            elapsed = ?self.last_inference,
            results = predictions.len(),
            "classified frame"
        );
        Ok(predictions)
    }

    /// Attaches the GPU delegate.
    ///
    /// Idempotent: if the delegate is already attached, no rebuild occurs.
    pub fn use_gpu(&mut self) -> ClassifierResult<()> {
        if self.config.delegate == DelegateKind::Gpu && self.handle.is_some() {
            return Ok(());
        }
        let next = self.config.clone().with_delegate(DelegateKind::Gpu);
        self.reconfigure(next)
    }

    /// Forces general-purpose CPU execution, detaching any delegate.
    pub fn use_cpu(&mut self) -> ClassifierResult<()> {
        let next = self.config.clone().with_delegate(DelegateKind::None);
        self.reconfigure(next)
    }

    /// Enables the platform neural-accelerator delegate.
    ///
    /// Idempotent: if the delegate is already attached, no rebuild occurs.
    pub fn use_accelerator(&mut self) -> ClassifierResult<()> {
        if self.config.delegate == DelegateKind::Accelerator && self.handle.is_some() {
            return Ok(());
        }
        let next = self.config.clone().with_delegate(DelegateKind::Accelerator);
        self.reconfigure(next)
    }

    /// Sets the CPU worker thread count for general-purpose execution.
    pub fn set_thread_count(&mut self, threads: usize) -> ClassifierResult<()> {
        if threads == 0 {
            return Err(ClassifierError::invalid_config(
                "thread_count must be at least 1",
            ));
        }
        let next = self.config.clone().with_thread_count(threads);
        self.reconfigure(next)
    }

    /// Adjusts the ranking depth; does not rebuild the engine.
    pub fn set_top_k(&mut self, k: usize) -> ClassifierResult<()> {
        self.ensure_open("set_top_k")?;
        self.ranker.set_k(k)
    }

    /// Rebuilds the engine handle for `next`.
    ///
    /// The candidate engine is constructed first; only once it exists is the
    /// prior handle closed (exactly once) and the candidate installed. On
    /// failure the previous handle and configuration stay in place, so a
    /// rejected delegate never strands the classifier.
    fn reconfigure(&mut self, next: BackendConfig) -> ClassifierResult<()> {
        let artifact = self
            .artifact
            .as_ref()
            .ok_or_else(|| ClassifierError::not_initialized("reconfigure"))?;

        debug!(
            delegate = %next.delegate,
            threads = next.thread_count,
            "rebuilding inference engine"
        );
        let candidate = EngineHandle::build(&self.factory, artifact, &next)?;

        if let Some(mut old) = self.handle.take() {
            old.close();
        }
        self.handle = Some(candidate);
        self.config = next;
        Ok(())
    }

    /// Releases all owned resources: the engine handle, the model mapping,
    /// and the input buffer.
    ///
    /// Idempotent; only the first call releases anything. Every other
    /// operation fails with `ClassifierError::NotInitialized` afterwards.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
        if self.artifact.take().is_some() {
            debug!("closed image classifier");
        }
        self.buffer = None;
    }

    /// Returns true once the classifier has been closed.
    pub fn is_closed(&self) -> bool {
        self.artifact.is_none()
    }

    /// Wall-clock duration of the most recent inference call, if any.
    ///
    /// Observability hook only; absence of a reading never affects
    /// classification.
    pub fn last_inference_duration(&self) -> Option<Duration> {
        self.last_inference
    }

    /// Returns the active backend configuration.
    pub fn backend_config(&self) -> &BackendConfig {
        &self.config
    }

    fn ensure_open(&self, operation: &str) -> ClassifierResult<()> {
        if self.is_closed() {
            return Err(ClassifierError::not_initialized(operation));
        }
        Ok(())
    }
}

/// Builder for [`ImageClassifier`].
///
/// Captures the per-model variant choices: input shape, pixel encoding,
/// output interpretation, label table, ranking depth, and the initial
/// backend configuration.
#[derive(Debug)]
pub struct ImageClassifierBuilder {
    input_width: u32,
    input_height: u32,
    encoder: Box<dyn PixelEncoder>,
    interpreter: Box<dyn OutputInterpreter>,
    labels: Vec<String>,
    top_k: usize,
    backend: BackendConfig,
}

impl Default for ImageClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageClassifierBuilder {
    /// Creates a builder with a 224x224 float input, identity output
    /// interpretation, and top-3 ranking on a single-threaded CPU backend.
    pub fn new() -> Self {
        Self {
            input_width: 224,
            input_height: 224,
            encoder: Box::new(Float32Encoder::unit()),
            interpreter: Box::new(IdentityInterpreter),
            labels: Vec::new(),
            top_k: DEFAULT_TOP_K,
            backend: BackendConfig::default(),
        }
    }

    /// Sets the model's fixed input dimensions.
    pub fn input_shape(mut self, width: u32, height: u32) -> Self {
        self.input_width = width;
        self.input_height = height;
        self
    }

    /// Sets the pixel encoder for the model variant.
    pub fn encoder(mut self, encoder: impl PixelEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Sets the output interpreter for the model variant.
    pub fn interpreter(mut self, interpreter: impl OutputInterpreter + 'static) -> Self {
        self.interpreter = Box::new(interpreter);
        self
    }

    /// Sets the class label table (index = class id).
    pub fn labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Sets the number of ranked results per frame.
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Sets the initial backend configuration.
    pub fn backend(mut self, config: BackendConfig) -> Self {
        self.backend = config;
        self
    }

    /// Builds a classifier over ONNX Runtime from the model at `model_path`.
    pub fn build(self, model_path: impl AsRef<Path>) -> ClassifierResult<ImageClassifier> {
        self.build_with_factory(OrtEngineFactory, model_path)
    }

    /// Builds a classifier over an explicit engine factory.
    pub fn build_with_factory<F: EngineFactory>(
        self,
        factory: F,
        model_path: impl AsRef<Path>,
    ) -> ClassifierResult<ImageClassifier<F>> {
        self.backend.validate()?;
        let ranker = TopK::new(self.top_k, self.labels)?;
        let buffer = InputTensorBuffer::new(
            self.input_width,
            self.input_height,
            self.encoder.bytes_per_channel(),
        )?;

        let artifact = Arc::new(ModelArtifact::open(model_path)?);
        let handle = EngineHandle::build(&factory, &artifact, &self.backend)?;

        debug!(
            model = %artifact.name(),
            width = self.input_width,
            height = self.input_height,
            "created image classifier"
        );

        Ok(ImageClassifier {
            factory,
            artifact: Some(artifact),
            config: self.backend,
            handle: Some(handle),
            buffer: Some(buffer),
            encoder: self.encoder,
            interpreter: self.interpreter,
            ranker,
            last_inference: None,
        })
    }
}
