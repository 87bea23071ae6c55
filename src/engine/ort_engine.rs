//! ONNX Runtime execution.
//!
//! [`OrtEngine`] compiles a memory-mapped model artifact into an ONNX
//! Runtime session bound to one backend configuration. The GPU delegate maps
//! to the CUDA execution provider and the neural-accelerator delegate to the
//! CoreML execution provider; delegate support is compiled in through the
//! `cuda` and `coreml` crate features.

use crate::backend::{BackendConfig, DelegateKind};
use crate::engine::{EngineFactory, InferenceEngine};
use crate::errors::{ClassifierError, ClassifierResult};
use crate::model::ModelArtifact;
use crate::tensor::{InputTensorBuffer, PIXEL_CHANNELS};
use ndarray::Array4;
use ort::logging::LogLevel;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use ort::value::TensorRef;
use std::sync::Arc;

/// Inference engine backed by an ONNX Runtime session.
pub struct OrtEngine {
    session: Session,
    input_name: String,
    output_name: String,
    model_name: String,
}

impl std::fmt::Debug for OrtEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtEngine")
            .field("model_name", &self.model_name)
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish()
    }
}

impl OrtEngine {
    fn build(artifact: &Arc<ModelArtifact>, config: &BackendConfig) -> ClassifierResult<Self> {
        config.validate()?;

        let builder = Session::builder()
            .map_err(|e| ClassifierError::engine_init("failed to create session builder", e))?
            .with_log_level(LogLevel::Error)
            .map_err(|e| ClassifierError::engine_init("failed to set session log level", e))?
            .with_intra_threads(config.thread_count)
            .map_err(|e| ClassifierError::engine_init("failed to set intra-op threads", e))?;

        let builder = Self::attach_delegate(builder, config.delegate)?;

        let session = builder.commit_from_memory(artifact.bytes()).map_err(|e| {
            ClassifierError::model_load(
                artifact.path(),
                "failed to compile model into an ONNX session",
                Some(Box::new(e)),
            )
        })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| {
                ClassifierError::engine_init_context("model declares no input tensors")
            })?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| {
                ClassifierError::engine_init_context("model declares no output tensors")
            })?;

        tracing::debug!(
            model = %artifact.name(),
            delegate = %config.delegate,
            threads = config.thread_count,
            "built ONNX Runtime session"
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            model_name: artifact.name().to_string(),
        })
    }

    /// Registers the execution provider for the requested delegate.
    ///
    /// Hardware that is absent, or a delegate whose support was not compiled
    /// in, surfaces as `ClassifierError::EngineInit` here rather than at
    /// `run` time.
    fn attach_delegate(
        builder: SessionBuilder,
        delegate: DelegateKind,
    ) -> ClassifierResult<SessionBuilder> {
        match delegate {
            DelegateKind::None => Ok(builder),
            DelegateKind::Gpu => {
                #[cfg(feature = "cuda")]
                {
                    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
                    let provider = CUDAExecutionProvider::default();
                    if !provider.is_available().unwrap_or(false) {
                        return Err(ClassifierError::engine_init_context(
                            "GPU delegate requested but the CUDA execution provider is unavailable",
                        ));
                    }
                    builder
                        .with_execution_providers([provider.build().error_on_failure()])
                        .map_err(|e| {
                            ClassifierError::engine_init("failed to register CUDA provider", e)
                        })
                }
                #[cfg(not(feature = "cuda"))]
                {
                    let _ = builder;
                    Err(ClassifierError::engine_init_context(
                        "GPU delegate requested but this build has no `cuda` feature",
                    ))
                }
            }
            DelegateKind::Accelerator => {
                #[cfg(feature = "coreml")]
                {
                    use ort::execution_providers::{CoreMLExecutionProvider, ExecutionProvider};
                    let provider = CoreMLExecutionProvider::default();
                    if !provider.is_available().unwrap_or(false) {
                        return Err(ClassifierError::engine_init_context(
                            "accelerator delegate requested but the CoreML execution provider is unavailable",
                        ));
                    }
                    builder
                        .with_execution_providers([provider.build().error_on_failure()])
                        .map_err(|e| {
                            ClassifierError::engine_init("failed to register CoreML provider", e)
                        })
                }
                #[cfg(not(feature = "coreml"))]
                {
                    let _ = builder;
                    Err(ClassifierError::engine_init_context(
                        "accelerator delegate requested but this build has no `coreml` feature",
                    ))
                }
            }
        }
    }

    fn run_f32(&mut self, input: &InputTensorBuffer) -> ClassifierResult<Vec<f32>> {
        let values: Vec<f32> = input
            .as_bytes()
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let array = Self::to_nhwc(&self.model_name, input, values)?;
        let tensor = TensorRef::from_array_view(array.view()).map_err(|e| {
            ClassifierError::inference(&self.model_name, "failed to wrap input tensor", e)
        })?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| {
                ClassifierError::inference(&self.model_name, "ONNX Runtime forward pass failed", e)
            })?;
        Self::scores_from_value(&self.model_name, &outputs[self.output_name.as_str()])
    }

    fn run_u8(&mut self, input: &InputTensorBuffer) -> ClassifierResult<Vec<f32>> {
        let values = input.as_bytes().to_vec();
        let array = Self::to_nhwc(&self.model_name, input, values)?;
        let tensor = TensorRef::from_array_view(array.view()).map_err(|e| {
            ClassifierError::inference(&self.model_name, "failed to wrap input tensor", e)
        })?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| {
                ClassifierError::inference(&self.model_name, "ONNX Runtime forward pass failed", e)
            })?;
        Self::scores_from_value(&self.model_name, &outputs[self.output_name.as_str()])
    }

    fn to_nhwc<T>(
        model_name: &str,
        input: &InputTensorBuffer,
        values: Vec<T>,
    ) -> ClassifierResult<Array4<T>> {
        let shape = (
            1,
            input.height() as usize,
            input.width() as usize,
            PIXEL_CHANNELS,
        );
        Array4::from_shape_vec(shape, values).map_err(|e| {
            ClassifierError::inference(
                model_name,
                format!("input buffer does not match tensor shape {shape:?}"),
                e,
            )
        })
    }

    fn scores_from_value(
        model_name: &str,
        value: &ort::value::DynValue,
    ) -> ClassifierResult<Vec<f32>> {
        if let Ok((_, data)) = value.try_extract_tensor::<f32>() {
            return Ok(data.to_vec());
        }

        // Quantized models emit u8 probabilities; dequantize to [0, 1].
        let (_, data) = value.try_extract_tensor::<u8>().map_err(|e| {
            ClassifierError::inference(model_name, "failed to extract output tensor as f32 or u8", e)
        })?;
        Ok(data.iter().map(|&v| v as f32 / 255.0).collect())
    }
}

impl InferenceEngine for OrtEngine {
    fn run(&mut self, input: &InputTensorBuffer) -> ClassifierResult<Vec<f32>> {
        match input.bytes_per_channel() {
            4 => self.run_f32(input),
            1 => self.run_u8(input),
            other => Err(ClassifierError::invalid_config(format!(
                "unsupported bytes_per_channel {other}; expected 4 (f32) or 1 (u8)"
            ))),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Factory producing [`OrtEngine`]s; the production engine factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrtEngineFactory;

impl EngineFactory for OrtEngineFactory {
    type Engine = OrtEngine;

    fn create(
        &self,
        artifact: &Arc<ModelArtifact>,
        config: &BackendConfig,
    ) -> ClassifierResult<OrtEngine> {
        OrtEngine::build(artifact, config)
    }
}
