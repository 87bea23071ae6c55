//! # framescan
//!
//! A single-image classification pipeline: camera frames go in, ranked
//! predictions come out. Inference runs on ONNX Runtime; this crate owns the
//! integration around it — memory-mapping the model artifact, selecting the
//! execution backend (CPU, GPU delegate, or neural accelerator), building
//! the fixed-size input tensor, and ranking the output scores.
//!
//! ## Components
//!
//! * [`model`] - read-only memory-mapped model artifacts
//! * [`backend`] - execution backend configuration (delegate kind, threads)
//! * [`tensor`] - reusable input tensor buffer and per-model pixel encoders
//! * [`engine`] - the inference engine handle and its ONNX Runtime backend
//! * [`ranking`] - output interpretation and top-K ranking
//! * [`classifier`] - the classifier tying the pipeline together
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use framescan::{Float32Encoder, ImageClassifierBuilder, SoftmaxInterpreter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut classifier = ImageClassifierBuilder::new()
//!     .input_shape(224, 224)
//!     .encoder(Float32Encoder::imagenet())
//!     .interpreter(SoftmaxInterpreter)
//!     .labels(vec!["cat".into(), "dog".into(), "bird".into()])
//!     .top_k(3)
//!     .build("models/mobilenet_v2.onnx")?;
//!
//! let frame = image::open("frame.png")?.to_rgb8();
//! for prediction in classifier.classify_frame(&frame)? {
//!     println!("{}: {:.3}", prediction.label, prediction.score);
//! }
//! classifier.close();
//! # Ok(())
//! # }
//! ```
//!
//! Calls are synchronous and blocking; a classifier is driven by one caller
//! at a time (`&mut self` enforces this). Reconfiguring the backend
//! (`use_gpu`, `use_cpu`, `use_accelerator`, `set_thread_count`) tears down
//! and rebuilds the engine handle; a failed rebuild leaves the previous
//! engine in place.

pub mod backend;
pub mod classifier;
pub mod engine;
pub mod errors;
pub mod model;
pub mod ranking;
pub mod tensor;

pub use backend::{BackendConfig, DelegateKind};
pub use classifier::{DEFAULT_TOP_K, ImageClassifier, ImageClassifierBuilder};
pub use engine::{EngineFactory, EngineHandle, InferenceEngine, OrtEngine, OrtEngineFactory};
pub use errors::{ClassifierError, ClassifierResult};
pub use model::ModelArtifact;
pub use ranking::{IdentityInterpreter, OutputInterpreter, Prediction, SoftmaxInterpreter, TopK};
pub use tensor::{
    Float32Encoder, InputTensorBuffer, PixelEncoder, QuantizedU8Encoder, TensorDataKind,
};
