//! Per-model pixel encoding.
//!
//! Models differ in how they expect pixel values: floating-point networks
//! take normalized `f32` channels, quantized networks take raw bytes. The
//! [`PixelEncoder`] capability captures that difference; a concrete encoder
//! is selected at classifier construction time.

use crate::errors::{ClassifierError, ClassifierResult};
use crate::tensor::InputTensorBuffer;
use image::Rgb;

/// Numeric element type of an encoded input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorDataKind {
    /// 32-bit floating point, native byte order.
    Float32,
    /// Unsigned 8-bit integer.
    Uint8,
}

/// Converts one RGB pixel into the numeric encoding a model expects and
/// appends it to the input buffer in R, G, B channel order.
pub trait PixelEncoder: std::fmt::Debug + Send + Sync {
    /// Number of bytes one encoded channel value occupies.
    fn bytes_per_channel(&self) -> usize;

    /// Element type the encoded buffer should be interpreted as.
    fn data_kind(&self) -> TensorDataKind;

    /// Encodes `pixel` into `buffer`.
    fn encode_pixel(&self, pixel: &Rgb<u8>, buffer: &mut InputTensorBuffer)
    -> ClassifierResult<()>;
}

/// Encoder for floating-point models.
///
/// Each channel value `v` is written as `v * alpha + beta` per channel,
/// where `alpha = scale / std` and `beta = -mean / std`, folding scaling and
/// normalization into one multiply-add.
#[derive(Debug, Clone)]
pub struct Float32Encoder {
    alpha: [f32; 3],
    beta: [f32; 3],
}

impl Float32Encoder {
    /// Creates an encoder from a scale factor and per-channel mean / std.
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::InvalidConfig` if `scale` is not positive
    /// or any standard deviation is not positive.
    pub fn new(scale: f32, mean: [f32; 3], std: [f32; 3]) -> ClassifierResult<Self> {
        if scale <= 0.0 {
            return Err(ClassifierError::invalid_config(
                "normalization scale must be greater than 0",
            ));
        }
        for (i, &s) in std.iter().enumerate() {
            if s <= 0.0 {
                return Err(ClassifierError::invalid_config(format!(
                    "standard deviation at index {i} must be greater than 0, got {s}"
                )));
            }
        }

        let mut alpha = [0.0f32; 3];
        let mut beta = [0.0f32; 3];
        for c in 0..3 {
            alpha[c] = scale / std[c];
            beta[c] = -mean[c] / std[c];
        }
        Ok(Self { alpha, beta })
    }

    /// Encoder mapping raw bytes to `[0, 1]` (scale `1/255`, zero mean,
    /// unit std).
    pub fn unit() -> Self {
        Self {
            alpha: [1.0 / 255.0; 3],
            beta: [0.0; 3],
        }
    }

    /// Encoder with ImageNet normalization constants.
    pub fn imagenet() -> Self {
        let scale = 1.0 / 255.0;
        let mean = [0.485f32, 0.456, 0.406];
        let std = [0.229f32, 0.224, 0.225];
        let mut alpha = [0.0f32; 3];
        let mut beta = [0.0f32; 3];
        for c in 0..3 {
            alpha[c] = scale / std[c];
            beta[c] = -mean[c] / std[c];
        }
        Self { alpha, beta }
    }
}

impl PixelEncoder for Float32Encoder {
    fn bytes_per_channel(&self) -> usize {
        std::mem::size_of::<f32>()
    }

    fn data_kind(&self) -> TensorDataKind {
        TensorDataKind::Float32
    }

    fn encode_pixel(
        &self,
        pixel: &Rgb<u8>,
        buffer: &mut InputTensorBuffer,
    ) -> ClassifierResult<()> {
        for c in 0..3 {
            let value = pixel.0[c] as f32 * self.alpha[c] + self.beta[c];
            buffer.put_f32(value)?;
        }
        Ok(())
    }
}

/// Encoder for quantized models: raw channel bytes, one byte per channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantizedU8Encoder;

impl PixelEncoder for QuantizedU8Encoder {
    fn bytes_per_channel(&self) -> usize {
        1
    }

    fn data_kind(&self) -> TensorDataKind {
        TensorDataKind::Uint8
    }

    fn encode_pixel(
        &self,
        pixel: &Rgb<u8>,
        buffer: &mut InputTensorBuffer,
    ) -> ClassifierResult<()> {
        for c in 0..3 {
            buffer.put_u8(pixel.0[c])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_f32s(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    #[test]
    fn unit_encoder_maps_black_to_zero_and_white_to_one() {
        let encoder = Float32Encoder::unit();
        let mut buffer = InputTensorBuffer::new(1, 1, 4).unwrap();

        encoder.encode_pixel(&Rgb([0, 0, 0]), &mut buffer).unwrap();
        assert_eq!(read_f32s(buffer.as_bytes()), vec![0.0, 0.0, 0.0]);

        buffer.rewind();
        encoder
            .encode_pixel(&Rgb([255, 255, 255]), &mut buffer)
            .unwrap();
        assert_eq!(read_f32s(buffer.as_bytes()), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn normalization_folds_into_multiply_add() {
        let encoder = Float32Encoder::new(1.0 / 255.0, [0.5, 0.5, 0.5], [0.5, 0.5, 0.5]).unwrap();
        let mut buffer = InputTensorBuffer::new(1, 1, 4).unwrap();
        encoder
            .encode_pixel(&Rgb([255, 0, 255]), &mut buffer)
            .unwrap();

        let values = read_f32s(buffer.as_bytes());
        assert!((values[0] - 1.0).abs() < 1e-6);
        assert!((values[1] + 1.0).abs() < 1e-6);
        assert!((values[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_normalization_constants_are_rejected() {
        assert!(Float32Encoder::new(0.0, [0.0; 3], [1.0; 3]).is_err());
        assert!(Float32Encoder::new(1.0, [0.0; 3], [1.0, 0.0, 1.0]).is_err());
    }

    #[test]
    fn quantized_encoder_writes_raw_bytes() {
        let encoder = QuantizedU8Encoder;
        let mut buffer = InputTensorBuffer::new(1, 1, 1).unwrap();
        encoder
            .encode_pixel(&Rgb([7, 77, 177]), &mut buffer)
            .unwrap();
        assert_eq!(buffer.as_bytes(), &[7, 77, 177]);
    }

    #[test]
    fn byte_widths_match_data_kinds() {
        assert_eq!(Float32Encoder::unit().bytes_per_channel(), 4);
        assert_eq!(Float32Encoder::unit().data_kind(), TensorDataKind::Float32);
        assert_eq!(QuantizedU8Encoder.bytes_per_channel(), 1);
        assert_eq!(QuantizedU8Encoder.data_kind(), TensorDataKind::Uint8);
    }
}
