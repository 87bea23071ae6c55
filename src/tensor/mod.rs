//! Input tensor construction.
//!
//! This module converts an arbitrary-resolution RGB image into the
//! fixed-size, fixed-layout byte buffer a model expects. The buffer is
//! allocated once per classifier and reused across frames; it is rewound,
//! never reallocated, before each build.
//!
//! Resize policy: nearest-neighbor, pinned. The policy must stay fixed so
//! numeric output is reproducible across runs.

pub mod encode;

pub use encode::{Float32Encoder, PixelEncoder, QuantizedU8Encoder, TensorDataKind};

use crate::errors::{ClassifierError, ClassifierResult};
use image::{RgbImage, imageops, imageops::FilterType};

/// Number of color channels in the input tensor.
pub const PIXEL_CHANNELS: usize = 3;

/// Batch dimension of the input tensor (single-image pipeline).
pub const BATCH_SIZE: usize = 1;

/// A fixed-capacity, native-byte-order buffer holding one pre-processed
/// image in the exact layout the model expects.
///
/// Capacity is `1 * width * height * 3 * bytes_per_channel` and never
/// changes after construction. Values are appended through the writer
/// methods; [`rewind`](Self::rewind) resets the write position so a new
/// frame never interleaves with a stale prior one.
#[derive(Debug)]
pub struct InputTensorBuffer {
    data: Vec<u8>,
    cursor: usize,
    width: u32,
    height: u32,
    bytes_per_channel: usize,
}

impl InputTensorBuffer {
    /// Allocates a buffer for a `width x height` RGB input with the given
    /// per-channel byte width.
    pub fn new(width: u32, height: u32, bytes_per_channel: usize) -> ClassifierResult<Self> {
        if width == 0 || height == 0 {
            return Err(ClassifierError::invalid_config(
                "input tensor dimensions must be at least 1x1",
            ));
        }
        if bytes_per_channel == 0 {
            return Err(ClassifierError::invalid_config(
                "bytes_per_channel must be at least 1",
            ));
        }
        let capacity =
            BATCH_SIZE * width as usize * height as usize * PIXEL_CHANNELS * bytes_per_channel;
        Ok(Self {
            data: vec![0u8; capacity],
            cursor: 0,
            width,
            height,
            bytes_per_channel,
        })
    }

    /// Resets the write position to the start of the buffer.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Appends a single `f32` value in native byte order.
    pub fn put_f32(&mut self, value: f32) -> ClassifierResult<()> {
        self.put_bytes(&value.to_ne_bytes())
    }

    /// Appends a single raw byte.
    pub fn put_u8(&mut self, value: u8) -> ClassifierResult<()> {
        self.put_bytes(&[value])
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> ClassifierResult<()> {
        let end = self.cursor + bytes.len();
        if end > self.data.len() {
            return Err(ClassifierError::invalid_input(format!(
                "input tensor overflow: capacity {} bytes, write would end at {}",
                self.data.len(),
                end
            )));
        }
        self.data[self.cursor..end].copy_from_slice(bytes);
        self.cursor = end;
        Ok(())
    }

    /// Returns the full backing byte region.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the fixed capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns the current write position in bytes.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Returns the tensor width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the tensor height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the per-channel byte width.
    pub fn bytes_per_channel(&self) -> usize {
        self.bytes_per_channel
    }
}

/// Fills `buffer` from `image` using `encoder`.
///
/// The image is resampled to the buffer's fixed dimensions with
/// nearest-neighbor scaling, then traversed in row-major order; each pixel's
/// channels are appended in R, G, B order through the encoder. The buffer is
/// rewound first, so a build never interleaves with a stale prior frame.
pub fn build_input(
    image: &RgbImage,
    buffer: &mut InputTensorBuffer,
    encoder: &dyn PixelEncoder,
) -> ClassifierResult<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ClassifierError::invalid_input(
            "input image must be at least 1x1",
        ));
    }
    if encoder.bytes_per_channel() != buffer.bytes_per_channel() {
        return Err(ClassifierError::invalid_config(format!(
            "encoder writes {} bytes per channel but the buffer was sized for {}",
            encoder.bytes_per_channel(),
            buffer.bytes_per_channel()
        )));
    }

    buffer.rewind();

    let resized = imageops::resize(image, buffer.width(), buffer.height(), FilterType::Nearest);
    for pixel in resized.pixels() {
        encoder.encode_pixel(pixel, buffer)?;
    }

    debug_assert_eq!(buffer.position(), buffer.capacity());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn capacity_matches_fixed_dimensions() {
        let buffer = InputTensorBuffer::new(224, 224, 4).unwrap();
        assert_eq!(buffer.capacity(), 224 * 224 * 3 * 4);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(InputTensorBuffer::new(0, 224, 4).is_err());
        assert!(InputTensorBuffer::new(224, 0, 4).is_err());
        assert!(InputTensorBuffer::new(224, 224, 0).is_err());
    }

    #[test]
    fn writes_past_capacity_are_refused() {
        let mut buffer = InputTensorBuffer::new(1, 1, 1).unwrap();
        buffer.put_u8(1).unwrap();
        buffer.put_u8(2).unwrap();
        buffer.put_u8(3).unwrap();
        assert!(buffer.put_u8(4).is_err());
    }

    #[test]
    fn rewind_resets_the_position() {
        let mut buffer = InputTensorBuffer::new(1, 1, 4).unwrap();
        buffer.put_f32(0.5).unwrap();
        assert_eq!(buffer.position(), 4);
        buffer.rewind();
        assert_eq!(buffer.position(), 0);
    }

    #[test]
    fn build_fills_exactly_capacity_for_any_resolution() {
        let encoder = QuantizedU8Encoder;
        let mut buffer = InputTensorBuffer::new(8, 8, 1).unwrap();

        for (w, h) in [(1, 1), (8, 8), (1920, 1080)] {
            let image = RgbImage::from_pixel(w, h, Rgb([10, 20, 30]));
            build_input(&image, &mut buffer, &encoder).unwrap();
            assert_eq!(buffer.position(), 8 * 8 * 3);
            assert_eq!(buffer.capacity(), 8 * 8 * 3);
        }
    }

    #[test]
    fn builds_do_not_interleave_with_prior_frames() {
        let encoder = QuantizedU8Encoder;
        let mut buffer = InputTensorBuffer::new(2, 2, 1).unwrap();

        let white = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        build_input(&white, &mut buffer, &encoder).unwrap();
        assert!(buffer.as_bytes().iter().all(|&b| b == 255));

        let black = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        build_input(&black, &mut buffer, &encoder).unwrap();
        assert!(buffer.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn pixels_are_traversed_row_major_in_channel_order() {
        let encoder = QuantizedU8Encoder;
        let mut buffer = InputTensorBuffer::new(2, 1, 1).unwrap();

        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([1, 2, 3]));
        image.put_pixel(1, 0, Rgb([4, 5, 6]));
        build_input(&image, &mut buffer, &encoder).unwrap();

        assert_eq!(buffer.as_bytes(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn zero_sized_image_is_refused() {
        let encoder = QuantizedU8Encoder;
        let mut buffer = InputTensorBuffer::new(2, 2, 1).unwrap();
        let image = RgbImage::new(0, 0);
        assert!(build_input(&image, &mut buffer, &encoder).is_err());
    }

    #[test]
    fn encoder_and_buffer_byte_widths_must_agree() {
        let encoder = Float32Encoder::unit();
        let mut buffer = InputTensorBuffer::new(2, 2, 1).unwrap();
        let image = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        assert!(matches!(
            build_input(&image, &mut buffer, &encoder),
            Err(ClassifierError::InvalidConfig { .. })
        ));
    }
}
