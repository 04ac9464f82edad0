//! Decoding, per-frame rescaling and re-encoding of images.

use std::io::Cursor;

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{
    AnimationDecoder, DynamicImage, Frame, ImageError, ImageFormat, ImageReader, RgbaImage,
};

use crate::{CasError, ScaleFactor};

/// Largest accepted width or height of an input image.
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

/// Most frames accepted in an animation.
pub const DEFAULT_MAX_FRAMES: usize = 500;

/// Most scaled pixels held across all frames of an animation (256 MiB of RGBA).
pub const DEFAULT_MAX_ANIMATION_PIXELS: u64 = 64 * 1024 * 1024;

/// A re-encoded image ready to upload.
#[derive(Debug, Clone)]
pub struct ScaledImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Number of frames; 1 for still images.
    pub frames: usize,
}

impl ScaledImage {
    /// Upload file name, `result.<ext>` for the output format.
    pub fn filename(&self) -> String {
        let ext = self.format.extensions_str().first().copied().unwrap_or("png");
        format!("result.{ext}")
    }
}

/// Turns image bytes into rescaled image bytes.
///
/// Implementations are synchronous and may be slow; [`ScalePool`](crate::ScalePool)
/// runs them off the async runtime.
pub trait Rescaler: Send + Sync {
    fn rescale(&self, image: &[u8], factor: ScaleFactor) -> Result<ScaledImage, CasError>;
}

/// [`Rescaler`] backed by the `image` crate.
///
/// Keeps the input format where an encoder exists (PNG otherwise) and
/// rescales animated GIFs frame by frame. Frames are decoded one at a time
/// and the animation is rejected once it passes the frame or pixel budget.
#[derive(Debug, Clone)]
pub struct ImageRescaler {
    filter: FilterType,
    max_dimension: u32,
    max_frames: usize,
    max_animation_pixels: u64,
}

impl Default for ImageRescaler {
    fn default() -> Self {
        ImageRescaler {
            filter: FilterType::Lanczos3,
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_frames: DEFAULT_MAX_FRAMES,
            max_animation_pixels: DEFAULT_MAX_ANIMATION_PIXELS,
        }
    }
}

impl ImageRescaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn with_max_animation_pixels(mut self, max_pixels: u64) -> Self {
        self.max_animation_pixels = max_pixels;
        self
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn animation_too_large(&self) -> CasError {
        CasError::AnimationTooLarge {
            max_frames: self.max_frames,
            max_pixels: self.max_animation_pixels,
        }
    }

    fn scale_frame(&self, frame: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        imageops::resize(frame, width, height, self.filter)
    }

    /// Scale every frame of a GIF. Returns `None` for a single-frame GIF,
    /// which is handled as a still image.
    fn rescale_animation(
        &self,
        image: &[u8],
        factor: ScaleFactor,
    ) -> Result<Option<ScaledImage>, CasError> {
        let mut scaled = Vec::new();
        let mut pixels: u64 = 0;
        let mut size = (1, 1);

        for frame in GifDecoder::new(Cursor::new(image))?.into_frames() {
            if scaled.len() == self.max_frames {
                return Err(self.animation_too_large());
            }
            let frame = frame?;
            let (left, top) = factor.apply(frame.left(), frame.top());
            let delay = frame.delay();
            let buffer = frame.into_buffer();
            let (width, height) = factor.apply(buffer.width(), buffer.height());
            pixels = pixels.saturating_add(u64::from(width) * u64::from(height));
            if pixels > self.max_animation_pixels {
                return Err(self.animation_too_large());
            }
            size = (width, height);
            scaled.push(Frame::from_parts(
                self.scale_frame(&buffer, width, height),
                left,
                top,
                delay,
            ));
        }

        let count = scaled.len();
        if count <= 1 {
            return Ok(None);
        }
        tracing::debug!(frames = count, pixels, %factor, "rescaled animation");

        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder.set_repeat(Repeat::Infinite)?;
            encoder.encode_frames(scaled)?;
        }
        Ok(Some(ScaledImage {
            bytes,
            format: ImageFormat::Gif,
            width: size.0,
            height: size.1,
            frames: count,
        }))
    }
}

impl Rescaler for ImageRescaler {
    fn rescale(&self, image: &[u8], factor: ScaleFactor) -> Result<ScaledImage, CasError> {
        let format = image::guess_format(image)?;
        let (width, height) = ImageReader::with_format(Cursor::new(image), format).into_dimensions()?;
        if width > self.max_dimension || height > self.max_dimension {
            return Err(CasError::TooLarge {
                width,
                height,
                max: self.max_dimension,
            });
        }

        if format == ImageFormat::Gif
            && let Some(animation) = self.rescale_animation(image, factor)?
        {
            return Ok(animation);
        }

        let decoded = image::load_from_memory_with_format(image, format)?;
        let (target_w, target_h) = factor.apply(width, height);
        let scaled = DynamicImage::ImageRgba8(self.scale_frame(&decoded.to_rgba8(), target_w, target_h));
        let (bytes, format) = encode(&scaled, format)?;
        Ok(ScaledImage {
            bytes,
            format,
            width: target_w,
            height: target_h,
            frames: 1,
        })
    }
}

/// Encode as `format`, falling back to PNG when no encoder exists for it.
fn encode(image: &DynamicImage, format: ImageFormat) -> Result<(Vec<u8>, ImageFormat), CasError> {
    // JPEG has no alpha channel.
    let rgb;
    let image = if format == ImageFormat::Jpeg {
        rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        &rgb
    } else {
        image
    };

    let mut out = Cursor::new(Vec::new());
    match image.write_to(&mut out, format) {
        Ok(()) => Ok((out.into_inner(), format)),
        Err(ImageError::Unsupported(e)) => {
            tracing::debug!(?format, error = %e, "no encoder, writing png");
            let mut out = Cursor::new(Vec::new());
            image.write_to(&mut out, ImageFormat::Png)?;
            Ok((out.into_inner(), ImageFormat::Png))
        }
        Err(e) => Err(e.into()),
    }
}
