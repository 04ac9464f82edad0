//! Image scaling command.
//!
//! Scaling goes through the [`Rescaler`] trait. The default
//! [`ImageRescaler`] is a plain Lanczos3 resize standing in for a
//! content-aware (seam carving) delegate, which can be plugged in as another
//! [`Rescaler`].
//!
//! A request goes through three stages, reported through a progress
//! callback so a chat front end can update its status message:
//!
//! 1. [`Stage::Downloading`]: the [`ImageSource`] is turned into bytes.
//! 2. [`Stage::Scaling`]: a [`Rescaler`] runs on the [`ScalePool`], off the
//!    async runtime, with a bounded number of concurrent jobs and a timeout.
//! 3. [`Stage::Uploading`]: the caller sends the [`ScaledImage`].
//!
//! The scale factor is validated before anything is downloaded.
//!
//! ```no_run
//! # async fn run() -> Result<(), cas::CasError> {
//! use cas::{Cas, ImageSource};
//!
//! let cas = Cas::default();
//! let source = ImageSource::Url("https://example.com/cat.png".into());
//! let scaled = cas.run(source, 0.5, |stage| println!("{stage}")).await?;
//! std::fs::write(scaled.filename(), &scaled.bytes).unwrap();
//! # Ok(())
//! # }
//! ```

mod error;
mod pool;
mod rescale;
mod scale;
mod source;

use std::fmt;

pub use error::CasError;
pub use pool::{DEFAULT_TIMEOUT, DEFAULT_WORKERS, ScalePool};
pub use rescale::{
    DEFAULT_MAX_ANIMATION_PIXELS, DEFAULT_MAX_DIMENSION, DEFAULT_MAX_FRAMES, ImageRescaler,
    Rescaler, ScaledImage,
};
pub use scale::ScaleFactor;
pub use source::ImageSource;

/// Progress of a scaling request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Downloading,
    Scaling,
    Uploading,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Downloading => ":inbox_tray:   Downloading image",
            Stage::Scaling => ":hourglass:   Scaling image",
            Stage::Uploading => ":outbox_tray:   Uploading",
        })
    }
}

/// The scaling command: fetch, then scale on the pool.
pub struct Cas<R = ImageRescaler> {
    pool: ScalePool<R>,
    client: reqwest::Client,
}

impl Default for Cas<ImageRescaler> {
    fn default() -> Self {
        Cas::new(ScalePool::new(ImageRescaler::new()), reqwest::Client::new())
    }
}

impl<R: Rescaler + 'static> Cas<R> {
    pub fn new(pool: ScalePool<R>, client: reqwest::Client) -> Self {
        Cas { pool, client }
    }

    pub fn pool(&self) -> &ScalePool<R> {
        &self.pool
    }

    /// Scale the image from `source` by `scale`.
    pub async fn run(
        &self,
        source: ImageSource,
        scale: f64,
        mut progress: impl FnMut(Stage),
    ) -> Result<ScaledImage, CasError> {
        let factor = ScaleFactor::new(scale)?;

        progress(Stage::Downloading);
        let image = source.fetch(&self.client).await?;

        progress(Stage::Scaling);
        let scaled = self.pool.scale(image, factor).await?;
        tracing::info!(
            %factor,
            format = ?scaled.format,
            width = scaled.width,
            height = scaled.height,
            frames = scaled.frames,
            "scaled image"
        );

        progress(Stage::Uploading);
        Ok(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::new(width, height))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn reports_every_stage() {
        let cas = Cas::default();
        let mut stages = Vec::new();
        let out = cas
            .run(ImageSource::Attachment(png(30, 30)), 0.5, |s| stages.push(s))
            .await
            .unwrap();
        assert_eq!((out.width, out.height), (15, 15));
        assert_eq!(
            stages,
            vec![Stage::Downloading, Stage::Scaling, Stage::Uploading]
        );
    }

    #[tokio::test]
    async fn bad_scale_stops_before_download() {
        let cas = Cas::default();
        let mut stages = Vec::new();
        let err = cas
            .run(ImageSource::Url("not a url".into()), 2.5, |s| stages.push(s))
            .await
            .unwrap_err();
        assert!(matches!(err, CasError::ScaleOutOfRange(_)));
        assert!(stages.is_empty());
    }

    #[tokio::test]
    async fn unreadable_bytes() {
        let err = Cas::default()
            .run(ImageSource::Attachment(b"GIF89a?".to_vec()), 1.0, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.status_line(), ":x:   Cannot read file type");
    }

    #[test]
    fn stage_lines() {
        assert_eq!(Stage::Scaling.to_string(), ":hourglass:   Scaling image");
    }
}
