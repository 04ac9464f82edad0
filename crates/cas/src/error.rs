use std::time::Duration;

use thiserror::Error;

/// Why a scaling request failed.
#[derive(Debug, Error)]
pub enum CasError {
    #[error("scale factor {0} is outside 0..=2")]
    ScaleOutOfRange(f64),

    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("cannot read image: {0}")]
    UnsupportedFormat(#[from] image::ImageError),

    #[error("image is {width}x{height}, larger than {max} pixels per side")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("animation has more than {max_frames} frames or {max_pixels} scaled pixels")]
    AnimationTooLarge { max_frames: usize, max_pixels: u64 },

    #[error("scaling did not finish within {0:?}")]
    Timeout(Duration),

    #[error("scaling worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("scaling pool is closed")]
    PoolClosed(#[from] tokio::sync::AcquireError),
}

impl CasError {
    /// Text shown to the user who asked for the scaling.
    pub fn user_message(&self) -> &'static str {
        match self {
            CasError::ScaleOutOfRange(_) => {
                "Scaling failed because the scale factor is not allowed!"
            }
            CasError::Download(_) => "Download failed",
            CasError::UnsupportedFormat(_) => "Cannot read file type",
            CasError::TooLarge { .. } | CasError::AnimationTooLarge { .. } => {
                "Image is too large to scale"
            }
            CasError::Timeout(_) => "Scaling took too long",
            CasError::Worker(_) | CasError::PoolClosed(_) => "Scaling failed",
        }
    }

    /// The failure as a progress line, e.g. `:x:   Download failed`.
    pub fn status_line(&self) -> String {
        format!(":x:   {}", self.user_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages() {
        assert_eq!(
            CasError::ScaleOutOfRange(3.0).user_message(),
            "Scaling failed because the scale factor is not allowed!"
        );
        let too_large = CasError::TooLarge {
            width: 5000,
            height: 10,
            max: 4096,
        };
        assert_eq!(too_large.user_message(), "Image is too large to scale");
        assert_eq!(
            too_large.to_string(),
            "image is 5000x10, larger than 4096 pixels per side"
        );
    }

    #[test]
    fn animation_budget_message() {
        let err = CasError::AnimationTooLarge {
            max_frames: 500,
            max_pixels: 1024,
        };
        assert_eq!(err.status_line(), ":x:   Image is too large to scale");
        assert_eq!(
            err.to_string(),
            "animation has more than 500 frames or 1024 scaled pixels"
        );
    }

    #[test]
    fn status_line_prefix() {
        assert_eq!(
            CasError::Timeout(Duration::from_secs(30)).status_line(),
            ":x:   Scaling took too long"
        );
    }
}
