//! Where the image to scale comes from.

use crate::CasError;

/// An image to scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Bytes already in hand, e.g. a message attachment or a local file.
    Attachment(Vec<u8>),
    /// A user's avatar URL.
    Avatar(String),
    /// Any other URL.
    Url(String),
}

impl ImageSource {
    /// Interpret a command argument: `http://` and `https://` values are
    /// URLs, anything else is `None`.
    pub fn from_url(target: &str) -> Option<Self> {
        let target = target.trim();
        let lower = target.to_ascii_lowercase();
        (lower.starts_with("http://") || lower.starts_with("https://"))
            .then(|| ImageSource::Url(target.to_owned()))
    }

    /// The image bytes, downloading them if needed.
    pub async fn fetch(self, client: &reqwest::Client) -> Result<Vec<u8>, CasError> {
        match self {
            ImageSource::Attachment(bytes) => Ok(bytes),
            ImageSource::Avatar(url) | ImageSource::Url(url) => download(client, &url).await,
        }
    }
}

async fn download(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, CasError> {
    tracing::debug!(url, "downloading image");
    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    Ok(bytes.to_vec())
}
