//! Inline previews.
//!
//! Only two raster formats are ever embedded into a rendered document. Every
//! other content type is replicated and linked, never previewed.

use base64::Engine as _;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid data URL: {0:?}")]
    InvalidDataUrl(data_url::DataUrlError),
    #[error("invalid base64 payload: {0:?}")]
    InvalidBase64(data_url::forgiving_base64::InvalidBase64),
    #[error("not a previewable content type: {0}")]
    NotPreviewable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewType {
    Png,
    Jpeg,
}

impl PreviewType {
    /// The single lookup deciding whether a content type gets an inline preview.
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let mime = content_type.trim().parse::<mime::Mime>().ok()?;
        if mime.type_() != mime::IMAGE {
            return None;
        }
        if mime.subtype() == mime::PNG {
            Some(Self::Png)
        } else if mime.subtype() == mime::JPEG {
            Some(Self::Jpeg)
        } else {
            None
        }
    }

    pub fn mime(self) -> mime::Mime {
        match self {
            Self::Png => mime::IMAGE_PNG,
            Self::Jpeg => mime::IMAGE_JPEG,
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// A base64 data URL holding the raw bytes of a previewable attachment.
#[derive(Clone, PartialEq, Eq, derive_debug::Dbg)]
pub struct InlinePreview {
    pub kind: PreviewType,
    #[dbg(skip)]
    data_url: String,
}

impl InlinePreview {
    pub fn encode(kind: PreviewType, body: &[u8]) -> Self {
        let payload = base64::engine::general_purpose::STANDARD.encode(body);
        Self {
            kind,
            data_url: format!("data:{};base64,{payload}", kind.mime()),
        }
    }

    /// Parses a data URL produced elsewhere. The media type must be previewable.
    pub fn parse(data_url: impl Into<String>) -> Result<Self, Error> {
        let data_url = data_url.into();
        let parsed = data_url::DataUrl::process(&data_url).map_err(Error::InvalidDataUrl)?;
        let media_type = parsed.mime_type();
        let essence = format!("{}/{}", media_type.type_, media_type.subtype);
        let kind = PreviewType::from_mime(&essence).ok_or(Error::NotPreviewable(essence))?;
        Ok(Self { kind, data_url })
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn decode(&self) -> Result<Vec<u8>, Error> {
        let parsed = data_url::DataUrl::process(&self.data_url).map_err(Error::InvalidDataUrl)?;
        let (body, _) = parsed.decode_to_vec().map_err(Error::InvalidBase64)?;
        Ok(body)
    }
}
