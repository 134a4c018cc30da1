//! Encoded image values and the `data:<media-type>;base64,<payload>` convention.

use std::fmt;

use base64::{engine::general_purpose, Engine as _};

use crate::llm::media::{
    detect_mime_type, gemini_supports_image_mime, normalize_image_mime_type, resolve_image_mime,
};
use crate::llm::model::ContentPart;

pub const FALLBACK_RESULT_MIME: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageAssetError {
    #[error("image data URL must start with 'data:'")]
    MissingScheme,
    #[error("image data URL is missing the ',' before its payload")]
    MissingPayloadDelimiter,
    #[error("image data URL has no media type")]
    MissingMediaType,
    #[error("image data URL is not base64 encoded")]
    NotBase64,
    #[error("unsupported image media type '{0}'")]
    UnsupportedMediaType(String),
    #[error("image payload is empty")]
    EmptyPayload,
    #[error("image payload is not valid base64: {0}")]
    InvalidBase64(String),
}

/// An encoded image: a recognized media type plus its base64 payload.
///
/// Constructors check that the payload decodes to at least one byte and that
/// the media type is one the image model accepts.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    mime_type: String,
    data: String,
}

impl ImageAsset {
    /// Strict parse of `data:<media-type>[;param]*;base64,<payload>`.
    pub fn from_data_url(value: &str) -> Result<Self, ImageAssetError> {
        let value = value.trim();
        let rest = strip_prefix_ignore_case(value, "data:").ok_or(ImageAssetError::MissingScheme)?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or(ImageAssetError::MissingPayloadDelimiter)?;

        let mut segments = header.split(';');
        let media_type = segments.next().map(str::trim).unwrap_or_default();
        if media_type.is_empty() {
            return Err(ImageAssetError::MissingMediaType);
        }
        if !segments.any(|segment| segment.trim().eq_ignore_ascii_case("base64")) {
            return Err(ImageAssetError::NotBase64);
        }

        Self::from_base64(media_type, payload)
    }

    /// Builds an asset from raw file bytes. A missing or unsupported declared
    /// type is replaced by the type sniffed from the bytes.
    pub fn from_bytes(bytes: &[u8], declared_mime: Option<&str>) -> Result<Self, ImageAssetError> {
        if bytes.is_empty() {
            return Err(ImageAssetError::EmptyPayload);
        }
        let mime_type = resolve_image_mime(declared_mime, bytes).ok_or_else(|| {
            ImageAssetError::UnsupportedMediaType(
                declared_mime.unwrap_or("unknown").trim().to_string(),
            )
        })?;
        Ok(Self {
            mime_type,
            data: general_purpose::STANDARD.encode(bytes),
        })
    }

    pub fn from_base64(mime_type: &str, data: &str) -> Result<Self, ImageAssetError> {
        let mime_type = normalize_image_mime_type(mime_type);
        if !gemini_supports_image_mime(&mime_type) {
            return Err(ImageAssetError::UnsupportedMediaType(mime_type));
        }
        let data = data.trim();
        decode_payload(data)?;
        Ok(Self {
            mime_type,
            data: data.to_string(),
        })
    }

    /// Wraps an inline image returned by the model. The returned type is kept
    /// when supported, otherwise the type is sniffed from the decoded bytes.
    /// An image type the model input side cannot take is rejected; PNG is
    /// assumed only when neither source names an image type.
    pub fn from_model_output(mime_type: &str, data: &str) -> Result<Self, ImageAssetError> {
        let data = data.trim();
        let bytes = decode_payload(data)?;
        let mime_type = match resolve_image_mime(Some(mime_type), &bytes) {
            Some(resolved) => resolved,
            None => {
                if let Some(other) = unsupported_image_type(mime_type, &bytes) {
                    return Err(ImageAssetError::UnsupportedMediaType(other));
                }
                FALLBACK_RESULT_MIME.to_string()
            }
        };
        Ok(Self {
            mime_type,
            data: data.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn unchecked(mime_type: &str, data: &str) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn decode(&self) -> Result<Vec<u8>, ImageAssetError> {
        decode_payload(&self.data)
    }

    pub fn validate(&self) -> Result<(), ImageAssetError> {
        if !gemini_supports_image_mime(&self.mime_type) {
            return Err(ImageAssetError::UnsupportedMediaType(self.mime_type.clone()));
        }
        self.decode().map(|_| ())
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn to_content_part(&self) -> ContentPart {
        ContentPart::inline_image(self.mime_type.clone(), self.data.clone())
    }
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}

fn unsupported_image_type(declared: &str, bytes: &[u8]) -> Option<String> {
    detect_mime_type(bytes)
        .into_iter()
        .chain(std::iter::once(declared.to_string()))
        .map(|candidate| normalize_image_mime_type(&candidate))
        .find(|candidate| candidate.starts_with("image/"))
}

fn decode_payload(data: &str) -> Result<Vec<u8>, ImageAssetError> {
    if data.is_empty() {
        return Err(ImageAssetError::EmptyPayload);
    }
    let bytes = general_purpose::STANDARD
        .decode(data)
        .map_err(|err| ImageAssetError::InvalidBase64(err.to_string()))?;
    if bytes.is_empty() {
        return Err(ImageAssetError::EmptyPayload);
    }
    Ok(bytes)
}
