//! The "generate content from parts" seam between the orchestrator and a hosted
//! image model. Request and response types follow the Gemini wire shape so the
//! HTTP client can serialize them directly.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Gemini request failed: {0}")]
    Transport(String),
    #[error("Gemini request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Gemini response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// One outbound request part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContentPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

impl ContentPart {
    pub fn inline_image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentPart::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn as_inline_data(&self) -> Option<&InlineData> {
        match self {
            ContentPart::InlineData { inline_data } => Some(inline_data),
            ContentPart::Text { .. } => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            ContentPart::InlineData { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateContentRequest {
    pub parts: Vec<ContentPart>,
    pub response_modalities: Vec<Modality>,
}

impl GenerateContentRequest {
    /// A request whose response must carry image output.
    pub fn image_output(parts: Vec<ContentPart>) -> Self {
        Self {
            parts,
            response_modalities: vec![Modality::Image],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponsePart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
    Other(Value),
}

impl GenerateContentResponse {
    /// The first part of the first candidate, if the model produced one.
    pub fn first_part(&self) -> Option<&ResponsePart> {
        self.candidates
            .as_deref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_deref()?
            .first()
    }

    /// Finish or block reason worth logging when no image came back.
    pub fn refusal_reason(&self) -> Option<&str> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Some(reason);
        }
        self.candidates
            .as_deref()?
            .first()?
            .finish_reason
            .as_deref()
            .filter(|reason| *reason != "STOP")
    }
}

pub trait ImageModel: Send + Sync {
    fn model_name(&self) -> &str;

    fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> impl Future<Output = Result<GenerateContentResponse, ModelError>> + Send;
}
