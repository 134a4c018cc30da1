use std::fmt;

use crate::llm::model::ModelError;
use crate::stylist::image::ImageAssetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Generate,
    Refine,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Generate => "generate",
            Operation::Refine => "refine",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing image")]
    MissingImage,
    #[error("no style selected")]
    NoStyleSelected,
    #[error("invalid image: {0}")]
    InvalidImage(#[from] ImageAssetError),
}

/// Error code stored in the status slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    EmptyResponse,
    Generation,
    Refinement,
    Busy,
}

#[derive(Debug, thiserror::Error)]
pub enum StylistError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("model returned no image during {operation}")]
    EmptyResponse { operation: Operation },
    #[error("generation failed: {0}")]
    Generation(#[source] ModelError),
    #[error("refinement failed: {0}")]
    Refinement(#[source] ModelError),
    #[error("another request is already in progress")]
    Busy,
}

impl StylistError {
    pub(crate) fn model_failure(operation: Operation, err: ModelError) -> Self {
        match operation {
            Operation::Generate => StylistError::Generation(err),
            Operation::Refine => StylistError::Refinement(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StylistError::Validation(_) => ErrorKind::Validation,
            StylistError::EmptyResponse { .. } => ErrorKind::EmptyResponse,
            StylistError::Generation(_) => ErrorKind::Generation,
            StylistError::Refinement(_) => ErrorKind::Refinement,
            StylistError::Busy => ErrorKind::Busy,
        }
    }

    /// Text shown to the user in place of the internal error.
    pub fn user_message(&self) -> String {
        match self {
            StylistError::Validation(ValidationError::MissingImage) => {
                "Please upload both a character image and a style reference image.".to_string()
            }
            StylistError::Validation(ValidationError::NoStyleSelected) => {
                "Please select at least one style to apply.".to_string()
            }
            StylistError::Validation(ValidationError::InvalidImage(err)) => {
                format!("One of the images cannot be used: {err}.")
            }
            StylistError::EmptyResponse {
                operation: Operation::Generate,
            } => "No image was generated. Please try again.".to_string(),
            StylistError::EmptyResponse {
                operation: Operation::Refine,
            } => "No image was produced during refinement. Please try again.".to_string(),
            StylistError::Generation(_) => {
                "Image generation failed. The model may have declined the request. Please check your images and try again."
                    .to_string()
            }
            StylistError::Refinement(_) => {
                "Refinement failed. Please try a different combination.".to_string()
            }
            StylistError::Busy => "Please wait for the current request to finish.".to_string(),
        }
    }
}
