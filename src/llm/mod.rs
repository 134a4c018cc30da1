pub mod gemini;
pub mod media;
pub mod model;

pub use gemini::GeminiClient;
pub use model::{
    ContentPart, GenerateContentRequest, GenerateContentResponse, ImageModel, ModelError,
    ResponsePart,
};
