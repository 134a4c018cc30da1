//! Session state and request orchestration for the virtual stylist.

pub mod error;
pub mod image;
pub mod orchestrator;
pub mod palette;
pub mod prompt;
pub mod selection;
pub mod state;

pub use error::{ErrorKind, Operation, StylistError, ValidationError};
pub use image::{ImageAsset, ImageAssetError};
pub use orchestrator::Stylist;
pub use selection::{
    RefinementField, RefinementSelection, StyleCategory, StyleSelection, SunglassesStyle,
};
pub use state::{SelectionState, Status};
