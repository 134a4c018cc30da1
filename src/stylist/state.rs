use crate::stylist::error::{ErrorKind, Operation, StylistError, ValidationError};
use crate::stylist::image::ImageAsset;
use crate::stylist::selection::{RefinementField, RefinementSelection, StyleCategory, StyleSelection};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Loading {
        operation: Operation,
        message: &'static str,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl Status {
    fn loading(operation: Operation) -> Self {
        let message = match operation {
            Operation::Generate => "Applying the selected styles...",
            Operation::Refine => "Refining your new look...",
        };
        Status::Loading { operation, message }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateSnapshot {
    pub character: ImageAsset,
    pub style: ImageAsset,
    pub selection: StyleSelection,
    pub(crate) epoch: u64,
}

#[derive(Debug, Clone)]
pub struct RefineSnapshot {
    pub image: ImageAsset,
    pub refinement: RefinementSelection,
    pub(crate) epoch: u64,
}

/// Everything the session knows: source images, choices, result, and status.
///
/// `epoch` advances on every reset so that a response arriving after a reset
/// is dropped instead of resurrecting a cleared session.
#[derive(Debug, Default)]
pub struct SelectionState {
    character_image: Option<ImageAsset>,
    style_image: Option<ImageAsset>,
    result_image: Option<ImageAsset>,
    style_selection: StyleSelection,
    refinement: RefinementSelection,
    status: Status,
    epoch: u64,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_character_image(&mut self, asset: ImageAsset) {
        self.character_image = Some(asset);
    }

    pub fn set_style_image(&mut self, asset: ImageAsset) {
        self.style_image = Some(asset);
    }

    pub fn toggle_style_category(&mut self, category: StyleCategory) -> bool {
        self.style_selection.toggle(category)
    }

    pub fn set_refinement_field(&mut self, field: RefinementField) {
        self.refinement.apply(field);
    }

    /// Clears the images, the result, the status and the refinement choices.
    /// Style category toggles are kept for the next round.
    pub fn reset(&mut self) {
        self.character_image = None;
        self.style_image = None;
        self.result_image = None;
        self.refinement = RefinementSelection::default();
        self.status = Status::Idle;
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, Status::Loading { .. })
    }

    pub fn can_generate(&self) -> bool {
        self.character_image.is_some()
            && self.style_image.is_some()
            && !self.is_loading()
            && self.style_selection.any_enabled()
    }

    pub fn can_refine(&self) -> bool {
        self.result_image.is_some() && !self.is_loading() && !self.refinement.is_default()
    }

    pub fn character_image(&self) -> Option<&ImageAsset> {
        self.character_image.as_ref()
    }

    pub fn style_image(&self) -> Option<&ImageAsset> {
        self.style_image.as_ref()
    }

    pub fn result_image(&self) -> Option<&ImageAsset> {
        self.result_image.as_ref()
    }

    pub fn style_selection(&self) -> &StyleSelection {
        &self.style_selection
    }

    pub fn refinement(&self) -> &RefinementSelection {
        &self.refinement
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            Status::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Checks the generate precondition and copies its inputs. A busy state
    /// is reported without touching the status.
    pub(crate) fn snapshot_generate(&self) -> Result<GenerateSnapshot, StylistError> {
        if self.is_loading() {
            return Err(StylistError::Busy);
        }
        let (Some(character), Some(style)) = (&self.character_image, &self.style_image) else {
            return Err(ValidationError::MissingImage.into());
        };
        if !self.style_selection.any_enabled() {
            return Err(ValidationError::NoStyleSelected.into());
        }
        Ok(GenerateSnapshot {
            character: character.clone(),
            style: style.clone(),
            selection: self.style_selection.clone(),
            epoch: self.epoch,
        })
    }

    pub(crate) fn snapshot_refine(&self) -> Option<RefineSnapshot> {
        if !self.can_refine() {
            return None;
        }
        let image = self.result_image.clone()?;
        Some(RefineSnapshot {
            image,
            refinement: self.refinement.clone(),
            epoch: self.epoch,
        })
    }

    pub(crate) fn current_epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn begin(&mut self, operation: Operation) {
        self.status = Status::loading(operation);
    }

    pub(crate) fn complete(&mut self, epoch: u64, result: ImageAsset) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.result_image = Some(result);
        self.status = Status::Idle;
        true
    }

    pub(crate) fn fail(&mut self, epoch: u64, err: &StylistError) {
        if epoch != self.epoch {
            return;
        }
        self.status = Status::Error {
            kind: err.kind(),
            message: err.user_message(),
        };
    }

    pub(crate) fn release_loading(&mut self, epoch: u64) {
        if epoch == self.epoch && self.is_loading() {
            self.status = Status::Idle;
        }
    }
}
