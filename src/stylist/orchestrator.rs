use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::llm::model::{
    ContentPart, GenerateContentRequest, GenerateContentResponse, ImageModel, ResponsePart,
};
use crate::stylist::error::{Operation, StylistError, ValidationError};
use crate::stylist::image::ImageAsset;
use crate::stylist::prompt::{build_refinement_instruction, build_style_instruction};
use crate::stylist::state::SelectionState;
use crate::utils::timing::OperationTimer;

/// Runs generate/refine calls against an image model for one session. The
/// state lock is never held across the model call.
pub struct Stylist<M> {
    model: M,
    state: Mutex<SelectionState>,
}

/// Clears a loading flag left behind by an early return or a dropped future.
struct LoadingGuard<'a> {
    state: &'a Mutex<SelectionState>,
    epoch: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().release_loading(self.epoch);
    }
}

impl<M: ImageModel> Stylist<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            state: Mutex::new(SelectionState::new()),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, SelectionState> {
        self.state.lock()
    }

    #[cfg(test)]
    pub(crate) fn model(&self) -> &M {
        &self.model
    }

    pub async fn generate(&self) -> Result<ImageAsset, StylistError> {
        let mut timer = OperationTimer::start(Operation::Generate.as_str());

        let snapshot = {
            let mut state = self.state.lock();
            let checked = state.snapshot_generate().and_then(|snapshot| {
                snapshot.character.validate().map_err(ValidationError::from)?;
                snapshot.style.validate().map_err(ValidationError::from)?;
                Ok(snapshot)
            });
            match checked {
                Ok(snapshot) => {
                    state.begin(Operation::Generate);
                    snapshot
                }
                Err(err) => {
                    if !matches!(err, StylistError::Busy) {
                        let epoch = state.current_epoch();
                        state.fail(epoch, &err);
                    }
                    warn!("Generate rejected before sending: {}", err);
                    timer.mark_status("rejected", Some(err.to_string()));
                    timer.complete();
                    return Err(err);
                }
            }
        };
        let _loading = LoadingGuard {
            state: &self.state,
            epoch: snapshot.epoch,
        };

        let instruction = build_style_instruction(&snapshot.selection)
            .ok_or(StylistError::Validation(ValidationError::NoStyleSelected));
        let outcome = match instruction {
            Ok(instruction) => {
                let parts = vec![
                    snapshot.character.to_content_part(),
                    snapshot.style.to_content_part(),
                    ContentPart::text(instruction),
                ];
                self.request_image(Operation::Generate, parts).await
            }
            Err(err) => Err(err),
        };

        self.settle(Operation::Generate, snapshot.epoch, outcome, &mut timer)
    }

    /// Applies the refinement choices to the current result. Returns `Ok(None)`
    /// without contacting the model when refinement is not currently allowed.
    pub async fn refine(&self) -> Result<Option<ImageAsset>, StylistError> {
        let snapshot = {
            let mut state = self.state.lock();
            let Some(snapshot) = state.snapshot_refine() else {
                debug!("Refine skipped: no result, busy, or nothing to change");
                return Ok(None);
            };
            if let Err(err) = snapshot.image.validate() {
                let err = StylistError::from(ValidationError::from(err));
                state.fail(snapshot.epoch, &err);
                warn!("Refine rejected before sending: {}", err);
                return Err(err);
            }
            state.begin(Operation::Refine);
            snapshot
        };
        let mut timer = OperationTimer::start(Operation::Refine.as_str());
        let _loading = LoadingGuard {
            state: &self.state,
            epoch: snapshot.epoch,
        };

        let parts = vec![
            snapshot.image.to_content_part(),
            ContentPart::text(build_refinement_instruction(&snapshot.refinement)),
        ];
        let outcome = self.request_image(Operation::Refine, parts).await;

        self.settle(Operation::Refine, snapshot.epoch, outcome, &mut timer)
            .map(Some)
    }

    async fn request_image(
        &self,
        operation: Operation,
        parts: Vec<ContentPart>,
    ) -> Result<ImageAsset, StylistError> {
        let request = GenerateContentRequest::image_output(parts);
        let response = self
            .model
            .generate_content(request)
            .await
            .map_err(|err| StylistError::model_failure(operation, err))?;
        extract_image(operation, self.model.model_name(), &response)
    }

    fn settle(
        &self,
        operation: Operation,
        epoch: u64,
        outcome: Result<ImageAsset, StylistError>,
        timer: &mut OperationTimer,
    ) -> Result<ImageAsset, StylistError> {
        let mut state = self.state.lock();
        match outcome {
            Ok(image) => {
                if state.complete(epoch, image.clone()) {
                    info!(
                        "{} produced a new result (mime={}, len={})",
                        operation,
                        image.mime_type(),
                        image.data().len()
                    );
                } else {
                    info!("{} finished after a reset; result discarded", operation);
                    timer.mark_status("discarded", None);
                }
                timer.complete();
                Ok(image)
            }
            Err(err) => {
                error!("{} failed: {}", operation, err);
                state.fail(epoch, &err);
                timer.mark_status("error", Some(format!("{:?}", err.kind())));
                timer.complete();
                Err(err)
            }
        }
    }
}

/// Reads the first part of the first candidate; anything other than inline
/// image data counts as an empty response.
fn extract_image(
    operation: Operation,
    model: &str,
    response: &GenerateContentResponse,
) -> Result<ImageAsset, StylistError> {
    match response.first_part() {
        Some(ResponsePart::InlineData { inline_data }) => {
            ImageAsset::from_model_output(&inline_data.mime_type, &inline_data.data).map_err(
                |err| {
                    warn!(
                        "Model {} returned unusable inline data during {}: {}",
                        model, operation, err
                    );
                    StylistError::EmptyResponse { operation }
                },
            )
        }
        other => {
            let shape = match other {
                Some(ResponsePart::Text { .. }) => "text",
                Some(ResponsePart::Other(_)) => "unknown part",
                _ => "no parts",
            };
            warn!(
                "No image returned by model {} during {} (first part: {}, reason: {:?})",
                model,
                operation,
                shape,
                response.refusal_reason()
            );
            Err(StylistError::EmptyResponse { operation })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::llm::model::ModelError;
    use crate::stylist::error::ErrorKind;
    use crate::stylist::image::ImageAssetError;
    use crate::stylist::selection::{RefinementField, StyleCategory, StyleSelection, SunglassesStyle};
    use crate::stylist::state::Status;

    const CHARACTER: &str = "Y2hhcmFjdGVy";
    const STYLE: &str = "c3R5bGU=";
    const FIRST_RESULT: &str = "Zmlyc3QtcmVzdWx0";
    const SECOND_RESULT: &str = "c2Vjb25kLXJlc3VsdA==";

    #[derive(Default)]
    struct MockModel {
        responses: Mutex<VecDeque<Result<GenerateContentResponse, ModelError>>>,
        requests: Mutex<Vec<GenerateContentRequest>>,
        hang: bool,
    }

    impl MockModel {
        fn with_responses(
            responses: Vec<Result<GenerateContentResponse, ModelError>>,
        ) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().len()
        }

        fn request(&self, index: usize) -> GenerateContentRequest {
            self.requests.lock()[index].clone()
        }
    }

    impl ImageModel for MockModel {
        fn model_name(&self) -> &str {
            "mock-image-model"
        }

        async fn generate_content(
            &self,
            request: GenerateContentRequest,
        ) -> Result<GenerateContentResponse, ModelError> {
            self.requests.lock().push(request);
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(GenerateContentResponse::default()))
        }
    }

    fn image_response(mime_type: &str, data: &str) -> Result<GenerateContentResponse, ModelError> {
        Ok(serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "mimeType": mime_type, "data": data } }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap())
    }

    fn text_response(text: &str) -> Result<GenerateContentResponse, ModelError> {
        Ok(serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
        .unwrap())
    }

    fn ready_stylist(model: MockModel) -> Stylist<MockModel> {
        let stylist = Stylist::new(model);
        {
            let mut state = stylist.state();
            state.set_character_image(ImageAsset::from_base64("image/jpeg", CHARACTER).unwrap());
            state.set_style_image(ImageAsset::from_base64("image/png", STYLE).unwrap());
        }
        stylist
    }

    fn inline_data(part: &ContentPart) -> (&str, &str) {
        let data = part.as_inline_data().expect("inline image part");
        (data.mime_type.as_str(), data.data.as_str())
    }

    #[tokio::test]
    async fn generate_sends_character_style_then_instruction() {
        let stylist = ready_stylist(MockModel::with_responses(vec![image_response(
            "image/png",
            FIRST_RESULT,
        )]));
        {
            let mut state = stylist.state();
            state.toggle_style_category(StyleCategory::Makeup);
            state.toggle_style_category(StyleCategory::Clothing);
        }

        let result = stylist.generate().await.unwrap();

        assert_eq!(result.data(), FIRST_RESULT);
        let request = stylist.model().request(0);
        assert_eq!(request.parts.len(), 3);
        assert_eq!(inline_data(&request.parts[0]), ("image/jpeg", CHARACTER));
        assert_eq!(inline_data(&request.parts[1]), ("image/png", STYLE));
        let instruction = request.parts[2].as_text().unwrap();
        assert!(instruction.contains("hairstyle, clothing"));
        assert!(!instruction.contains("makeup"));
        assert!(!instruction.contains("jewelry"));
        assert_eq!(request.response_modalities, vec![crate::llm::model::Modality::Image]);

        let state = stylist.state();
        assert_eq!(state.result_image(), Some(&result));
        assert_eq!(state.status(), &Status::Idle);
    }

    #[tokio::test]
    async fn generate_without_images_never_calls_model() {
        let stylist = Stylist::new(MockModel::default());

        let err = stylist.generate().await.unwrap_err();

        assert!(matches!(err, StylistError::Validation(ValidationError::MissingImage)));
        assert_eq!(stylist.model().calls(), 0);
        assert!(matches!(
            stylist.state().status(),
            Status::Error { kind: ErrorKind::Validation, .. }
        ));
    }

    #[tokio::test]
    async fn generate_without_categories_never_calls_model() {
        let stylist = ready_stylist(MockModel::default());
        {
            let mut state = stylist.state();
            state.toggle_style_category(StyleCategory::Hairstyle);
            state.toggle_style_category(StyleCategory::Makeup);
            assert_eq!(state.style_selection(), &StyleSelection::none());
        }

        let err = stylist.generate().await.unwrap_err();

        assert!(matches!(err, StylistError::Validation(ValidationError::NoStyleSelected)));
        assert_eq!(stylist.model().calls(), 0);
    }

    #[tokio::test]
    async fn empty_candidate_list_is_an_empty_response() {
        let stylist = ready_stylist(MockModel::with_responses(vec![Ok(
            serde_json::from_value(json!({ "candidates": [] })).unwrap(),
        )]));

        let err = stylist.generate().await.unwrap_err();

        assert!(matches!(
            err,
            StylistError::EmptyResponse { operation: Operation::Generate }
        ));
        let state = stylist.state();
        assert!(state.result_image().is_none());
        assert!(matches!(
            state.status(),
            Status::Error { kind: ErrorKind::EmptyResponse, .. }
        ));
    }

    #[tokio::test]
    async fn text_only_answer_is_an_empty_response() {
        let stylist = ready_stylist(MockModel::with_responses(vec![text_response(
            "I can't help with that.",
        )]));

        let err = stylist.generate().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert!(stylist.state().result_image().is_none());
    }

    #[tokio::test]
    async fn gif_answer_is_an_empty_response() {
        let stylist = ready_stylist(MockModel::with_responses(vec![
            image_response("image/png", FIRST_RESULT),
            image_response("image/gif", "R0lGODlhAQABAIAAADs="),
        ]));
        let first = stylist.generate().await.unwrap();

        let err = stylist.generate().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert_eq!(stylist.state().result_image(), Some(&first));
    }

    #[tokio::test]
    async fn corrupt_source_image_fails_validation_before_sending() {
        let stylist = ready_stylist(MockModel::default());
        stylist
            .state()
            .set_style_image(ImageAsset::unchecked("image/png", "@@@"));

        let err = stylist.generate().await.unwrap_err();

        assert!(matches!(
            err,
            StylistError::Validation(ValidationError::InvalidImage(
                ImageAssetError::InvalidBase64(_)
            ))
        ));
        assert_eq!(stylist.model().calls(), 0);
        let state = stylist.state();
        assert!(!state.is_loading());
        assert!(matches!(
            state.status(),
            Status::Error { kind: ErrorKind::Validation, .. }
        ));
    }

    #[tokio::test]
    async fn corrupt_result_fails_refine_before_sending() {
        let stylist = ready_stylist(MockModel::default());
        {
            let mut state = stylist.state();
            let epoch = state.current_epoch();
            state.complete(epoch, ImageAsset::unchecked("image/gif", FIRST_RESULT));
            state.set_refinement_field(RefinementField::HairColor("#000000".to_string()));
        }

        let err = stylist.refine().await.unwrap_err();

        assert!(matches!(
            err,
            StylistError::Validation(ValidationError::InvalidImage(
                ImageAssetError::UnsupportedMediaType(_)
            ))
        ));
        assert_eq!(stylist.model().calls(), 0);
        assert!(!stylist.state().is_loading());
    }

    #[tokio::test]
    async fn transport_failure_keeps_previous_result_and_sources() {
        let stylist = ready_stylist(MockModel::with_responses(vec![
            image_response("image/png", FIRST_RESULT),
            Err(ModelError::Transport("connection reset".to_string())),
        ]));
        let first = stylist.generate().await.unwrap();

        let err = stylist.generate().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Generation);
        let state = stylist.state();
        assert_eq!(state.result_image(), Some(&first));
        assert_eq!(state.character_image().map(ImageAsset::data), Some(CHARACTER));
        assert_eq!(state.style_image().map(ImageAsset::data), Some(STYLE));
        assert!(!state.is_loading());
        assert!(state.can_generate());
    }

    #[tokio::test]
    async fn refine_is_a_no_op_when_not_allowed() {
        let stylist = ready_stylist(MockModel::default());
        assert_eq!(stylist.refine().await.unwrap(), None);

        stylist
            .state()
            .set_refinement_field(RefinementField::HairColor("#000000".to_string()));
        assert_eq!(stylist.refine().await.unwrap(), None);

        assert_eq!(stylist.model().calls(), 0);
        assert_eq!(stylist.state().status(), &Status::Idle);
    }

    #[tokio::test]
    async fn refinements_chain_from_the_latest_result() {
        let stylist = ready_stylist(MockModel::with_responses(vec![
            image_response("image/webp", FIRST_RESULT),
            image_response("image/png", SECOND_RESULT),
            image_response("image/png", FIRST_RESULT),
        ]));
        stylist.generate().await.unwrap();
        stylist
            .state()
            .set_refinement_field(RefinementField::HairColor("#B71C1C".to_string()));

        let refined = stylist.refine().await.unwrap().unwrap();

        let request = stylist.model().request(1);
        assert_eq!(request.parts.len(), 2);
        assert_eq!(inline_data(&request.parts[0]), ("image/webp", FIRST_RESULT));
        assert_ne!(inline_data(&request.parts[0]).1, CHARACTER);
        let instruction = request.parts[1].as_text().unwrap();
        assert!(instruction.contains("Change the hair color to #B71C1C."));
        assert!(instruction.contains("Ensure the person is not wearing sunglasses."));
        assert_eq!(refined.data(), SECOND_RESULT);

        stylist
            .state()
            .set_refinement_field(RefinementField::Sunglasses(SunglassesStyle::Style(
                "round John Lennon style sunglasses".to_string(),
            )));
        stylist.refine().await.unwrap().unwrap();

        let request = stylist.model().request(2);
        assert_eq!(inline_data(&request.parts[0]).1, SECOND_RESULT);
        let instruction = request.parts[1].as_text().unwrap();
        assert!(instruction.contains("Add round John Lennon style sunglasses."));
        assert!(!instruction.contains("not wearing sunglasses"));
    }

    #[tokio::test]
    async fn refine_failure_uses_refinement_code() {
        let stylist = ready_stylist(MockModel::with_responses(vec![
            image_response("image/png", FIRST_RESULT),
            Err(ModelError::Status {
                status: 503,
                message: "overloaded".to_string(),
            }),
        ]));
        let first = stylist.generate().await.unwrap();
        stylist
            .state()
            .set_refinement_field(RefinementField::LipstickColor("#D50000".to_string()));

        let err = stylist.refine().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Refinement);
        let state = stylist.state();
        assert_eq!(state.result_image(), Some(&first));
        assert!(matches!(
            state.status(),
            Status::Error { kind: ErrorKind::Refinement, .. }
        ));
        assert!(state.can_refine());
    }

    #[tokio::test]
    async fn busy_session_rejects_generate_without_touching_status() {
        let stylist = ready_stylist(MockModel::default());
        stylist.state().begin(Operation::Refine);

        let err = stylist.generate().await.unwrap_err();

        assert!(matches!(err, StylistError::Busy));
        assert_eq!(stylist.model().calls(), 0);
        assert!(stylist.state().is_loading());
    }

    #[tokio::test]
    async fn next_operation_clears_previous_error() {
        let stylist = ready_stylist(MockModel::with_responses(vec![
            text_response("no"),
            image_response("image/png", FIRST_RESULT),
        ]));
        assert!(stylist.generate().await.is_err());
        assert!(stylist.state().error_message().is_some());

        stylist.generate().await.unwrap();

        assert_eq!(stylist.state().status(), &Status::Idle);
    }

    #[tokio::test]
    async fn dropped_request_releases_loading_flag() {
        let stylist = ready_stylist(MockModel {
            hang: true,
            ..MockModel::default()
        });

        let outcome = tokio::time::timeout(Duration::from_millis(20), stylist.generate()).await;

        assert!(outcome.is_err());
        assert_eq!(stylist.model().calls(), 1);
        let state = stylist.state();
        assert!(!state.is_loading());
        assert!(state.result_image().is_none());
    }
}
