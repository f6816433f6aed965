use rocket::serde::json::Json;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::speech::{PHRASES, Phrase, PronunciationScore, find_phrase, score_pronunciation};
use crate::validation::JsonValidateExt;

use super::{ApiResponse, ApiResult};

/// A transcript to score, against either a known phrase or free text.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub phrase_id: Option<String>,
    pub expected: Option<String>,
    #[validate(length(min = 1, message = "Transcript is required"))]
    pub transcript: String,
}

#[get("/phrases")]
pub fn api_list_phrases() -> ApiResult<&'static [Phrase]> {
    Ok(ApiResponse::ok(PHRASES.as_slice()))
}

#[post("/score", data = "<request>")]
pub fn api_score_pronunciation(request: Json<ScoreRequest>) -> ApiResult<PronunciationScore> {
    let request = request.validate_custom()?;

    let expected = match (&request.phrase_id, &request.expected) {
        (Some(id), _) => find_phrase(id)
            .map(|phrase| phrase.text.to_string())
            .ok_or_else(|| AppError::NotFound(format!("Phrase {} not found", id)))?,
        (None, Some(expected)) if !expected.trim().is_empty() => expected.clone(),
        _ => {
            return Err(AppError::Validation(
                "Either phraseId or expected text is required".to_string(),
            ));
        }
    };

    Ok(ApiResponse::ok(score_pronunciation(
        &expected,
        &request.transcript,
    )))
}
