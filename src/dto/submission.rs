//! Payloads of the media and score submissions.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dto::validation::validate_not_blank;

/// Media answer for an open quest attempt, sent by the elected video-shooter.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct AddResultRequest {
    /// Attempt being answered.
    pub game_id: Uuid,
    /// Reference returned by the media storage.
    #[validate(length(max = 2048), custom(function = "validate_not_blank"))]
    pub media_ref: String,
}

/// Finished attempt created by a media submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct AddResultResponse {
    pub game_finished_id: Uuid,
    pub game_id: Uuid,
}

/// Judge's score for one finished attempt.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SetScoreRequest {
    pub game_finished_id: Uuid,
    pub judge_fix_id: Uuid,
    #[validate(range(min = 0, max = 100))]
    pub score: i32,
}

/// Score row created by a judge.
#[derive(Debug, Serialize, ToSchema)]
pub struct SetScoreResponse {
    pub judge_score_id: Uuid,
    pub score: i32,
}
