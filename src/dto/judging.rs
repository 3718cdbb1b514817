use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// What an assigned judge sees: the judged team and every finished attempt.
#[derive(Debug, Serialize, ToSchema)]
pub struct JudgeInfoResponse {
    pub fix_judge_id: Uuid,
    pub team_id: Uuid,
    pub team_name: String,
    pub game_def_id: Uuid,
    pub game_name: String,
    pub attempts: Vec<FinishedAttemptView>,
}

/// A finished attempt awaiting or holding a score.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinishedAttemptView {
    pub game_finished_id: Uuid,
    pub game_id: Uuid,
    pub task: String,
    /// Resolved URL of the submitted media.
    pub media_url: String,
    /// `null` until scored.
    pub score: Option<i32>,
}
