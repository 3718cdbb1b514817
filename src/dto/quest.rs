use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Media instructions of a quest.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestMediaResponse {
    pub quest_id: Uuid,
    pub media_url: String,
}
