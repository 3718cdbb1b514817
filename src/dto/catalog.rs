//! Game definition import payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::GameDefinitionEntity,
    dto::{
        format_system_time,
        validation::{parse_rfc3339, validate_not_blank, validate_rfc3339},
    },
};

/// Moderator-accepted definition with its ordered quest list.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateDefinitionRequest {
    pub name: String,
    pub max_teams: u32,
    /// RFC 3339 start of the play window.
    pub date_begin: String,
    /// RFC 3339 end of the play window.
    pub date_end: String,
    #[serde(default)]
    pub min_score: i32,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub rating: i32,
    #[serde(default)]
    pub location: String,
    /// Quests in play order.
    pub quests: Vec<QuestInput>,
}

impl Validate for CreateDefinitionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_not_blank(&self.name) {
            errors.add("name", e);
        }
        if let Err(e) = validate_rfc3339(&self.date_begin) {
            errors.add("date_begin", e);
        }
        if let Err(e) = validate_rfc3339(&self.date_end) {
            errors.add("date_end", e);
        }
        let window = parse_rfc3339(&self.date_begin).zip(parse_rfc3339(&self.date_end));
        if window.is_some_and(|(begin, end)| begin > end) {
            let mut err = ValidationError::new("window");
            err.message = Some("date_begin must not be after date_end".into());
            errors.add("date_end", err);
        }
        for quest in &self.quests {
            if let Err(quest_errors) = quest.validate() {
                errors.merge_self("quests", Err(quest_errors));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// One quest and the mark it is anchored to.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct QuestInput {
    #[validate(custom(function = "validate_not_blank"))]
    pub task: String,
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub media_ref: String,
    /// Visibility radius in metres.
    #[validate(range(exclusive_min = 0.0))]
    pub radius_m: f64,
    #[validate(nested)]
    pub mark: MarkInput,
}

/// Geographic anchor of a quest.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct MarkInput {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[serde(default)]
    pub location: String,
}

/// Identifiers of an imported definition.
#[derive(Debug, Serialize, ToSchema)]
pub struct DefinitionCreatedResponse {
    pub id: Uuid,
    /// Quest identifiers in play order.
    pub quest_ids: Vec<Uuid>,
}

/// Accepted definition a team can still register for.
#[derive(Debug, Serialize, ToSchema)]
pub struct OpenDefinitionView {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub location: String,
    pub date_begin: String,
    pub date_end: String,
    pub min_score: i32,
    pub rating: i32,
    pub max_teams: u32,
    /// Teams registered so far.
    pub registered_teams: u64,
    pub quest_count: usize,
}

impl OpenDefinitionView {
    /// Assemble the view from a definition and its registration and quest counts.
    pub fn new(definition: GameDefinitionEntity, registered_teams: u64, quest_count: usize) -> Self {
        Self {
            id: definition.id,
            name: definition.name,
            kind: definition.kind,
            location: definition.location,
            date_begin: format_system_time(definition.date_begin),
            date_end: format_system_time(definition.date_end),
            min_score: definition.min_score,
            rating: definition.rating,
            max_teams: definition.max_teams,
            registered_teams,
            quest_count,
        }
    }
}
