//! Realtime frames exchanged over `/ws`.
//!
//! Every frame is `{"event": "<name>", "data": {...}}`; events without payload omit `data`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// Why an inbound frame could not be accepted.
#[derive(Debug, Error)]
pub enum InboundError {
    /// The frame is not a known event.
    #[error("malformed event: {0}")]
    Parse(#[from] serde_json::Error),
    /// The payload failed validation.
    #[error("invalid payload: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// Events accepted from realtime clients.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind the user to the session.
    Authentication(AuthenticationPayload),
    /// Ask for the caller's current view.
    Status,
    /// Ask for the caller's team membership code.
    CommandStatus,
    /// Share a position with teammates.
    SetPlayerCoordinates(CoordinatesPayload),
    /// Ask teammates to publish their positions.
    CoordinatesPlayers,
    /// Persist the caller's position.
    SetCurrentCoordinates(CoordinatesPayload),
    /// Read back the caller's stored position.
    GetMyCoordinates,
}

impl ClientMessage {
    /// Parse and validate one text frame.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        let message: ClientMessage = serde_json::from_str(text)?;
        message.validate()?;
        Ok(message)
    }

    /// Event name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::Authentication(_) => "authentication",
            ClientMessage::Status => "status",
            ClientMessage::CommandStatus => "command_status",
            ClientMessage::SetPlayerCoordinates(_) => "set_player_coordinates",
            ClientMessage::CoordinatesPlayers => "coordinates_players",
            ClientMessage::SetCurrentCoordinates(_) => "set_current_coordinates",
            ClientMessage::GetMyCoordinates => "get_my_coordinates",
        }
    }
}

impl Validate for ClientMessage {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            ClientMessage::Authentication(payload) => payload.validate(),
            ClientMessage::SetPlayerCoordinates(payload)
            | ClientMessage::SetCurrentCoordinates(payload) => payload.validate(),
            _ => Ok(()),
        }
    }
}

/// Payload of `authentication`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct AuthenticationPayload {
    /// User the client claims to be.
    pub users_id: Uuid,
    /// Bearer credential already validated at handshake.
    #[validate(length(min = 1))]
    pub access_token: String,
}

/// A user's position.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct CoordinatesPayload {
    /// User the position belongs to.
    pub users_id: Uuid,
    /// Latitude in degrees.
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    /// Longitude in degrees.
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

/// Events pushed to realtime clients.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthenticationSuccess,
    AuthenticationFailed,
    StatusOn(StatusPayload),
    StatusOff(StatusPayload),
    CommandStatusOn(CommandStatusPayload),
    SetViewCurrentQuest(QuestMarkView),
    LoadMediaInstructions,
    NotLoadMediaInstructions,
    ClearGamesMarks,
    GameOver,
    AddPlayerCoordinates(CoordinatesPayload),
    GetPlayerCoordinates,
    SetMyCoordinates(PositionView),
    TeamPlayerDisconnect(DisconnectPayload),
    /// A request from this session was refused.
    Rejected(RejectionPayload),
}

/// Role summary carried by `status_on` and `status_off`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StatusPayload {
    /// The caller is playing an open quest.
    pub player: bool,
    /// The caller judges an active game.
    pub judge: bool,
    /// 0 idle, 1 playing, 2 playing as the elected video-shooter.
    pub player_status: u8,
    /// Judge row when `judge` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_assignment: Option<JudgeAssignmentView>,
    /// Open quest when `player` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest: Option<QuestView>,
}

impl StatusPayload {
    /// Neither playing nor judging.
    pub fn idle() -> Self {
        Self {
            player: false,
            judge: false,
            player_status: 0,
            judge_assignment: None,
            quest: None,
        }
    }

    /// Judging `assignment`.
    pub fn judging(assignment: JudgeAssignmentView) -> Self {
        Self {
            judge: true,
            judge_assignment: Some(assignment),
            ..Self::idle()
        }
    }

    /// Playing `quest`.
    pub fn playing(shooter: bool, quest: QuestView) -> Self {
        Self {
            player: true,
            player_status: if shooter { 2 } else { 1 },
            quest: Some(quest),
            ..Self::idle()
        }
    }
}

/// Judge assignment shown to the judge.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JudgeAssignmentView {
    pub id: Uuid,
    pub users_id: Uuid,
    pub commands_id: Uuid,
    pub game_def_id: Uuid,
}

/// The open quest of the caller's team.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuestView {
    pub task: String,
    pub hint: String,
    /// One-based index of the quest within the game.
    pub number: u32,
    /// Open attempt identifier, the `game_id` of `add_result`.
    pub current_quest: Uuid,
    /// Current game row identifier.
    pub current_game_id: Uuid,
    pub visible: bool,
}

/// Payload of `command_status_on`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CommandStatusPayload {
    /// 0 no team, 1 member, 2 creator.
    pub status: u8,
    pub commands_id: Option<Uuid>,
}

/// Payload of `set_view_current_quest`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuestMarkView {
    pub lat: f64,
    pub lng: f64,
    /// Quest radius in metres.
    pub radius: f64,
}

/// Payload of `set_my_coordinates`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PositionView {
    pub lat: f64,
    pub lng: f64,
}

/// Payload of `team_player_disconnect`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisconnectPayload {
    pub users_id: Uuid,
}

/// Payload of `rejected`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RejectionPayload {
    /// Error kind such as `input_rejected` or `not_found`.
    pub kind: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_events_parse_without_data() {
        assert_eq!(
            ClientMessage::from_json_str(r#"{"event":"status"}"#).unwrap(),
            ClientMessage::Status
        );
        assert_eq!(
            serde_json::to_string(&ServerMessage::GameOver).unwrap(),
            r#"{"event":"game_over"}"#
        );
    }

    #[test]
    fn coordinates_out_of_range_are_rejected() {
        let text = r#"{"event":"set_current_coordinates","data":{"users_id":"2f1c7a52-1d6c-4f7b-9a43-0f4b7a9d6e11","lat":91.0,"lng":0.0}}"#;
        assert!(matches!(
            ClientMessage::from_json_str(text),
            Err(InboundError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_event_is_a_parse_error() {
        assert!(matches!(
            ClientMessage::from_json_str(r#"{"event":"teleport"}"#),
            Err(InboundError::Parse(_))
        ));
    }

    #[test]
    fn status_payload_omits_empty_sections() {
        let value = serde_json::to_value(ServerMessage::StatusOn(StatusPayload::idle())).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "event": "status_on",
                "data": {"player": false, "judge": false, "player_status": 0}
            })
        );
    }
}
