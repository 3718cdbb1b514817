use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for GeoQuest Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::submissions::add_result,
        crate::routes::submissions::set_score,
        crate::routes::teams::create_team,
        crate::routes::teams::my_team,
        crate::routes::teams::team_games,
        crate::routes::teams::add_member,
        crate::routes::teams::leave_team,
        crate::routes::teams::register_team,
        crate::routes::judging::judge_info,
        crate::routes::judging::quest_media,
        crate::routes::catalog::open_definitions,
        crate::routes::catalog::create_definition,
        crate::routes::catalog::delete_definition,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::submission::AddResultRequest,
            crate::dto::submission::AddResultResponse,
            crate::dto::submission::SetScoreRequest,
            crate::dto::submission::SetScoreResponse,
            crate::dto::team::CreateTeamRequest,
            crate::dto::team::AddMemberRequest,
            crate::dto::team::RegisterTeamRequest,
            crate::dto::team::TeamView,
            crate::dto::team::TeamMemberView,
            crate::dto::team::LeaveTeamResponse,
            crate::dto::team::RegistrationView,
            crate::dto::team::CompletedGameView,
            crate::dto::judging::JudgeInfoResponse,
            crate::dto::judging::FinishedAttemptView,
            crate::dto::quest::QuestMediaResponse,
            crate::dto::catalog::CreateDefinitionRequest,
            crate::dto::catalog::QuestInput,
            crate::dto::catalog::MarkInput,
            crate::dto::catalog::DefinitionCreatedResponse,
            crate::dto::catalog::OpenDefinitionView,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "realtime", description = "WebSocket session for players and judges"),
        (name = "submissions", description = "Media answers and judge scores"),
        (name = "teams", description = "Team membership and registration"),
        (name = "judging", description = "Judge and quest read models"),
        (name = "catalog", description = "Game definition listing and import"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}
