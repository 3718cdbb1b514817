use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Location of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Swagger UI at `/docs`, backed by the document served at [`OPENAPI_PATH`].
pub fn router(state: SharedState) -> Router<SharedState> {
    let swagger: Router<SharedState> = SwaggerUi::new("/docs")
        .url(OPENAPI_PATH, ApiDoc::openapi())
        .into();
    swagger.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_game_endpoints() {
        let doc = ApiDoc::openapi();
        for path in [
            "/ws",
            "/results",
            "/scores",
            "/teams",
            "/teams/{id}/members",
            "/teams/me/games",
            "/definitions",
            "/judging/{id}",
            "/admin/definitions",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = doc.components.as_ref().map(|c| &c.security_schemes);
        assert!(schemes.is_some_and(|s| s.contains_key("bearer")));
    }
}
