/// Game definition import and removal.
pub mod catalog_service;
/// Current-game activation loop.
pub mod current_game;
/// OpenAPI documentation generation.
pub mod documentation;
/// Scheduling of the background loops.
pub mod game_loops;
/// Health check service.
pub mod health_service;
/// Judge-assignment loop.
pub mod judge_assignment;
/// Judge and quest read models.
pub mod judging_service;
/// Per-team progress snapshot.
pub mod progress;
/// Progression loop.
pub mod progression;
/// Realtime event publishing.
pub mod realtime;
/// Realtime session event handlers.
pub mod session_service;
/// Storage connection supervisor.
pub mod storage_supervisor;
/// Media and score submissions.
pub mod submission_service;
/// Team management.
pub mod team_service;
/// WebSocket connection lifecycle.
pub mod websocket_service;
