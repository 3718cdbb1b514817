//! End-to-end game flows driven through the service layer with the in-memory store and an
//! explicit clock.

use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use axum::extract::ws::Message;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use geoquest_back::{
    capability::Capabilities,
    config::AppConfig,
    dao::{
        models::{FixJudgeEntity, GameFinishedEntity},
        quest_store::{MemoryQuestStore, QuestStore},
    },
    dto::{
        catalog::{CreateDefinitionRequest, MarkInput, QuestInput},
        submission::{AddResultRequest, SetScoreRequest},
        team::{AddMemberRequest, CreateTeamRequest, RegisterTeamRequest},
        ws::{ClientMessage, CoordinatesPayload, ServerMessage},
    },
    error::ServiceError,
    identity::{Identity, StaticIdentityOracle},
    services::{
        catalog_service, current_game, judge_assignment, judging_service,
        progression::{self, Outcome},
        session_service, submission_service, team_service, websocket_service,
    },
    state::{AppState, SessionId, SharedState},
};

/// 2026-05-01T10:00:00Z
fn t0() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_777_629_600)
}

fn at(offset_secs: i64) -> SystemTime {
    if offset_secs >= 0 {
        t0() + Duration::from_secs(offset_secs as u64)
    } else {
        t0() - Duration::from_secs(offset_secs.unsigned_abs())
    }
}

fn player() -> Identity {
    Identity {
        user_id: Uuid::new_v4(),
        capabilities: Capabilities::PLAYER,
    }
}

struct Client {
    identity: Identity,
    session: SessionId,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Client {
    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            if let Message::Text(text) = message {
                out.push(serde_json::from_str(text.as_str()).unwrap());
            }
        }
        out
    }
}

struct World {
    state: SharedState,
    store: Arc<dyn QuestStore>,
}

impl World {
    async fn new() -> Self {
        Self::with_config(AppConfig {
            rng_seed: Some(42),
            ..AppConfig::default()
        })
        .await
    }

    async fn with_config(config: AppConfig) -> Self {
        let store: Arc<dyn QuestStore> = Arc::new(MemoryQuestStore::new());
        let state = AppState::with_store(
            config,
            Arc::new(StaticIdentityOracle::default()),
            store.clone(),
        )
        .await;
        Self { state, store }
    }

    async fn send(&self, client: &Client, message: ClientMessage, now: SystemTime) {
        session_service::handle_event(&self.state, client.session, message, now)
            .await
            .unwrap();
    }

    /// Open a session for `identity` and authenticate it.
    async fn connect(&self, identity: Identity, now: SystemTime) -> Client {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = self.state.sessions().connect(tx, identity);
        let mut client = Client {
            identity,
            session,
            rx,
        };
        self.send(
            &client,
            ClientMessage::Authentication(
                serde_json::from_value(json!({
                    "users_id": identity.user_id,
                    "access_token": "token",
                }))
                .unwrap(),
            ),
            now,
        )
        .await;
        assert_eq!(client.drain(), vec![ServerMessage::AuthenticationSuccess]);
        client
    }

    async fn define(&self, quests: Vec<QuestInput>) -> Uuid {
        self.define_for(4, quests).await
    }

    async fn define_for(&self, max_teams: u32, quests: Vec<QuestInput>) -> Uuid {
        let staff = Identity {
            user_id: Uuid::new_v4(),
            capabilities: Capabilities::MODERATOR,
        };
        catalog_service::create_definition(
            &self.state,
            &staff,
            CreateDefinitionRequest {
                name: "Old town".into(),
                max_teams,
                date_begin: "2026-05-01T10:00:00Z".into(),
                date_end: "2026-05-01T11:00:00Z".into(),
                min_score: 0,
                kind: "city".into(),
                rating: 0,
                location: "Moscow".into(),
                quests,
            },
        )
        .await
        .unwrap()
        .id
    }

    /// Team of `members` founded by the first one, registered for `game_def_id` before it opens.
    async fn team(&self, name: &str, members: &[&Client], game_def_id: Uuid) -> Uuid {
        let creator = &members[0].identity;
        let team = team_service::create_team(
            &self.state,
            creator,
            CreateTeamRequest { name: name.into() },
            at(-3600),
        )
        .await
        .unwrap();
        for (i, member) in members.iter().enumerate().skip(1) {
            team_service::add_member(
                &self.state,
                creator,
                team.id,
                AddMemberRequest {
                    user_id: member.identity.user_id,
                },
                at(-3600 + i as i64),
            )
            .await
            .unwrap();
        }
        team_service::register_team(
            &self.state,
            creator,
            RegisterTeamRequest { game_def_id },
            at(-1800),
        )
        .await
        .unwrap();
        team.id
    }

    async fn progress(&self, now: SystemTime) -> Outcome {
        let steps = progression::run_tick(&self.state, now).await.unwrap();
        assert_eq!(steps.len(), 1);
        steps.into_iter().next().unwrap().outcome.unwrap()
    }

    async fn move_to(&self, client: &Client, lat: f64, lng: f64, now: SystemTime) {
        self.send(
            client,
            ClientMessage::SetCurrentCoordinates(CoordinatesPayload {
                users_id: client.identity.user_id,
                lat,
                lng,
            }),
            now,
        )
        .await;
    }
}

fn quest(task: &str, lat: f64, lng: f64, radius_m: f64) -> QuestInput {
    QuestInput {
        task: task.into(),
        hint: "look around".into(),
        media_ref: format!("{task}.mp4"),
        radius_m,
        mark: MarkInput {
            lat,
            lng,
            location: String::new(),
        },
    }
}

fn shooter_of(members: &[&Client], user_id: Uuid) -> Identity {
    members
        .iter()
        .map(|client| client.identity)
        .find(|identity| identity.user_id == user_id)
        .unwrap()
}

/// Three players on one team, an outside player, a definition and an activated game with
/// its judge.
struct Match {
    world: World,
    members: Vec<Client>,
    outsider: Client,
    team_id: Uuid,
    game_def_id: Uuid,
    fix_judge_id: Uuid,
}

async fn start_match(quests: Vec<QuestInput>) -> Match {
    let world = World::new().await;
    let mut members = Vec::new();
    for _ in 0..3 {
        members.push(world.connect(player(), at(-7200)).await);
    }
    let outsider = world.connect(player(), at(-7200)).await;
    let game_def_id = world.define(quests).await;
    let refs: Vec<&Client> = members.iter().collect();
    let team_id = world.team("Foxes", &refs, game_def_id).await;

    let activated = current_game::run_tick(&world.state, t0()).await.unwrap();
    assert_eq!(activated.len(), 1);
    assert_eq!(activated[0].team_id, team_id);

    let judges = judge_assignment::run_tick(&world.state, t0()).await.unwrap();
    assert_eq!(judges.len(), 1);
    assert_eq!(judges[0].user_id, outsider.identity.user_id);

    Match {
        fix_judge_id: judges[0].id,
        world,
        members,
        outsider,
        team_id,
        game_def_id,
    }
}

/// Queue the next quest, walk the first member onto it and return `(attempt, shooter)`.
async fn reveal_next(m: &mut Match, now: SystemTime, lat: f64, lng: f64) -> (Uuid, Uuid) {
    let Outcome::QuestQueued { attempt_id } = m.world.progress(now).await else {
        panic!("expected a queued quest");
    };
    for member in &m.members {
        m.world.send(member, ClientMessage::Status, now).await;
    }
    for member in &mut m.members {
        member.drain();
    }

    m.world.move_to(&m.members[0], lat, lng, now).await;
    let Outcome::QuestRevealed {
        attempt_id: revealed,
        shooter: Some(shooter),
    } = m.world.progress(now + Duration::from_secs(1)).await
    else {
        panic!("expected the quest to be revealed");
    };
    assert_eq!(revealed, attempt_id);
    (attempt_id, shooter)
}

#[tokio::test]
async fn single_quest_game_is_played_judged_and_completed() {
    let mut m = start_match(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;

    let Outcome::QuestQueued { attempt_id } = m.world.progress(at(5)).await else {
        panic!("expected a queued quest");
    };
    m.world.send(&m.members[0], ClientMessage::Status, at(5)).await;
    let events = m.members[0].drain();
    let ServerMessage::StatusOn(status) = &events[0] else {
        panic!("expected status_on, got {events:?}");
    };
    assert_eq!(status.player_status, 1);
    let view = status.quest.as_ref().unwrap();
    assert_eq!(view.current_quest, attempt_id);
    assert_eq!(view.number, 1);
    assert!(!view.visible);
    assert!(events.contains(&ServerMessage::NotLoadMediaInstructions));

    for member in &m.members[1..] {
        m.world.send(member, ClientMessage::Status, at(5)).await;
    }
    for member in &mut m.members {
        member.drain();
    }

    m.world.move_to(&m.members[0], 55.7501, 37.6201, at(10)).await;
    let Outcome::QuestRevealed {
        shooter: Some(shooter),
        ..
    } = m.world.progress(at(10)).await
    else {
        panic!("expected the quest to be revealed");
    };
    let refs: Vec<&Client> = m.members.iter().collect();
    let shooter = shooter_of(&refs, shooter);
    for member in &mut m.members {
        let events = member.drain();
        assert!(events.contains(&ServerMessage::LoadMediaInstructions));
        assert!(matches!(events[0], ServerMessage::SetViewCurrentQuest(_)));
    }
    assert!(m.world.store.find_attempt(attempt_id).await.unwrap().unwrap().visible);

    let submitted = submission_service::add_result(
        &m.world.state,
        &shooter,
        AddResultRequest {
            game_id: attempt_id,
            media_ref: "blob://x".into(),
        },
        at(20),
    )
    .await
    .unwrap();
    assert!(m.world.store.find_video_shooter(attempt_id).await.unwrap().is_none());

    let info = judging_service::judge_info(&m.world.state, &m.outsider.identity, m.fix_judge_id)
        .await
        .unwrap();
    assert_eq!(info.attempts.len(), 1);
    assert_eq!(info.attempts[0].score, None);

    submission_service::set_score(
        &m.world.state,
        &m.outsider.identity,
        SetScoreRequest {
            game_finished_id: submitted.game_finished_id,
            judge_fix_id: m.fix_judge_id,
            score: 5,
        },
    )
    .await
    .unwrap();

    assert_eq!(m.world.progress(at(30)).await, Outcome::Completed { score: 5 });
    let complete = m
        .world
        .store
        .find_complete_game(m.team_id, m.game_def_id)
        .await
        .unwrap()
        .unwrap();
    assert!(complete.completed);
    assert_eq!(complete.score, 5);
    assert!(
        m.world
            .store
            .find_current_game_for_team(m.team_id)
            .await
            .unwrap()
            .is_none()
    );
    for member in &mut m.members {
        assert_eq!(member.drain(), vec![ServerMessage::GameOver]);
    }
}

#[tokio::test]
async fn deadline_closes_a_partially_scored_game() {
    let mut m = start_match(vec![
        quest("fountain", 55.75, 37.62, 50.0),
        quest("bridge", 55.76, 37.63, 50.0),
    ])
    .await;

    let (attempt, shooter) = reveal_next(&mut m, at(5), 55.75, 37.62).await;
    let refs: Vec<&Client> = m.members.iter().collect();
    let shooter = shooter_of(&refs, shooter);
    let submitted = submission_service::add_result(
        &m.world.state,
        &shooter,
        AddResultRequest {
            game_id: attempt,
            media_ref: "blob://first".into(),
        },
        at(60),
    )
    .await
    .unwrap();
    submission_service::set_score(
        &m.world.state,
        &m.outsider.identity,
        SetScoreRequest {
            game_finished_id: submitted.game_finished_id,
            judge_fix_id: m.fix_judge_id,
            score: 3,
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        m.world.progress(at(120)).await,
        Outcome::QuestQueued { .. }
    ));
    assert_eq!(m.world.progress(at(120)).await, Outcome::Waiting);

    assert_eq!(m.world.progress(at(3600)).await, Outcome::Expired { score: 3 });
    let complete = m
        .world
        .store
        .find_complete_game(m.team_id, m.game_def_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!complete.completed);
    assert_eq!(complete.score, 3);
    assert!(
        m.world
            .store
            .find_current_game_for_team(m.team_id)
            .await
            .unwrap()
            .is_none()
    );
    for member in &mut m.members {
        assert!(member.drain().contains(&ServerMessage::GameOver));
    }
}

#[tokio::test]
async fn touching_circles_do_not_reveal_the_quest() {
    let mut config = AppConfig {
        rng_seed: Some(7),
        ..AppConfig::default()
    };
    config.game.degree_divisor = 1.0;
    config.game.player_radius_m = 3.0;
    let world = World::with_config(config).await;

    let mut members = Vec::new();
    for _ in 0..3 {
        members.push(world.connect(player(), at(-7200)).await);
    }
    let game_def_id = world.define(vec![quest("pier", 0.0, 0.0, 2.0)]).await;
    let refs: Vec<&Client> = members.iter().collect();
    world.team("Otters", &refs, game_def_id).await;
    current_game::run_tick(&world.state, t0()).await.unwrap();

    let Outcome::QuestQueued { attempt_id } = world.progress(at(1)).await else {
        panic!("expected a queued quest");
    };

    // Distance 5 equals the sum of the radii.
    world.move_to(&members[0], 3.0, 4.0, at(2)).await;
    assert_eq!(world.progress(at(3)).await, Outcome::Waiting);
    assert!(!world.store.find_attempt(attempt_id).await.unwrap().unwrap().visible);
    assert!(world.store.find_video_shooter(attempt_id).await.unwrap().is_none());

    world.move_to(&members[0], 3.0, 3.9, at(4)).await;
    assert!(matches!(
        world.progress(at(5)).await,
        Outcome::QuestRevealed { .. }
    ));
    assert!(world.store.find_attempt(attempt_id).await.unwrap().unwrap().visible);
}

#[tokio::test]
async fn lone_team_waits_for_an_outside_judge() {
    let world = World::new().await;
    let mut members = Vec::new();
    for _ in 0..3 {
        members.push(world.connect(player(), at(-7200)).await);
    }
    let game_def_id = world.define(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    let refs: Vec<&Client> = members.iter().collect();
    let team_id = world.team("Foxes", &refs, game_def_id).await;
    current_game::run_tick(&world.state, t0()).await.unwrap();

    assert!(
        judge_assignment::run_tick(&world.state, t0())
            .await
            .unwrap()
            .is_empty()
    );
    assert!(world.store.list_fix_judges().await.unwrap().is_empty());

    let outsider = world.connect(player(), at(10)).await;
    let judges = judge_assignment::run_tick(&world.state, at(11)).await.unwrap();
    assert_eq!(judges.len(), 1);
    assert_eq!(judges[0].user_id, outsider.identity.user_id);
    assert_eq!(judges[0].team_id, team_id);

    // A second pass keeps the existing assignment.
    assert!(
        judge_assignment::run_tick(&world.state, at(12))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn leadership_passes_to_the_oldest_member_and_lapses_when_empty() {
    let world = World::new().await;
    let mut members = Vec::new();
    for _ in 0..3 {
        members.push(world.connect(player(), at(-7200)).await);
    }
    let game_def_id = world.define(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    let refs: Vec<&Client> = members.iter().collect();
    let team_id = world.team("Foxes", &refs, game_def_id).await;
    let (u1, u2, u3) = (
        members[0].identity,
        members[1].identity,
        members[2].identity,
    );

    let left = team_service::leave_team(&world.state, &u1).await.unwrap();
    assert_eq!(left.team_id, team_id);
    assert_eq!(left.creator_user_id, Some(u2.user_id));

    let err = team_service::add_member(
        &world.state,
        &u3,
        team_id,
        AddMemberRequest {
            user_id: u1.user_id,
        },
        at(-100),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    team_service::leave_team(&world.state, &u2).await.unwrap();
    let left = team_service::leave_team(&world.state, &u3).await.unwrap();
    assert_eq!(left.creator_user_id, None);

    let err = team_service::add_member(
        &world.state,
        &u2,
        team_id,
        AddMemberRequest {
            user_id: u1.user_id,
        },
        at(-50),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn repeated_media_submission_is_not_found() {
    let mut m = start_match(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    let (attempt, shooter) = reveal_next(&mut m, at(5), 55.75, 37.62).await;
    let refs: Vec<&Client> = m.members.iter().collect();
    let shooter = shooter_of(&refs, shooter);
    let bystander = m
        .members
        .iter()
        .map(|client| client.identity)
        .find(|identity| identity.user_id != shooter.user_id)
        .unwrap();

    let request = |media: &str| AddResultRequest {
        game_id: attempt,
        media_ref: media.into(),
    };

    let err = submission_service::add_result(&m.world.state, &bystander, request("blob://y"), at(30))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    submission_service::add_result(&m.world.state, &shooter, request("blob://x"), at(31))
        .await
        .unwrap();
    let err = submission_service::add_result(&m.world.state, &shooter, request("blob://x"), at(31))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let finished = m.world.store.list_finished(vec![attempt]).await.unwrap();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].media_ref, "blob://x");
}

#[tokio::test]
async fn score_is_accepted_once_from_the_assigned_judge() {
    let mut m = start_match(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    let (attempt, shooter) = reveal_next(&mut m, at(5), 55.75, 37.62).await;
    let refs: Vec<&Client> = m.members.iter().collect();
    let shooter = shooter_of(&refs, shooter);
    let submitted = submission_service::add_result(
        &m.world.state,
        &shooter,
        AddResultRequest {
            game_id: attempt,
            media_ref: "blob://x".into(),
        },
        at(30),
    )
    .await
    .unwrap();
    let request = SetScoreRequest {
        game_finished_id: submitted.game_finished_id,
        judge_fix_id: m.fix_judge_id,
        score: 4,
    };

    let err = submission_service::set_score(&m.world.state, &shooter, request.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    submission_service::set_score(&m.world.state, &m.outsider.identity, request.clone())
        .await
        .unwrap();
    let err = submission_service::set_score(&m.world.state, &m.outsider.identity, request)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn empty_quest_order_completes_with_zero_score() {
    let world = World::new().await;
    let mut members = Vec::new();
    for _ in 0..3 {
        members.push(world.connect(player(), at(-7200)).await);
    }
    let game_def_id = world.define(Vec::new()).await;
    let refs: Vec<&Client> = members.iter().collect();
    let team_id = world.team("Empties", &refs, game_def_id).await;
    current_game::run_tick(&world.state, t0()).await.unwrap();

    assert_eq!(world.progress(at(1)).await, Outcome::Completed { score: 0 });
    let complete = world
        .store
        .find_complete_game(team_id, game_def_id)
        .await
        .unwrap()
        .unwrap();
    assert!(complete.completed);
    assert_eq!(complete.score, 0);

    // The finished registration is not activated again.
    assert!(current_game::run_tick(&world.state, at(2)).await.unwrap().is_empty());
}

#[tokio::test]
async fn progression_is_idempotent_without_external_change() {
    let mut m = start_match(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    reveal_next(&mut m, at(5), 55.75, 37.62).await;

    let registration = m
        .world
        .store
        .find_registration(m.team_id, m.game_def_id)
        .await
        .unwrap()
        .unwrap();
    let attempts = m
        .world
        .store
        .list_attempts(m.team_id, registration.id)
        .await
        .unwrap();
    assert_eq!(m.world.progress(at(40)).await, Outcome::Waiting);
    assert_eq!(m.world.progress(at(41)).await, Outcome::Waiting);
    assert_eq!(
        m.world
            .store
            .list_attempts(m.team_id, registration.id)
            .await
            .unwrap(),
        attempts
    );
}

#[tokio::test]
async fn coordinates_are_relayed_to_teammates_only() {
    let mut m = start_match(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    m.world.progress(at(5)).await;
    for member in &m.members {
        m.world.send(member, ClientMessage::Status, at(5)).await;
    }
    for client in m.members.iter_mut().chain(std::iter::once(&mut m.outsider)) {
        client.drain();
    }

    let position = CoordinatesPayload {
        users_id: m.members[0].identity.user_id,
        lat: 55.7,
        lng: 37.6,
    };
    m.world
        .send(
            &m.members[0],
            ClientMessage::SetPlayerCoordinates(position.clone()),
            at(6),
        )
        .await;

    assert!(m.members[0].drain().is_empty());
    for member in &mut m.members[1..] {
        assert_eq!(
            member.drain(),
            vec![ServerMessage::AddPlayerCoordinates(position.clone())]
        );
    }
    assert!(m.outsider.drain().is_empty());
}

#[tokio::test]
async fn malformed_and_foreign_frames_are_rejected() {
    let world = World::new().await;
    let mut client = world.connect(player(), at(0)).await;

    websocket_service::handle_text(&world.state, client.session, "{\"event\": \"dance\"}").await;
    let events = client.drain();
    let [ServerMessage::Rejected(rejection)] = events.as_slice() else {
        panic!("expected a rejection, got {events:?}");
    };
    assert_eq!(rejection.kind, "input_rejected");

    let frame = json!({
        "event": "set_current_coordinates",
        "data": { "users_id": Uuid::new_v4(), "lat": 1.0, "lng": 2.0 }
    });
    websocket_service::handle_text(&world.state, client.session, &frame.to_string()).await;
    let events = client.drain();
    let [ServerMessage::Rejected(rejection)] = events.as_slice() else {
        panic!("expected a rejection, got {events:?}");
    };
    assert_eq!(rejection.kind, "not_authorised");
    assert!(
        world
            .store
            .find_coord(client.identity.user_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn disconnect_notifies_the_team() {
    let world = World::new().await;
    let mut members = Vec::new();
    for _ in 0..3 {
        members.push(world.connect(player(), at(-7200)).await);
    }
    let game_def_id = world.define(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    let refs: Vec<&Client> = members.iter().collect();
    world.team("Foxes", &refs, game_def_id).await;

    // Reconnecting puts the sessions into the team room.
    let mut reconnected = Vec::new();
    for member in &members {
        reconnected.push(world.connect(member.identity, at(-600)).await);
    }
    for member in members {
        session_service::disconnect(&world.state, member.session).await;
    }
    for client in &mut reconnected {
        client.drain();
    }

    let gone = reconnected.remove(0);
    session_service::disconnect(&world.state, gone.session).await;
    for client in &mut reconnected {
        assert_eq!(
            client.drain(),
            vec![ServerMessage::TeamPlayerDisconnect(
                geoquest_back::dto::ws::DisconnectPayload {
                    users_id: gone.identity.user_id,
                }
            )]
        );
    }
    assert!(!world.state.sessions().is_user_connected(gone.identity.user_id));
}

#[tokio::test]
async fn command_status_reports_membership() {
    let world = World::new().await;
    let mut members = Vec::new();
    for _ in 0..3 {
        members.push(world.connect(player(), at(-7200)).await);
    }
    let mut loner = world.connect(player(), at(-7200)).await;
    let game_def_id = world.define(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    let refs: Vec<&Client> = members.iter().collect();
    let team_id = world.team("Foxes", &refs, game_def_id).await;

    let mut statuses = Vec::new();
    for client in members.iter_mut().chain(std::iter::once(&mut loner)) {
        world.send(client, ClientMessage::CommandStatus, at(0)).await;
        let events = client.drain();
        let [ServerMessage::CommandStatusOn(payload)] = events.as_slice() else {
            panic!("expected command_status_on, got {events:?}");
        };
        statuses.push((payload.status, payload.commands_id));
    }
    assert_eq!(
        statuses,
        vec![
            (2, Some(team_id)),
            (1, Some(team_id)),
            (1, Some(team_id)),
            (0, None),
        ]
    );
}

#[tokio::test]
async fn leaving_the_team_stops_room_broadcasts() {
    let world = World::new().await;
    let mut members = Vec::new();
    for _ in 0..3 {
        members.push(world.connect(player(), at(-7200)).await);
    }
    let game_def_id = world.define(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    let refs: Vec<&Client> = members.iter().collect();
    let team_id = world.team("Foxes", &refs, game_def_id).await;

    let mut reconnected = Vec::new();
    for member in &members {
        reconnected.push(world.connect(member.identity, at(-600)).await);
    }
    for member in members {
        session_service::disconnect(&world.state, member.session).await;
    }
    for client in &mut reconnected {
        client.drain();
        assert_eq!(world.state.sessions().room_of(client.session), Some(team_id));
    }

    let ex = reconnected[2].identity;
    team_service::leave_team(&world.state, &ex).await.unwrap();
    world.send(&reconnected[2], ClientMessage::Status, at(-500)).await;
    assert_eq!(
        reconnected[2].drain(),
        vec![
            ServerMessage::StatusOn(geoquest_back::dto::ws::StatusPayload::idle()),
            ServerMessage::ClearGamesMarks,
        ]
    );
    assert_eq!(world.state.sessions().room_of(reconnected[2].session), None);

    let position = CoordinatesPayload {
        users_id: reconnected[0].identity.user_id,
        lat: 55.7,
        lng: 37.6,
    };
    world
        .send(
            &reconnected[0],
            ClientMessage::SetPlayerCoordinates(position.clone()),
            at(-400),
        )
        .await;

    assert!(reconnected[2].drain().is_empty());
    assert_eq!(
        reconnected[1].drain(),
        vec![ServerMessage::AddPlayerCoordinates(position)]
    );
    assert_eq!(world.state.sessions().room_of(reconnected[0].session), Some(team_id));
}

#[tokio::test]
async fn disconnected_member_on_the_mark_does_not_reveal() {
    let mut m = start_match(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    let Outcome::QuestQueued { attempt_id } = m.world.progress(at(5)).await else {
        panic!("expected a queued quest");
    };

    m.world.move_to(&m.members[0], 55.75, 37.62, at(6)).await;
    let walker = m.members.remove(0);
    session_service::disconnect(&m.world.state, walker.session).await;

    assert_eq!(m.world.progress(at(7)).await, Outcome::Waiting);
    assert!(!m.world.store.find_attempt(attempt_id).await.unwrap().unwrap().visible);
    assert!(m.world.store.find_video_shooter(attempt_id).await.unwrap().is_none());

    // Back online at the same spot.
    let _walker = m.world.connect(walker.identity, at(8)).await;
    let Outcome::QuestRevealed {
        attempt_id: revealed,
        shooter: Some(_),
    } = m.world.progress(at(9)).await
    else {
        panic!("expected the quest to be revealed");
    };
    assert_eq!(revealed, attempt_id);
}

#[tokio::test]
async fn judges_of_the_game_are_neither_triggers_nor_shooters() {
    let m = start_match(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    for member in &m.members[1..] {
        m.world
            .store
            .create_fix_judge(FixJudgeEntity {
                id: Uuid::new_v4(),
                user_id: member.identity.user_id,
                team_id: Uuid::new_v4(),
                game_def_id: m.game_def_id,
                created_at: t0(),
            })
            .await
            .unwrap();
    }
    let Outcome::QuestQueued { attempt_id } = m.world.progress(at(5)).await else {
        panic!("expected a queued quest");
    };

    m.world.move_to(&m.members[1], 55.75, 37.62, at(6)).await;
    m.world.move_to(&m.members[2], 55.75, 37.62, at(6)).await;
    assert_eq!(m.world.progress(at(7)).await, Outcome::Waiting);
    assert!(!m.world.store.find_attempt(attempt_id).await.unwrap().unwrap().visible);

    m.world.move_to(&m.members[0], 55.7501, 37.6201, at(8)).await;
    let Outcome::QuestRevealed {
        shooter: Some(shooter),
        ..
    } = m.world.progress(at(9)).await
    else {
        panic!("expected the quest to be revealed");
    };
    assert_eq!(shooter, m.members[0].identity.user_id);
    let elected = m.world.store.find_video_shooter(attempt_id).await.unwrap().unwrap();
    let player = m.world.store.find_player(shooter).await.unwrap().unwrap();
    assert_eq!(elected.player_data_id, player.id);
}

#[tokio::test]
async fn reconnect_restores_the_revealed_quest() {
    let mut m = start_match(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    let (attempt, shooter) = reveal_next(&mut m, at(5), 55.75, 37.62).await;

    let dropped = m.members.remove(1);
    session_service::disconnect(&m.world.state, dropped.session).await;
    for member in &mut m.members {
        member.drain();
    }

    let mut back = m.world.connect(dropped.identity, at(20)).await;
    m.world.send(&back, ClientMessage::Status, at(21)).await;
    let events = back.drain();
    let ServerMessage::StatusOn(status) = &events[0] else {
        panic!("expected status_on, got {events:?}");
    };
    let expected_status = if shooter == dropped.identity.user_id { 2 } else { 1 };
    assert_eq!(status.player_status, expected_status);
    let view = status.quest.as_ref().unwrap();
    assert_eq!(view.current_quest, attempt);
    assert!(view.visible);
    assert!(events.iter().any(|event| matches!(
        event,
        ServerMessage::SetViewCurrentQuest(mark) if mark.lat == 55.75 && mark.lng == 37.62
    )));
    assert!(events.contains(&ServerMessage::LoadMediaInstructions));
    assert!(!events.contains(&ServerMessage::NotLoadMediaInstructions));
}

#[tokio::test]
async fn media_losing_a_concurrent_insert_is_not_found() {
    let mut m = start_match(vec![quest("fountain", 55.75, 37.62, 50.0)]).await;
    let (attempt, shooter) = reveal_next(&mut m, at(5), 55.75, 37.62).await;
    let refs: Vec<&Client> = m.members.iter().collect();
    let shooter = shooter_of(&refs, shooter);

    // The other submission inserted its result but has not removed the shooter yet.
    m.world
        .store
        .create_finished(GameFinishedEntity {
            id: Uuid::new_v4(),
            game_id: attempt,
            media_ref: "blob://first".into(),
            finished_at: at(30),
        })
        .await
        .unwrap();

    let err = submission_service::add_result(
        &m.world.state,
        &shooter,
        AddResultRequest {
            game_id: attempt,
            media_ref: "blob://second".into(),
        },
        at(30),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let finished = m.world.store.list_finished(vec![attempt]).await.unwrap();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].media_ref, "blob://first");
}

#[tokio::test]
async fn finished_games_are_listed_for_the_team() {
    let world = World::new().await;
    let mut members = Vec::new();
    for _ in 0..3 {
        members.push(world.connect(player(), at(-7200)).await);
    }
    let loner = world.connect(player(), at(-7200)).await;
    let game_def_id = world.define(Vec::new()).await;
    let refs: Vec<&Client> = members.iter().collect();
    world.team("Empties", &refs, game_def_id).await;

    let games = team_service::team_games(&world.state, &members[1].identity)
        .await
        .unwrap();
    assert!(games.is_empty());

    current_game::run_tick(&world.state, t0()).await.unwrap();
    assert_eq!(world.progress(at(1)).await, Outcome::Completed { score: 0 });

    let games = team_service::team_games(&world.state, &members[1].identity)
        .await
        .unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].game_def_id, game_def_id);
    assert_eq!(games[0].name, "Old town");
    assert!(games[0].completed);
    assert_eq!(games[0].score, 0);
    assert_eq!(games[0].quest_count, 0);

    let err = team_service::team_games(&world.state, &loner.identity)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn open_definitions_hide_started_and_full_games() {
    let world = World::new().await;
    let mut members = Vec::new();
    for _ in 0..3 {
        members.push(world.connect(player(), at(-7200)).await);
    }
    let roomy = world
        .define_for(
            4,
            vec![
                quest("fountain", 55.75, 37.62, 50.0),
                quest("bridge", 55.76, 37.63, 50.0),
            ],
        )
        .await;
    let single = world.define_for(1, Vec::new()).await;

    let open = catalog_service::open_definitions(&world.state, at(-3600))
        .await
        .unwrap();
    assert_eq!(open.len(), 2);

    let refs: Vec<&Client> = members.iter().collect();
    world.team("Foxes", &refs, single).await;

    let open = catalog_service::open_definitions(&world.state, at(-1800))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, roomy);
    assert_eq!(open[0].quest_count, 2);
    assert_eq!(open[0].registered_teams, 0);
    assert_eq!(open[0].date_begin, "2026-05-01T10:00:00Z");

    // A full game refuses further registrations.
    let mut others = Vec::new();
    for _ in 0..3 {
        others.push(world.connect(player(), at(-7200)).await);
    }
    let creator = others[0].identity;
    let team = team_service::create_team(
        &world.state,
        &creator,
        CreateTeamRequest {
            name: "Owls".into(),
        },
        at(-3000),
    )
    .await
    .unwrap();
    for other in &others[1..] {
        team_service::add_member(
            &world.state,
            &creator,
            team.id,
            AddMemberRequest {
                user_id: other.identity.user_id,
            },
            at(-3000),
        )
        .await
        .unwrap();
    }
    let err = team_service::register_team(
        &world.state,
        &creator,
        RegisterTeamRequest {
            game_def_id: single,
        },
        at(-1700),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));

    assert!(
        catalog_service::open_definitions(&world.state, at(1))
            .await
            .unwrap()
            .is_empty()
    );
}
