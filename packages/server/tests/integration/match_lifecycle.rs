use uuid::Uuid;

use server::entity::matches::MatchStatus;
use server::error::AppError;
use server::gateway::ClientEvent;
use server::models::matchmaking::{
    AcceptMatchRequest, MatchChatRequest, RejectMatchRequest, SubmitMatchRequest,
};

use crate::common::{uuid_field, FailingMatchStore, TestApp, TestPlayer};

fn accept(match_id: Uuid) -> ClientEvent {
    ClientEvent::AcceptMatch(AcceptMatchRequest { match_id })
}

fn reject(match_id: Uuid) -> ClientEvent {
    ClientEvent::RejectMatch(RejectMatchRequest { match_id })
}

fn submit(match_id: Uuid, source_code: &str) -> ClientEvent {
    ClientEvent::SubmitMatch(SubmitMatchRequest {
        match_id,
        language_id: 71,
        source_code: source_code.to_string(),
    })
}

fn chat(match_id: Uuid, message: &str) -> ClientEvent {
    ClientEvent::SendMessageMatch(MatchChatRequest {
        match_id,
        message: message.to_string(),
    })
}

/// ada (1500) and brett (1450), paired into a Pending match.
async fn paired(app: &TestApp) -> (TestPlayer, TestPlayer, Uuid) {
    let mut p1 = app.connect_player("ada", 1500).await;
    let mut p2 = app.connect_player("brett", 1450).await;
    app.dispatch(&p1, ClientEvent::FindMatch).await.unwrap();
    app.dispatch(&p2, ClientEvent::FindMatch).await.unwrap();
    let data = p1.expect("found_competitor").await;
    let match_id = uuid_field(&data, "matchId");
    p2.expect("found_competitor").await;
    (p1, p2, match_id)
}

/// Same pair, with both accepts in and the match Ongoing.
async fn started(app: &TestApp) -> (TestPlayer, TestPlayer, Uuid) {
    let (mut p1, mut p2, match_id) = paired(app).await;
    app.dispatch(&p1, accept(match_id)).await.unwrap();
    app.dispatch(&p2, accept(match_id)).await.unwrap();
    p1.expect("start_match").await;
    p2.expect("start_match").await;
    (p1, p2, match_id)
}

#[tokio::test]
async fn second_accept_starts_the_match() {
    let app = TestApp::spawn().await;
    let (mut p1, mut p2, match_id) = paired(&app).await;

    app.dispatch(&p1, accept(match_id)).await.unwrap();
    p1.assert_not_queued("start_match");

    app.dispatch(&p2, accept(match_id)).await.unwrap();
    let data = p1.expect("start_match").await;
    assert_eq!(uuid_field(&data, "matchId"), match_id);
    assert_eq!(uuid_field(&data, "roomId"), match_id);
    assert!(data["deadline"].is_string());
    p2.expect("start_match").await;

    let doc = app.match_doc(match_id).await.expect("match stored");
    assert_eq!(doc.status, MatchStatus::Ongoing);
    assert_eq!(doc.player1, Some(p1.user_id));
    assert_eq!(doc.player2, Some(p2.user_id));
    assert!(doc.started_at.is_some());
}

#[tokio::test]
async fn reject_tears_the_pairing_down() {
    let app = TestApp::spawn().await;
    let (p1, mut p2, match_id) = paired(&app).await;

    app.dispatch(&p2, reject(match_id)).await.unwrap();
    let data = p2.expect("reject_match").await;
    assert_eq!(uuid_field(&data, "userId"), p2.user_id);

    assert!(app.match_doc(match_id).await.is_none());
    let err = app.dispatch(&p1, accept(match_id)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn accepting_twice_conflicts() {
    let app = TestApp::spawn().await;
    let (p1, _p2, match_id) = paired(&app).await;

    app.dispatch(&p1, accept(match_id)).await.unwrap();
    let err = app.dispatch(&p1, accept(match_id)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn reject_after_start_conflicts() {
    let app = TestApp::spawn().await;
    let (p1, _p2, match_id) = started(&app).await;

    let err = app.dispatch(&p1, reject(match_id)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn submitting_before_start_conflicts() {
    let app = TestApp::spawn().await;
    let (p1, _p2, match_id) = paired(&app).await;

    let err = app
        .dispatch(&p1, submit(match_id, "print(1)"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn first_submission_notifies_only_the_opponent() {
    let app = TestApp::spawn().await;
    let (mut p1, mut p2, match_id) = started(&app).await;

    app.dispatch(&p1, submit(match_id, "print(1)")).await.unwrap();

    let data = p1.expect("submission_success").await;
    assert_eq!(data["submission"]["grade"], 3);
    p1.assert_not_queued("competitor_submission");

    let data = p2.expect("competitor_submission").await;
    assert_eq!(data["username"], "ada");
    assert_eq!(uuid_field(&data, "matchId"), match_id);
}

#[tokio::test]
async fn second_submission_settles_and_moves_the_stake() {
    let app = TestApp::spawn().await;
    let (mut p1, mut p2, match_id) = started(&app).await;

    app.dispatch(&p1, submit(match_id, "print(1)")).await.unwrap();
    app.dispatch(&p2, submit(match_id, "// WRONG")).await.unwrap();

    let data = p1.expect("finish_match").await;
    assert_eq!(uuid_field(&data, "winner"), p1.user_id);
    assert_eq!(data["results"].as_array().unwrap().len(), 2);
    p2.expect("finish_match").await;

    let doc = app.match_doc(match_id).await.expect("match stored");
    assert_eq!(doc.status, MatchStatus::Completed);
    assert_eq!(doc.winner, Some(p1.user_id));
    assert!(doc.ended_at.is_some());

    assert_eq!(app.rating_of(p1.user_id).await, 1525);
    assert_eq!(app.rating_of(p2.user_id).await, 1425);

    // The session is gone once settled.
    let err = app
        .dispatch(&p1, submit(match_id, "print(1)"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn draw_leaves_ratings_untouched() {
    let app = TestApp::spawn().await;
    let (mut p1, mut p2, match_id) = started(&app).await;

    app.dispatch(&p1, submit(match_id, "// WRONG")).await.unwrap();
    app.dispatch(&p2, submit(match_id, "// WRONG")).await.unwrap();

    let data = p1.expect("finish_match").await;
    assert!(data["winner"].is_null());
    p2.expect("finish_match").await;

    let doc = app.match_doc(match_id).await.expect("match stored");
    assert_eq!(doc.winner, None);
    assert_eq!(app.rating_of(p1.user_id).await, 1500);
    assert_eq!(app.rating_of(p2.user_id).await, 1450);
}

#[tokio::test(start_paused = true)]
async fn deadline_completes_the_match_without_a_winner() {
    let app = TestApp::builder()
        .config(|c| c.matchmaking.match_duration_secs = 1)
        .spawn()
        .await;
    let (mut p1, mut p2, match_id) = started(&app).await;

    let data = p1.expect("match_ended").await;
    assert_eq!(data["reason"], "timeout");
    p2.expect("match_ended").await;

    let doc = app.match_doc(match_id).await.expect("match stored");
    assert_eq!(doc.status, MatchStatus::Completed);
    assert_eq!(doc.winner, None);
    assert_eq!(app.rating_of(p1.user_id).await, 1500);

    let err = app
        .dispatch(&p1, submit(match_id, "print(1)"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn deadline_during_judging_discards_the_late_result() {
    let app = TestApp::builder()
        .config(|c| c.matchmaking.match_duration_secs = 1)
        .spawn()
        .await;
    let (mut p1, _p2, match_id) = started(&app).await;

    // The judge stalls past the deadline; the timeout settles the match
    // while this submission is still in flight.
    let task = app.dispatch_task(&p1, submit(match_id, "// SLEEP"));
    let data = p1.expect("match_ended").await;
    assert_eq!(data["reason"], "timeout");

    let result = task.await.unwrap();
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let doc = app.match_doc(match_id).await.expect("match stored");
    assert_eq!(doc.status, MatchStatus::Completed);
    assert_eq!(doc.winner, None);
    assert_eq!(doc.player1_submission, None);
}

#[tokio::test]
async fn chat_reaches_only_the_opponent() {
    let app = TestApp::spawn().await;
    let (mut p1, mut p2, match_id) = paired(&app).await;

    app.dispatch(&p1, chat(match_id, "good luck")).await.unwrap();

    let data = p2.expect("receive_message_match").await;
    assert_eq!(data["username"], "ada");
    assert_eq!(data["message"], "good luck");
    p1.assert_not_queued("receive_message_match");
}

#[tokio::test]
async fn chat_after_teardown_is_rejected() {
    let app = TestApp::spawn().await;
    let (p1, p2, match_id) = paired(&app).await;

    app.dispatch(&p2, reject(match_id)).await.unwrap();
    let err = app
        .dispatch(&p1, chat(match_id, "anyone there?"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn resubmitting_before_settlement_conflicts() {
    let app = TestApp::spawn().await;
    let (mut p1, mut p2, match_id) = started(&app).await;

    app.dispatch(&p1, submit(match_id, "print(3)")).await.unwrap();
    p1.expect("submission_success").await;

    let err = app
        .dispatch(&p1, submit(match_id, "print(3) # again"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(p2.queued("competitor_submission"), 1);
}

#[tokio::test(start_paused = true)]
async fn submission_in_flight_serializes_a_resubmit() {
    let app = TestApp::spawn().await;
    let (p1, mut p2, match_id) = started(&app).await;

    let first = app.dispatch_task(&p1, submit(match_id, "SLEEP"));
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    // The second attempt waits for the in-flight grading, then hits the
    // filled submission slot.
    let err = app
        .dispatch(&p1, submit(match_id, "print(3)"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    first.await.unwrap().unwrap();

    let doc = app.match_doc(match_id).await.expect("match stored");
    assert!(doc.player1_submission.is_some());
    assert_eq!(p2.queued("competitor_submission"), 1);
}

#[tokio::test]
async fn flush_failure_rolls_the_submission_back() {
    let builder = TestApp::builder();
    let failing = FailingMatchStore::new(builder.store());
    let app = builder.matches_store(failing.clone()).spawn().await;
    let (mut p1, mut p2, match_id) = started(&app).await;

    failing.fail_on_update(1);
    let err = app
        .dispatch(&p1, submit(match_id, "print(3)"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    let doc = app.match_doc(match_id).await.expect("match stored");
    assert_eq!(doc.status, MatchStatus::Ongoing);
    assert!(doc.player1_submission.is_none());
    p2.assert_not_queued("competitor_submission");

    app.dispatch(&p1, submit(match_id, "print(3)")).await.unwrap();
    p1.expect("submission_success").await;
    p2.expect("competitor_submission").await;
}
