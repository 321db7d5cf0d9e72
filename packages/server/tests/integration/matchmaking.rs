use server::entity::matches::MatchStatus;
use server::gateway::ClientEvent;

use crate::common::{uuid_field, TestApp};

#[tokio::test]
async fn pairs_players_within_rating_gap() {
    let app = TestApp::spawn().await;
    let mut ada = app.connect_player("ada", 1500).await;
    let mut brett = app.connect_player("brett", 1450).await;

    app.dispatch(&ada, ClientEvent::FindMatch).await.unwrap();
    assert_eq!(app.state.matchmaker.waiting_count().await, 1);

    app.dispatch(&brett, ClientEvent::FindMatch).await.unwrap();
    assert_eq!(app.state.matchmaker.waiting_count().await, 0);

    let data = ada.expect("found_competitor").await;
    let match_id = uuid_field(&data, "matchId");
    assert_eq!(uuid_field(&data, "roomId"), match_id);
    brett.expect("found_competitor").await;

    let doc = app.match_doc(match_id).await.expect("match stored");
    assert_eq!(doc.status, MatchStatus::Pending);
    assert!(doc.player1.is_none());
    assert!(doc.player2.is_none());
}

#[tokio::test]
async fn players_outside_rating_gap_keep_waiting() {
    let app = TestApp::spawn().await;
    let mut low = app.connect_player("ada", 100).await;
    let mut high = app.connect_player("brett", 2500).await;

    app.dispatch(&low, ClientEvent::FindMatch).await.unwrap();
    app.dispatch(&high, ClientEvent::FindMatch).await.unwrap();

    assert_eq!(app.state.matchmaker.waiting_count().await, 2);
    low.assert_not_queued("found_competitor");
    high.assert_not_queued("found_competitor");
}

#[tokio::test]
async fn first_compatible_waiter_wins_the_pairing() {
    let app = TestApp::spawn().await;
    let mut low = app.connect_player("ada", 100).await;
    let mut high = app.connect_player("brett", 2500).await;
    let mut mid = app.connect_player("caleb", 1600).await;

    app.dispatch(&low, ClientEvent::FindMatch).await.unwrap();
    app.dispatch(&high, ClientEvent::FindMatch).await.unwrap();
    assert_eq!(app.state.matchmaker.waiting_count().await, 2);

    // caleb is compatible with both; ada queued first and gets the match.
    app.dispatch(&mid, ClientEvent::FindMatch).await.unwrap();
    low.expect("found_competitor").await;
    mid.expect("found_competitor").await;
    high.assert_not_queued("found_competitor");
    assert_eq!(app.state.matchmaker.waiting_count().await, 1);
}

#[tokio::test]
async fn re_enqueue_replaces_the_stale_entry() {
    let app = TestApp::spawn().await;
    let ada = app.connect_player("ada", 1500).await;

    app.dispatch(&ada, ClientEvent::FindMatch).await.unwrap();
    app.dispatch(&ada, ClientEvent::FindMatch).await.unwrap();

    assert_eq!(app.state.matchmaker.waiting_count().await, 1);
}

#[tokio::test]
async fn leave_waiting_empties_the_pool() {
    let app = TestApp::spawn().await;
    let ada = app.connect_player("ada", 1500).await;

    app.dispatch(&ada, ClientEvent::FindMatch).await.unwrap();
    assert_eq!(app.state.matchmaker.waiting_count().await, 1);

    app.dispatch(&ada, ClientEvent::LeaveWaiting).await.unwrap();
    assert_eq!(app.state.matchmaker.waiting_count().await, 0);
}

#[tokio::test]
async fn pairing_without_an_open_problem_keeps_both_waiting() {
    let app = TestApp::builder().no_seed().spawn().await;
    let mut ada = app.connect_player("ada", 1500).await;
    let mut brett = app.connect_player("brett", 1450).await;

    app.dispatch(&ada, ClientEvent::FindMatch).await.unwrap();
    app.dispatch(&brett, ClientEvent::FindMatch).await.unwrap();

    assert_eq!(app.state.matchmaker.waiting_count().await, 2);
    ada.assert_not_queued("found_competitor");
    brett.assert_not_queued("found_competitor");
}

#[tokio::test]
async fn unrated_player_pairs_at_rating_zero() {
    let app = TestApp::spawn().await;
    let mut guest = app.connect_guest("guest01");
    let mut dana = app.connect_player("dana", 1500).await;

    app.dispatch(&guest, ClientEvent::FindMatch).await.unwrap();
    app.dispatch(&dana, ClientEvent::FindMatch).await.unwrap();

    guest.expect("found_competitor").await;
    dana.expect("found_competitor").await;
    assert_eq!(app.state.matchmaker.waiting_count().await, 0);
}

#[tokio::test]
async fn concurrent_enqueues_pair_exactly_once() {
    let app = TestApp::spawn().await;
    let mut ada = app.connect_player("ada", 1500).await;
    let mut brett = app.connect_player("brett", 1450).await;
    let mut caleb = app.connect_player("caleb", 1600).await;

    let (a, b, c) = tokio::join!(
        app.dispatch(&ada, ClientEvent::FindMatch),
        app.dispatch(&brett, ClientEvent::FindMatch),
        app.dispatch(&caleb, ClientEvent::FindMatch),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    // Whatever the interleaving, exactly one pair forms and one player keeps
    // waiting; nobody is matched twice.
    let paired = ada.queued("found_competitor")
        + brett.queued("found_competitor")
        + caleb.queued("found_competitor");
    assert_eq!(paired, 2);
    assert_eq!(app.state.matchmaker.waiting_count().await, 1);
}
