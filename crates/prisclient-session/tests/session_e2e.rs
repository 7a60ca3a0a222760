//! End-to-end relay tests against a mock hub on loopback TCP.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

use prisclient_core::protocol::query::{Action, CommandBlock, MessageBlock, Query, QueryType};
use prisclient_session::config::SessionConfig;
use prisclient_session::obs::{Direction, SessionEvent};
use prisclient_session::transport::ConnState;
use prisclient_session::Session;

use mock_hub::Recorder;

const WAIT: Duration = Duration::from_secs(5);

async fn listener() -> (TcpListener, u16) {
    let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = l.local_addr().unwrap().port();
    (l, port)
}

async fn wait_state(session: &Session, want: ConnState) {
    let mut rx = session.state();
    timeout(WAIT, rx.wait_for(|s| *s == want))
        .await
        .expect("state wait timed out")
        .unwrap();
}

async fn wait_event(recorder: &Recorder, pred: impl Fn(&SessionEvent) -> bool) {
    timeout(WAIT, async {
        while recorder.count(&pred) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("event wait timed out");
}

#[tokio::test]
async fn relays_round_trip_then_disengages_on_hub_close() {
    let (l, port) = listener().await;
    let hub = tokio::spawn(async move {
        let (sock, _) = l.accept().await.unwrap();
        let mut conn = mock_hub::engage(sock, "s3cret", "echo-1").await;
        let q = mock_hub::recv(&mut conn).await.unwrap();
        conn.send(q).await.unwrap();
        // dropping `conn` closes the socket
    });

    let cfg = SessionConfig::new("127.0.0.1", port, "responder", "echo", "s3cret", false).unwrap();
    let recorder = Arc::new(Recorder::default());
    let session = Session::new(cfg, recorder.clone()).unwrap();

    let (out_tx, out_rx) = mpsc::channel(8);
    let (in_tx, mut in_rx) = mpsc::channel(8);
    let runner = {
        let s = session.clone();
        tokio::spawn(async move { s.run(out_rx, in_tx).await })
    };

    wait_state(&session, ConnState::Connected).await;
    assert_eq!(session.source_id(), "echo-1");

    out_tx
        .send(Query::message("", MessageBlock::new("lobby", "ping")))
        .await
        .unwrap();

    let echoed = timeout(WAIT, in_rx.recv()).await.unwrap().unwrap();
    assert_eq!(echoed.kind, QueryType::Message);
    assert_eq!(echoed.source, "echo-1");
    let m = echoed.message.unwrap();
    assert_eq!(m.room, "lobby");
    assert_eq!(m.message, "ping");

    let notice = timeout(WAIT, in_rx.recv()).await.unwrap().unwrap();
    assert!(notice.is_disengage());
    assert_eq!(notice.source, "pris");

    // exactly one notice, then the read loop is gone
    assert!(timeout(WAIT, in_rx.recv()).await.unwrap().is_none());

    drop(out_tx);
    timeout(WAIT, runner).await.unwrap().unwrap().unwrap();
    hub.await.unwrap();

    assert_eq!(*session.state().borrow(), ConnState::Disconnected);
    assert_eq!(recorder.count(|e| *e == SessionEvent::Disconnected), 1);
    assert_eq!(
        recorder.count(|e| *e == SessionEvent::Relayed { direction: Direction::Outbound }),
        1
    );
}

#[tokio::test]
async fn invalid_inbound_is_dropped_and_session_continues() {
    let (l, port) = listener().await;
    let hub = tokio::spawn(async move {
        let (sock, _) = l.accept().await.unwrap();
        let mut conn = mock_hub::engage(sock, "", "resp").await;
        conn.send(Query::message("hub", MessageBlock::new("", "no room")))
            .await
            .unwrap();
        conn.send(Query::command("hub", CommandBlock::new(Action::UserRequest).with_kind("bogus")))
            .await
            .unwrap();
        // unknown action: well-formed JSON, wrong schema
        conn.get_mut()
            .write_all(br#"{"type":"command","command":{"action":"explode"}}"#)
            .await
            .unwrap();
        let email = CommandBlock::new(Action::UserRequest)
            .with_kind("email")
            .with_data("a@x.io");
        conn.send(Query::command("hub", email)).await.unwrap();
    });

    let cfg = SessionConfig::new("127.0.0.1", port, "responder", "resp", "", false).unwrap();
    let recorder = Arc::new(Recorder::default());
    let session = Session::new(cfg, recorder.clone()).unwrap();

    let (_out_tx, out_rx) = mpsc::channel(8);
    let (in_tx, mut in_rx) = mpsc::channel(8);
    let s = session.clone();
    tokio::spawn(async move { s.run(out_rx, in_tx).await });

    let q = timeout(WAIT, in_rx.recv()).await.unwrap().unwrap();
    let cmd = q.command.unwrap();
    assert_eq!(cmd.action, Some(Action::UserRequest));
    assert_eq!(cmd.data, "a@x.io");
    assert_eq!(cmd.id.len(), 16, "missing id is minted on the way in");

    let notice = timeout(WAIT, in_rx.recv()).await.unwrap().unwrap();
    assert!(notice.is_disengage());
    hub.await.unwrap();

    let rejected = recorder.count(|e| {
        matches!(e, SessionEvent::Rejected { direction: Direction::Inbound, .. })
    });
    assert_eq!(rejected, 3);
    assert!(recorder.count(|e| matches!(e, SessionEvent::IdAssigned { .. })) >= 1);
}

#[tokio::test]
async fn outbound_invalid_or_unconnected_is_dropped() {
    // Accept the TCP connection but never answer the engage, so the session
    // sits in Authenticating with no published writer.
    let (l, port) = listener().await;
    let hub = tokio::spawn(async move {
        let (sock, _) = l.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(sock);
    });

    let cfg = SessionConfig::new("127.0.0.1", port, "adapter", "slack", "k", false).unwrap();
    let recorder = Arc::new(Recorder::default());
    let session = Session::new(cfg, recorder.clone()).unwrap();

    let (out_tx, out_rx) = mpsc::channel(8);
    let (in_tx, _in_rx) = mpsc::channel(8);
    let s = session.clone();
    let runner = tokio::spawn(async move { s.run(out_rx, in_tx).await });

    wait_state(&session, ConnState::Authenticating).await;

    out_tx
        .send(Query::message("slack", MessageBlock::new("", "no room")))
        .await
        .unwrap();
    wait_event(&recorder, |e| {
        matches!(e, SessionEvent::Rejected { direction: Direction::Outbound, .. })
    })
    .await;

    out_tx
        .send(Query::message("slack", MessageBlock::new("lobby", "hi")))
        .await
        .unwrap();
    wait_event(&recorder, |e| *e == SessionEvent::DroppedNotConnected).await;

    assert_eq!(
        recorder.count(|e| matches!(e, SessionEvent::Relayed { .. })),
        0
    );

    runner.abort();
    hub.abort();
}

#[tokio::test]
async fn dial_failure_without_retry_is_fatal() {
    let (l, port) = listener().await;
    drop(l);

    let cfg = SessionConfig::new("127.0.0.1", port, "adapter", "slack", "k", false).unwrap();
    let recorder = Arc::new(Recorder::default());
    let session = Session::new(cfg, recorder.clone()).unwrap();

    let (_out_tx, out_rx) = mpsc::channel(8);
    let (in_tx, mut in_rx) = mpsc::channel(8);
    let err = timeout(WAIT, session.run(out_rx, in_tx))
        .await
        .unwrap()
        .expect_err("connect must fail");

    assert_eq!(err.kind().as_str(), "TRANSPORT");
    assert_eq!(*session.state().borrow(), ConnState::Failed);
    assert_eq!(recorder.count(|e| matches!(e, SessionEvent::Fatal { .. })), 1);
    assert_eq!(recorder.count(|e| matches!(e, SessionEvent::RetryScheduled { .. })), 0);
    // no disengage notice for a session that never started
    assert!(in_rx.recv().await.is_none());
}

#[tokio::test]
async fn handshake_rejection_without_retry_is_fatal() {
    let (l, port) = listener().await;
    let hub = tokio::spawn(async move {
        let (sock, _) = l.accept().await.unwrap();
        let _conn = mock_hub::engage_with(sock, "k", Query::disengage_notice()).await;
    });

    let cfg = SessionConfig::new("127.0.0.1", port, "adapter", "slack", "k", false).unwrap();
    let recorder = Arc::new(Recorder::default());
    let session = Session::new(cfg, recorder.clone()).unwrap();

    let (_out_tx, out_rx) = mpsc::channel(8);
    let (in_tx, _in_rx) = mpsc::channel(8);
    let err = timeout(WAIT, session.run(out_rx, in_tx))
        .await
        .unwrap()
        .expect_err("handshake must fail");
    hub.await.unwrap();

    assert_eq!(err.kind().as_str(), "HANDSHAKE_REJECTED");
    assert_eq!(recorder.count(|e| matches!(e, SessionEvent::HandshakeFailed { .. })), 1);
}

#[tokio::test]
async fn silent_hub_hits_read_timeout() {
    let (l, port) = listener().await;
    let hub = tokio::spawn(async move {
        let (sock, _) = l.accept().await.unwrap();
        let conn = mock_hub::engage(sock, "k", "echo").await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(conn);
    });

    let cfg = SessionConfig::new("127.0.0.1", port, "responder", "echo", "k", false)
        .unwrap()
        .with_read_timeout(Some(Duration::from_millis(200)));
    let recorder = Arc::new(Recorder::default());
    let session = Session::new(cfg, recorder.clone()).unwrap();

    let (_out_tx, out_rx) = mpsc::channel(8);
    let (in_tx, mut in_rx) = mpsc::channel(8);
    let s = session.clone();
    tokio::spawn(async move { s.run(out_rx, in_tx).await });

    let notice = timeout(WAIT, in_rx.recv()).await.unwrap().unwrap();
    assert!(notice.is_disengage());
    assert_eq!(
        recorder.count(|e| {
            matches!(e, SessionEvent::TransportError { reason } if reason.contains("timed out"))
        }),
        1
    );
    hub.abort();
}
