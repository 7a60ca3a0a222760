//! Connection manager: dial, engage handshake, retry policy.
//!
//! State machine:
//! `Disconnected -> Connecting -> Authenticating -> Connected -> (Disconnected | Failed)`
//!
//! Nothing is published until the hub has answered `proceed`, so a partially
//! authenticated stream never reaches the relay loops.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::watch;
use tokio_util::codec::{FramedRead, FramedWrite};

use prisclient_core::error::{ErrorKind, PrisError, Result};
use prisclient_core::protocol::auth::{compute_credential, random_id, unix_now};
use prisclient_core::protocol::query::{Action, CommandBlock, Query, QueryType, HUB_DESTINATION};

use crate::config::SessionConfig;
use crate::obs::{Observer, SessionEvent};
use crate::transport::codec::{Inbound, QueryCodec};
use crate::transport::dial::{BoxedStream, Dialer};

pub type QueryReader = FramedRead<ReadHalf<BoxedStream>, QueryCodec>;
pub type QueryWriter = FramedWrite<WriteHalf<BoxedStream>, QueryCodec>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
    /// Connection failed and auto retry is off; no further attempts.
    Failed,
}

/// An authenticated connection, ready to be published to the relay loops.
pub struct Link {
    pub reader: QueryReader,
    pub writer: QueryWriter,
    /// Identity confirmed or reassigned by the hub.
    pub source_id: String,
}

/// Read the next envelope, honoring the optional read timeout.
pub async fn next_inbound(reader: &mut QueryReader, timeout: Option<Duration>) -> Result<Inbound> {
    let next = match timeout {
        Some(d) => tokio::time::timeout(d, reader.next())
            .await
            .map_err(|_| PrisError::Timeout)?,
        None => reader.next().await,
    };
    next.unwrap_or(Err(PrisError::Disconnected))
}

pub struct ConnectionManager {
    cfg: SessionConfig,
    dialer: Arc<dyn Dialer>,
    observer: Arc<dyn Observer>,
    state: watch::Sender<ConnState>,
}

impl ConnectionManager {
    pub fn new(cfg: SessionConfig, dialer: Arc<dyn Dialer>, observer: Arc<dyn Observer>) -> Self {
        let (state, _) = watch::channel(ConnState::Disconnected);
        Self {
            cfg,
            dialer,
            observer,
            state,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.cfg
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ConnState {
        *self.state.borrow()
    }

    /// Publish a state transition (no-op if unchanged).
    pub fn set_state(&self, to: ConnState) {
        let from = self.state.send_replace(to);
        if from != to {
            self.observer.report(&SessionEvent::StateChanged { from, to });
        }
    }

    /// Dial and engage until it works, or until the first failure when auto
    /// retry is off. The caller marks `Connected` once it has published the link.
    pub async fn connect(&self) -> Result<Link> {
        loop {
            match self.connect_once().await {
                Ok(link) => return Ok(link),
                Err(e) => {
                    let reason = e.to_string();
                    match e.kind() {
                        ErrorKind::HandshakeRejected => {
                            self.observer.report(&SessionEvent::HandshakeFailed { reason })
                        }
                        _ => self.observer.report(&SessionEvent::TransportError { reason }),
                    }
                    self.set_state(ConnState::Disconnected);

                    if !self.should_retry(&e) {
                        self.set_state(ConnState::Failed);
                        return Err(e);
                    }
                    self.wait_retry().await;
                }
            }
        }
    }

    /// Retry only when the policy allows it and the failure is transient.
    pub fn should_retry(&self, err: &PrisError) -> bool {
        self.cfg.auto_retry && err.kind().is_retryable()
    }

    /// Fixed-delay pause before the next attempt.
    pub async fn wait_retry(&self) {
        let delay = self.cfg.retry_delay;
        self.observer.report(&SessionEvent::RetryScheduled { delay });
        tokio::time::sleep(delay).await;
    }

    /// One dial + engage round trip. Dropping the halves on error closes the socket.
    pub async fn connect_once(&self) -> Result<Link> {
        self.set_state(ConnState::Connecting);
        let addr = self.cfg.addr();
        let stream = self.dialer.dial(&addr).await?;
        tracing::debug!(%addr, "hub dialed");

        let (r, w) = tokio::io::split(stream);
        let mut reader = FramedRead::new(r, QueryCodec::new());
        let mut writer = FramedWrite::new(w, QueryCodec::new());

        self.set_state(ConnState::Authenticating);
        writer.send(self.engage_query(unix_now())?).await?;

        let ack = match next_inbound(&mut reader, self.cfg.read_timeout).await {
            Ok(Inbound::Query(q)) => q,
            Ok(Inbound::Malformed(reason)) | Err(PrisError::Decode(reason)) => {
                return Err(PrisError::HandshakeRejected(format!(
                    "undecodable reply: {reason}"
                )))
            }
            Err(e) => return Err(e),
        };

        let assigned = match (&ack.kind, &ack.command) {
            (QueryType::Command, Some(cmd)) if cmd.action == Some(Action::Proceed) => {
                cmd.data.clone()
            }
            _ => {
                return Err(PrisError::HandshakeRejected(format!(
                    "unexpected response from server: {ack:?}"
                )))
            }
        };

        let source_id = if assigned.is_empty() {
            self.cfg.source_id.clone()
        } else {
            assigned
        };

        self.observer.report(&SessionEvent::Engaged {
            source: source_id.clone(),
        });

        Ok(Link {
            reader,
            writer,
            source_id,
        })
    }

    /// Engage command for `timestamp`; an empty secret leaves `data` out.
    pub fn engage_query(&self, timestamp: i64) -> Result<Query> {
        let data = if self.cfg.secret.is_empty() {
            String::new()
        } else {
            compute_credential(&self.cfg.secret, &self.cfg.source_id, timestamp)?
        };

        let mut cmd = CommandBlock::new(Action::Engage)
            .with_kind(self.cfg.client_type.as_str())
            .with_data(data);
        cmd.id = random_id();
        cmd.time = timestamp;

        Ok(Query::command(self.cfg.source_id.clone(), cmd).to(HUB_DESTINATION))
    }
}
