use std::sync::Arc;

use futures_util::SinkExt;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use prisclient_core::error::{PrisError, Result};
use prisclient_core::protocol::query::Query;
use prisclient_core::protocol::validate::{validate_inbound, validate_outbound};

use crate::config::SessionConfig;
use crate::obs::{Direction, Observer, SessionEvent};
use crate::transport::codec::Inbound;
use crate::transport::conn::{
    next_inbound, ConnState, ConnectionManager, QueryReader, QueryWriter,
};
use crate::transport::dial::{Dialer, TcpDialer};

/// A long-lived, reconnecting conversation with the hub.
///
/// `run` spawns the read loop (dial + engage, then decode -> validate ->
/// forward) and drives the write loop (validate -> hand off to the link
/// writer) in the caller's task.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

struct Shared {
    manager: ConnectionManager,
    observer: Arc<dyn Observer>,
    /// Live link writer; replaced on every reconnect, `None` while down.
    /// Never held across socket I/O.
    link: Mutex<Option<LinkWriter>>,
    /// Identity assigned by the hub on the latest engage.
    source: watch::Sender<String>,
}

/// Per-link writer task that owns the socket's write half.
struct LinkWriter {
    tx: mpsc::Sender<Query>,
    task: JoinHandle<()>,
}

impl LinkWriter {
    fn spawn(mut writer: QueryWriter, capacity: usize, observer: Arc<dyn Observer>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Query>(capacity);
        let task = tokio::spawn(async move {
            while let Some(q) = rx.recv().await {
                if let Err(e) = writer.send(q).await {
                    observer.report(&SessionEvent::TransportError {
                        reason: e.to_string(),
                    });
                    // The read loop notices the broken stream and reconnects.
                    return;
                }
                observer.report(&SessionEvent::Relayed {
                    direction: Direction::Outbound,
                });
            }
        });
        Self { tx, task }
    }
}

impl Drop for LinkWriter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Aborts the read loop if `run` is dropped before it finishes.
struct ReadTask(JoinHandle<Result<()>>);

impl Drop for ReadTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Session {
    pub fn new(cfg: SessionConfig, observer: Arc<dyn Observer>) -> Result<Self> {
        Self::with_dialer(cfg, Arc::new(TcpDialer), observer)
    }

    pub fn with_dialer(
        cfg: SessionConfig,
        dialer: Arc<dyn Dialer>,
        observer: Arc<dyn Observer>,
    ) -> Result<Self> {
        cfg.validate()?;
        let (source, _) = watch::channel(cfg.source_id.clone());
        let manager = ConnectionManager::new(cfg, dialer, Arc::clone(&observer));
        Ok(Self {
            shared: Arc::new(Shared {
                manager,
                observer,
                link: Mutex::new(None),
                source,
            }),
        })
    }

    pub fn state(&self) -> watch::Receiver<ConnState> {
        self.shared.manager.subscribe()
    }

    pub fn source_id(&self) -> String {
        self.shared.source.borrow().clone()
    }

    /// Relay envelopes until the session ends.
    ///
    /// Returns `Err` only when the connection failed with auto retry off, in
    /// which case the process is expected to stop. Once the hub disconnects
    /// for good, `inbound` receives one disengage notice and later outbound
    /// envelopes are dropped; `run` then returns when `outbound` is closed.
    pub async fn run(
        &self,
        mut outbound: mpsc::Receiver<Query>,
        inbound: mpsc::Sender<Query>,
    ) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let mut reader = ReadTask(tokio::spawn(async move { shared.read_loop(inbound).await }));
        let mut read_done = false;

        loop {
            tokio::select! {
                res = &mut reader.0, if !read_done => {
                    read_done = true;
                    read_result(res)?;
                }
                maybe = outbound.recv() => {
                    match maybe {
                        Some(q) => self.shared.send(q).await,
                        None => break,
                    }
                }
            }
        }

        if !read_done {
            read_result((&mut reader.0).await)?;
        }
        Ok(())
    }
}

fn read_result(res: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match res {
        Ok(r) => r,
        Err(e) => Err(PrisError::Internal(format!("read loop aborted: {e}"))),
    }
}

fn missing_id(q: &Query) -> bool {
    q.command.as_ref().is_some_and(|c| c.id.is_empty())
}

impl Shared {
    /// Write side: validate, stamp identity, queue on the current link.
    async fn send(&self, mut q: Query) {
        let minted = missing_id(&q);
        if let Err(e) = validate_outbound(&mut q) {
            self.observer.report(&SessionEvent::Rejected {
                direction: Direction::Outbound,
                reason: e.to_string(),
            });
            return;
        }
        self.report_minted(minted, &q);

        let tx = self.link.lock().await.as_ref().map(|l| l.tx.clone());
        let Some(tx) = tx else {
            self.observer.report(&SessionEvent::DroppedNotConnected);
            return;
        };

        if q.source.is_empty() {
            q.source = self.source.borrow().clone();
        }

        // Fails once teardown has retired the link, even if it was full.
        if tx.send(q).await.is_err() {
            self.observer.report(&SessionEvent::DroppedNotConnected);
        }
    }

    async fn read_loop(self: Arc<Self>, inbound: mpsc::Sender<Query>) -> Result<()> {
        let mut reader = match self.establish().await {
            Ok(r) => r,
            Err(e) => {
                self.observer.report(&SessionEvent::Fatal {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };
        let read_timeout = self.manager.config().read_timeout;

        loop {
            match next_inbound(&mut reader, read_timeout).await {
                Ok(Inbound::Query(mut q)) => {
                    let minted = missing_id(&q);
                    match validate_inbound(&mut q) {
                        Ok(()) => {
                            self.report_minted(minted, &q);
                            self.observer.report(&SessionEvent::Relayed {
                                direction: Direction::Inbound,
                            });
                            if inbound.send(q).await.is_err() {
                                tracing::debug!("inbound receiver dropped, closing session");
                                self.teardown().await;
                                return Ok(());
                            }
                        }
                        Err(e) => self.observer.report(&SessionEvent::Rejected {
                            direction: Direction::Inbound,
                            reason: e.to_string(),
                        }),
                    }
                }
                Ok(Inbound::Malformed(reason)) => {
                    self.observer.report(&SessionEvent::Rejected {
                        direction: Direction::Inbound,
                        reason,
                    })
                }
                Err(e) => {
                    if e.kind() == prisclient_core::ErrorKind::CleanDisconnect {
                        self.observer.report(&SessionEvent::Disconnected);
                    } else {
                        self.observer.report(&SessionEvent::TransportError {
                            reason: e.to_string(),
                        });
                    }
                    self.teardown().await;

                    if !self.manager.should_retry(&e) {
                        let _ = inbound.send(Query::disengage_notice()).await;
                        return Ok(());
                    }

                    self.manager.wait_retry().await;
                    reader = self.establish().await?;
                }
            }
        }
    }

    /// Connect per policy, then publish the new link writer and identity.
    async fn establish(&self) -> Result<QueryReader> {
        let link = self.manager.connect().await?;
        let writer = LinkWriter::spawn(
            link.writer,
            self.manager.config().channel_capacity,
            Arc::clone(&self.observer),
        );
        *self.link.lock().await = Some(writer);
        self.source.send_replace(link.source_id);
        self.manager.set_state(ConnState::Connected);
        Ok(link.reader)
    }

    /// Retire the current link; dropping it aborts a writer stuck on a full socket.
    async fn teardown(&self) {
        let retired = self.link.lock().await.take();
        drop(retired);
        self.manager.set_state(ConnState::Disconnected);
    }

    fn report_minted(&self, minted: bool, q: &Query) {
        if let (true, Some(cmd)) = (minted, q.command.as_ref()) {
            self.observer.report(&SessionEvent::IdAssigned { id: cmd.id.clone() });
        }
    }
}
