//! pris-client: pipe JSON envelopes between stdio and the hub.
//!
//! - stdin: one `Query` JSON object per line, sent outbound
//! - stdout: every inbound `Query` as one JSON line
//! - exits after the disengage notice, or non-zero on a fatal connection failure

use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use prisclient_core::protocol::query::Query;
use prisclient_session::obs::{MeteredObserver, SessionMetrics, TracingObserver};
use prisclient_session::{config, Session};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "prisclient.yaml".to_string());
    let cfg = match config::load_from_file(&path) {
        Ok(c) => c.session_config(),
        Err(e) => {
            tracing::error!(%path, error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };

    let metrics = Arc::new(SessionMetrics::default());
    let observer = Arc::new(MeteredObserver::new(Arc::new(TracingObserver), Arc::clone(&metrics)));
    let capacity = cfg.channel_capacity;
    let session = match Session::new(cfg, observer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid session config");
            return ExitCode::FAILURE;
        }
    };

    let (out_tx, out_rx) = mpsc::channel::<Query>(capacity);
    let (in_tx, mut in_rx) = mpsc::channel::<Query>(capacity);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Query>(&line) {
                Ok(q) => {
                    if out_tx.send(q).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "stdin line is not a query"),
            }
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(q) = in_rx.recv().await {
            match serde_json::to_string(&q) {
                Ok(s) => println!("{s}"),
                Err(e) => tracing::warn!(error = %e, "inbound query encode failed"),
            }
            if q.is_disengage() {
                break;
            }
        }
    });

    let code = tokio::select! {
        res = session.run(out_rx, in_tx) => match res {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, code = e.kind().as_str(), "session failed");
                ExitCode::FAILURE
            }
        },
        _ = printer => ExitCode::SUCCESS,
    };

    tracing::debug!(metrics = %metrics.render(), "session metrics");
    code
}
