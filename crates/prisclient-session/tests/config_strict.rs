#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use prisclient_core::protocol::query::ClientType;
use prisclient_session::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
hub:
  host: "127.0.0.1"
  port: 4517
client:
  type: responder
  source_id: "echo"
  auto_rety: true # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn invalid_client_type_is_config_error() {
    let bad = r#"
version: 1
hub: { host: "127.0.0.1", port: 4517 }
client: { type: observer, source_id: "echo" }
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
hub:
  host: "127.0.0.1"
  port: 4517
client:
  type: adapter
  source_id: "slack"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);

    let s = cfg.session_config();
    assert_eq!(s.client_type, ClientType::Adapter);
    assert_eq!(s.addr(), "127.0.0.1:4517");
    assert!(s.secret.is_empty());
    assert!(!s.auto_retry);
    assert_eq!(s.retry_delay, Duration::from_secs(5));
    assert!(s.read_timeout.is_none());
}

#[test]
fn session_section_knobs() {
    let ok = r#"
version: 1
hub: { host: "hub.local", port: 4517 }
client: { type: responder, source_id: "echo", secret: "k", auto_retry: true }
session:
  retry_delay_ms: 250
  read_timeout_ms: 30000
  channel_capacity: 8
"#;
    let s = config::load_from_str(ok).unwrap().session_config();
    assert!(s.auto_retry);
    assert_eq!(s.retry_delay, Duration::from_millis(250));
    assert_eq!(s.read_timeout, Some(Duration::from_secs(30)));
    assert_eq!(s.channel_capacity, 8);
}

#[test]
fn rejects_bad_values() {
    for bad in [
        "version: 2\nhub: { host: h, port: 1 }\nclient: { type: adapter, source_id: a }\n",
        "version: 1\nhub: { host: '', port: 1 }\nclient: { type: adapter, source_id: a }\n",
        "version: 1\nhub: { host: h, port: 0 }\nclient: { type: adapter, source_id: a }\n",
        "version: 1\nhub: { host: h, port: 1 }\nclient: { type: adapter, source_id: '' }\n",
        "version: 1\nhub: { host: h, port: 1 }\nclient: { type: adapter, source_id: a }\n\
         session: { retry_delay_ms: 0 }\n",
        "version: 1\nhub: { host: h, port: 1 }\nclient: { type: adapter, source_id: a }\n\
         session: { channel_capacity: 0 }\n",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert_eq!(err.kind().as_str(), "CONFIG", "config={bad}");
    }
}
