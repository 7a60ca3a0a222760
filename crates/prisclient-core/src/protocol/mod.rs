//! Protocol modules (envelope model, handshake credential, validation).
//!
//! The hub speaks a stream of JSON `Query` objects over plain TCP:
//! - `query`: the envelope schema (superset of every observed field, all optional).
//! - `auth`: the engage credential and correlation id minting.
//! - `validate`: the predicate gating every envelope in both directions.
//!
//! Unknown `type`/`action` variants fail at decode time, so the validator only
//! ever sees closed enums.

pub mod auth;
pub mod query;
pub mod validate;
