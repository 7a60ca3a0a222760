//! Envelope validation (symmetric for inbound and outbound traffic).
//!
//! The only side effect is minting a correlation id for a command that lacks
//! one. Rejection is reported as `PrisError::Rejected` and never tears the
//! connection down.

use crate::error::{PrisError, Result};
use crate::protocol::auth::random_id;
use crate::protocol::query::{Action, CommandBlock, Query, QueryType};

const USER_REQUEST_KINDS: &[&str] = &["user", "mention", "email", "id"];
const ROOM_REQUEST_KINDS: &[&str] = &["name", "id"];
const INFO_KINDS: &[&str] = &["user", "room"];

/// Validate an envelope the owning application wants to send.
pub fn validate_outbound(q: &mut Query) -> Result<()> {
    validate_query(q)
}

/// Validate an envelope decoded from the hub.
pub fn validate_inbound(q: &mut Query) -> Result<()> {
    validate_query(q)
}

/// Boolean form of the predicate (still mints a missing command id).
pub fn is_valid(q: &mut Query) -> bool {
    validate_query(q).is_ok()
}

fn validate_query(q: &mut Query) -> Result<()> {
    match q.kind {
        QueryType::Command => {
            let cmd = q.command.as_mut().ok_or_else(|| {
                PrisError::Rejected("command envelope without command block".into())
            })?;
            // the session reports the mint as IdAssigned
            if cmd.id.is_empty() {
                cmd.id = random_id();
            }
            validate_command(cmd)
        }
        QueryType::Message => match &q.message {
            Some(m) if !m.room.is_empty() => Ok(()),
            Some(_) => Err(PrisError::Rejected("message without room".into())),
            None => Err(PrisError::Rejected("message envelope without message block".into())),
        },
    }
}

fn validate_command(cmd: &CommandBlock) -> Result<()> {
    let action = cmd
        .action
        .ok_or_else(|| PrisError::Rejected("command without action".into()))?;

    match action {
        Action::UserRequest => {
            require_kind(action, &cmd.kind, USER_REQUEST_KINDS)?;
            require_data(action, &cmd.data)
        }
        Action::RoomRequest => {
            require_kind(action, &cmd.kind, ROOM_REQUEST_KINDS)?;
            require_data(action, &cmd.data)
        }
        Action::Info => require_kind(action, &cmd.kind, INFO_KINDS),
        Action::Disengage => Ok(()),
        Action::Engage | Action::Proceed => {
            Err(PrisError::Rejected(format!("unsupported command: {action}")))
        }
    }
}

fn require_kind(action: Action, kind: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&kind) {
        Ok(())
    } else {
        Err(PrisError::Rejected(format!("invalid {action} type: {kind:?}")))
    }
}

fn require_data(action: Action, data: &str) -> Result<()> {
    if data.is_empty() {
        Err(PrisError::Rejected(format!("{action} missing data field")))
    } else {
        Ok(())
    }
}
