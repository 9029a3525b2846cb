use tracing::{debug, error, info};

use super::payload::{opcode, GatewayPayload, Hello, Ready};
use super::session::SessionState;

/// What the client must do in response to an inbound payload. Routing is
/// pure: the only side effects here are session-state updates.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    None,
    /// Server asked for an ad hoc heartbeat, outside the regular schedule.
    Heartbeat,
    /// Mark the pending heartbeat as acknowledged.
    Ack,
    /// HELLO arrived: arm the heartbeat timer and send IDENTIFY or RESUME.
    Hello { heartbeat_interval: u64 },
    /// READY or RESUMED confirmed the session.
    Established,
    /// Server wants an immediate reconnect with resume intended.
    Reconnect,
    /// Session invalidated; `resumable` comes from the payload body.
    InvalidSession { resumable: bool },
}

/// Routes one decoded payload by opcode. Malformed or unknown payloads are
/// dropped without touching the session or the connection.
pub fn route(session: &mut SessionState, payload: GatewayPayload) -> Action {
    match payload.op {
        opcode::DISPATCH => on_dispatch(session, payload),
        opcode::HEARTBEAT => {
            debug!("server requested heartbeat");
            Action::Heartbeat
        }
        opcode::RECONNECT => {
            info!("server requested reconnect");
            Action::Reconnect
        }
        opcode::INVALID_SESSION => {
            let resumable = payload
                .data
                .as_ref()
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            if !resumable {
                session.invalidate();
            }
            Action::InvalidSession { resumable }
        }
        opcode::HELLO => match payload
            .data
            .ok_or_else(|| "missing body".to_string())
            .and_then(|d| serde_json::from_value::<Hello>(d).map_err(|e| e.to_string()))
        {
            Ok(hello) => Action::Hello {
                heartbeat_interval: hello.heartbeat_interval,
            },
            Err(e) => {
                error!(error = %e, "malformed HELLO payload, dropping");
                Action::None
            }
        },
        opcode::HEARTBEAT_ACK => {
            debug!("heartbeat acknowledged");
            Action::Ack
        }
        opcode::IDENTIFY
        | opcode::STATUS_UPDATE
        | opcode::VOICE_STATE_UPDATE
        | opcode::VOICE_SERVER_PING
        | opcode::RESUME
        | opcode::REQUEST_GUILD_MEMBERS => {
            debug!(op = payload.op, "ignoring outbound-only opcode from server");
            Action::None
        }
        other => {
            error!(op = other, "received unknown opcode, dropping payload");
            Action::None
        }
    }
}

fn on_dispatch(session: &mut SessionState, payload: GatewayPayload) -> Action {
    if let Some(seq) = payload.sequence {
        session.record_sequence(seq);
    }
    match payload.event_name.as_deref() {
        Some("READY") => match payload
            .data
            .and_then(|d| serde_json::from_value::<Ready>(d).ok())
        {
            Some(ready) => {
                session.capture_ready(ready.session_id);
                Action::Established
            }
            None => {
                error!("READY dispatch without a session_id, dropping");
                Action::None
            }
        },
        Some("RESUMED") => {
            debug!("session resumption confirmed");
            Action::Established
        }
        event => {
            // Domain events are not routed by this crate.
            debug!(?event, "unhandled dispatch event");
            Action::None
        }
    }
}
