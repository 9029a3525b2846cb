use serde::{Deserialize, Serialize};

/// Opcodes of the gateway wire protocol.
pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const STATUS_UPDATE: u8 = 3;
    pub const VOICE_STATE_UPDATE: u8 = 4;
    pub const VOICE_SERVER_PING: u8 = 5;
    pub const RESUME: u8 = 6;
    pub const RECONNECT: u8 = 7;
    pub const REQUEST_GUILD_MEMBERS: u8 = 8;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Close codes.
pub mod close_code {
    pub const UNKNOWN_ERROR: u16 = 4000;
    pub const UNKNOWN_OPCODE: u16 = 4001;
    pub const DECODE_ERROR: u16 = 4002;
    pub const NOT_AUTHENTICATED: u16 = 4003;
    pub const AUTH_FAILED: u16 = 4004;
    pub const ALREADY_AUTHENTICATED: u16 = 4005;
    pub const INVALID_SEQ: u16 = 4007;
    pub const RATE_LIMITED: u16 = 4008;
    pub const SESSION_TIMED_OUT: u16 = 4009;
    pub const INVALID_VERSION: u16 = 4012;
    pub const INVALID_INTENT: u16 = 4013;
    pub const DISALLOWED_INTENT: u16 = 4014;

    /// Whether a connection closed with this code left a session the server
    /// will still accept a RESUME for. Normal closes and authentication or
    /// protocol-negotiation failures do not.
    pub fn resumable(code: u16) -> bool {
        !matches!(
            code,
            1000 | 1001 | AUTH_FAILED | INVALID_VERSION | INVALID_INTENT | DISALLOWED_INTENT
        )
    }
}

/// Gateway message envelope. A missing `op` is a decode failure; unknown
/// extra fields are ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(rename = "s", skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    #[serde(rename = "t", skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
}

/// IDENTIFY (opcode 2) body. The property keys carry the `$` prefix the
/// wire protocol requires.
#[derive(Debug, Serialize, Deserialize)]
pub struct Identify {
    pub token: String,
    pub properties: IdentifyProperties,
    pub compress: bool,
    pub large_threshold: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentifyProperties {
    #[serde(rename = "$os")]
    pub os: String,
    #[serde(rename = "$browser")]
    pub browser: String,
    #[serde(rename = "$device")]
    pub device: String,
}

/// RESUME (opcode 6) body.
#[derive(Debug, Serialize, Deserialize)]
pub struct Resume {
    pub token: String,
    pub session_id: String,
    pub seq: Option<u64>,
}

/// HELLO (opcode 10) body.
#[derive(Debug, Deserialize)]
pub struct Hello {
    /// Milliseconds between heartbeats.
    pub heartbeat_interval: u64,
}

/// The slice of a READY dispatch this client cares about.
#[derive(Debug, Deserialize)]
pub struct Ready {
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_decodes_wire_fields() {
        let text = r#"{"op":0,"s":42,"t":"READY","d":{"session_id":"abc"}}"#;
        let payload: GatewayPayload = serde_json::from_str(text).unwrap();
        assert_eq!(payload.op, opcode::DISPATCH);
        assert_eq!(payload.sequence, Some(42));
        assert_eq!(payload.event_name.as_deref(), Some("READY"));
        assert!(payload.data.is_some());
    }

    #[test]
    fn test_envelope_ignores_unknown_fields() {
        let text = r#"{"op":11,"_trace":["gateway-prd-main"]}"#;
        let payload: GatewayPayload = serde_json::from_str(text).unwrap();
        assert_eq!(payload.op, opcode::HEARTBEAT_ACK);
        assert!(payload.data.is_none());
    }

    #[test]
    fn test_envelope_requires_op() {
        let text = r#"{"d":null,"s":1}"#;
        assert!(serde_json::from_str::<GatewayPayload>(text).is_err());
    }

    #[test]
    fn test_identify_round_trip() {
        let identify = Identify {
            token: "Bot xyz".to_string(),
            properties: IdentifyProperties {
                os: "linux".to_string(),
                browser: "accordgateway".to_string(),
                device: "accordgateway".to_string(),
            },
            compress: true,
            large_threshold: 250,
        };
        let encoded = serde_json::to_string(&identify).unwrap();
        assert!(encoded.contains("\"$os\":\"linux\""), "expected $-prefixed keys: {encoded}");
        let decoded: Identify = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.token, identify.token);
        assert_eq!(decoded.properties.os, identify.properties.os);
        assert_eq!(decoded.properties.browser, identify.properties.browser);
        assert_eq!(decoded.properties.device, identify.properties.device);
        assert_eq!(decoded.compress, identify.compress);
        assert_eq!(decoded.large_threshold, identify.large_threshold);
    }

    #[test]
    fn test_close_code_classification() {
        assert!(!close_code::resumable(1000));
        assert!(!close_code::resumable(close_code::AUTH_FAILED));
        assert!(!close_code::resumable(close_code::DISALLOWED_INTENT));
        assert!(close_code::resumable(close_code::SESSION_TIMED_OUT));
        assert!(close_code::resumable(close_code::UNKNOWN_ERROR));
        assert!(close_code::resumable(close_code::RATE_LIMITED));
    }
}
