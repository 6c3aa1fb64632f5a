//! Transport frames and control envelopes.
//!
//! A [`TransportFrame`] is the opaque `{flow, message}` unit that
//! crosses an isolation boundary once a link is established. A
//! [`ControlEnvelope`] is the unit of handshake and lifecycle traffic
//! carried on the reserved `control` flow. Both serialize to the JSON
//! wire format (`sourceFlow`, `fromApp`, ...).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flow::Flow;
use crate::id::ContextId;
use crate::manifest::Manifest;

/// The wire unit crossing an isolation boundary: an opaque message
/// tagged with the flow it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportFrame {
    /// The flow this message belongs to.
    pub flow: Flow,
    /// The opaque payload.
    pub message: Value,
}

impl TransportFrame {
    /// Build a frame.
    pub fn new(flow: impl Into<Flow>, message: Value) -> Self {
        Self {
            flow: flow.into(),
            message,
        }
    }

    /// Whether this frame is a close request addressed to the control
    /// channel itself. Such a frame shuts the link down locally and is
    /// never forwarded across the transport.
    #[must_use]
    pub fn is_control_close(&self) -> bool {
        self.flow.is_control()
            && self.message.get("type").and_then(Value::as_str) == Some("close")
            && self.message.get("channel").and_then(Value::as_str) == Some(Flow::CONTROL)
    }
}

/// The lifecycle requests a control envelope can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlRequest {
    /// Sent by a fresh context to ask its spawner for identity.
    Create,
    /// Sent by a context once its capability surface is populated.
    Ready,
    /// Asks the host to resolve and instantiate a declared dependency.
    Dep,
    /// Forwards a diagnostic message; inert unless debugging is enabled.
    Debug,
    /// Requests channel teardown.
    Close,
}

impl fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Ready => "ready",
            Self::Dep => "dep",
            Self::Debug => "debug",
            Self::Close => "close",
        };
        f.write_str(s)
    }
}

/// The wire unit for lifecycle and control traffic.
///
/// Every field except `sourceFlow` is optional on the wire; which
/// fields are present depends on the request. The handshake reply, for
/// example, carries `id`, `manifest` and `config` and no `request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlEnvelope {
    /// The flow this envelope originated from.
    pub source_flow: Flow,
    /// Set on everything a context sends; distinguishes a context's own
    /// traffic from its spawner's when both share a message primitive.
    #[serde(default)]
    pub from_app: bool,
    /// The lifecycle request, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<ControlRequest>,
    /// Free-form payload (flow-routed messages, debug text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<Value>,
    /// Dependency name, for `dep` requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dep: Option<String>,
    /// Assigned identity, in the handshake reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ContextId>,
    /// The context's manifest, in the handshake reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Manifest>,
    /// Merged configuration, in the handshake reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    /// Channel a close request is addressed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Message kind tag (`"close"` on teardown messages).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Default for ControlEnvelope {
    fn default() -> Self {
        Self {
            source_flow: Flow::control(),
            from_app: false,
            request: None,
            msg: None,
            dep: None,
            id: None,
            manifest: None,
            config: None,
            channel: None,
            kind: None,
        }
    }
}

impl ControlEnvelope {
    /// An envelope on the control flow with `fromApp` stamped.
    fn control() -> Self {
        Self {
            from_app: true,
            ..Self::default()
        }
    }

    /// The first envelope a fresh context sends: asks the spawner for
    /// identity, manifest and configuration.
    #[must_use]
    pub fn create() -> Self {
        Self {
            request: Some(ControlRequest::Create),
            ..Self::control()
        }
    }

    /// Sent once the capability surface is populated, immediately
    /// before user scripts are imported.
    #[must_use]
    pub fn ready() -> Self {
        Self {
            request: Some(ControlRequest::Ready),
            ..Self::control()
        }
    }

    /// Asks the host to resolve and instantiate the named dependency.
    #[must_use]
    pub fn dep(name: impl Into<String>) -> Self {
        Self {
            request: Some(ControlRequest::Dep),
            dep: Some(name.into()),
            ..Self::control()
        }
    }

    /// A diagnostic envelope carrying the display form of `msg`.
    #[must_use]
    pub fn debug(msg: impl fmt::Display) -> Self {
        Self {
            request: Some(ControlRequest::Debug),
            msg: Some(Value::String(msg.to_string())),
            ..Self::control()
        }
    }

    /// A payload-bearing envelope from an application flow.
    pub fn flow_message(flow: impl Into<Flow>, msg: Value) -> Self {
        Self {
            source_flow: flow.into(),
            from_app: true,
            msg: Some(msg),
            ..Self::default()
        }
    }

    /// Whether this is a handshake reply (carries an assigned identity
    /// and a manifest, and no request).
    #[must_use]
    pub fn is_handshake_reply(&self) -> bool {
        self.request.is_none()
            && self.source_flow.is_control()
            && self.id.is_some()
            && self.manifest.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_envelope_wire_shape() {
        let json = serde_json::to_value(ControlEnvelope::create()).unwrap();
        assert_eq!(
            json,
            json!({"sourceFlow": "control", "fromApp": true, "request": "create"})
        );
    }

    #[test]
    fn dep_envelope_carries_name() {
        let env = ControlEnvelope::dep("storage");
        assert_eq!(env.request, Some(ControlRequest::Dep));
        assert_eq!(env.dep.as_deref(), Some("storage"));
    }

    #[test]
    fn debug_envelope_stringifies() {
        let env = ControlEnvelope::debug(42);
        assert_eq!(env.msg, Some(Value::String("42".to_string())));
    }

    #[test]
    fn handshake_reply_detection() {
        let reply: ControlEnvelope = serde_json::from_value(json!({
            "sourceFlow": "control",
            "id": "ctx-1",
            "manifest": {"app": {"script": "a.js"}},
            "config": {}
        }))
        .unwrap();
        assert!(reply.is_handshake_reply());
        assert!(!ControlEnvelope::create().is_handshake_reply());
    }

    #[test]
    fn control_close_frame() {
        let frame = TransportFrame::new(
            Flow::control(),
            json!({"type": "close", "channel": "control"}),
        );
        assert!(frame.is_control_close());

        let other = TransportFrame::new(
            Flow::control(),
            json!({"type": "close", "channel": "default"}),
        );
        assert!(!other.is_control_close());

        let data = TransportFrame::new("default", json!({"type": "close", "channel": "control"}));
        assert!(!data.is_control_close());
    }

    #[test]
    fn frame_round_trip() {
        let frame = TransportFrame::new("storage", json!({"k": 1}));
        let back: TransportFrame =
            serde_json::from_str(&serde_json::to_string(&frame).unwrap()).unwrap();
        assert_eq!(back, frame);
    }
}
