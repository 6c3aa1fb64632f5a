//! Wire types for the peripheral relay protocol.
//!
//! The relay forwards calls from an isolated context to provider
//! implementations living in the hosting context. The relay itself is
//! not part of this runtime's core; these types document its wire
//! format so both ends agree on shapes.
//!
//! Contract notes:
//! - `Create` registers a local provider instance under `name`.
//! - `Call` invokes a method on a registered provider; the relay
//!   answers with a `Return` carrying the same `id`.
//! - `ListenForEvent` subscribes exactly once per `(provider, event)`
//!   pair; duplicate subscriptions are deduplicated by the relay.
//!   Subsequent matches are forwarded as `EventFired`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message exchanged with the peripheral relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelayMessage {
    /// Register a local provider instance under `name`.
    Create {
        /// Name to register the instance under.
        name: String,
        /// The provider API to instantiate.
        provider: String,
    },
    /// Invoke a method on a registered provider.
    Call {
        /// Correlates this call with its `Return`.
        id: u64,
        /// The registered provider name.
        provider: String,
        /// Method to invoke.
        method: String,
        /// Positional arguments.
        args: Vec<Value>,
    },
    /// The result of a `Call` with the matching `id`.
    Return {
        /// The originating call's id.
        id: u64,
        /// The method's return value.
        data: Value,
    },
    /// Subscribe to a provider event (deduplicated per pair).
    ListenForEvent {
        /// The registered provider name.
        provider: String,
        /// Event name to subscribe to.
        event: String,
    },
    /// A subscribed event fired.
    #[serde(rename_all = "camelCase")]
    EventFired {
        /// The registered provider name.
        provider: String,
        /// The event that fired.
        event: String,
        /// The event's payload.
        event_payload: Value,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_wire_shape() {
        let msg = RelayMessage::Call {
            id: 7,
            provider: "storage".to_string(),
            method: "get".to_string(),
            args: vec![json!("k")],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({"type": "call", "id": 7, "provider": "storage", "method": "get", "args": ["k"]})
        );
    }

    #[test]
    fn event_fired_uses_camel_case_payload() {
        let msg: RelayMessage = serde_json::from_value(json!({
            "type": "eventFired",
            "provider": "storage",
            "event": "change",
            "eventPayload": {"key": "k"}
        }))
        .unwrap();
        assert_eq!(
            msg,
            RelayMessage::EventFired {
                provider: "storage".to_string(),
                event: "change".to_string(),
                event_payload: json!({"key": "k"}),
            }
        );
    }

    #[test]
    fn return_round_trips() {
        let msg = RelayMessage::Return {
            id: 1,
            data: json!(true),
        };
        let back: RelayMessage =
            serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(back, msg);
    }
}
