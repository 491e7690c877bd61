//! Message definitions for the websocket transport spoken by the WinCC
//! Unified subscription endpoint.
//!
//! This is the [graphql-transport-ws protocol][1] with one vendor addition:
//! the client announces shutdown with a `connection_terminate` frame before
//! dropping the socket.
//!
//! [1]: https://github.com/enisdenjo/graphql-ws/blob/HEAD/PROTOCOL.md

#[derive(Default, Debug)]
pub struct ConnectionInit {
    payload: Option<serde_json::Value>,
}

impl ConnectionInit {
    pub fn new(payload: Option<serde_json::Value>) -> Self {
        ConnectionInit { payload }
    }
}

impl serde::Serialize for ConnectionInit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "connection_init")?;
        if self.payload.is_some() {
            map.serialize_entry("payload", &self.payload)?;
        }
        map.end()
    }
}

/// An outbound frame.
#[derive(serde::Serialize)]
#[serde(tag = "type")]
pub enum Message<'a, Operation> {
    #[serde(rename = "subscribe")]
    Subscribe { id: String, payload: &'a Operation },
    #[serde(rename = "complete")]
    Complete { id: String },
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "connection_terminate")]
    ConnectionTerminate,
}

/// An inbound frame.
#[derive(serde::Deserialize, Debug)]
#[serde(tag = "type")]
pub enum Event {
    // Ack, ping and pong payloads are tolerated on the wire but carry
    // nothing this client acts on.
    #[serde(rename = "connection_ack")]
    ConnectionAck,
    #[serde(rename = "next")]
    Next {
        id: String,
        payload: serde_json::Value,
    },
    #[serde(rename = "error")]
    Error {
        id: String,
        payload: Vec<serde_json::Value>,
    },
    #[serde(rename = "complete")]
    Complete { id: String },
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
}

impl Event {
    pub fn r#type(&self) -> &'static str {
        match self {
            Event::ConnectionAck => "connection_ack",
            Event::Next { .. } => "next",
            Event::Error { .. } => "error",
            Event::Complete { .. } => "complete",
            Event::Ping => "ping",
            Event::Pong => "pong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn connection_init_omits_missing_payload() {
        let json = serde_json::to_value(ConnectionInit::new(None)).unwrap();
        assert_eq!(json, json!({"type": "connection_init"}));

        let json =
            serde_json::to_value(ConnectionInit::new(Some(json!({"Authorization": "Bearer x"}))))
                .unwrap();
        assert_eq!(
            json,
            json!({
                "type": "connection_init",
                "payload": {"Authorization": "Bearer x"}
            })
        );
    }

    #[test]
    fn subscribe_envelope() {
        let payload = json!({"query": "subscription { x }", "variables": {}});
        let json = serde_json::to_value(Message::Subscribe {
            id: "1".into(),
            payload: &payload,
        })
        .unwrap();
        assert_eq!(
            json,
            json!({
                "type": "subscribe",
                "id": "1",
                "payload": {"query": "subscription { x }", "variables": {}}
            })
        );
    }

    #[test]
    fn terminate_and_complete_envelopes() {
        let json = serde_json::to_value(Message::ConnectionTerminate::<()>).unwrap();
        assert_eq!(json, json!({"type": "connection_terminate"}));

        let json = serde_json::to_value(Message::Complete::<()> { id: "7".into() }).unwrap();
        assert_eq!(json, json!({"type": "complete", "id": "7"}));
    }

    #[test]
    fn decodes_inbound_events() {
        let event =
            serde_json::from_value::<Event>(json!({"type": "connection_ack"})).unwrap();
        assert_matches!(event, Event::ConnectionAck);

        // Payloads on acks and pings are allowed by the protocol, we just
        // don't use them.
        let event = serde_json::from_value::<Event>(
            json!({"type": "connection_ack", "payload": {"session": 1}}),
        )
        .unwrap();
        assert_matches!(event, Event::ConnectionAck);

        let event =
            serde_json::from_value::<Event>(json!({"type": "ping", "payload": {}})).unwrap();
        assert_matches!(event, Event::Ping);

        let event = serde_json::from_value::<Event>(
            json!({"type": "next", "id": "1", "payload": {"data": {"v": 1}}}),
        )
        .unwrap();
        assert_matches!(event, Event::Next { ref id, .. } if id == "1");

        let event = serde_json::from_value::<Event>(
            json!({"type": "error", "id": "1", "payload": [{"message": "boom"}]}),
        )
        .unwrap();
        assert_matches!(event, Event::Error { ref payload, .. } if payload.len() == 1);

        let event =
            serde_json::from_value::<Event>(json!({"type": "complete", "id": "1"})).unwrap();
        assert_matches!(event, Event::Complete { ref id } if id == "1");
        assert_eq!(event.r#type(), "complete");
    }

    #[test]
    fn rejects_unknown_frame_types() {
        assert!(serde_json::from_value::<Event>(json!({"type": "ka"})).is_err());
    }
}
