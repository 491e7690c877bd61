//! An in-memory websocket for driving the client from the server side of
//! the protocol.
#![allow(dead_code)] // not every test binary uses every helper

use serde_json::json;
use winccua_ws_client::{client::Message, Connection, Error};

/// The client half: hand this to `ClientBuilder::build`.
pub struct FakeConnection {
    incoming: async_channel::Receiver<Message>,
    outgoing: async_channel::Sender<Message>,
}

/// The server half: inject frames and inspect what the client sent.
pub struct FakeServer {
    to_client: async_channel::Sender<Message>,
    from_client: async_channel::Receiver<Message>,
}

pub fn fake_connection() -> (FakeConnection, FakeServer) {
    let (to_client, incoming) = async_channel::unbounded();
    let (outgoing, from_client) = async_channel::unbounded();

    (
        FakeConnection { incoming, outgoing },
        FakeServer {
            to_client,
            from_client,
        },
    )
}

impl Connection for FakeConnection {
    async fn receive(&mut self) -> Option<Message> {
        self.incoming.recv().await.ok()
    }

    async fn send(&mut self, message: Message) -> Result<(), Error> {
        self.outgoing
            .send(message)
            .await
            .map_err(|_| Error::Transport("fake socket closed".into()))
    }
}

impl FakeServer {
    /// Sends one JSON frame to the client.
    pub async fn send_json(&self, frame: serde_json::Value) {
        self.to_client
            .send(Message::Text(frame.to_string()))
            .await
            .unwrap();
    }

    /// Sends raw text, for exercising malformed frame handling.
    pub async fn send_text(&self, text: &str) {
        self.to_client
            .send(Message::Text(text.to_string()))
            .await
            .unwrap();
    }

    /// Completes the client handshake: reads `connection_init`, replies
    /// with `connection_ack`.
    pub async fn ack_handshake(&self) {
        let init = self.next_frame().await;
        assert_eq!(init["type"], "connection_init");
        self.send_json(json!({"type": "connection_ack"})).await;
    }

    /// Reads the next JSON frame the client sent.  Panics on non-text
    /// messages; use [`FakeServer::next_message`] when those are expected.
    pub async fn next_frame(&self) -> serde_json::Value {
        match self.next_message().await {
            Message::Text(text) => serde_json::from_str(&text).unwrap(),
            _ => panic!("expected a text frame"),
        }
    }

    pub async fn next_message(&self) -> Message {
        self.from_client.recv().await.unwrap()
    }

    /// Ends the transport, as a peer going away would.
    pub fn disconnect(&self) {
        self.to_client.close();
    }
}
