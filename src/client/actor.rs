use std::{future::IntoFuture, pin::pin};

use futures_lite::{future, FutureExt, StreamExt};

use crate::{
    logging::{trace, warning},
    protocol::Event,
    Error, SubscriptionId,
};

use super::{
    connection::{Message, ObjectSafeConnection},
    keepalive::KeepAliveSettings,
    registry::{DeliveryPolicy, Registry},
    ConnectionCommand,
};

/// The background task that owns a connections socket.
///
/// Reads one inbound frame at a time and routes it by subscription id,
/// serialises every outbound write, and tears the registry down exactly once
/// when the connection ends - whatever ends it.
///
/// Obtain one from [`crate::ClientBuilder::build`] and spawn it (or await its
/// `IntoFuture`) on whatever runtime the surrounding application uses.
#[must_use]
pub struct ConnectionActor {
    connection: Box<dyn ObjectSafeConnection>,
    commands: async_channel::Receiver<ConnectionCommand>,
    dropped_subscriptions: async_channel::Receiver<SubscriptionId>,
    registry: Registry,
    keep_alive: KeepAliveSettings,
}

impl std::fmt::Debug for ConnectionActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionActor")
            .field("keep_alive", &self.keep_alive)
            .finish_non_exhaustive()
    }
}

impl ConnectionActor {
    pub(super) fn new(
        connection: Box<dyn ObjectSafeConnection>,
        commands: async_channel::Receiver<ConnectionCommand>,
        dropped_subscriptions: async_channel::Receiver<SubscriptionId>,
        delivery_policy: DeliveryPolicy,
        keep_alive: KeepAliveSettings,
    ) -> Self {
        ConnectionActor {
            connection,
            commands,
            dropped_subscriptions,
            registry: Registry::new(delivery_policy),
            keep_alive,
        }
    }

    async fn run(mut self) {
        let keep_alive = self.keep_alive.clone();
        let mut keep_alive_ticks = pin!(keep_alive.run());
        let mut unanswered_pings = 0usize;

        let cause = loop {
            let next = {
                let connection = &mut self.connection;
                let commands = &self.commands;
                let dropped = &self.dropped_subscriptions;
                let mut ticks = keep_alive_ticks.as_mut();

                let next_command = async move {
                    match commands.recv().await {
                        Ok(command) => Next::Command(command),
                        Err(_) => Next::ClientGone,
                    }
                };
                let next_drop = async move {
                    match dropped.recv().await {
                        Ok(id) => Next::Command(ConnectionCommand::Cancel(id)),
                        // Every handle is gone; the command arm reports it.
                        Err(_) => future::pending().await,
                    }
                };
                let next_message = async move { Next::Message(connection.receive().await) };
                let next_tick = async move {
                    match ticks.next().await {
                        Some(command) => Next::Command(command),
                        None => future::pending().await,
                    }
                };

                next_command.or(next_drop).or(next_message).or(next_tick)
            }
            .await;

            match next {
                Next::Command(ConnectionCommand::Close) | Next::ClientGone => {
                    self.connection.send(Message::terminate()).await.ok();
                    self.connection
                        .send(Message::Close {
                            code: Some(1000),
                            reason: Some("Normal Closure".into()),
                        })
                        .await
                        .ok();
                    break None;
                }
                Next::Command(ConnectionCommand::Ping) => {
                    if unanswered_pings > self.keep_alive.retries {
                        break Some(Error::Transport("keep alive retries exceeded".into()));
                    }
                    unanswered_pings += 1;
                    if let Err(error) = self.connection.send(Message::graphql_ping()).await {
                        break Some(error);
                    }
                }
                Next::Command(command) => {
                    if let Some(message) = self.handle_command(command) {
                        if let Err(error) = self.connection.send(message).await {
                            break Some(error);
                        }
                    }
                }
                Next::Message(None) => {
                    break Some(Error::Transport("websocket connection dropped".into()));
                }
                Next::Message(Some(message)) => {
                    unanswered_pings = 0;
                    match self.handle_message(message).await {
                        Ok(None) => {}
                        Ok(Some(reply)) => {
                            if let Err(error) = self.connection.send(reply).await {
                                break Some(error);
                            }
                        }
                        Err(cause) => break Some(cause),
                    }
                }
            }
        };

        if let Some(cause) = &cause {
            warning!("connection closed: {cause}");
        }

        self.registry.close_all(cause.as_ref());
    }

    fn handle_command(&mut self, command: ConnectionCommand) -> Option<Message> {
        match command {
            ConnectionCommand::Subscribe {
                request,
                sender,
                id,
            } => {
                self.registry.register(id, sender);
                Some(Message::Text(request))
            }
            ConnectionCommand::Cancel(id) => self
                .registry
                .unregister(id)
                .then(|| Message::complete(id)),
            // Close & Ping are handled in the run loop
            ConnectionCommand::Close | ConnectionCommand::Ping => None,
        }
    }

    /// Routes one inbound websocket message.
    ///
    /// Malformed frames and frames for unknown subscription ids are logged
    /// and skipped rather than failing the connection.  An `Err` here is
    /// fatal to the connection.
    async fn handle_message(&mut self, message: Message) -> Result<Option<Message>, Error> {
        let event = match message {
            Message::Text(text) => {
                trace!("decoding message: {text}");
                match serde_json::from_str::<Event>(&text) {
                    Ok(event) => event,
                    Err(error) => {
                        warning!("discarding malformed frame: {error}");
                        return Ok(None);
                    }
                }
            }
            Message::Close { code, reason } => {
                return Err(Error::Close(
                    code.unwrap_or_default(),
                    reason.unwrap_or_default(),
                ))
            }
            Message::Ping => return Ok(Some(Message::Pong)),
            Message::Pong => return Ok(None),
        };

        match event {
            Event::Next { id, payload } => {
                let Some(id) = SubscriptionId::from_str(&id) else {
                    warning!("discarding payload with unparseable id: {id}");
                    return Ok(None);
                };
                self.registry.deliver(id, payload).await;
            }
            Event::Error { id, payload } => {
                if let Some(id) = SubscriptionId::from_str(&id) {
                    self.registry.fail(id, payload);
                }
            }
            Event::Complete { id } => {
                if let Some(id) = SubscriptionId::from_str(&id) {
                    trace!("subscription {} complete", id.to_string());
                    self.registry.complete(id);
                }
            }
            Event::ConnectionAck => {
                warning!("unexpected connection_ack after handshake, ignoring");
            }
            Event::Ping => return Ok(Some(Message::graphql_pong())),
            Event::Pong => {}
        }

        Ok(None)
    }
}

enum Next {
    Command(ConnectionCommand),
    Message(Option<Message>),
    ClientGone,
}

impl IntoFuture for ConnectionActor {
    type Output = ();

    type IntoFuture = future::Boxed<()>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}
