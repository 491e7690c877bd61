//! The subscription client itself: the caller-facing [`Client`], the
//! [`ConnectionActor`] that owns the socket, and the [`Connection`]
//! abstraction over websocket libraries.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use futures_lite::StreamExt;

use crate::{graphql::Operation, protocol, Error};

mod actor;
mod builder;
mod connection;
mod keepalive;
mod production_future;
mod registry;
mod subscription;
mod subscription_id;

pub use self::{
    actor::ConnectionActor,
    builder::ClientBuilder,
    connection::{Connection, Message},
    registry::DeliveryPolicy,
    subscription::Subscription,
    subscription_id::SubscriptionId,
};

use self::registry::Delivery;

/// A live connection to the subscription endpoint.
///
/// Handed out by [`ClientBuilder::build`] once the handshake has completed,
/// so a `Client` can only exist in the ready state.  Cheap to clone; all
/// clones talk to the same connection.
#[derive(Clone, Debug)]
pub struct Client {
    actor: async_channel::Sender<ConnectionCommand>,
    drop_sender: async_channel::Sender<SubscriptionId>,
    subscription_buffer_size: usize,
    next_id: Arc<AtomicUsize>,
}

impl Client {
    pub(crate) fn new_internal(
        actor: async_channel::Sender<ConnectionCommand>,
        drop_sender: async_channel::Sender<SubscriptionId>,
        subscription_buffer_size: usize,
    ) -> Self {
        Client {
            actor,
            drop_sender,
            subscription_buffer_size,
            next_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// Starts a subscription on this connection.
    ///
    /// Returns as soon as the `subscribe` frame is queued for sending - the
    /// server sends no per-subscription acknowledgement.  Fails with
    /// [`Error::ConnectionClosed`] if the connection has been closed,
    /// including when racing a concurrent `close()`.
    pub async fn subscribe<Op>(&self, op: Op) -> Result<Subscription<Op>, Error>
    where
        Op: Operation + Unpin + Send + 'static,
        Op::Response: 'static,
    {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
            .expect("subscription ids start at 1");

        let request = serde_json::to_string(&protocol::Message::Subscribe {
            id: id.to_string(),
            payload: &op,
        })
        .map_err(|error| Error::Serializing(error.to_string()))?;

        let (sender, receiver) = async_channel::bounded::<Delivery>(self.subscription_buffer_size);

        self.actor
            .send(ConnectionCommand::Subscribe {
                request,
                sender,
                id,
            })
            .await
            .map_err(|_| Error::ConnectionClosed)?;

        let stream = receiver.map(move |delivery| {
            delivery.and_then(|payload| {
                op.decode(payload)
                    .map_err(|error| Error::Decode(error.to_string()))
            })
        });

        Ok(Subscription {
            id,
            stream: Some(Box::pin(stream)),
            drop_sender: Some(self.drop_sender.clone()),
            actor: self.actor.clone(),
        })
    }

    /// Stops a running subscription by id.
    ///
    /// A no-op if the subscription has already finished or been stopped.
    pub async fn stop(&self, id: SubscriptionId) -> Result<(), Error> {
        self.actor
            .send(ConnectionCommand::Cancel(id))
            .await
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Closes the connection.
    ///
    /// Sends `connection_terminate` best-effort, ends every open
    /// subscription stream, and releases the socket.  Idempotent: calling
    /// this twice (or concurrently) is harmless, and any `subscribe` racing
    /// a close fails with [`Error::ConnectionClosed`].
    pub async fn close(&self) {
        self.actor.send(ConnectionCommand::Close).await.ok();
        self.actor.close();
    }
}

pub(crate) enum ConnectionCommand {
    Subscribe {
        /// The full subscribe request as a JSON encoded string.
        request: String,
        sender: async_channel::Sender<Delivery>,
        id: SubscriptionId,
    },
    Cancel(SubscriptionId),
    Ping,
    Close,
}
