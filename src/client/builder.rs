use std::{future::IntoFuture, time::Duration};

use futures_lite::{future, FutureExt};
use serde::Serialize;

use crate::{graphql::Operation, logging::trace, protocol::Event, Error};

use super::{
    actor::ConnectionActor,
    connection::{Connection, Message},
    keepalive::KeepAliveSettings,
    production_future::read_from_producer,
    registry::DeliveryPolicy,
    Client, Subscription,
};

const DEFAULT_SUBSCRIPTION_BUFFER_SIZE: usize = 5;
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for WinCC Unified subscription clients
///
/// This can be used to configure the connection prior to construction, but
/// can also create subscriptions directly in the case where users only need
/// to run one per connection.
///
/// ```rust
/// use winccua_ws_client::{Client, ClientBuilder};
/// #
/// # async fn example() -> Result<(), winccua_ws_client::Error> {
/// # let connection = winccua_ws_client::__doc_utils::Conn;
/// let (client, actor) = ClientBuilder::new().build(connection).await?;
/// // or
/// # let connection = winccua_ws_client::__doc_utils::Conn;
/// let (client, actor) = Client::builder().build(connection).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ClientBuilder {
    payload: Option<serde_json::Value>,
    subscription_buffer_size: Option<usize>,
    delivery_policy: DeliveryPolicy,
    handshake_timeout: Duration,
    keep_alive: KeepAliveSettings,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        ClientBuilder {
            payload: None,
            subscription_buffer_size: None,
            delivery_policy: DeliveryPolicy::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            keep_alive: KeepAliveSettings::default(),
        }
    }
}

impl Client {
    /// Creates a ClientBuilder.
    ///
    /// Same as calling `ClientBuilder::new()`.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl ClientBuilder {
    /// Creates a ClientBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add payload to `connection_init`
    pub fn payload(self, payload: impl Serialize) -> Result<Self, Error> {
        Ok(Self {
            payload: Some(
                serde_json::to_value(payload)
                    .map_err(|error| Error::Serializing(error.to_string()))?,
            ),
            ..self
        })
    }

    /// Authenticates the connection with a session token from a prior login.
    ///
    /// WinCC Unified expects the token inside the `connection_init` payload,
    /// as an `Authorization: Bearer` entry.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        Self {
            payload: Some(serde_json::json!({
                "Authorization": format!("Bearer {}", token.as_ref())
            })),
            ..self
        }
    }

    /// Sets the size of the incoming message buffer that subscriptions
    /// created by this client will use
    pub fn subscription_buffer_size(self, new: usize) -> Self {
        ClientBuilder {
            subscription_buffer_size: Some(new),
            ..self
        }
    }

    /// Sets what happens when a subscriptions buffer is full.
    ///
    /// Defaults to [`DeliveryPolicy::DropNewest`].
    pub fn delivery_policy(self, policy: DeliveryPolicy) -> Self {
        ClientBuilder {
            delivery_policy: policy,
            ..self
        }
    }

    /// Sets how long `build` waits for the servers `connection_ack` before
    /// giving up with [`Error::Handshake`].
    ///
    /// Defaults to 10 seconds.  There are no other per-call timeouts -
    /// callers needing one should wrap operations externally.
    pub fn handshake_timeout(self, timeout: Duration) -> Self {
        ClientBuilder {
            handshake_timeout: timeout,
            ..self
        }
    }

    /// Sets the interval between keep alives.
    ///
    /// Any incoming messages automatically reset the failure count so keep
    /// alives may go unanswered on busy connections without harm.
    pub fn keep_alive_interval(mut self, new: Duration) -> Self {
        self.keep_alive.interval = Some(new);
        self
    }

    /// The number of keepalive retries before a connection is considered broken.
    ///
    /// This defaults to 3, but has no effect if `keep_alive_interval` is not called.
    pub fn keep_alive_retries(mut self, count: usize) -> Self {
        self.keep_alive.retries = count;
        self
    }

    /// Initialise a Client and use it to run a single subscription
    ///
    /// ```rust
    /// use winccua_ws_client::{Client, SubscriptionRequest};
    /// # async fn example() -> Result<(), winccua_ws_client::Error> {
    /// # let connection = winccua_ws_client::__doc_utils::Conn;
    /// let subscription = SubscriptionRequest::new("subscription { reduTask }");
    /// let stream = Client::builder().subscribe(connection, subscription).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// Note that this takes ownership of the builder, so it cannot be
    /// used to run any more operations.
    ///
    /// If users want to run multiple operations on a connection they
    /// should `build` the `Client`.
    pub async fn subscribe<Conn, Op>(
        self,
        connection: Conn,
        operation: Op,
    ) -> Result<Subscription<Op>, Error>
    where
        Conn: Connection + Send + 'static,
        Op: Operation + Unpin + Send + 'static,
        Op::Response: 'static,
    {
        let (client, actor) = self.build(connection).await?;

        let actor_future = actor.into_future();
        let subscribe_future = client.subscribe(operation);

        let (stream, actor_future) = run_startup(subscribe_future, actor_future).await?;

        Ok(stream.join(actor_future))
    }

    /// Constructs a Client
    ///
    /// Takes an already established websocket connection, sends
    /// `connection_init` and waits for the servers `connection_ack`, then
    /// returns the client and a future that must be awaited somewhere - if
    /// the future is dropped the connection will also drop.
    ///
    /// Fails with [`Error::Handshake`] if anything other than an ack (or a
    /// ping) arrives first, or if the ack does not arrive within the
    /// handshake timeout.
    pub async fn build<Conn>(self, mut connection: Conn) -> Result<(Client, ConnectionActor), Error>
    where
        Conn: Connection + Send + 'static,
    {
        let Self {
            payload,
            subscription_buffer_size,
            delivery_policy,
            handshake_timeout,
            keep_alive,
        } = self;
        let subscription_buffer_size =
            subscription_buffer_size.unwrap_or(DEFAULT_SUBSCRIPTION_BUFFER_SIZE);

        connection.send(Message::init(payload)).await?;

        // Wait for ack before entering the receive loop:
        let handshake = async {
            loop {
                match connection.receive().await {
                    None => {
                        return Err(Error::Transport(
                            "connection dropped before connection_ack".into(),
                        ))
                    }
                    Some(Message::Close { code, reason }) => {
                        return Err(Error::Close(
                            code.unwrap_or_default(),
                            reason.unwrap_or_default(),
                        ))
                    }
                    Some(Message::Ping) | Some(Message::Pong) => {}
                    Some(message @ Message::Text(_)) => {
                        let event = message
                            .deserialize::<Event>()
                            .map_err(|error| Error::Handshake(error.to_string()))?;
                        match event {
                            // Pings can be sent at any time
                            Event::Ping => {
                                connection.send(Message::graphql_pong()).await?;
                            }
                            Event::Pong => {}
                            Event::ConnectionAck => {
                                trace!("connection_ack received, handshake completed");
                                return Ok(());
                            }
                            event => {
                                connection
                                    .send(Message::Close {
                                        code: Some(4950),
                                        reason: Some(
                                            "Unexpected message while waiting for ack".into(),
                                        ),
                                    })
                                    .await
                                    .ok();
                                return Err(Error::Handshake(format!(
                                    "expected a connection_ack or ping, got {}",
                                    event.r#type()
                                )));
                            }
                        }
                    }
                }
            }
        };
        let timeout = async {
            futures_timer::Delay::new(handshake_timeout).await;
            Err(Error::Handshake(format!(
                "no connection_ack within {handshake_timeout:?}"
            )))
        };
        handshake.or(timeout).await?;

        let (command_sender, command_receiver) = async_channel::bounded(subscription_buffer_size);
        let (drop_sender, drop_receiver) = async_channel::unbounded();

        let actor = ConnectionActor::new(
            Box::new(connection),
            command_receiver,
            drop_receiver,
            delivery_policy,
            keep_alive,
        );

        let client = Client::new_internal(command_sender, drop_sender, subscription_buffer_size);

        Ok((client, actor))
    }
}

async fn run_startup<SubscribeFut, Op>(
    subscribe: SubscribeFut,
    actor: future::Boxed<()>,
) -> Result<(Subscription<Op>, future::Boxed<()>), Error>
where
    SubscribeFut: std::future::Future<Output = Result<Subscription<Op>, Error>>,
    Op: Operation,
{
    match read_from_producer(subscribe, actor).await {
        Some((Ok(subscription), actor)) => Ok((subscription, actor)),
        Some((Err(err), _)) => Err(err),
        None => Err(Error::ConnectionClosed),
    }
}
