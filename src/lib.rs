//! # winccua-ws-client
//!
//! winccua-ws-client implements the websocket subscription transport of the
//! WinCC Unified GraphQL API: the connection handshake, multiplexing of any
//! number of named subscriptions over one socket, and per-subscription
//! delivery streams.
//!
//! It tries to be websocket client _and_ async executor agnostic: anything
//! implementing the [`client::Connection`] trait can carry the protocol, and
//! the connections background task is handed back as a plain future for the
//! surrounding application to spawn.  Built in support is provided for
//! websocket clients speaking [tungstenite][tungstenite] messages (for
//! example [async-tungstenite][async-tungstenite]).
//!
//! Queries and mutations go over HTTP and are not handled here - obtain a
//! session token from that side of the API and pass it to
//! [`ClientBuilder::bearer_token`].
//!
//! [tungstenite]: https://github.com/snapview/tungstenite-rs
//! [async-tungstenite]: https://github.com/sdroege/async-tungstenite

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod logging;
mod protocol;

pub mod client;
pub mod graphql;

#[cfg(feature = "tungstenite")]
mod native;

#[doc(hidden)]
#[allow(missing_docs)]
pub mod __doc_utils;

pub use client::{
    Client, ClientBuilder, Connection, ConnectionActor, DeliveryPolicy, Subscription,
    SubscriptionId,
};
pub use error::Error;
pub use graphql::SubscriptionRequest;
