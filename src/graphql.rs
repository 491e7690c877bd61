//! Traits that abstract over the GraphQL operation behind a subscription.
//!
//! The WinCC Unified API is driven with fixed query strings, so the bundled
//! [`SubscriptionRequest`] type (a raw query plus JSON variables) covers most
//! uses.  Typed client libraries can integrate by implementing [`Operation`]
//! for their own streaming-operation types.

use std::collections::HashMap;

/// An abstraction over GraphQL subscription operations.
pub trait Operation: serde::Serialize {
    /// The decoded response type of this operation.
    type Response;

    /// The error that will be returned from failed attempts to decode a
    /// `Response`.
    type Error: std::error::Error;

    /// Decodes one `next` payload into the response type of this operation.
    fn decode(&self, data: serde_json::Value) -> Result<Self::Response, Self::Error>;
}

/// A raw GraphQL subscription: a query string plus its variables.
///
/// Responses are left as `serde_json::Value`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubscriptionRequest {
    query: String,
    variables: HashMap<String, serde_json::Value>,
}

impl SubscriptionRequest {
    /// Creates a request for the given subscription document with no
    /// variables.
    pub fn new(query: impl Into<String>) -> Self {
        SubscriptionRequest {
            query: query.into(),
            variables: HashMap::new(),
        }
    }

    /// Adds a variable to the request.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

impl Operation for SubscriptionRequest {
    type Response = serde_json::Value;

    type Error = serde_json::Error;

    fn decode(&self, data: serde_json::Value) -> Result<Self::Response, Self::Error> {
        Ok(data)
    }
}
