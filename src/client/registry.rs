use std::collections::HashMap;

use crate::{
    logging::{trace, warning},
    Error, SubscriptionId,
};

/// What to do with an incoming payload when a subscriptions delivery
/// channel is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Discard the incoming payload, keeping whatever is already queued.
    ///
    /// This is the default: a slow consumer only ever loses its own
    /// payloads and can never stall delivery to other subscriptions.
    #[default]
    DropNewest,
    /// Discard the oldest queued payload to make room for the incoming one.
    DropOldest,
    /// Wait for the consumer to catch up.
    ///
    /// This guarantees per-subscription completeness at the price of
    /// head-of-line blocking: while one channel is full nothing is
    /// delivered to any other subscription.
    Block,
}

pub(crate) type Delivery = Result<serde_json::Value, Error>;

/// The table of live subscriptions on a connection.
///
/// Owned by the `ConnectionActor`, which serialises every mutation through
/// its command loop.  Each entry maps a [`SubscriptionId`] onto the bounded
/// channel its `Subscription` handle reads from.
pub(super) struct Registry {
    entries: HashMap<SubscriptionId, async_channel::Sender<Delivery>>,
    policy: DeliveryPolicy,
}

impl Registry {
    pub fn new(policy: DeliveryPolicy) -> Self {
        Registry {
            entries: HashMap::new(),
            policy,
        }
    }

    /// Records the delivery channel for a newly subscribed id.
    ///
    /// Ids come from a counter that is never rewound, so an occupied entry
    /// would be a bug in the client.
    pub fn register(&mut self, id: SubscriptionId, sender: async_channel::Sender<Delivery>) {
        let previous = self.entries.insert(id, sender);
        debug_assert!(previous.is_none(), "subscription id reused");
    }

    /// Delivers a `next` payload to the subscription it belongs to.
    ///
    /// Unknown ids are dropped: the server may still be flushing frames for
    /// a subscription we just cancelled.
    pub async fn deliver(&mut self, id: SubscriptionId, payload: serde_json::Value) {
        let Some(sender) = self.entries.get(&id) else {
            trace!("dropping payload for unknown subscription {}", id.to_string());
            return;
        };

        match self.policy {
            DeliveryPolicy::DropNewest => {
                if let Err(async_channel::TrySendError::Full(_)) = sender.try_send(Ok(payload)) {
                    warning!(
                        "subscription {} buffer full, discarding incoming payload",
                        id.to_string()
                    );
                }
            }
            DeliveryPolicy::DropOldest => {
                if let Ok(Some(_)) = sender.force_send(Ok(payload)) {
                    warning!(
                        "subscription {} buffer full, discarded oldest payload",
                        id.to_string()
                    );
                }
            }
            DeliveryPolicy::Block => {
                sender.send(Ok(payload)).await.ok();
            }
        }
    }

    /// Terminates a subscription with a server reported error.
    ///
    /// The error is force-sent so a consumer that drains the channel always
    /// observes it, even if the buffer was full.
    pub fn fail(&mut self, id: SubscriptionId, errors: Vec<serde_json::Value>) {
        if let Some(sender) = self.entries.remove(&id) {
            sender.force_send(Err(Error::Subscription(errors))).ok();
            sender.close();
        }
    }

    /// Ends a subscription normally.  The channel closes once queued
    /// payloads are drained.
    pub fn complete(&mut self, id: SubscriptionId) {
        if let Some(sender) = self.entries.remove(&id) {
            sender.close();
        }
    }

    /// Removes a subscription on behalf of its caller.
    ///
    /// Returns whether the id was still registered, so the caller knows if
    /// the server needs telling.  Calling this twice is a no-op the second
    /// time.
    pub fn unregister(&mut self, id: SubscriptionId) -> bool {
        match self.entries.remove(&id) {
            Some(sender) => {
                sender.close();
                true
            }
            None => false,
        }
    }

    /// Terminates every subscription at once, optionally with the
    /// connection-level cause.
    ///
    /// Called exactly once, during connection shutdown.
    pub fn close_all(&mut self, cause: Option<&Error>) {
        for (_, sender) in self.entries.drain() {
            if let Some(cause) = cause {
                sender.force_send(Err(cause.clone())).ok();
            }
            sender.close();
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn id(n: usize) -> SubscriptionId {
        SubscriptionId::new(n).unwrap()
    }

    #[test]
    fn paired_register_unregister_leaves_registry_empty() {
        let mut registry = Registry::new(DeliveryPolicy::default());

        let channels = (1..=3)
            .map(|n| {
                let (sender, receiver) = async_channel::bounded(1);
                registry.register(id(n), sender);
                receiver
            })
            .collect::<Vec<_>>();

        for n in 1..=3 {
            assert!(registry.unregister(id(n)));
            assert!(!registry.unregister(id(n)));
        }

        assert_eq!(registry.len(), 0);
        for receiver in channels {
            assert!(receiver.is_closed());
        }
    }

    #[test]
    fn operations_on_unknown_ids_are_noops() {
        let mut registry = Registry::new(DeliveryPolicy::default());

        futures_lite::future::block_on(registry.deliver(id(9), json!(1)));
        registry.fail(id(9), vec![json!({"message": "nope"})]);
        registry.complete(id(9));
        assert!(!registry.unregister(id(9)));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn drop_newest_discards_incoming_payload_when_full() {
        let mut registry = Registry::new(DeliveryPolicy::DropNewest);
        let (sender, receiver) = async_channel::bounded(1);
        registry.register(id(1), sender);

        futures_lite::future::block_on(async {
            registry.deliver(id(1), json!(1)).await;
            registry.deliver(id(1), json!(2)).await;
        });

        assert_eq!(receiver.try_recv().unwrap().unwrap(), json!(1));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn drop_oldest_displaces_queued_payload_when_full() {
        let mut registry = Registry::new(DeliveryPolicy::DropOldest);
        let (sender, receiver) = async_channel::bounded(1);
        registry.register(id(1), sender);

        futures_lite::future::block_on(async {
            registry.deliver(id(1), json!(1)).await;
            registry.deliver(id(1), json!(2)).await;
        });

        assert_eq!(receiver.try_recv().unwrap().unwrap(), json!(2));
    }

    #[test]
    fn fail_delivers_terminal_error_even_when_full() {
        let mut registry = Registry::new(DeliveryPolicy::DropNewest);
        let (sender, receiver) = async_channel::bounded(1);
        registry.register(id(1), sender);

        futures_lite::future::block_on(registry.deliver(id(1), json!(1)));
        registry.fail(id(1), vec![json!({"message": "boom"})]);

        assert_matches!(receiver.try_recv().unwrap(), Err(Error::Subscription(_)));
        assert!(receiver.is_closed());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn close_all_fans_the_cause_out_to_every_channel() {
        let mut registry = Registry::new(DeliveryPolicy::default());
        let receivers = (1..=2)
            .map(|n| {
                let (sender, receiver) = async_channel::bounded(4);
                registry.register(id(n), sender);
                receiver
            })
            .collect::<Vec<_>>();

        registry.close_all(Some(&Error::Transport("socket closed".into())));

        assert_eq!(registry.len(), 0);
        for receiver in receivers {
            assert_matches!(receiver.try_recv().unwrap(), Err(Error::Transport(_)));
            assert!(receiver.is_closed());
        }
    }
}
