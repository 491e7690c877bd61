use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures_lite::{future, stream, Stream, StreamExt};

use crate::{
    client::production_future::read_from_producer, graphql::Operation, Error, SubscriptionId,
};

use super::ConnectionCommand;

/// A `futures::Stream` for a subscription.
///
/// Emits an item for each `next` frame received for the subscription, ending
/// when the server completes the stream or with a final `Err` when the
/// subscription or connection fails.  A finished subscription cannot be
/// restarted - issue a new subscribe call instead.
#[pin_project::pin_project(PinnedDrop)]
pub struct Subscription<Op>
where
    Op: Operation,
{
    pub(super) id: SubscriptionId,
    pub(super) stream: Option<stream::Boxed<Result<Op::Response, Error>>>,
    pub(super) drop_sender: Option<async_channel::Sender<SubscriptionId>>,
    // Keeps the command channel open while this subscription is live, so the
    // connection outlives the Client that created it.
    pub(super) actor: async_channel::Sender<ConnectionCommand>,
}

impl<Op> std::fmt::Debug for Subscription<Op>
where
    Op: Operation,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[pin_project::pinned_drop]
impl<Op> PinnedDrop for Subscription<Op>
where
    Op: Operation,
{
    fn drop(mut self: Pin<&mut Self>) {
        let Some(drop_sender) = self.drop_sender.take() else {
            return;
        };
        // We try_send here but the drop_sender channel _should_ be unbounded so
        // this should always work if the connection actor is still alive.
        drop_sender.try_send(self.id).ok();
    }
}

impl<Op> Subscription<Op>
where
    Op: Operation + Send,
{
    /// Returns the identifier for this subscription.
    ///
    /// This can be used with [`crate::Client::stop`] to stop
    /// a running subscription without needing access to the `Subscription`
    /// itself.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stops this subscription.
    ///
    /// The server is sent a `complete` frame for the id.  Payloads already
    /// queued for delivery remain readable by whoever holds the other half
    /// of the handle until it is dropped.
    pub async fn stop(mut self) {
        // Suppress the drop path, the cancel below covers it.
        self.drop_sender.take();
        self.actor
            .send(ConnectionCommand::Cancel(self.id))
            .await
            .ok();
    }

    pub(super) fn join(mut self, future: future::Boxed<()>) -> Self
    where
        Op::Response: 'static,
    {
        self.stream = self
            .stream
            .take()
            .map(|stream| join_stream(stream, future).boxed());
        self
    }
}

impl<Op> Stream for Subscription<Op>
where
    Op: Operation + Unpin,
{
    type Item = Result<Op::Response, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.project().stream.as_mut() {
            None => Poll::Ready(None),
            Some(stream) => stream.poll_next(cx),
        }
    }
}

/// Joins a future onto the execution of a stream returning a stream that also polls
/// the given future.
///
/// If the future ends the stream will still continue till completion but if the stream
/// ends the future will be cancelled.
///
/// This can be used when you have the receivng side of a channel and a future that sends
/// on that channel - combining the two into a single stream that'll run till the channel
/// is exhausted.  If you drop the stream you also cancel the underlying process.
fn join_stream<Item>(
    stream: stream::Boxed<Item>,
    future: future::Boxed<()>,
) -> impl Stream<Item = Item> {
    stream::unfold(ProducerState::Running(stream, future), producer_handler)
}

enum ProducerState<'a, Item> {
    Running(
        Pin<Box<dyn Stream<Item = Item> + Send + 'a>>,
        future::Boxed<()>,
    ),
    Draining(Pin<Box<dyn Stream<Item = Item> + Send + 'a>>),
}

async fn producer_handler<Item>(
    mut state: ProducerState<'_, Item>,
) -> Option<(Item, ProducerState<'_, Item>)> {
    loop {
        match state {
            ProducerState::Running(mut stream, producer) => {
                match read_from_producer(stream.next(), producer).await {
                    Some((item, producer)) => {
                        return Some((item?, ProducerState::Running(stream, producer)));
                    }
                    None => state = ProducerState::Draining(stream),
                }
            }
            ProducerState::Draining(mut stream) => {
                return Some((stream.next().await?, ProducerState::Draining(stream)));
            }
        }
    }
}
