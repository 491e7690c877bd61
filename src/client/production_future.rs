use std::{
    future::{poll_fn, Future},
    pin::pin,
    task::Poll,
};

use futures_lite::future;

/// Polls a future to completion while also polling the producer that feeds
/// it.
///
/// Returns `None` if the producer finishes first - the future can never
/// complete once its producer is gone.  Otherwise returns the futures
/// output along with the still-running producer.
pub(crate) async fn read_from_producer<F>(
    future: F,
    mut producer: future::Boxed<()>,
) -> Option<(F::Output, future::Boxed<()>)>
where
    F: Future,
{
    let mut future = pin!(future);

    let output = poll_fn(|cx| {
        if let Poll::Ready(output) = future.as_mut().poll(cx) {
            return Poll::Ready(Some(output));
        }

        match producer.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    })
    .await?;

    Some((output, producer))
}
