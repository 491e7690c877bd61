use std::{pin::Pin, task::Poll};

use futures_lite::{future, ready, Stream, StreamExt};
use futures_sink::Sink;
use tungstenite::protocol::CloseFrame;

use crate::{client::Message, Error};

#[cfg_attr(docsrs, doc(cfg(feature = "tungstenite")))]
impl<T> crate::client::Connection for T
where
    T: Stream<Item = Result<tungstenite::Message, tungstenite::Error>>
        + Sink<tungstenite::Message>
        + Send
        + Sync
        + Unpin,
    <T as Sink<tungstenite::Message>>::Error: std::fmt::Display,
{
    async fn receive(&mut self) -> Option<Message> {
        loop {
            match self.next().await? {
                Ok(tungstenite::Message::Text(text)) => {
                    return Some(Message::Text(text));
                }
                Ok(tungstenite::Message::Ping(_)) => return Some(Message::Ping),
                Ok(tungstenite::Message::Pong(_)) => return Some(Message::Pong),
                Ok(tungstenite::Message::Close(frame)) => {
                    return Some(Message::Close {
                        code: frame.as_ref().map(|frame| frame.code.into()),
                        reason: frame.map(|frame| frame.reason.to_string()),
                    });
                }
                Ok(tungstenite::Message::Frame(_) | tungstenite::Message::Binary(_)) => continue,
                Err(error) => {
                    #[allow(unused)]
                    let error = error;
                    crate::logging::warning!("error receiving message: {error:?}");
                    return None;
                }
            }
        }
    }

    async fn send(&mut self, message: Message) -> Result<(), Error> {
        send_via_sink(
            self,
            match message {
                Message::Text(text) => tungstenite::Message::Text(text),
                Message::Close { code, reason } => {
                    tungstenite::Message::Close(code.zip(reason).map(|(code, reason)| CloseFrame {
                        code: code.into(),
                        reason: reason.into(),
                    }))
                }
                Message::Ping => tungstenite::Message::Ping(vec![]),
                Message::Pong => tungstenite::Message::Pong(vec![]),
            },
        )
        .await
        .map_err(|error| Error::Transport(error.to_string()))
    }
}

/// Sends one item into the sink and flushes it.
///
/// `futures::SinkExt::send` without having to pull the whole `futures`
/// crate in for it.
async fn send_via_sink<Si, Item>(sink: &mut Si, item: Item) -> Result<(), Si::Error>
where
    Si: Sink<Item> + Unpin + ?Sized,
{
    let mut item = Some(item);
    future::poll_fn(move |cx| {
        let mut sink = Pin::new(&mut *sink);
        if item.is_some() {
            ready!(sink.as_mut().poll_ready(cx))?;
            if let Some(item) = item.take() {
                sink.as_mut().start_send(item)?;
            }
        }
        ready!(sink.as_mut().poll_flush(cx))?;
        Poll::Ready(Ok(()))
    })
    .await
}
