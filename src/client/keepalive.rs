use std::{future::pending, time::Duration};

use futures_lite::{stream, Stream};

use super::ConnectionCommand;

#[derive(Clone, Debug)]
pub(super) struct KeepAliveSettings {
    /// How often to send a keep alive ping
    pub(super) interval: Option<Duration>,

    /// How many pings can be sent without receiving a reply before
    /// the connection is considered dropped
    pub(super) retries: usize,
}

impl Default for KeepAliveSettings {
    fn default() -> Self {
        Self {
            interval: None,
            retries: 3,
        }
    }
}

impl KeepAliveSettings {
    /// Emits a `Ping` command every interval.  Counting unanswered pings is
    /// the actors job, since any inbound traffic resets the count.
    pub(super) fn run(&self) -> impl Stream<Item = ConnectionCommand> + 'static {
        let interval = self.interval;

        stream::unfold((), move |()| async move {
            match interval {
                Some(duration) => futures_timer::Delay::new(duration).await,
                None => pending::<()>().await,
            }

            Some((ConnectionCommand::Ping, ()))
        })
    }
}
