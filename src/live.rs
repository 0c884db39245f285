use rocket::tokio::sync::broadcast::{self, Receiver, Sender};

/// Capacity of the update channel. Subscribers that fall further behind
/// than this see `RecvError::Lagged` and recompute from the store.
const CHANNEL_CAPACITY: usize = 64;

/// Fan-out notification channel signalling that the vote ledger changed.
///
/// One producer (each committed write), many consumers (live tally
/// streams). Sends never block on slow consumers: the channel carries no
/// payload, only "something changed", so a laggard that drops events loses
/// nothing. The next recomputation covers all missed updates.
#[derive(Debug, Clone)]
pub struct UpdateNotifier {
    sender: Sender<()>,
}

impl UpdateNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Signal all subscribers. A send with no subscribers is not an error.
    pub fn notify(&self) {
        let _ = self.sender.send(());
    }

    pub fn subscribe(&self) -> Receiver<()> {
        self.sender.subscribe()
    }
}

impl Default for UpdateNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rocket::async_test]
    async fn notify_without_subscribers_is_fine() {
        let notifier = UpdateNotifier::new();
        notifier.notify();
    }

    #[rocket::async_test]
    async fn subscribers_receive_signals() {
        let notifier = UpdateNotifier::new();
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.subscribe();
        notifier.notify();
        rx1.recv().await.unwrap();
        rx2.recv().await.unwrap();
    }
}
