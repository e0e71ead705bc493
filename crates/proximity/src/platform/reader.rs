//! Forwards a stream of near/far changes to a reading callback until cancelled.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::provider::ReadingCallback;

/// Raw readings handed to the monitor: covered sensors read as distance zero.
pub(crate) const NEAR_READING: f32 = 0.0;
pub(crate) const FAR_READING: f32 = 1.0;

pub(crate) fn raw_reading(near: bool) -> f32 {
    if near {
        NEAR_READING
    } else {
        FAR_READING
    }
}

/// Deliver `initial`, then every change, until `token` is cancelled or the
/// stream ends. Dropping the stream on return ends the platform subscription.
pub(crate) async fn forward_readings<S>(
    initial: Option<bool>,
    changes: S,
    token: CancellationToken,
    callback: ReadingCallback,
) where
    S: Stream<Item = bool>,
{
    futures::pin_mut!(changes);

    if token.is_cancelled() {
        return;
    }
    if let Some(near) = initial {
        callback(raw_reading(near));
    }

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            change = changes.next() => match change {
                Some(near) => callback(raw_reading(near)),
                None => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::new_reading_callback;
    use futures::channel::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn recorder() -> (ReadingCallback, Arc<Mutex<Vec<f32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback = new_reading_callback(move |raw| sink.lock().unwrap().push(raw));
        (callback, seen)
    }

    #[tokio::test]
    async fn test_cancel_ends_reader_without_further_changes() {
        let (tx, rx) = mpsc::unbounded();
        let (callback, seen) = recorder();
        let token = CancellationToken::new();

        let reader = tokio::spawn(forward_readings(
            Some(false),
            rx,
            token.clone(),
            callback,
        ));

        tx.unbounded_send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while seen.lock().unwrap().len() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        // The sender stays open: only cancellation can end the reader.
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .expect("reader should stop once cancelled")
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![FAR_READING, NEAR_READING]);

        // Changes after cancellation go nowhere.
        assert!(tx.unbounded_send(false).is_err());
    }

    #[tokio::test]
    async fn test_changes_are_forwarded_until_stream_ends() {
        let (callback, seen) = recorder();
        let changes = futures::stream::iter([true, false, true]);

        forward_readings(None, changes, CancellationToken::new(), callback).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![NEAR_READING, FAR_READING, NEAR_READING]
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start_delivers_nothing() {
        let (callback, seen) = recorder();
        let token = CancellationToken::new();
        token.cancel();

        forward_readings(Some(true), futures::stream::pending(), token, callback).await;

        assert!(seen.lock().unwrap().is_empty());
    }
}
