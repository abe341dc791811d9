//! Delayed deletion of the bot's own replies in group channels.

use std::{future::Future, time::Duration};

use log::{debug, error, info};
use tokio::{task::JoinHandle, time::Instant};

use crate::error::{BotError, Result};

/// How long a group reply stays up before it is deleted.
pub const RETRACTION_DELAY: Duration = Duration::from_secs(60);

/// What the outbound send reported back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SentMessage {
    pub message_id: Option<u64>,
}

impl SentMessage {
    #[must_use]
    pub fn new(message_id: u64) -> Self {
        Self {
            message_id: Some(message_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRetraction {
    pub self_id: u64,
    pub message_id: Option<u64>,
    pub group_id: u64,
    pub fire_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetractionOutcome {
    Deleted,
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct RetractionScheduler {
    delay: Duration,
}

impl Default for RetractionScheduler {
    fn default() -> Self {
        Self::new(RETRACTION_DELAY)
    }
}

impl RetractionScheduler {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Spawn a task that deletes `sent` after the delay.
    ///
    /// Does nothing outside group contexts. The returned handle may be dropped;
    /// the task runs to completion on its own.
    pub fn schedule<F, Fut>(
        &self,
        sent: SentMessage,
        group_id: Option<u64>,
        self_id: u64,
        delete_fn: F,
    ) -> Option<JoinHandle<RetractionOutcome>>
    where
        F: FnOnce(u64, u64) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let group_id = group_id?;
        let pending = PendingRetraction {
            self_id,
            message_id: sent.message_id,
            group_id,
            fire_at: Instant::now() + self.delay,
        };
        debug!(
            "Scheduled retraction of message {:?} in group {group_id} in {}s",
            pending.message_id,
            self.delay.as_secs()
        );
        Some(tokio::spawn(run_retraction(pending, delete_fn)))
    }
}

/// Wait until `fire_at`, then make one delete attempt. Never returns an error.
pub async fn run_retraction<F, Fut>(pending: PendingRetraction, delete_fn: F) -> RetractionOutcome
where
    F: FnOnce(u64, u64) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    tokio::time::sleep_until(pending.fire_at).await;

    let Some(message_id) = pending.message_id else {
        error!(
            "Cannot retract reply in group {}: {}",
            pending.group_id,
            BotError::MissingMessageId
        );
        return RetractionOutcome::Failed;
    };

    info!(
        "Retracting message {message_id} (self_id: {}, group: {})",
        pending.self_id, pending.group_id
    );

    match delete_fn(message_id, pending.self_id).await {
        Ok(()) => RetractionOutcome::Deleted,
        Err(e) => {
            let err = BotError::Retraction {
                message_id,
                reason: e.to_string(),
            };
            error!("{err}");
            RetractionOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    type Calls = Arc<Mutex<Vec<(u64, u64)>>>;

    fn recording(calls: &Calls) -> impl FnOnce(u64, u64) -> std::future::Ready<Result<()>> + use<> {
        let calls = Arc::clone(calls);
        move |message_id, self_id| {
            calls.lock().unwrap().push((message_id, self_id));
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deletes_after_delay_with_ids() {
        let calls = Calls::default();
        let scheduler = RetractionScheduler::default();
        let started = Instant::now();

        let handle = scheduler
            .schedule(SentMessage::new(42), Some(7), 99, recording(&calls))
            .unwrap();

        assert_eq!(handle.await.unwrap(), RetractionOutcome::Deleted);
        assert!(started.elapsed() >= RETRACTION_DELAY);
        assert_eq!(*calls.lock().unwrap(), vec![(42, 99)]);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_fire_early() {
        let calls = Calls::default();
        let handle = RetractionScheduler::default()
            .schedule(SentMessage::new(1), Some(7), 99, recording(&calls))
            .unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        tokio::task::yield_now().await;
        assert!(calls.lock().unwrap().is_empty());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(handle.await.unwrap(), RetractionOutcome::Deleted);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn private_context_is_never_scheduled() {
        let calls = Calls::default();
        let handle =
            RetractionScheduler::default().schedule(SentMessage::new(1), None, 99, recording(&calls));

        assert!(handle.is_none());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_message_id_fails_without_delete() {
        let calls = Calls::default();
        let handle = RetractionScheduler::default()
            .schedule(SentMessage::default(), Some(7), 99, recording(&calls))
            .unwrap();

        assert_eq!(handle.await.unwrap(), RetractionOutcome::Failed);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_failure_is_contained() {
        let handle = RetractionScheduler::default()
            .schedule(SentMessage::new(5), Some(7), 99, |_, _| async {
                Err::<(), _>(BotError::Config("delete rejected".to_string()))
            })
            .unwrap();

        assert_eq!(handle.await.unwrap(), RetractionOutcome::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_retractions_are_independent() {
        let deleted = Arc::new(AtomicUsize::new(0));
        let scheduler = RetractionScheduler::new(Duration::from_secs(10));

        let mut handles = Vec::new();
        for message_id in 0..5_u64 {
            let deleted = Arc::clone(&deleted);
            let handle = scheduler
                .schedule(SentMessage::new(message_id), Some(1), 99, move |id, _| async move {
                    if id == 2 {
                        return Err(BotError::Config("boom".to_string()));
                    }
                    deleted.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
            handles.push(handle);
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        assert_eq!(deleted.load(Ordering::SeqCst), 4);
        assert_eq!(outcomes[2], RetractionOutcome::Failed);
        assert_eq!(
            outcomes
                .iter()
                .filter(|outcome| **outcome == RetractionOutcome::Deleted)
                .count(),
            4
        );
    }

    async fn exploding_delete(_message_id: u64, _self_id: u64) -> Result<()> {
        panic!("transport exploded")
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_delete_does_not_affect_others() {
        let calls = Calls::default();
        let scheduler = RetractionScheduler::default();

        let panicking = scheduler
            .schedule(SentMessage::new(1), Some(7), 99, exploding_delete)
            .unwrap();
        let healthy = scheduler
            .schedule(SentMessage::new(2), Some(7), 99, recording(&calls))
            .unwrap();

        assert!(panicking.await.is_err());
        assert_eq!(healthy.await.unwrap(), RetractionOutcome::Deleted);
        assert_eq!(*calls.lock().unwrap(), vec![(2, 99)]);
    }
}
