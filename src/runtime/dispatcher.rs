use std::{io::Write, sync::Arc};

use tokio::{sync::Mutex, task::JoinHandle};

use crate::persist::PersistError;

use super::events::{Notification, NotificationStream};

/// Destination for delivered reminders.
///
/// Sinks run on a blocking worker, one notification at a time, in the order
/// they were registered.
pub trait NotificationSink: Send {
    /// Handles one notification.
    fn deliver(&mut self, notification: &Notification) -> Result<(), PersistError>;
}

/// Writes each message as one line.
pub struct ConsoleSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> ConsoleSink<W> {
    /// Sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ConsoleSink<std::io::Stdout> {
    /// Sink writing to standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> NotificationSink for ConsoleSink<W> {
    fn deliver(&mut self, notification: &Notification) -> Result<(), PersistError> {
        writeln!(self.out, "Reminder: {}", notification.message)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Counters returned when the consumer loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Notifications received.
    pub received: usize,
    /// Individual sink failures.
    pub sink_failures: usize,
}

type SharedSinks = Arc<Mutex<Vec<Box<dyn NotificationSink>>>>;

/// Spawns the single consumer of `stream`.
///
/// Notifications are handed to the sinks strictly in arrival order; a slow
/// sink holds up everything queued behind it. The task finishes once every
/// sender is gone and the queue is empty.
pub fn spawn_dispatcher(
    mut stream: NotificationStream,
    sinks: Vec<Box<dyn NotificationSink>>,
) -> JoinHandle<DispatchStats> {
    let sinks: SharedSinks = Arc::new(Mutex::new(sinks));
    tokio::spawn(async move {
        let mut stats = DispatchStats::default();
        while let Some(notification) = stream.recv().await {
            stats.received += 1;
            log::info!(
                "reminder fired for event {}: {}",
                notification.event_id,
                notification.message
            );
            stats.sink_failures += deliver_all(&sinks, notification).await;
        }
        log::info!(target: "system", "notification channel closed after {} messages", stats.received);
        stats
    })
}

async fn deliver_all(sinks: &SharedSinks, notification: Notification) -> usize {
    let sinks_ref = Arc::clone(sinks);
    let joined = tokio::task::spawn_blocking(move || {
        let mut sinks = sinks_ref.blocking_lock();
        let mut failures = 0;
        for sink in sinks.iter_mut() {
            if let Err(err) = sink.deliver(&notification) {
                log::error!("delivering notification for event {} failed: {err}", notification.event_id);
                failures += 1;
            }
        }
        failures
    })
    .await;

    match joined {
        Ok(failures) => failures,
        Err(err) => {
            log::error!("notification sink worker failed: {err}");
            1
        }
    }
}
