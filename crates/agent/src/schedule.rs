use crate::config::{Config, MongoConfig};
use crate::publish::{PublishError, Publisher};
use crate::source::{self, SourceError};
use color_eyre::eyre;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Status(#[from] SourceError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// One unit of repeating work. The scheduler only ever logs a failed run;
/// nothing a cycle returns can stop the ticking.
#[async_trait::async_trait]
pub trait Cycle: Send {
    async fn run(&mut self) -> Result<(), CycleError>;
}

/// The production cycle: fetch a fresh status snapshot, publish its fields.
#[derive(Debug)]
pub struct StatusCycle {
    mongodb: MongoConfig,
    publisher: Publisher,
}

impl StatusCycle {
    pub fn new(config: &Config) -> Self {
        Self {
            mongodb: config.mongodb.clone(),
            publisher: Publisher::new(config.statsd.clone()),
        }
    }
}

#[async_trait::async_trait]
impl Cycle for StatusCycle {
    async fn run(&mut self) -> Result<(), CycleError> {
        let status = source::fetch(&self.mongodb).await?;
        self.publisher.publish(&status).await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Scheduler<C> {
    cycle: C,
    interval: Duration,
}

impl Scheduler<StatusCycle> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(StatusCycle::new(config), config.interval())
    }
}

impl<C: Cycle> Scheduler<C> {
    pub fn new(cycle: C, interval: Duration) -> Self {
        Self { cycle, interval }
    }

    /// Runs cycles on a fixed period until the shutdown watch fires. The
    /// first cycle starts one full interval after start; ticks that land
    /// while a cycle is still executing are coalesced, so at most one cycle
    /// is ever in flight.
    pub async fn start(mut self, mut shutdown_rx: watch::Receiver<bool>) -> eyre::Result<()> {
        let start_at = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start_at, self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);

        info!(interval = ?self.interval, "scheduler running");
        loop {
            tokio::select! {
                // shutdown wins over a pending tick: no new cycle may start
                // once the signal has been observed
                biased;
                _ = shutdown_rx.changed() => break,
                _ = ticks.next() => (),
            };

            let begin = std::time::Instant::now();
            match self.cycle.run().await {
                Ok(()) => debug!("cycle completed in {:?}", begin.elapsed()),
                Err(err) => error!("cycle failed: {err}"),
            }
        }
        info!("scheduler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fails every odd run and requests shutdown once `stop_after` runs have
    /// happened.
    struct FlakyCycle {
        runs: Arc<AtomicUsize>,
        stop_after: usize,
        shutdown_tx: watch::Sender<bool>,
    }

    #[async_trait::async_trait]
    impl Cycle for FlakyCycle {
        async fn run(&mut self) -> Result<(), CycleError> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            if run >= self.stop_after {
                self.shutdown_tx.send(true).unwrap();
            }
            if run % 2 == 1 {
                Err(CycleError::Publish(PublishError::Sink(SinkError::Send(
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
                ))))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycles_do_not_stop_the_ticking() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runs = Arc::new(AtomicUsize::new(0));
        let cycle = FlakyCycle {
            runs: Arc::clone(&runs),
            stop_after: 4,
            shutdown_tx,
        };

        let started = tokio::time::Instant::now();
        Scheduler::new(cycle, Duration::from_secs(1))
            .start(shutdown_rx)
            .await
            .unwrap();

        // runs 1 and 3 failed, yet all four ticks executed a cycle
        assert_eq!(runs.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn no_cycle_runs_after_shutdown_is_observed() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runs = Arc::new(AtomicUsize::new(0));
        let cycle = FlakyCycle {
            runs: Arc::clone(&runs),
            stop_after: usize::MAX,
            shutdown_tx: shutdown_tx.clone(),
        };

        shutdown_tx.send(true).unwrap();
        Scheduler::new(cycle, Duration::from_secs(1))
            .start(shutdown_rx)
            .await
            .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_waits_one_full_interval() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runs = Arc::new(AtomicUsize::new(0));
        let cycle = FlakyCycle {
            runs: Arc::clone(&runs),
            stop_after: 1,
            shutdown_tx,
        };

        let started = tokio::time::Instant::now();
        Scheduler::new(cycle, Duration::from_secs(30))
            .start(shutdown_rx)
            .await
            .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }
}
