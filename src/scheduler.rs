//! Timer-driven publishing.
//!
//! Each schedule is an independent Tokio task that pushes the event through
//! the same queue `fire` uses, so scheduled events share its backpressure and
//! ordering behavior. Timers are spawned on the runtime the bus was built on,
//! so `schedule` can be called from any thread. There is no cancellation
//! handle: a repeating timer ends the first time its push is refused because
//! the bus was shut down.

use crate::bus::EventBus;
use crate::event::{Event, EventEnvelope, Origin, Source};
use crate::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Spawns and tracks schedule timers.
#[derive(Debug)]
pub struct Scheduler {
    active: Arc<AtomicUsize>,
    runtime: Handle,
}

/// Decrements the active count however the timer task ends.
struct ActiveTimer(Arc<AtomicUsize>);

impl Drop for ActiveTimer {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Scheduler {
    /// Create a scheduler spawning its timers on `runtime`
    pub fn new(runtime: Handle) -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            runtime,
        }
    }

    /// Number of timers that have not finished yet
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Start a timer that fires `event` on `bus` after `delay`, and then
    /// every `delay` if `repeat` is set.
    pub(crate) fn schedule<E: Event>(
        &self,
        bus: EventBus,
        source: Option<Source>,
        delay: Duration,
        repeat: bool,
        event: E,
    ) -> Result<()> {
        if repeat && delay.is_zero() {
            return Err(Error::ConfigError(
                "repeating schedule needs a non-zero period".to_string(),
            ));
        }

        self.active.fetch_add(1, Ordering::AcqRel);
        let guard = ActiveTimer(self.active.clone());

        debug!(
            event_type = E::event_type(),
            delay_ms = delay.as_millis() as u64,
            repeat,
            "Scheduling event"
        );

        self.runtime.spawn(async move {
            let _guard = guard;

            if repeat {
                let mut ticker = time::interval_at(Instant::now() + delay, delay);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if !Self::fire(&bus, source.clone(), event.clone()).await {
                        break;
                    }
                }
            } else {
                time::sleep(delay).await;
                Self::fire(&bus, source, event).await;
            }
        });

        Ok(())
    }

    async fn fire<E: Event>(bus: &EventBus, source: Option<Source>, event: E) -> bool {
        let envelope = EventEnvelope::new(event, source, Origin::Schedule);
        let event_id = envelope.event_id();

        match bus.enqueue(envelope).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    event_id = %event_id,
                    event_type = E::event_type(),
                    error = %e,
                    "Scheduled event not queued, stopping timer"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::Handler;
    use std::sync::atomic::AtomicU64;

    fn counting_bus_handler(counter: Arc<AtomicU64>) -> Handler {
        Handler::from_fn(move |_bus: EventBus, tick: &'static str| {
            let counter = counter.clone();
            async move {
                assert_eq!(tick, "tick");
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_one_shot_fires_once() {
        let bus = EventBus::builder().build().await.unwrap();
        let counter = Arc::new(AtomicU64::new(0));
        bus.subscribe(counting_bus_handler(counter.clone()));

        bus.schedule(None, Duration::from_millis(100), false, "tick").unwrap();
        assert_eq!(bus.scheduler().active(), 1);

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(250)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(bus.scheduler().active(), 0);

        bus.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_repeating_fires_until_shutdown() {
        let bus = EventBus::builder().build().await.unwrap();
        let counter = Arc::new(AtomicU64::new(0));
        bus.subscribe(counting_bus_handler(counter.clone()));

        bus.schedule(None, Duration::from_millis(100), true, "tick").unwrap();

        time::sleep(Duration::from_millis(250)).await;
        assert!(counter.load(Ordering::SeqCst) >= 2);

        bus.shutdown_and_wait().await.unwrap();
        let after_shutdown = counter.load(Ordering::SeqCst);

        time::sleep(Duration::from_millis(250)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_shutdown);
        assert_eq!(bus.scheduler().active(), 0);
    }

    #[test]
    fn test_schedule_from_thread_outside_runtime() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let bus = runtime.block_on(EventBus::builder().build()).unwrap();
        let counter = Arc::new(AtomicU64::new(0));
        bus.subscribe(counting_bus_handler(counter.clone()));

        let remote = bus.clone();
        std::thread::spawn(move || {
            remote.schedule(None, Duration::from_millis(10), false, "tick")
        })
        .join()
        .unwrap()
        .unwrap();

        runtime.block_on(async { time::sleep(Duration::from_millis(200)).await });
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        runtime.block_on(bus.shutdown_and_wait()).unwrap();
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let bus = EventBus::builder().build().await.unwrap();

        let err = bus.schedule(None, Duration::ZERO, true, "tick").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert_eq!(bus.scheduler().active(), 0);

        bus.shutdown().await.unwrap();
    }
}
