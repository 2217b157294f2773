//! The periodic update driver.
//!
//! A single timer task calls [`tick`] at a fixed period. Each tick tries to
//! take the cycle lock without blocking: if the previous cycle is still
//! running, the tick is skipped (logged, no state touched) rather than
//! queued, and the next completed cycle's real-time delta simply spans the
//! gap. Within a cycle all satellites are refreshed, the view sinks are
//! updated in registration order, the satellites are refreshed again to
//! reconcile anything a sink update perturbed, and the clock commits.

use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::module::clock::TimeController;
use crate::module::registry::{LoadSummary, Registry, SatSource};
use crate::predict::{events, OrbitEngine};
use crate::sat::{self, datetime_from_daynum};
use crate::sink::{GlanceSink, Sink};
use crate::station::GroundStation;

/// Sub-cadence counters inside the base tick. Free-running, reset to zero
/// on wraparound.
#[derive(Debug, Clone, Copy)]
pub struct CycleCounters {
    pub head_count: u32,
    pub head_period: u32,
    pub event_count: u32,
    pub event_period: u32,
}

impl CycleCounters {
    /// Derive the sub-cadence periods from the tick period: header about
    /// once per second, events about once per minute of wall time. The
    /// event counter starts saturated so the very first cycle computes
    /// events.
    pub fn for_period(period: Duration) -> Self {
        let ms = period.as_millis().max(1) as u32;
        let head_period = (1_000 / ms).max(1);
        let event_period = (60_000 / ms).max(1);
        Self {
            head_count: 0,
            head_period,
            event_count: event_period,
            event_period,
        }
    }
}

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Cycle ran to completion; carries the cycle sequence number.
    Completed(u64),
    /// Previous cycle still held the lock; nothing was touched.
    Skipped,
}

/// Everything the cycle lock guards: clock, counters, registry and sinks.
/// Holding the `Mutex` around this struct *is* the Running state; unlocked
/// means Idle.
pub struct ModuleCore {
    pub name: String,
    pub observer: GroundStation,
    pub clock: TimeController,
    pub counters: CycleCounters,
    pub registry: Registry,
    pub source: Box<dyn SatSource + Send>,
    pub engine: Box<dyn OrbitEngine + Send>,
    pub views: Vec<Box<dyn Sink>>,
    pub glance: GlanceSink,
    pub horizon_days: f64,
    pub time_format: String,
    pub header: String,
    pub cycle_seq: u64,
}

impl ModuleCore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        observer: GroundStation,
        period: Duration,
        throttle: f64,
        horizon_days: f64,
        time_format: String,
        keys: Vec<u32>,
        source: Box<dyn SatSource + Send>,
        engine: Box<dyn OrbitEngine + Send>,
        views: Vec<Box<dyn Sink>>,
    ) -> Self {
        Self {
            name,
            observer,
            clock: TimeController::new(sat::daynum_now(), throttle),
            counters: CycleCounters::for_period(period),
            registry: Registry::new(keys),
            source,
            engine,
            views,
            glance: GlanceSink::new(),
            horizon_days,
            time_format,
            header: String::new(),
            cycle_seq: 0,
        }
    }

    /// Initial satellite load; per-key failures are skipped inside
    /// [`Registry::load`]. Sinks get their rows afterwards.
    pub fn load_sats(&mut self) -> LoadSummary {
        let now = self.clock.sim_current();
        let summary = self.registry.load(self.source.as_ref(), now);
        for sink in &mut self.views {
            sink.rebuild(&self.registry);
        }
        summary
    }

    /// Drop and re-fetch all satellites, then rebuild every sink's rows.
    /// Runs under the same lock as ticks, so it waits for an in-flight
    /// cycle instead of racing it.
    pub fn reload_sats(&mut self) -> LoadSummary {
        info!("reloading satellites for module {}", self.name);
        let now = self.clock.sim_current();
        let summary = self.registry.reload(self.source.as_ref(), now);

        // next AOS/LOS must be recalculated for the fresh objects
        self.counters.event_count = 0;
        for sink in &mut self.views {
            sink.rebuild(&self.registry);
        }
        self.glance.invalidate();
        summary
    }

    /// One full update cycle. `real_now` is the sampled wall clock as a
    /// daynum; callers other than tests pass `daynum_now()`.
    pub fn run_cycle(&mut self, real_now: f64) {
        self.clock.advance(real_now);
        let now = self.clock.sim_current();

        self.counters.head_count += 1;
        if self.counters.head_count == self.counters.head_period {
            self.counters.head_count = 0;
            self.header = datetime_from_daynum(now)
                .format(&self.time_format)
                .to_string();
        }

        // wraparound is what arms the event recalculation below
        if self.counters.event_count == self.counters.event_period {
            self.counters.event_count = 0;
        }

        self.update_sats(now);

        let Self {
            views, registry, ..
        } = self;
        for sink in views.iter_mut() {
            sink.update(registry, now);
        }

        // sink updates may have perturbed object state; refresh again so
        // every consumer of this cycle saw coherent data
        self.update_sats(now);

        self.glance.maybe_rebuild(&self.registry, now);

        self.counters.event_count += 1;
        self.clock.commit();
        self.cycle_seq += 1;
        debug!("cycle {} committed for module {}", self.cycle_seq, self.name);
    }

    fn update_sats(&mut self, now: f64) {
        let events_due = self.counters.event_count == 0;
        let Self {
            registry,
            engine,
            observer,
            horizon_days,
            ..
        } = self;

        for sat in registry.iter_mut() {
            events::update_events(
                sat,
                observer,
                engine.as_ref(),
                now,
                *horizon_days,
                events_due,
            );

            match engine.propagate(sat, observer, now) {
                Ok(obs) => sat.obs = obs,
                Err(e) => warn!("#{}: propagation failed: {e}", sat.catnum),
            }
        }
    }
}

/// One timer tick: try the cycle lock, run a cycle or skip.
pub fn tick(core: &Mutex<ModuleCore>) -> TickOutcome {
    let mut core = match core.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::WouldBlock) => {
            warn!("previous cycle missed its deadline");
            return TickOutcome::Skipped;
        }
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
    };

    core.run_cycle(sat::daynum_now());
    TickOutcome::Completed(core.cycle_seq)
}

struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// The tracking module: owns the shared core and the timer task driving it.
pub struct Module {
    core: Arc<Mutex<ModuleCore>>,
    period: Duration,
    worker: Option<WorkerHandle>,
}

impl Module {
    pub fn new(core: ModuleCore, period: Duration) -> Self {
        Self {
            core: Arc::new(Mutex::new(core)),
            period,
            worker: None,
        }
    }

    pub fn core(&self) -> &Arc<Mutex<ModuleCore>> {
        &self.core
    }

    /// Spawn the periodic timer task. No-op if already running.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }

        let core = self.core.clone();
        let period = self.period;
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        tick(&core);
                    }
                    _ = &mut stop_rx => break,
                }
            }
        });

        self.worker = Some(WorkerHandle { stop_tx, join });
    }

    /// Stop the timer. An in-flight cycle always completes; this only
    /// prevents further ticks.
    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
    }

    /// Reload satellites under the cycle lock (blocks until any in-flight
    /// cycle commits).
    pub fn reload_sats(&self) -> LoadSummary {
        let mut core = self.core.lock().unwrap_or_else(|p| p.into_inner());
        core.reload_sats()
    }

    #[allow(dead_code)]
    pub fn set_throttle(&self, throttle: f64) {
        let mut core = self.core.lock().unwrap_or_else(|p| p.into_inner());
        core.clock.set_throttle(throttle);
    }

    /// Manual simulated-time override; only effective at throttle 0.
    #[allow(dead_code)]
    pub fn set_manual_time(&self, sim_time: f64) {
        let mut core = self.core.lock().unwrap_or_else(|p| p.into_inner());
        core.clock.set_manual(sim_time);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::module::registry::tests::FakeSource;
    use crate::predict::FakeEngine;
    use crate::sat::OrbitClass;
    use crate::sink::EventListSink;

    fn test_core(keys: Vec<u32>, engine: FakeEngine, event_period: u32) -> ModuleCore {
        let mut core = ModuleCore::new(
            "test".into(),
            GroundStation::from_coordinates("55.1, 12.5", None).unwrap(),
            Duration::from_secs(1),
            1.0,
            3.0,
            "%Y/%m/%d %H:%M:%S".into(),
            keys,
            Box::new(FakeSource::new()),
            Box::new(engine),
            vec![Box::new(EventListSink::new())],
        );
        core.counters = CycleCounters {
            head_count: 0,
            head_period: 1,
            event_count: event_period,
            event_period,
        };
        core.load_sats();
        core
    }

    fn counters(engine: &FakeEngine) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (engine.propagate_calls.clone(), engine.rise_calls.clone())
    }

    #[test]
    fn skipped_tick_changes_nothing() {
        let engine = FakeEngine::new();
        let (propagate_calls, _) = counters(&engine);
        let core = Arc::new(Mutex::new(test_core(vec![25544], engine, 4)));

        let guard = core.lock().unwrap();
        let held = core.clone();
        let outcome = std::thread::spawn(move || tick(&held)).join().unwrap();
        assert_eq!(outcome, TickOutcome::Skipped);

        assert_eq!(guard.cycle_seq, 0);
        assert_eq!(guard.counters.event_count, 4);
        assert_eq!(propagate_calls.load(Ordering::SeqCst), 0);
        drop(guard);

        // next tick with the lock free proceeds normally
        assert_eq!(tick(&core), TickOutcome::Completed(1));
    }

    #[test]
    fn events_run_on_the_coarse_cadence() {
        let engine = FakeEngine::new();
        let (propagate_calls, rise_calls) = counters(&engine);
        let mut core = test_core(vec![25544], engine, 4);

        for i in 0..9 {
            core.run_cycle(100.0 + i as f64 * 1e-5);
        }

        // event cycles 1, 5 and 9; the search runs in both update passes
        assert_eq!(rise_calls.load(Ordering::SeqCst), 6);
        // two propagation passes per object per cycle
        assert_eq!(propagate_calls.load(Ordering::SeqCst), 18);
        assert_eq!(core.cycle_seq, 9);
    }

    #[test]
    fn geostationary_objects_are_never_searched() {
        let engine = FakeEngine::new();
        let (propagate_calls, rise_calls) = counters(&engine);
        let mut core = test_core(vec![25544], engine, 2);
        core.registry.get_mut(25544).unwrap().class = OrbitClass::Geostationary;

        for i in 0..6 {
            core.run_cycle(100.0 + i as f64 * 1e-5);
        }

        assert_eq!(rise_calls.load(Ordering::SeqCst), 0);
        assert!(propagate_calls.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn stale_events_persist_between_coarse_cycles() {
        let mut engine = FakeEngine::new();
        engine.rise_result = 100.05;
        let mut core = test_core(vec![25544], engine, 20);

        core.run_cycle(100.0);
        assert_eq!(core.registry.get(25544).unwrap().aos, 100.05);

        // intervening cycles leave the value untouched even though the
        // engine result could have changed
        for i in 1..20 {
            core.run_cycle(100.0 + i as f64 * 1e-5);
            assert_eq!(core.registry.get(25544).unwrap().aos, 100.05);
        }
    }

    #[test]
    fn clock_commits_once_per_cycle() {
        let engine = FakeEngine::new();
        let mut core = test_core(vec![25544], engine, 4);
        core.clock = TimeController::new(100.0, 1.0);

        core.run_cycle(100.001389);
        let state = core.clock.current();
        assert_eq!(state.sim_current, 100.001389);
        assert_eq!(state.sim_prev, 100.001389);
        assert_eq!(state.real_prev, 100.001389);
    }

    #[test]
    fn reload_resets_event_counter_and_rows() {
        let engine = FakeEngine::new();
        let mut core = test_core(vec![100, 200], engine, 10);
        core.run_cycle(100.0);
        assert_ne!(core.counters.event_count, 0);

        core.registry.set_keys(vec![300]);
        let summary = core.reload_sats();
        assert_eq!(summary.loaded, 1);
        assert_eq!(core.counters.event_count, 0);
        assert_eq!(core.registry.len(), 1);
    }

    #[test]
    fn header_follows_its_own_cadence() {
        let engine = FakeEngine::new();
        let mut core = test_core(vec![25544], engine, 4);
        core.counters.head_period = 3;
        core.clock = TimeController::new(100.0, 1.0);

        core.run_cycle(100.0);
        core.run_cycle(100.0);
        assert!(core.header.is_empty());
        core.run_cycle(100.0);
        assert!(!core.header.is_empty());
    }
}
