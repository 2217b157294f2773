use log::info;

use crate::module::registry::Registry;
use crate::sat::{is_never, TrackedObject};
use crate::sink::Sink;

/// Countdown row for the upcoming-events table.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub catnum: u32,
    pub name: String,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    /// True when the satellite is up and the pending event is LOS.
    pub above: bool,
    /// Days until the pending event, -1.0 when there is none.
    pub countdown: f64,
}

/// Next-event view: one row per satellite with a countdown to whichever of
/// AOS/LOS comes next.
pub struct EventListSink {
    rows: Vec<EventRow>,
}

impl EventListSink {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn rows(&self) -> &[EventRow] {
        &self.rows
    }

    fn fill_row(row: &mut EventRow, sat: &TrackedObject, now: f64) {
        row.azimuth_deg = sat.obs.azimuth_deg;
        row.elevation_deg = sat.obs.elevation_deg;
        row.above = sat.obs.elevation_deg >= 0.0;

        row.countdown = if sat.obs.elevation_deg > 0.0 {
            if !is_never(sat.los) {
                sat.los - now
            } else {
                -1.0 // stationary or no event
            }
        } else if !is_never(sat.aos) {
            sat.aos - now
        } else {
            -1.0
        };
    }
}

impl Sink for EventListSink {
    fn name(&self) -> &'static str {
        "event-list"
    }

    fn update(&mut self, registry: &Registry, tstamp: f64) {
        self.rows.retain_mut(|row| match registry.get(row.catnum) {
            Some(sat) => {
                Self::fill_row(row, sat, tstamp);
                true
            }
            None => {
                info!("satellite #{} not tracked anymore, row removed", row.catnum);
                false
            }
        });
    }

    fn rebuild(&mut self, registry: &Registry) {
        self.rows = registry
            .iter()
            .map(|sat| EventRow {
                catnum: sat.catnum,
                name: sat.name.clone(),
                azimuth_deg: sat.obs.azimuth_deg,
                elevation_deg: sat.obs.elevation_deg,
                above: sat.obs.elevation_deg >= 0.0,
                countdown: -1.0,
            })
            .collect();
        self.rows.sort_by_key(|r| r.catnum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::registry::tests::FakeSource;
    use crate::module::registry::Registry;
    use crate::sat::{daynum_now, NEVER};

    fn registry(keys: Vec<u32>) -> Registry {
        let mut r = Registry::new(keys);
        r.load(&FakeSource::new(), daynum_now());
        r
    }

    #[test]
    fn countdown_targets_pending_aos() {
        let mut reg = registry(vec![25544]);
        {
            let sat = reg.get_mut(25544).unwrap();
            sat.obs.elevation_deg = -5.0;
            sat.aos = 100.05;
            sat.los = NEVER;
        }

        let mut sink = EventListSink::new();
        sink.rebuild(&reg);
        sink.update(&reg, 100.04);

        let row = &sink.rows()[0];
        assert!(!row.above);
        assert!((row.countdown - 0.01).abs() < 1e-12);
    }

    #[test]
    fn countdown_targets_los_while_above() {
        let mut reg = registry(vec![25544]);
        {
            let sat = reg.get_mut(25544).unwrap();
            sat.obs.elevation_deg = 12.0;
            sat.aos = NEVER;
            sat.los = 100.10;
        }

        let mut sink = EventListSink::new();
        sink.rebuild(&reg);
        sink.update(&reg, 100.04);

        let row = &sink.rows()[0];
        assert!(row.above);
        assert!((row.countdown - 0.06).abs() < 1e-12);
    }

    #[test]
    fn no_event_yields_minus_one() {
        let mut reg = registry(vec![25544]);
        reg.get_mut(25544).unwrap().obs.elevation_deg = -5.0;

        let mut sink = EventListSink::new();
        sink.rebuild(&reg);
        sink.update(&reg, 100.0);

        assert_eq!(sink.rows()[0].countdown, -1.0);
    }

    #[test]
    fn missing_key_retracts_row() {
        let reg = registry(vec![100, 200]);
        let mut sink = EventListSink::new();
        sink.rebuild(&reg);
        assert_eq!(sink.rows().len(), 2);

        let smaller = registry(vec![200]);
        sink.update(&smaller, 100.0);
        assert_eq!(sink.rows().len(), 1);
        assert_eq!(sink.rows()[0].catnum, 200);
    }
}
