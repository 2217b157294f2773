mod event_list;
mod glance;
mod sat_list;
mod single_sat;
mod telemetry;

pub use event_list::EventListSink;
pub use glance::GlanceSink;
pub use sat_list::SatListSink;
pub use single_sat::SingleSatSink;
pub use telemetry::TelemetrySink;

use log::warn;

use crate::config::TelemetryConfig;
use crate::module::registry::Registry;

/// A per-cycle snapshot consumer. Sinks hold catalog numbers, never object
/// references, and re-lookup every cycle; a missing key means the object
/// was removed and the sink retracts its row. Sinks never report errors
/// back to the scheduler.
pub trait Sink: Send {
    fn name(&self) -> &'static str;

    /// Deliver the cycle snapshot at simulated time `tstamp` (daynum).
    fn update(&mut self, registry: &Registry, tstamp: f64);

    /// Repopulate rows from scratch, after a registry (re)load.
    fn rebuild(&mut self, registry: &Registry);
}

/// View kinds understood in the layout grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    List,
    Map,
    Polar,
    Single,
    Event,
}

impl ViewKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ViewKind::List),
            1 => Some(ViewKind::Map),
            2 => Some(ViewKind::Polar),
            3 => Some(ViewKind::Single),
            4 => Some(ViewKind::Event),
            _ => None,
        }
    }
}

/// Build the view sinks described by a (validated) layout grid, in grid
/// order, plus the telemetry exporter when configured.
pub fn build_sinks(
    layout: &[i32],
    telemetry: Option<&TelemetryConfig>,
) -> Vec<Box<dyn Sink>> {
    let mut sinks: Vec<Box<dyn Sink>> = Vec::new();

    for group in layout.chunks_exact(5) {
        let sink: Box<dyn Sink> = match ViewKind::from_code(group[0]) {
            Some(ViewKind::Single) => Box::new(SingleSatSink::new()),
            Some(ViewKind::Event) => Box::new(EventListSink::new()),
            // map and polar render elsewhere; their data content is the
            // full state table
            Some(ViewKind::List) | Some(ViewKind::Map) | Some(ViewKind::Polar) => {
                Box::new(SatListSink::new())
            }
            None => {
                warn!("invalid view type ({}), using list view", group[0]);
                Box::new(SatListSink::new())
            }
        };
        sinks.push(sink);
    }

    if let Some(cfg) = telemetry {
        match TelemetrySink::new(cfg) {
            Ok(sink) => sinks.push(Box::new(sink)),
            Err(e) => warn!("telemetry sink disabled: {e}"),
        }
    }

    sinks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_kind_codes() {
        assert_eq!(ViewKind::from_code(0), Some(ViewKind::List));
        assert_eq!(ViewKind::from_code(4), Some(ViewKind::Event));
        assert_eq!(ViewKind::from_code(7), None);
    }

    #[test]
    fn sinks_follow_grid_order() {
        let layout = [0, 0, 1, 0, 1, 4, 1, 2, 0, 1, 99, 2, 3, 0, 1];
        let sinks = build_sinks(&layout, None);
        assert_eq!(sinks.len(), 3);
        assert_eq!(sinks[0].name(), "sat-list");
        assert_eq!(sinks[1].name(), "event-list");
        assert_eq!(sinks[2].name(), "sat-list");
    }
}
