use log::debug;

use crate::module::registry::Registry;
use crate::sat::is_never;

/// Simulated-time gap that triggers a rebuild, ~60 seconds in days.
const REBUILD_THRESHOLD_DAYS: f64 = 7.0e-4;

#[derive(Debug, Clone, PartialEq)]
pub struct GlanceItem {
    pub catnum: u32,
    pub name: String,
    pub aos: f64,
    pub los: f64,
}

/// Low-frequency "upcoming events" overview, driven on its own
/// simulated-time threshold rather than the view cadence. The item list is
/// recreated from scratch on every rebuild, never patched in place.
pub struct GlanceSink {
    items: Vec<GlanceItem>,
    last_rebuild: f64,
}

impl GlanceSink {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            last_rebuild: 0.0,
        }
    }

    pub fn items(&self) -> &[GlanceItem] {
        &self.items
    }

    pub fn last_rebuild(&self) -> f64 {
        self.last_rebuild
    }

    /// Force a rebuild on the next cycle (used after registry reloads).
    pub fn invalidate(&mut self) {
        self.last_rebuild = 0.0;
    }

    /// Rebuild when enough simulated time has passed since the last one.
    pub fn maybe_rebuild(&mut self, registry: &Registry, now: f64) {
        if (now - self.last_rebuild).abs() <= REBUILD_THRESHOLD_DAYS {
            return;
        }

        debug!("rebuilding sky-at-a-glance snapshot");
        let mut items: Vec<GlanceItem> = registry
            .iter()
            .filter(|sat| !is_never(sat.aos) || !is_never(sat.los))
            .map(|sat| GlanceItem {
                catnum: sat.catnum,
                name: sat.name.clone(),
                aos: sat.aos,
                los: sat.los,
            })
            .collect();
        items.sort_by(|a, b| a.aos.total_cmp(&b.aos));

        self.items = items;
        self.last_rebuild = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::registry::tests::FakeSource;
    use crate::sat::daynum_now;

    #[test]
    fn rebuild_respects_threshold() {
        let mut reg = Registry::new(vec![25544]);
        reg.load(&FakeSource::new(), daynum_now());
        reg.get_mut(25544).unwrap().aos = 100.05;

        let mut glance = GlanceSink::new();
        glance.maybe_rebuild(&reg, 100.0);
        assert_eq!(glance.items().len(), 1);
        assert_eq!(glance.last_rebuild(), 100.0);

        // within the ~60 s window nothing changes
        reg.get_mut(25544).unwrap().aos = 100.99;
        glance.maybe_rebuild(&reg, 100.0 + 5.0e-4);
        assert_eq!(glance.items()[0].aos, 100.05);

        // past the window the snapshot is recreated
        glance.maybe_rebuild(&reg, 100.0 + 8.0e-4);
        assert_eq!(glance.items()[0].aos, 100.99);
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let mut reg = Registry::new(vec![25544]);
        reg.load(&FakeSource::new(), daynum_now());
        reg.get_mut(25544).unwrap().aos = 100.05;

        let mut glance = GlanceSink::new();
        glance.maybe_rebuild(&reg, 100.0);
        reg.get_mut(25544).unwrap().aos = 100.10;

        glance.invalidate();
        glance.maybe_rebuild(&reg, 100.0 + 1.0e-5);
        assert_eq!(glance.items()[0].aos, 100.10);
    }
}
