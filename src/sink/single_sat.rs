use log::info;

use crate::module::registry::Registry;
use crate::sat::ObsSet;
use crate::sink::Sink;

/// Detail view for one selected satellite (the lowest catalog number until
/// told otherwise).
pub struct SingleSatSink {
    selected: Option<u32>,
    latest: Option<(ObsSet, f64, f64)>,
}

impl SingleSatSink {
    pub fn new() -> Self {
        Self {
            selected: None,
            latest: None,
        }
    }

    pub fn select(&mut self, catnum: u32) {
        self.selected = Some(catnum);
        self.latest = None;
    }

    pub fn selected(&self) -> Option<u32> {
        self.selected
    }

    pub fn latest(&self) -> Option<&(ObsSet, f64, f64)> {
        self.latest.as_ref()
    }
}

impl Sink for SingleSatSink {
    fn name(&self) -> &'static str {
        "single-sat"
    }

    fn update(&mut self, registry: &Registry, _tstamp: f64) {
        let Some(catnum) = self.selected else {
            return;
        };

        match registry.get(catnum) {
            Some(sat) => self.latest = Some((sat.obs, sat.aos, sat.los)),
            None => {
                info!("satellite #{catnum} not tracked anymore, selection cleared");
                self.selected = None;
                self.latest = None;
            }
        }
    }

    fn rebuild(&mut self, registry: &Registry) {
        if self
            .selected
            .map_or(true, |catnum| registry.get(catnum).is_none())
        {
            self.selected = registry.iter().map(|s| s.catnum).min();
            self.latest = None;
        }
    }
}
