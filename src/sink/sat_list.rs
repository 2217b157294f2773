use log::info;

use crate::module::registry::Registry;
use crate::sat::ObsSet;
use crate::sink::Sink;

#[derive(Debug, Clone, PartialEq)]
pub struct SatRow {
    pub catnum: u32,
    pub name: String,
    pub obs: ObsSet,
    pub aos: f64,
    pub los: f64,
}

/// Full state table: one row per satellite with the complete derived set.
pub struct SatListSink {
    rows: Vec<SatRow>,
}

impl SatListSink {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn rows(&self) -> &[SatRow] {
        &self.rows
    }
}

impl Sink for SatListSink {
    fn name(&self) -> &'static str {
        "sat-list"
    }

    fn update(&mut self, registry: &Registry, _tstamp: f64) {
        self.rows.retain_mut(|row| match registry.get(row.catnum) {
            Some(sat) => {
                row.obs = sat.obs;
                row.aos = sat.aos;
                row.los = sat.los;
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
            .map(|sat| SatRow {
                catnum: sat.catnum,
                name: sat.name.clone(),
                obs: sat.obs,
                aos: sat.aos,
                los: sat.los,
            })
            .collect();
        self.rows.sort_by_key(|r| r.catnum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::registry::tests::FakeSource;
    use crate::sat::daynum_now;

    #[test]
    fn rows_track_registry_state() {
        let mut reg = Registry::new(vec![25544]);
        reg.load(&FakeSource::new(), daynum_now());

        let mut sink = SatListSink::new();
        sink.rebuild(&reg);

        reg.get_mut(25544).unwrap().obs.range_km = 1234.5;
        sink.update(&reg, 100.0);
        assert_eq!(sink.rows()[0].obs.range_km, 1234.5);
    }
}
