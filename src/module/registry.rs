use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use sgp4::{Constants, Elements};
use thiserror::Error;

use crate::sat::TrackedObject;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("satellite #{0} not found in data source")]
    NotFound(u32),
    #[error("TLE directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("TLE read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tle: {0}")]
    InvalidTle(#[from] sgp4::TleError),
    #[error("elements error: {0}")]
    Elements(#[from] sgp4::ElementsError),
}

/// External satellite data source, keyed by catalog number.
pub trait SatSource {
    fn fetch(&self, catnum: u32) -> Result<SatRecord, SourceError>;
}

pub struct SatRecord {
    pub catnum: u32,
    pub name: String,
    pub elements: Elements,
    pub constants: Constants,
}

/// Counts reported by a registry load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub requested: usize,
    pub loaded: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// The tracked-object registry. Keys are catalog numbers and stay unique;
/// reload clears the map in place so references to the registry itself
/// remain valid across reloads.
pub struct Registry {
    sats: HashMap<u32, TrackedObject>,
    keys: Vec<u32>,
}

impl Registry {
    pub fn new(keys: Vec<u32>) -> Self {
        Self {
            sats: HashMap::new(),
            keys,
        }
    }

    /// Fetch every configured key from the source. Per-key failures and
    /// duplicates are logged and skipped, never fatal.
    pub fn load(&mut self, source: &dyn SatSource, now: f64) -> LoadSummary {
        let keys = self.keys.clone();
        let mut summary = LoadSummary {
            requested: keys.len(),
            ..LoadSummary::default()
        };

        for catnum in keys {
            if self.sats.contains_key(&catnum) {
                warn!("sat #{catnum} already in list");
                summary.duplicates += 1;
                continue;
            }

            match source.fetch(catnum) {
                Ok(rec) => {
                    self.sats.insert(
                        catnum,
                        TrackedObject::new(catnum, rec.name, rec.elements, rec.constants, now),
                    );
                    summary.loaded += 1;
                }
                Err(e) => {
                    error!("error reading data for #{catnum}: {e}");
                    summary.failed += 1;
                }
            }
        }

        info!(
            "read {} of {} satellites",
            summary.loaded, summary.requested
        );
        summary
    }

    /// Drop all entries and re-run load with the current key list.
    pub fn reload(&mut self, source: &dyn SatSource, now: f64) -> LoadSummary {
        self.sats.clear();
        self.load(source, now)
    }

    /// Replace the configured key list (takes effect on the next reload).
    pub fn set_keys(&mut self, keys: Vec<u32>) {
        self.keys = keys;
    }

    pub fn keys(&self) -> &[u32] {
        &self.keys
    }

    pub fn get(&self, catnum: u32) -> Option<&TrackedObject> {
        self.sats.get(&catnum)
    }

    pub fn get_mut(&mut self, catnum: u32) -> Option<&mut TrackedObject> {
        self.sats.get_mut(&catnum)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedObject> {
        self.sats.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedObject> {
        self.sats.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sats.is_empty()
    }
}

struct RawTle {
    name: Option<String>,
    line1: String,
    line2: String,
}

/// TLE-file data source: scans a directory of `.tle`/`.txt` files once and
/// serves elements by catalog number.
pub struct TleDirSource {
    entries: HashMap<u32, RawTle>,
}

impl TleDirSource {
    pub fn open(tle_dir: &Path) -> Result<Self, SourceError> {
        if !tle_dir.exists() {
            return Err(SourceError::DirectoryNotFound(
                tle_dir.display().to_string(),
            ));
        }

        let mut entries = HashMap::new();
        for entry in fs::read_dir(tle_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            match path.extension().and_then(|e| e.to_str()) {
                Some("tle") | Some("txt") => {}
                _ => continue,
            }

            if let Err(e) = scan_tle_file(&path, &mut entries) {
                warn!("failed to parse TLE file {}: {e}", path.display());
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SatSource for TleDirSource {
    fn fetch(&self, catnum: u32) -> Result<SatRecord, SourceError> {
        let raw = self
            .entries
            .get(&catnum)
            .ok_or(SourceError::NotFound(catnum))?;

        let elements = Elements::from_tle(
            raw.name.clone(),
            raw.line1.as_bytes(),
            raw.line2.as_bytes(),
        )?;
        let constants = Constants::from_elements(&elements)?;
        let name = raw
            .name
            .clone()
            .unwrap_or_else(|| format!("NORAD {catnum}"));

        Ok(SatRecord {
            catnum,
            name,
            elements,
            constants,
        })
    }
}

fn scan_tle_file(path: &PathBuf, entries: &mut HashMap<u32, RawTle>) -> Result<(), SourceError> {
    let content = fs::read_to_string(path)?;

    for (name, line1, line2) in parse_multi_tle(&content) {
        // validate and extract the catalog number up front
        let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())?;
        entries.insert(elements.norad_id as u32, RawTle { name, line1, line2 });
    }

    Ok(())
}

/// Split multi-satellite TLE content into (name, line1, line2) triples,
/// accepting both 2-line and named 3-line sets.
fn parse_multi_tle(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            result.push((
                Some(lines[i].to_string()),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
            i += 3;
        } else {
            i += 1;
        }
    }

    result
}
