//! Result persistence
//!
//! Curve sets are written as pretty-printed JSON with keys in insertion
//! order, so re-running an identical comparison produces byte-identical
//! files. Destinations are never merged or overwritten implicitly at the
//! directory level; the output directories must not pre-exist.

use std::fs;
use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::{CurveSet, ReportError, Result};

/// Persist a curve set as pretty-printed JSON.
pub fn persist(curves: &CurveSet, path: &Path) -> Result<()> {
    let mut json = serde_json::to_string_pretty(curves)?;
    json.push('\n');
    fs::write(path, json).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a previously persisted curve set.
pub fn load(path: &Path) -> Result<CurveSet> {
    let text = fs::read_to_string(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Persist the encoder command lines used for a run, keyed by codec label
/// in sweep order.
pub fn persist_commands(commands: &[(String, String)], path: &Path) -> Result<()> {
    struct CommandMap<'a>(&'a [(String, String)]);

    impl Serialize for CommandMap<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.0.len()))?;
            for (label, line) in self.0 {
                map.serialize_entry(label, line)?;
            }
            map.end()
        }
    }

    let mut json = serde_json::to_string_pretty(&CommandMap(commands))?;
    json.push('\n');
    fs::write(path, json).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Output directory capability, created once before the pipeline starts.
///
/// Both directories must not already exist; a pre-existing directory is a
/// fatal, user-visible condition with no auto-cleanup.
#[derive(Debug, Clone)]
pub struct OutputDirs {
    /// Where rendered plot images go.
    pub plots: PathBuf,
    /// Where result and command JSON files go.
    pub json_logs: PathBuf,
}

impl OutputDirs {
    /// Create `plots/` and `json_logs/` under `base`, failing if either
    /// already exists.
    pub fn prepare(base: &Path) -> Result<Self> {
        let plots = base.join("plots");
        fs::create_dir(&plots).map_err(|source| ReportError::Write {
            path: plots.clone(),
            source,
        })?;

        let json_logs = base.join("json_logs");
        fs::create_dir(&json_logs).map_err(|source| ReportError::Write {
            path: json_logs.clone(),
            source,
        })?;

        Ok(Self { plots, json_logs })
    }
}
