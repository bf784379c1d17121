use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DEFAULT_DISPATCH_QUEUE_CAPACITY, DEFAULT_DISPATCH_WORKERS, DEFAULT_FACE_MODEL_URL, EVENTS_PATH,
    SEND_TIMEOUT,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("invalid collector address {address}: {reason}")]
    Collector { address: String, reason: String },
    #[error("node id file {path}: {source}")]
    NodeId {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine data directory for the node id")]
    NoDataDir,
}

/// Timing parameters of the tracking loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopTiming {
    /// Minimum time between two detection passes.
    pub detection_interval: Duration,
    /// Minimum visible duration for an expired track to be reported.
    pub send_delay: Duration,
    /// Grace window of continuous tracker failure before a track expires.
    pub failure_delay: Duration,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            detection_interval: Duration::from_secs(1),
            send_delay: Duration::from_millis(400),
            failure_delay: Duration::from_secs(1),
        }
    }
}

/// Camera node settings, loadable from a JSON file.
///
/// Durations are stored in seconds. Every field has a default, so a config
/// file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub detection_interval: f64,
    pub send_delay: f64,
    pub failure_delay: f64,
    pub min_box_fraction: f64,
    pub max_box_fraction: f64,
    pub node_id: Option<u64>,
    pub collector_address: String,
    pub dispatch_workers: usize,
    pub dispatch_queue_capacity: usize,
    pub send_timeout: f64,
    pub confidence: f64,
    /// Download location of the face model when it is not cached yet.
    pub model_url: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let timing = LoopTiming::default();
        Self {
            detection_interval: timing.detection_interval.as_secs_f64(),
            send_delay: timing.send_delay.as_secs_f64(),
            failure_delay: timing.failure_delay.as_secs_f64(),
            min_box_fraction: 0.1,
            max_box_fraction: 1.0,
            node_id: None,
            collector_address: "http://localhost:8000".to_string(),
            dispatch_workers: DEFAULT_DISPATCH_WORKERS,
            dispatch_queue_capacity: DEFAULT_DISPATCH_QUEUE_CAPACITY,
            send_timeout: SEND_TIMEOUT.as_secs_f64(),
            confidence: 0.5,
            model_url: DEFAULT_FACE_MODEL_URL.to_string(),
        }
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("detection_interval", self.detection_interval)?;
        positive("send_delay", self.send_delay)?;
        positive("failure_delay", self.failure_delay)?;
        if !(self.send_timeout.is_finite() && self.send_timeout > 0.0) {
            return Err(invalid("send_timeout", "must be a positive number of seconds"));
        }
        if !(self.min_box_fraction > 0.0
            && self.min_box_fraction <= self.max_box_fraction
            && self.max_box_fraction <= 1.0)
        {
            return Err(invalid(
                "min_box_fraction/max_box_fraction",
                "must satisfy 0 < min <= max <= 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(invalid("confidence", "must be within 0.0-1.0"));
        }
        if self.dispatch_workers == 0 {
            return Err(invalid("dispatch_workers", "must be at least 1"));
        }
        if self.dispatch_queue_capacity == 0 {
            return Err(invalid("dispatch_queue_capacity", "must be at least 1"));
        }
        if self.node_id == Some(0) {
            return Err(invalid("node_id", "must be greater than 0"));
        }
        self.events_url()?;
        reqwest::Url::parse(&self.model_url)
            .map_err(|e| invalid("model_url", &e.to_string()))?;
        Ok(())
    }

    pub fn timing(&self) -> LoopTiming {
        LoopTiming {
            detection_interval: Duration::from_secs_f64(self.detection_interval),
            send_delay: Duration::from_secs_f64(self.send_delay),
            failure_delay: Duration::from_secs_f64(self.failure_delay),
        }
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.send_timeout)
    }

    /// The collector's event endpoint, `{collector_address}/v1/events/`.
    pub fn events_url(&self) -> Result<reqwest::Url, ConfigError> {
        let collector_err = |reason: String| ConfigError::Collector {
            address: self.collector_address.clone(),
            reason,
        };
        let base =
            reqwest::Url::parse(&self.collector_address).map_err(|e| collector_err(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(collector_err("scheme must be http or https".to_string()));
        }
        base.join(EVENTS_PATH)
            .map_err(|e| collector_err(e.to_string()))
    }

    /// The configured node id, or the persistent id of this device.
    pub fn resolve_node_id(&self) -> Result<u64, ConfigError> {
        match self.node_id {
            Some(id) => Ok(id),
            None => load_or_create_node_id(&node_id_path()?),
        }
    }
}

fn positive(field: &'static str, seconds: f64) -> Result<(), ConfigError> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number of seconds"))
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// Location of the persistent node id, e.g. `~/.local/share/facewatch/node_id`.
pub fn node_id_path() -> Result<PathBuf, ConfigError> {
    dirs::data_local_dir()
        .map(|d| d.join("facewatch").join("node_id"))
        .ok_or(ConfigError::NoDataDir)
}

/// Reads the node id stored at `path`, generating and storing one on first use.
///
/// Generated ids are 48-bit and never zero, like a hardware address.
pub fn load_or_create_node_id(path: &Path) -> Result<u64, ConfigError> {
    let io_err = |e| ConfigError::NodeId {
        path: path.to_path_buf(),
        source: e,
    };

    if let Ok(text) = fs::read_to_string(path) {
        if let Ok(id) = text.trim().parse::<u64>() {
            if id > 0 {
                return Ok(id);
            }
        }
        log::warn!("Ignoring malformed node id in {}", path.display());
    }

    let id = generate_node_id();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, id.to_string()).map_err(io_err)?;
    log::info!("Generated node id {id} at {}", path.display());
    Ok(id)
}

fn generate_node_id() -> u64 {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
        ^ u64::from(std::process::id()).rotate_left(32);

    // splitmix64 finalizer
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;

    (z & 0xFFFF_FFFF_FFFF).max(1)
}
