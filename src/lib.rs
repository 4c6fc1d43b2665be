mod config;
mod hardware;
mod limit_float_precission;

pub mod components;
pub mod convert;
pub mod data_file;
pub mod generator;
pub mod interpolator;
pub mod model;
pub mod reducer;
pub mod report;
pub mod spline;

use serde::{Deserialize, Serialize};

use limit_float_precission::serialize_float_6dgt;

pub use config::{
    AdcConfig, Config, HardwareConfig, InterpolationMode, ModelConfig, OptimizerConfig,
    ReductionTarget,
};
pub use generator::{generate, Synthesis, TimingParams};
pub use hardware::{AdcScale, RelayType};
pub use interpolator::{find_mpp, Interpolator};
pub use model::CurveModel;
pub use reducer::{reduce, Reduction};

#[derive(Debug)]
pub enum Error {
    InvalidInput(String),
    ModelDivergence {
        done_threshold: i32,
        last_current_code: Option<i32>,
    },
    DegenerateGeometry(String),
    Config(String),
    Parse(String),
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Error::ModelDivergence {
                done_threshold,
                last_current_code,
            } => match last_current_code {
                Some(code) => write!(
                    f,
                    "Curve never reached the done threshold ({done_threshold}), last current code: {code}"
                ),
                None => write!(
                    f,
                    "Curve never reached the done threshold ({done_threshold}), no points recorded"
                ),
            },
            Error::DegenerateGeometry(msg) => write!(f, "Degenerate geometry: {msg}"),
            Error::Config(msg) => write!(f, "Config error: {msg}"),
            Error::Parse(msg) => write!(f, "Parse error: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        let msg = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(e) => Self::Io(e),
            _ => Self::Parse(msg),
        }
    }
}

/// One point of an I-V curve.
///
/// `resistance` is `voltage / current`, or the configured "infinite" sentinel
/// when the current is exactly zero. `power` is `voltage * current`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point4 {
    #[serde(serialize_with = "serialize_float_6dgt")]
    pub current: f64,
    #[serde(serialize_with = "serialize_float_6dgt")]
    pub voltage: f64,
    #[serde(serialize_with = "serialize_float_6dgt")]
    pub resistance: f64,
    #[serde(serialize_with = "serialize_float_6dgt")]
    pub power: f64,
}

impl Point4 {
    pub fn new(current: f64, voltage: f64, resistance: f64, power: f64) -> Self {
        Self {
            current,
            voltage,
            resistance,
            power,
        }
    }

    /// Build a point from a (voltage, current) pair, deriving resistance and power.
    pub fn from_vi(voltage: f64, current: f64, infinite_val: f64) -> Self {
        let resistance = if current == 0.0 {
            infinite_val
        } else {
            voltage / current
        };
        Self {
            current,
            voltage,
            resistance,
            power: voltage * current,
        }
    }
}

/// Raw hardware sample: CH0 carries the voltage, CH1 the current.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdcPair {
    pub voltage_code: i32,
    pub current_code: i32,
}

impl AdcPair {
    pub fn new(voltage_code: i32, current_code: i32) -> Self {
        Self {
            voltage_code,
            current_code,
        }
    }
}

impl From<(i32, i32)> for AdcPair {
    fn from((voltage_code, current_code): (i32, i32)) -> Self {
        Self::new(voltage_code, current_code)
    }
}
