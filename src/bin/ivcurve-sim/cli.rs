use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum Mode {
    Linear,
    Spline,
}

impl From<Mode> for ivcurve::InterpolationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Linear => ivcurve::InterpolationMode::Linear,
            Mode::Spline => ivcurve::InterpolationMode::Spline,
        }
    }
}

/// Simulate an I-V curve trace of a PV panel
#[derive(Parser)]
#[clap(version)]
pub struct Cli {
    /// Config file, default: <config dir>/ivcurve/config.json
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Short circuit current, A
    #[clap(long)]
    pub isc: Option<f64>,

    /// Open circuit voltage, V
    #[clap(long)]
    pub voc: Option<f64>,

    /// Curve shape, larger is "squarer"
    #[clap(long)]
    pub shape: Option<f64>,

    /// Number of modeled points from 0 V to Voc
    #[clap(short = 'n', long)]
    pub points: Option<u32>,

    /// Max points kept by the reduction
    #[clap(long)]
    pub max_points: Option<u32>,

    /// Max consecutive discarded points
    #[clap(long)]
    pub max_discards: Option<u32>,

    /// Pick standard components for the given Isc/Voc first
    #[clap(long)]
    pub choose_components: bool,

    /// Interpolation mode
    #[clap(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Directory for the run output
    #[clap(short, long, default_value = ".")]
    pub output: PathBuf,
}
