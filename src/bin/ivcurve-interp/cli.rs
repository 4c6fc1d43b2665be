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

/// Interpolate measured I-V curves and print their maximum power points
#[derive(Parser)]
#[clap(version)]
pub struct Cli {
    /// Interpolation mode, default from the config file
    #[clap(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Don't write `<name>_interp.csv` next to each input
    #[clap(long)]
    pub no_output: bool,

    /// Data point CSV files (`Volts, Amps, Watts, Ohms`)
    #[clap(required = true)]
    pub files: Vec<PathBuf>,
}
