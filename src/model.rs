use crate::{Error, ModelConfig, Result};

/// Simplified diode-equation PV curve:
///
/// `I(V) = Isc - A * (exp(B * V) - 1)`, with `B = shape_ratio / Voc` and `A`
/// chosen so that `I(Voc) == 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveModel {
    isc: f64,
    voc: f64,
    shape_ratio: f64,
    a_coeff: f64,
    b_coeff: f64,
}

impl CurveModel {
    pub fn new(isc: f64, voc: f64, shape_ratio: f64) -> Result<Self> {
        if !(isc.is_finite() && isc > 0.0) {
            return Err(Error::InvalidInput(format!("Isc must be positive, got {isc}")));
        }
        if !(voc.is_finite() && voc > 0.0) {
            return Err(Error::DegenerateGeometry(format!(
                "Voc must be positive, got {voc}"
            )));
        }
        if !(shape_ratio.is_finite() && shape_ratio > 0.0) {
            return Err(Error::InvalidInput(format!(
                "shape ratio must be positive, got {shape_ratio}"
            )));
        }

        let b_coeff = shape_ratio / voc;
        let growth = (b_coeff * voc).exp_m1();
        if !growth.is_finite() {
            return Err(Error::DegenerateGeometry(format!(
                "shape ratio {shape_ratio} overflows the exponential"
            )));
        }
        let a_coeff = isc / growth;

        Ok(Self {
            isc,
            voc,
            shape_ratio,
            a_coeff,
            b_coeff,
        })
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Self::new(config.isc, config.voc, config.shape_ratio)
    }

    pub fn isc(&self) -> f64 {
        self.isc
    }

    pub fn voc(&self) -> f64 {
        self.voc
    }

    pub fn shape_ratio(&self) -> f64 {
        self.shape_ratio
    }

    pub fn a_coeff(&self) -> f64 {
        self.a_coeff
    }

    pub fn b_coeff(&self) -> f64 {
        self.b_coeff
    }

    pub fn current(&self, volts: f64) -> f64 {
        self.isc - self.a_coeff * (self.b_coeff * volts).exp_m1()
    }

    /// Load resistance that would hold the source at `volts`.
    pub fn load_ohms(&self, volts: f64, infinite_val: f64) -> f64 {
        let amps = self.current(volts);
        if amps == 0.0 {
            infinite_val
        } else {
            volts / amps
        }
    }
}
