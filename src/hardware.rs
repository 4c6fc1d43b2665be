use serde::{Deserialize, Serialize};

use crate::{AdcConfig, Error, HardwareConfig, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayType {
    /// Electromechanical relay: the load caps sit in the short-circuit path.
    #[serde(rename = "EMR")]
    Emr,
    /// Solid-state relay.
    #[serde(rename = "SSR")]
    Ssr,
}

impl std::fmt::Display for RelayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayType::Emr => write!(f, "EMR"),
            RelayType::Ssr => write!(f, "SSR"),
        }
    }
}

impl HardwareConfig {
    pub fn relay_ohms(&self) -> f64 {
        match self.relay_type {
            RelayType::Ssr => self.ssr_ohms,
            RelayType::Emr => self.emr_ohms,
        }
    }

    pub fn relay_max_volts(&self) -> f64 {
        match self.relay_type {
            RelayType::Ssr => self.ssr_max_volts,
            RelayType::Emr => self.emr_max_volts,
        }
    }

    pub fn relay_max_amps(&self) -> f64 {
        match self.relay_type {
            RelayType::Ssr => self.ssr_max_amps,
            RelayType::Emr => self.emr_max_amps,
        }
    }

    /// ESR of the parallel load caps; zero for SSR designs.
    pub fn load_caps_ohms(&self) -> f64 {
        match self.relay_type {
            RelayType::Ssr => 0.0,
            RelayType::Emr if self.num_load_caps == 0 => 0.0,
            RelayType::Emr => self.load_cap_esr / self.num_load_caps as f64,
        }
    }

    pub fn load_caps_uf(&self) -> f64 {
        self.num_load_caps as f64 * self.load_cap_uf
    }

    pub fn load_cap_max_volts(&self) -> f64 {
        self.load_cap_v * (self.cap_voltage_derate_pct / 100.0)
    }

    pub fn amm_shunt_resistance(&self) -> f64 {
        self.amm_shunt_max_volts / self.amm_shunt_max_amps
    }

    pub fn amm_op_amp_gain(&self) -> f64 {
        1.0 + self.amm_op_amp_rf / self.amm_op_amp_rg
    }

    pub fn vdiv_ratio(&self) -> f64 {
        self.vdiv_r2 / (self.vdiv_r1 + self.vdiv_r2)
    }

    /// Resistance of the path the hardware sees at "short circuit". The curve
    /// below this load is never sampled.
    pub fn short_circuit_ohms(&self) -> f64 {
        self.amm_shunt_resistance() + self.wire_ohms + self.relay_ohms() + self.load_caps_ohms()
    }

    /// Seconds to wait between curves so that the bleed resistor stays within
    /// its power rating.
    pub fn min_swing_interval(&self, voc: f64) -> f64 {
        let load_caps_farads = self.load_caps_uf() / 1000000.0;
        let load_cap_joules = 0.5 * load_caps_farads * voc * voc;
        load_cap_joules / self.rb_wattage
    }

    /// Volts per ADC code on CH0.
    pub fn v_mult(&self, adc: &AdcConfig) -> f64 {
        adc.adc_vref / adc.adc_range / self.vdiv_ratio() * adc.v_cal
    }

    /// Amps per ADC code on CH1.
    pub fn i_mult(&self, adc: &AdcConfig) -> f64 {
        adc.adc_vref / adc.adc_range / self.amm_op_amp_gain() / self.amm_shunt_resistance()
            * adc.i_cal
    }
}

/// Conversion constants between physical units and ADC codes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdcScale {
    pub adc_max: i32,
    /// Voltage that maps to `adc_max`.
    pub v_sat: f64,
    /// Current that maps to `adc_max`.
    pub i_sat: f64,
    /// Resistance reported for zero-current points.
    pub infinite_val: f64,
}

impl AdcScale {
    pub fn new(adc_max: i32, v_sat: f64, i_sat: f64, infinite_val: f64) -> Result<Self> {
        if adc_max <= 0 {
            return Err(Error::InvalidInput(format!("ADC max must be positive, got {adc_max}")));
        }
        if !(v_sat.is_finite() && v_sat > 0.0 && i_sat.is_finite() && i_sat > 0.0) {
            return Err(Error::DegenerateGeometry(format!(
                "saturation values must be positive and finite (v_sat={v_sat}, i_sat={i_sat})"
            )));
        }
        Ok(Self {
            adc_max,
            v_sat,
            i_sat,
            infinite_val,
        })
    }

    pub fn from_hardware(hw: &HardwareConfig, adc: &AdcConfig) -> Result<Self> {
        let max = adc.adc_max as f64;
        Self::new(
            adc.adc_max,
            max * hw.v_mult(adc),
            max * hw.i_mult(adc),
            adc.infinite_val,
        )
    }

    pub fn steps_per_volt(&self) -> f64 {
        self.adc_max as f64 / self.v_sat
    }

    pub fn steps_per_amp(&self) -> f64 {
        self.adc_max as f64 / self.i_sat
    }

    pub fn volts_to_code(&self, volts: f64) -> i32 {
        self.saturate(self.steps_per_volt() * volts)
    }

    pub fn amps_to_code(&self, amps: f64) -> i32 {
        self.saturate(self.steps_per_amp() * amps)
    }

    pub fn code_to_volts(&self, code: i32) -> f64 {
        code as f64 / self.steps_per_volt()
    }

    pub fn code_to_amps(&self, code: i32) -> f64 {
        code as f64 / self.steps_per_amp()
    }

    fn saturate(&self, value: f64) -> i32 {
        (value.round() as i64).clamp(0, self.adc_max as i64) as i32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_circuit_path_depends_on_relay() {
        let mut hw = HardwareConfig::default();
        assert!((hw.short_circuit_ohms() - (0.005 + 0.010 + 0.070)).abs() < 1e-12);

        hw.relay_type = RelayType::Emr;
        let expected = 0.005 + 0.010 + 0.100 + 0.133 / 2.0;
        assert!((hw.short_circuit_ohms() - expected).abs() < 1e-12);
    }

    #[test]
    fn default_saturation() {
        let scale =
            AdcScale::from_hardware(&HardwareConfig::default(), &AdcConfig::default()).unwrap();
        assert!((scale.v_sat - 107.04).abs() < 0.05, "v_sat = {}", scale.v_sat);
        assert!((scale.i_sat - 14.716).abs() < 0.01, "i_sat = {}", scale.i_sat);
    }

    #[test]
    fn codes_saturate() {
        let scale = AdcScale::new(4095, 100.0, 10.0, 99999999.0).unwrap();
        assert_eq!(scale.volts_to_code(150.0), 4095);
        assert_eq!(scale.volts_to_code(-1.0), 0);
        assert_eq!(scale.amps_to_code(5.0), 2048);
        assert!((scale.code_to_volts(4095) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_saturation_rejected() {
        assert!(matches!(
            AdcScale::new(4095, 0.0, 10.0, 99999999.0),
            Err(Error::DegenerateGeometry(_))
        ));
    }
}
