use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, RelayType, Result};

#[derive(Deserialize, Clone, Copy, Serialize, Debug, PartialEq)]
pub struct AdcConfig {
    #[serde(rename = "AdcMax")]
    pub adc_max: i32,

    #[serde(rename = "AdcRange")]
    pub adc_range: f64,

    #[serde(rename = "AdcVref")]
    pub adc_vref: f64,

    #[serde(rename = "VCal")]
    pub v_cal: f64,

    #[serde(rename = "ICal")]
    pub i_cal: f64,

    #[serde(rename = "InfiniteVal")]
    pub infinite_val: f64,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            adc_max: 4095,
            adc_range: 4096.0,
            adc_vref: 5.0,
            v_cal: 1.0197,
            i_cal: 1.1187,
            infinite_val: 99999999.0,
        }
    }
}

#[derive(Deserialize, Clone, Serialize, Debug, PartialEq)]
pub struct HardwareConfig {
    #[serde(rename = "RelayType")]
    pub relay_type: RelayType,

    #[serde(rename = "VdivR1")]
    pub vdiv_r1: f64,

    #[serde(rename = "VdivR2")]
    pub vdiv_r2: f64,

    #[serde(rename = "AmmOpAmpRf")]
    pub amm_op_amp_rf: f64,

    #[serde(rename = "AmmOpAmpRg")]
    pub amm_op_amp_rg: f64,

    #[serde(rename = "AmmShuntMaxVolts")]
    pub amm_shunt_max_volts: f64,

    #[serde(rename = "AmmShuntMaxAmps")]
    pub amm_shunt_max_amps: f64,

    #[serde(rename = "ShuntWattage")]
    pub shunt_wattage: f64,

    #[serde(rename = "ShuntMfgPn")]
    pub shunt_mfg_pn: String,

    #[serde(rename = "WireOhms")]
    pub wire_ohms: f64,

    #[serde(rename = "EmrOhms")]
    pub emr_ohms: f64,

    #[serde(rename = "SsrOhms")]
    pub ssr_ohms: f64,

    #[serde(rename = "EmrMaxVolts")]
    pub emr_max_volts: f64,

    #[serde(rename = "SsrMaxVolts")]
    pub ssr_max_volts: f64,

    #[serde(rename = "EmrMaxAmps")]
    pub emr_max_amps: f64,

    #[serde(rename = "SsrMaxAmps")]
    pub ssr_max_amps: f64,

    #[serde(rename = "LoadCapUf")]
    pub load_cap_uf: f64,

    #[serde(rename = "LoadCapV")]
    pub load_cap_v: f64,

    #[serde(rename = "LoadCapEsr")]
    pub load_cap_esr: f64,

    #[serde(rename = "LoadCapMfgPn")]
    pub load_cap_mfg_pn: String,

    #[serde(rename = "NumLoadCaps")]
    pub num_load_caps: u32,

    #[serde(rename = "CapVoltageDeratePct")]
    pub cap_voltage_derate_pct: f64,

    #[serde(rename = "RbOhms")]
    pub rb_ohms: f64,

    #[serde(rename = "RbWattage")]
    pub rb_wattage: f64,

    #[serde(rename = "RbMfgPn")]
    pub rb_mfg_pn: String,

    #[serde(rename = "UsPerPoint")]
    pub us_per_point: f64,

    #[serde(rename = "DoneCh1Adc")]
    pub done_ch1_adc: i32,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            relay_type: RelayType::Ssr,
            vdiv_r1: 150000.0,
            vdiv_r2: 7500.0,
            amm_op_amp_rf: 75000.0,
            amm_op_amp_rg: 1000.0,
            amm_shunt_max_volts: 0.050,
            amm_shunt_max_amps: 10.0,
            shunt_wattage: 3.0,
            shunt_mfg_pn: "LVR035L000FE70".to_owned(),
            wire_ohms: 0.010,
            emr_ohms: 0.100,
            ssr_ohms: 0.070,
            emr_max_volts: 60.0,
            ssr_max_volts: 100.0,
            emr_max_amps: 10.0,
            ssr_max_amps: 30.0,
            load_cap_uf: 1000.0,
            load_cap_v: 100.0,
            load_cap_esr: 0.133,
            load_cap_mfg_pn: "108CKS100MRY".to_owned(),
            num_load_caps: 2,
            cap_voltage_derate_pct: 80.0,
            rb_ohms: 47.0,
            rb_wattage: 5.0,
            rb_mfg_pn: "AC05000004709JAC00".to_owned(),
            us_per_point: 65.0,
            done_ch1_adc: 20,
        }
    }
}

#[derive(Deserialize, Clone, Copy, Serialize, Debug, PartialEq)]
pub struct ModelConfig {
    #[serde(rename = "Isc")]
    pub isc: f64,

    #[serde(rename = "Voc")]
    pub voc: f64,

    #[serde(rename = "ShapeRatio")]
    pub shape_ratio: f64,

    #[serde(rename = "NumSynthPoints")]
    pub num_synth_points: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            isc: 9.0,
            voc: 36.0,
            shape_ratio: 10.0,
            num_synth_points: 100000,
        }
    }
}

/// Budget of the onboard point decimation.
#[derive(Deserialize, Clone, Copy, Serialize, Debug, PartialEq)]
pub struct ReductionTarget {
    #[serde(rename = "MaxPoints")]
    pub max_points: u32,

    #[serde(rename = "MaxConsecutiveDiscards")]
    pub max_consecutive_discards: u32,

    #[serde(rename = "AspectWidth")]
    pub aspect_width: f64,

    #[serde(rename = "AspectHeight")]
    pub aspect_height: f64,
}

impl Default for ReductionTarget {
    fn default() -> Self {
        Self {
            max_points: 140,
            max_consecutive_discards: 300,
            aspect_width: 3.0,
            aspect_height: 2.0,
        }
    }
}

/// Limits and targets used when picking components for a given Isc/Voc.
#[derive(Deserialize, Clone, Copy, Serialize, Debug, PartialEq)]
pub struct OptimizerConfig {
    #[serde(rename = "OptPctHeadroom")]
    pub opt_pct_headroom: f64,

    #[serde(rename = "MaxVdivCurrent")]
    pub max_vdiv_current: f64,

    #[serde(rename = "OpAmpMaxDriveCurrent")]
    pub op_amp_max_drive_current: f64,

    #[serde(rename = "OpAmpMaxInputCurrent")]
    pub op_amp_max_input_current: f64,

    #[serde(rename = "TargetAmmOpAmpGain")]
    pub target_amm_op_amp_gain: f64,

    #[serde(rename = "TargetMaxSwingUs")]
    pub target_max_swing_us: f64,

    #[serde(rename = "TargetBleedRcUs")]
    pub target_bleed_rc_us: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            opt_pct_headroom: 30.0,
            max_vdiv_current: 0.004,
            op_amp_max_drive_current: 0.080,
            op_amp_max_input_current: 0.000000075,
            target_amm_op_amp_gain: 76.0,
            target_max_swing_us: 1000000.0,
            target_bleed_rc_us: 2.0 * 1000.0 * 47.0,
        }
    }
}

impl OptimizerConfig {
    pub fn opt_multiplier(&self) -> f64 {
        1.0 + self.opt_pct_headroom / 100.0
    }
}

#[derive(Deserialize, Clone, Copy, Serialize, Debug, Default, PartialEq, Eq)]
pub enum InterpolationMode {
    #[serde(rename = "Linear")]
    Linear,
    #[default]
    #[serde(rename = "Spline")]
    Spline,
}

impl std::fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpolationMode::Linear => write!(f, "Linear"),
            InterpolationMode::Spline => write!(f, "Spline"),
        }
    }
}

#[derive(Deserialize, Clone, Serialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "Adc")]
    pub adc: AdcConfig,

    #[serde(rename = "Hardware")]
    pub hardware: HardwareConfig,

    #[serde(rename = "Model")]
    pub model: ModelConfig,

    #[serde(rename = "Reduction")]
    pub reduction: ReductionTarget,

    #[serde(rename = "Optimizer")]
    pub optimizer: OptimizerConfig,

    #[serde(rename = "Interpolation")]
    pub interpolation: InterpolationMode,
}

impl Config {
    /// Default location: `<config dir>/ivcurve/config.json`.
    pub fn default_path() -> Result<PathBuf> {
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| Error::Config("Failed to get config directory!".to_owned()))?;
        Ok(base_dirs
            .config_dir()
            .join(Path::new("ivcurve"))
            .join(Path::new("config.json")))
    }

    /// Load the config from the default location. A missing file is not an
    /// error: the built-in defaults are used instead.
    pub fn load() -> Result<(Self, PathBuf)> {
        let path = Self::default_path()?;
        if path.exists() {
            Ok((Self::from_file(&path)?, path))
        } else {
            tracing::warn!("{:?} not found, using built-in defaults", path);
            Ok((Self::default(), path))
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {:?}: {}", path, e)))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str::<Config>(contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Adc:")?;
        writeln!(f, "  AdcMax: {}", self.adc.adc_max)?;
        writeln!(f, "  AdcRange: {}", self.adc.adc_range)?;
        writeln!(f, "  AdcVref: {}", self.adc.adc_vref)?;
        writeln!(f, "  VCal: {}", self.adc.v_cal)?;
        writeln!(f, "  ICal: {}", self.adc.i_cal)?;

        let hw = &self.hardware;
        writeln!(f, "Hardware:")?;
        writeln!(f, "  RelayType: {}", hw.relay_type)?;
        writeln!(f, "  R1: {}  R2: {}", hw.vdiv_r1, hw.vdiv_r2)?;
        writeln!(f, "  Rf: {}  Rg: {}", hw.amm_op_amp_rf, hw.amm_op_amp_rg)?;
        writeln!(
            f,
            "  Shunt: {} V @ {} A, {} W ({})",
            hw.amm_shunt_max_volts, hw.amm_shunt_max_amps, hw.shunt_wattage, hw.shunt_mfg_pn
        )?;
        writeln!(
            f,
            "  LoadCaps: {} x {} uF, {} V, ESR {} ({})",
            hw.num_load_caps, hw.load_cap_uf, hw.load_cap_v, hw.load_cap_esr, hw.load_cap_mfg_pn
        )?;
        writeln!(f, "  Rb: {} ohms, {} W ({})", hw.rb_ohms, hw.rb_wattage, hw.rb_mfg_pn)?;
        writeln!(f, "  WireOhms: {}", hw.wire_ohms)?;
        writeln!(f, "  UsPerPoint: {}", hw.us_per_point)?;
        writeln!(f, "  DoneCh1Adc: {}", hw.done_ch1_adc)?;

        writeln!(f, "Model:")?;
        writeln!(f, "  Isc: {}", self.model.isc)?;
        writeln!(f, "  Voc: {}", self.model.voc)?;
        writeln!(f, "  ShapeRatio: {}", self.model.shape_ratio)?;
        writeln!(f, "  NumSynthPoints: {}", self.model.num_synth_points)?;

        writeln!(f, "Reduction:")?;
        writeln!(f, "  MaxPoints: {}", self.reduction.max_points)?;
        writeln!(
            f,
            "  MaxConsecutiveDiscards: {}",
            self.reduction.max_consecutive_discards
        )?;
        writeln!(
            f,
            "  Aspect: {}:{}",
            self.reduction.aspect_width, self.reduction.aspect_height
        )?;

        writeln!(f, "Optimizer:")?;
        writeln!(f, "  Headroom: {}%", self.optimizer.opt_pct_headroom)?;
        writeln!(f, "  TargetAmmOpAmpGain: {}", self.optimizer.target_amm_op_amp_gain)?;
        writeln!(f, "  TargetMaxSwingUs: {}", self.optimizer.target_max_swing_us)?;
        writeln!(f, "  TargetBleedRcUs: {}", self.optimizer.target_bleed_rc_us)?;

        writeln!(f, "Interpolation: {}", self.interpolation)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{ "Model": { "Isc": 5.5, "Voc": 48.0, "ShapeRatio": 12.0, "NumSynthPoints": 5000 } }"#)
            .unwrap();
        assert_eq!(config.model.isc, 5.5);
        assert_eq!(config.model.num_synth_points, 5000);
        assert_eq!(config.reduction, ReductionTarget::default());
        assert_eq!(config.hardware.relay_type, RelayType::Ssr);
    }

    #[test]
    fn malformed_json_is_config_error() {
        assert!(matches!(
            Config::from_json("{ \"Model\": 3 }"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn json_roundtrip() {
        let mut config = Config::default();
        config.hardware.relay_type = RelayType::Emr;
        config.interpolation = InterpolationMode::Linear;
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"RelayType\":\"EMR\""));
        let parsed = Config::from_json(&json).unwrap();
        assert_eq!(parsed.hardware.relay_type, RelayType::Emr);
        assert_eq!(parsed.interpolation, InterpolationMode::Linear);
        assert_eq!(parsed.reduction, config.reduction);
    }
}
