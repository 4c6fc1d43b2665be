//! Human readable summary of a simulated run: component values, voltage and
//! current limits, and how hard each part is pushed.

use std::fmt::{self, Display, Formatter};

use crate::{AdcScale, CurveModel, HardwareConfig, OptimizerConfig, Synthesis};

/// Rating of R1, R2, Rf and Rg.
pub const QTR_WATT: f64 = 0.25;

const EXCEEDED: &str = "     <== EXCEEDED!!";
const TOO_MUCH: &str = "     <== TOO MUCH!!";

#[derive(Clone, Debug)]
pub struct SimReport {
    pub isc: f64,
    pub voc: f64,
    pub hardware: HardwareConfig,
    pub scale: AdcScale,
    pub optimizer: OptimizerConfig,
    pub swing_time_us: f64,
    pub points_recorded: usize,
    pub points_discarded: u32,
    pub bleed_pct: f64,
    pub unbled_volts: f64,
}

impl SimReport {
    pub fn new(
        model: &CurveModel,
        hardware: &HardwareConfig,
        scale: &AdcScale,
        optimizer: &OptimizerConfig,
        synthesis: &Synthesis,
    ) -> Self {
        Self {
            isc: model.isc(),
            voc: model.voc(),
            hardware: hardware.clone(),
            scale: *scale,
            optimizer: *optimizer,
            swing_time_us: synthesis.swing_time_us,
            points_recorded: synthesis.adc_pairs.len(),
            points_discarded: synthesis.discarded,
            bleed_pct: synthesis.bleed_pct,
            unbled_volts: synthesis.unbled_volts,
        }
    }

    /// Divider current at Voc.
    pub fn vdiv_amps(&self) -> f64 {
        self.voc / (self.hardware.vdiv_r1 + self.hardware.vdiv_r2)
    }

    pub fn vdiv_r1_watts(&self) -> f64 {
        self.vdiv_amps().powi(2) * self.hardware.vdiv_r1
    }

    pub fn vdiv_r2_watts(&self) -> f64 {
        self.vdiv_amps().powi(2) * self.hardware.vdiv_r2
    }

    /// Shunt dissipation at Isc.
    pub fn shunt_watts(&self) -> f64 {
        self.isc.powi(2) * self.hardware.amm_shunt_resistance()
    }

    /// Current through Rf and Rg with Isc flowing through the shunt.
    pub fn rf_rg_amps(&self) -> f64 {
        let hw = &self.hardware;
        let v_op_amp_out = self.isc * hw.amm_shunt_resistance() * hw.amm_op_amp_gain();
        v_op_amp_out / (hw.amm_op_amp_rf + hw.amm_op_amp_rg)
    }

    /// Highest measurable voltage and what limits it.
    pub fn max_voltage(&self) -> (f64, String) {
        let hw = &self.hardware;
        let cap_max = hw.load_cap_max_volts();
        let relay_max = hw.relay_max_volts();
        let v_max = self.scale.v_sat.min(relay_max).min(cap_max);
        let reason = if v_max == cap_max {
            format!(
                "({}% of {}V load cap rating)",
                shorten_value(hw.cap_voltage_derate_pct),
                shorten_value(hw.load_cap_v)
            )
        } else if v_max == relay_max {
            format!("({} max voltage)", hw.relay_type)
        } else {
            "(ADC saturation)".to_owned()
        };
        (v_max, reason)
    }

    pub fn max_current(&self) -> (f64, String) {
        let relay_max = self.hardware.relay_max_amps();
        let i_max = self.scale.i_sat.min(relay_max);
        let reason = if i_max == relay_max {
            format!("({} max current)", self.hardware.relay_type)
        } else {
            "(ADC saturation)".to_owned()
        };
        (i_max, reason)
    }

    fn write_components(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let hw = &self.hardware;
        writeln!(f, "Component values:")?;
        writeln!(f, "  Relay type: {}", hw.relay_type)?;
        writeln!(f, "  R1: {} ohms, 1/4W", shorten_value(hw.vdiv_r1))?;
        writeln!(f, "  R2: {} ohms, 1/4W", shorten_value(hw.vdiv_r2))?;
        writeln!(f, "  Rf: {} ohms, 1/4W", shorten_value(hw.amm_op_amp_rf))?;
        writeln!(f, "  Rg: {} ohms, 1/4W", shorten_value(hw.amm_op_amp_rg))?;
        writeln!(
            f,
            "  Shunt: {} ohms, {}W  PN: {}",
            hw.amm_shunt_resistance(),
            shorten_value(hw.shunt_wattage),
            hw.shunt_mfg_pn
        )?;
        writeln!(
            f,
            "  Load caps: {} x {} uF, {}V  PN: {}",
            hw.num_load_caps,
            shorten_value(hw.load_cap_uf),
            shorten_value(hw.load_cap_v),
            hw.load_cap_mfg_pn
        )?;
        writeln!(
            f,
            "  Rb: {} ohms, {}W  PN: {}",
            shorten_value(hw.rb_ohms),
            shorten_value(hw.rb_wattage),
            hw.rb_mfg_pn
        )
    }

    fn write_limits(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Limits:")?;

        let (v_max, reason) = self.max_voltage();
        let flag = if self.voc > v_max { EXCEEDED } else { "" };
        writeln!(f, "  Max voltage: {} V {} {}", sigfigs(v_max, 4), reason, flag)?;

        let (i_max, reason) = self.max_current();
        let flag = if self.isc > i_max { EXCEEDED } else { "" };
        writeln!(f, "  Max current: {} A {} {}", sigfigs(i_max, 4), reason, flag)
    }

    fn write_results(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation data:")?;
        writeln!(f, "  Swing time: {} microseconds", self.swing_time_us as i64)?;
        writeln!(f, "  Points recorded: {}", self.points_recorded)?;
        writeln!(f, "  Points discarded: {}", self.points_discarded)?;

        let flag = if self.bleed_pct < 99.0 {
            "     <== INSUFFICIENT!!"
        } else {
            ""
        };
        writeln!(
            f,
            "  Bleed %: {} ({} V @ 1 s) {}",
            sigfigs(self.bleed_pct, 5),
            sigfigs(self.unbled_volts, 3),
            flag
        )?;

        for (name, watts) in [("R1", self.vdiv_r1_watts()), ("R2", self.vdiv_r2_watts())] {
            let pct = pct_rated(watts, QTR_WATT);
            let flag = if pct > 100.0 { TOO_MUCH } else { "" };
            writeln!(
                f,
                "  {} power: {} mW ({} % rated) {}",
                name,
                sigfigs(watts * 1000.0, 3),
                sigfigs(pct, 3),
                flag
            )?;
        }

        let shunt_pct = pct_rated(self.shunt_watts(), self.hardware.shunt_wattage);
        let flag = if shunt_pct > 300.0 {
            TOO_MUCH
        } else if shunt_pct > 100.0 {
            "     <== OK (low duty cycle)"
        } else {
            ""
        };
        writeln!(
            f,
            "  Shunt power: {} mW ({} % rated) {}",
            sigfigs(self.shunt_watts() * 1000.0, 3),
            sigfigs(shunt_pct, 3),
            flag
        )?;

        let rf_rg_amps = self.rf_rg_amps();
        writeln!(
            f,
            "  Rf,Rg current @ Isc: {} uA (1/{} op amp drive, {}x op amp input)",
            sigfigs(rf_rg_amps * 1000000.0, 4),
            round_sigfigs(self.optimizer.op_amp_max_drive_current / rf_rg_amps, 4) as i64,
            round_sigfigs(rf_rg_amps / self.optimizer.op_amp_max_input_current, 4) as i64
        )?;

        let interval = self.hardware.min_swing_interval(self.voc);
        let flag = if interval > 1.0 { "     <== WARNING!!" } else { "" };
        writeln!(
            f,
            "  Min swing interval (Rb wattage): {} seconds {}",
            sigfigs(interval, 2),
            flag
        )?;

        let adc_max = self.scale.adc_max as f64;
        let v_steps = self.scale.volts_to_code(self.voc);
        let i_steps = self.scale.amps_to_code(self.isc);
        writeln!(f, "  Resolution:")?;
        writeln!(
            f,
            "    ADC steps from 0V to Voc: {} ({}% utilization)",
            v_steps,
            (100.0 * v_steps as f64 / adc_max).round() as i64
        )?;
        writeln!(
            f,
            "    ADC steps from 0A to Isc: {} ({}% utilization)",
            i_steps,
            (100.0 * i_steps as f64 / adc_max).round() as i64
        )
    }
}

impl Display for SimReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Isc: {} A     Voc: {} V", self.isc, self.voc)?;
        writeln!(f)?;
        self.write_components(f)?;
        writeln!(f)?;
        self.write_limits(f)?;
        writeln!(f)?;
        self.write_results(f)
    }
}

fn pct_rated(watts: f64, rating: f64) -> f64 {
    (100.0 * watts / rating * 100.0).round() / 100.0
}

/// `value` rounded to `figs` significant figures.
pub fn round_sigfigs(value: f64, figs: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10f64.powi(figs as i32 - 1 - magnitude);
    (value * scale).round() / scale
}

/// `value` with `figs` significant figures, always with a decimal point:
/// `sigfigs(99.87654, 3) == "99.9"`, `sigfigs(123456.0, 2) == "120000.0"`.
pub fn sigfigs(value: f64, figs: u32) -> String {
    let rounded = round_sigfigs(value, figs);
    if rounded == 0.0 || !rounded.is_finite() {
        return format!("{:?}", rounded);
    }
    let magnitude = rounded.abs().log10().floor() as i32;
    let decimals = (figs as i32 - 1 - magnitude).max(1) as usize;
    let text = format!("{:.*}", decimals, rounded);
    let trimmed = text.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_owned()
    }
}

/// Component value with a `k` suffix from 1000 up; integral values without
/// a fraction: `4700 -> "4.7k"`, `47000 -> "47k"`, `0.005 -> "0.005"`.
pub fn shorten_value(value: f64) -> String {
    if value >= 1000.0 {
        let k_value = value / 1000.0;
        if k_value == k_value.trunc() {
            format!("{}k", k_value as i64)
        } else {
            format!("{}k", k_value)
        }
    } else if value == value.trunc() {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{generate, AdcConfig, ReductionTarget, TimingParams};

    fn report(isc: f64, voc: f64, hw: HardwareConfig) -> SimReport {
        let scale = AdcScale::from_hardware(&hw, &AdcConfig::default()).unwrap();
        let model = CurveModel::new(isc, voc, 10.0).unwrap();
        let timing = TimingParams::from_hardware(&hw, 100000);
        let synthesis = generate(&model, &timing, &ReductionTarget::default(), &scale).unwrap();
        SimReport::new(&model, &hw, &scale, &OptimizerConfig::default(), &synthesis)
    }

    #[test]
    fn significant_figures() {
        assert_eq!(sigfigs(99.87654, 3), "99.9");
        assert_eq!(sigfigs(99.96, 3), "100.0");
        assert_eq!(sigfigs(0.0012345, 2), "0.0012");
        assert_eq!(sigfigs(123456.0, 2), "120000.0");
        assert_eq!(sigfigs(36.0, 3), "36.0");
        assert_eq!(sigfigs(0.0, 3), "0.0");
        assert_eq!(round_sigfigs(1234.5678, 4), 1235.0);
    }

    #[test]
    fn shortened_values() {
        assert_eq!(shorten_value(47000.0), "47k");
        assert_eq!(shorten_value(4700.0), "4.7k");
        assert_eq!(shorten_value(1000.0), "1k");
        assert_eq!(shorten_value(680.0), "680");
        assert_eq!(shorten_value(4.7), "4.7");
        assert_eq!(shorten_value(0.005), "0.005");
    }

    #[test]
    fn default_run_report() {
        let r = report(9.0, 36.0, HardwareConfig::default());
        let text = r.to_string();

        assert!(text.starts_with("Isc: 9 A     Voc: 36 V\n"));
        assert!(text.contains("  R1: 150k ohms, 1/4W\n"));
        assert!(text.contains("  R2: 7.5k ohms, 1/4W\n"));
        assert!(text.contains("  Rb: 47 ohms, 5W  PN: AC05000004709JAC00\n"));
        // SSR at 100 V vs 80% of a 100 V cap
        assert!(text.contains("  Max voltage: 80.0 V (80% of 100V load cap rating) \n"));
        assert!(text.contains("  Max current: 14.72 A (ADC saturation) \n"));
        assert!(!text.contains("EXCEEDED"));
        assert!(text.contains(&format!("  Points recorded: {}\n", r.points_recorded)));

        let (v_max, _) = r.max_voltage();
        assert_eq!(v_max, 80.0);
        assert!(r.vdiv_r1_watts() < QTR_WATT);
    }

    #[test]
    fn flags_exceeded_limits() {
        let mut hw = HardwareConfig::default();
        hw.relay_type = crate::RelayType::Emr;
        let r = report(12.0, 70.0, hw);
        let text = r.to_string();

        // EMR limits: 60 V, 10 A
        let (v_max, reason) = r.max_voltage();
        assert_eq!(v_max, 60.0);
        assert_eq!(reason, "(EMR max voltage)");
        assert!(text.contains("  Max voltage: 60.0 V (EMR max voltage)      <== EXCEEDED!!\n"));
        assert!(text.contains("  Max current: 10.0 A (EMR max current)      <== EXCEEDED!!\n"));
    }

    #[test]
    fn shunt_rating_levels() {
        let mut r = report(9.0, 36.0, HardwareConfig::default());
        // 9 A through 5 mOhm: 405 mW of 3 W
        assert!((r.shunt_watts() - 0.405).abs() < 1e-12);
        assert!(!r.to_string().contains("low duty cycle"));

        r.hardware.shunt_wattage = 0.3;
        assert!(r.to_string().contains("<== OK (low duty cycle)"));
        r.hardware.shunt_wattage = 0.1;
        assert!(r.to_string().contains("Shunt power: 405.0 mW (405.0 % rated)      <== TOO MUCH!!"));
    }
}
