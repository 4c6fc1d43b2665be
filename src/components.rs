//! Picks standard parts for the curve tracer so that a panel with the given
//! Isc/Voc (plus headroom) fits the ADC range.

use crate::{AdcConfig, Error, HardwareConfig, OptimizerConfig, Result};

/// Stands in for a jumper in the resistor table.
pub const ZERO_OHMS: f64 = 0.0001;
/// R2 fitted when R1 is a jumper and the divider is bypassed.
pub const R2_DEFAULT: f64 = 7500.0;

pub const QTR_WATT_RESISTORS: [f64; 41] = [
    ZERO_OHMS, 47.0, 56.0, 68.0, 75.0, 82.0, 100.0, 120.0, 150.0, 180.0, 220.0, 270.0, 330.0,
    390.0, 470.0, 510.0, 680.0, 820.0, 1000.0, 1500.0, 2200.0, 3300.0, 3900.0, 4700.0, 5600.0,
    6800.0, 7500.0, 8200.0, 10000.0, 15000.0, 22000.0, 33000.0, 39000.0, 47000.0, 56000.0,
    68000.0, 75000.0, 82000.0, 100000.0, 150000.0, 180000.0,
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resistor {
    pub ohms: f64,
    pub watts: f64,
    pub mfg_pn: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Capacitor {
    pub uf: f64,
    pub volts: f64,
    /// `None` when the datasheet does not list it.
    pub esr: Option<f64>,
    pub height_mm: f64,
    pub mfg_pn: &'static str,
}

const fn r(ohms: f64, watts: f64, mfg_pn: &'static str) -> Resistor {
    Resistor { ohms, watts, mfg_pn }
}

const fn c(uf: f64, volts: f64, esr: Option<f64>, height_mm: f64, mfg_pn: &'static str) -> Capacitor {
    Capacitor {
        uf,
        volts,
        esr,
        height_mm,
        mfg_pn,
    }
}

pub const SHUNT_RESISTORS: [Resistor; 10] = [
    r(0.005, 3.0, "LVR035L000FE70"),
    r(0.010, 3.0, "LVR03R0100FE70"),
    r(0.020, 3.0, "LVR03R0200FE70"),
    r(0.040, 3.0, "13FR040E"),
    r(0.080, 3.0, "LVR03R0800FE70"),
    r(0.100, 3.0, "LVR03R1000FE70"),
    r(0.150, 3.0, "LVR03R1500FE70"),
    r(0.330, 3.0, "UB3C-0R33F1"),
    r(0.500, 3.0, "UB3C-0R5F1"),
    r(1.000, 3.0, "UB3C-1RF1"),
];

/// Ordered by rising voltage rating.
pub const LOAD_CAPACITORS: [Capacitor; 9] = [
    c(22000.0, 10.0, None, 37.5, "EEU-HD1A223"),
    c(15000.0, 16.0, None, 37.0, "16PX15000MEFC18X35.5"),
    c(10000.0, 25.0, None, 37.0, "UBY1E103MHL"),
    c(6800.0, 35.0, None, 37.5, "EEU-HD1V682"),
    c(3300.0, 50.0, None, 37.0, "UVZ1H332MHD"),
    c(2200.0, 63.0, None, 37.0, "UVZ1J222MHD"),
    c(1500.0, 80.0, None, 37.0, "EKZN800ELL152MMP1S"),
    c(1000.0, 100.0, Some(0.133), 36.5, "108CKS100MRY"),
    c(680.0, 160.0, None, 47.5, "UCY2C681MHD"),
];

pub const BLEED_RESISTORS: [Resistor; 9] = [
    r(2.0, 5.0, "AC05000002008JAC00"),
    r(3.0, 5.0, "AC05000003008JAC00"),
    r(4.7, 5.0, "AC05000004708JAC00"),
    r(7.5, 5.0, "AC05000007508JAC00"),
    r(15.0, 5.0, "AC05000001509JAC00"),
    r(22.0, 5.0, "AC05000002209JAC00"),
    r(30.0, 5.0, "AC05000003009JAC00"),
    r(47.0, 5.0, "AC05000004709JAC00"),
    r(68.0, 10.0, "SQPW1068RJ"),
];

/// Reference part for ESR estimates of capacitors without a datasheet value.
const REF_CAP_UF: f64 = 1000.0;
const REF_CAP_ESR: f64 = 0.133;

impl Capacitor {
    /// Datasheet ESR, or a rough estimate assuming ESR is inversely
    /// proportional to capacitance.
    pub fn esr_or_estimate(&self) -> f64 {
        self.esr.unwrap_or(REF_CAP_UF / self.uf * REF_CAP_ESR)
    }
}

fn jumper_to_zero(ohms: f64) -> f64 {
    if ohms == ZERO_OHMS {
        0.0
    } else {
        ohms
    }
}

/// Return a copy of `hw` with R1/R2, shunt, Rf/Rg, load caps and bleed
/// resistor chosen for a panel with the given Isc and Voc.
pub fn choose_optimal_components(
    isc: f64,
    voc: f64,
    hw: &HardwareConfig,
    adc: &AdcConfig,
    limits: &OptimizerConfig,
) -> Result<HardwareConfig> {
    if !(isc > 0.0 && voc > 0.0) {
        return Err(Error::InvalidInput(format!(
            "Isc and Voc must be positive (Isc={isc}, Voc={voc})"
        )));
    }

    let mut hw = hw.clone();
    choose_r1_r2(&mut hw, voc, adc.adc_vref, limits);
    // the op amp gain depends on the shunt
    choose_shunt(&mut hw, isc, adc.adc_vref, limits);
    choose_rf_rg(&mut hw, isc, adc.adc_vref, limits);
    choose_load_caps(&mut hw, isc, voc, limits)?;
    choose_rb(&mut hw, limits);

    tracing::info!(
        "Chosen components: R1={} R2={} Rf={} Rg={} shunt={} ({}), caps={}uF/{}V ({}), Rb={} ({})",
        hw.vdiv_r1,
        hw.vdiv_r2,
        hw.amm_op_amp_rf,
        hw.amm_op_amp_rg,
        hw.amm_shunt_resistance(),
        hw.shunt_mfg_pn,
        hw.load_cap_uf,
        hw.load_cap_v,
        hw.load_cap_mfg_pn,
        hw.rb_ohms,
        hw.rb_mfg_pn
    );
    Ok(hw)
}

/// Divider ratio just below the ideal one, within the divider current limit.
fn choose_r1_r2(hw: &mut HardwareConfig, voc: f64, vref: f64, limits: &OptimizerConfig) {
    let ideal_ratio = vref / (voc * limits.opt_multiplier());
    let mut least_err = f64::INFINITY;

    for r1 in QTR_WATT_RESISTORS {
        for r2 in QTR_WATT_RESISTORS {
            let vdiv_ohms = r1 + r2;
            if voc / vdiv_ohms > limits.max_vdiv_current {
                continue;
            }
            let err = ideal_ratio - r2 / vdiv_ohms;
            if err > 0.0 && err < least_err {
                if r1 == ZERO_OHMS {
                    hw.vdiv_r1 = 0.0;
                    hw.vdiv_r2 = R2_DEFAULT;
                } else {
                    hw.vdiv_r1 = r1;
                    hw.vdiv_r2 = jumper_to_zero(r2);
                }
                least_err = err;
            }
        }
    }
}

/// Shunt whose voltage at Isc, times the target gain, lands closest to vref.
fn choose_shunt(hw: &mut HardwareConfig, isc: f64, vref: f64, limits: &OptimizerConfig) {
    let mut least_err = f64::INFINITY;
    for shunt in SHUNT_RESISTORS {
        let v_shunt_max = isc * limits.opt_multiplier() * shunt.ohms;
        let err = (vref - v_shunt_max * limits.target_amm_op_amp_gain).abs();
        if err < least_err {
            hw.amm_shunt_max_volts = hw.amm_shunt_max_amps * shunt.ohms;
            hw.shunt_wattage = shunt.watts;
            hw.shunt_mfg_pn = shunt.mfg_pn.to_owned();
            least_err = err;
        }
    }
}

/// Highest op amp gain that keeps the output below vref, with the feedback
/// current inside what the op amp can drive and well above its input bias.
fn choose_rf_rg(hw: &mut HardwareConfig, isc: f64, vref: f64, limits: &OptimizerConfig) {
    let v_shunt_max = isc * limits.opt_multiplier() * hw.amm_shunt_resistance();
    let mut least_err = f64::INFINITY;

    for rf in QTR_WATT_RESISTORS {
        for rg in QTR_WATT_RESISTORS {
            if rg > rf {
                continue;
            }
            let rf_rg_max_current = vref / (rf + rg);
            if rf_rg_max_current > limits.op_amp_max_drive_current / 200.0
                || rf_rg_max_current < limits.op_amp_max_input_current * 500.0
            {
                continue;
            }
            let gain = 1.0 + rf / rg;
            let err = vref - v_shunt_max * gain;
            if err > 0.0 && err < least_err {
                hw.amm_op_amp_rf = jumper_to_zero(rf);
                hw.amm_op_amp_rg = jumper_to_zero(rg);
                least_err = err;
            }
        }
    }
}

/// Lowest adequate voltage rating, i.e. the largest capacitance, unless the
/// estimated swing is too long; then step up the table.
fn choose_load_caps(
    hw: &mut HardwareConfig,
    isc: f64,
    voc: f64,
    limits: &OptimizerConfig,
) -> Result<()> {
    let cap_min_volts = voc / (hw.cap_voltage_derate_pct / 100.0);
    // worst case: 10% of Isc, MPP at 75% of Voc, twice the time to MPP
    let min_isc = 0.1 * isc;
    let v_mpp = 0.75 * voc;

    let mut chosen = None;
    for cap in LOAD_CAPACITORS.iter().filter(|cap| cap.volts >= cap_min_volts) {
        chosen = Some(cap);
        let total_uf = cap.uf * hw.num_load_caps as f64;
        let est_max_swing_us = (2.0 * total_uf * v_mpp / min_isc).trunc();
        if est_max_swing_us < limits.target_max_swing_us {
            break;
        }
    }

    let Some(cap) = chosen else {
        tracing::error!("No load caps found with sufficient voltage ({cap_min_volts:.1} V)");
        return Err(Error::InvalidInput(format!(
            "no load capacitor rated for {cap_min_volts:.1} V"
        )));
    };

    hw.load_cap_uf = cap.uf;
    hw.load_cap_v = cap.volts;
    hw.load_cap_esr = cap.esr_or_estimate();
    hw.load_cap_mfg_pn = cap.mfg_pn.to_owned();
    Ok(())
}

/// Bleed RC closest to the target time constant.
fn choose_rb(hw: &mut HardwareConfig, limits: &OptimizerConfig) {
    let load_caps_uf = hw.load_caps_uf();
    let mut least_diff = f64::INFINITY;
    for rb in BLEED_RESISTORS {
        let diff = (load_caps_uf * rb.ohms - limits.target_bleed_rc_us).abs();
        if diff < least_diff {
            hw.rb_ohms = rb.ohms;
            hw.rb_wattage = rb.watts;
            hw.rb_mfg_pn = rb.mfg_pn.to_owned();
            least_diff = diff;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn choose(isc: f64, voc: f64) -> Result<HardwareConfig> {
        choose_optimal_components(
            isc,
            voc,
            &HardwareConfig::default(),
            &AdcConfig::default(),
            &OptimizerConfig::default(),
        )
    }

    #[test]
    fn typical_panel() {
        let hw = choose(9.0, 36.0).unwrap();
        assert_eq!((hw.vdiv_r1, hw.vdiv_r2), (47000.0, 5600.0));
        assert_eq!(hw.shunt_mfg_pn, "LVR035L000FE70");
        assert!((hw.amm_shunt_resistance() - 0.005).abs() < 1e-12);
        assert_eq!((hw.amm_op_amp_rf, hw.amm_op_amp_rg), (15000.0, 180.0));
        assert_eq!(hw.load_cap_mfg_pn, "UVZ1H332MHD");
        assert_eq!(hw.load_cap_uf, 3300.0);
        assert_eq!(hw.rb_ohms, 15.0);
    }

    #[test]
    fn low_voltage_panel_bypasses_divider() {
        // 5 V / (3 V * 1.3) > 1, no real divider ratio is high enough
        let mut hw = HardwareConfig::default();
        hw.vdiv_r2 = 1000.0;
        choose_r1_r2(&mut hw, 3.0, 5.0, &OptimizerConfig::default());
        assert_eq!((hw.vdiv_r1, hw.vdiv_r2), (0.0, R2_DEFAULT));

        let hw = choose(1.0, 3.0).unwrap();
        assert_eq!((hw.vdiv_r1, hw.vdiv_r2), (0.0, R2_DEFAULT));
    }

    #[test]
    fn high_voltage_low_current_panel() {
        let hw = choose(3.0, 80.0).unwrap();
        assert_eq!((hw.vdiv_r1, hw.vdiv_r2), (150000.0, 7500.0));
        assert!((hw.amm_shunt_resistance() - 0.020).abs() < 1e-12);
        assert_eq!((hw.amm_op_amp_rf, hw.amm_op_amp_rg), (39000.0, 680.0));
        assert_eq!((hw.load_cap_uf, hw.load_cap_v), (1000.0, 100.0));
        assert_eq!(hw.load_cap_esr, 0.133);
        assert_eq!(hw.rb_ohms, 47.0);
    }

    #[test]
    fn chosen_parts_keep_signals_in_range() {
        let adc = AdcConfig::default();
        let limits = OptimizerConfig::default();
        for (isc, voc) in [(9.0, 36.0), (3.0, 80.0), (0.5, 6.0), (12.0, 48.0)] {
            let hw = choose(isc, voc).unwrap();
            assert!(voc * limits.opt_multiplier() * hw.vdiv_ratio() < adc.adc_vref);
            let v_op_amp =
                isc * limits.opt_multiplier() * hw.amm_shunt_resistance() * hw.amm_op_amp_gain();
            assert!(v_op_amp < adc.adc_vref, "{isc}/{voc}: {v_op_amp}");
            assert!(hw.load_cap_v * hw.cap_voltage_derate_pct / 100.0 >= voc);
        }
    }

    #[test]
    fn unknown_esr_is_estimated() {
        assert_eq!(LOAD_CAPACITORS[7].esr_or_estimate(), 0.133);
        assert!((LOAD_CAPACITORS[4].esr_or_estimate() - 0.133 / 3.3).abs() < 1e-12);
    }

    #[test]
    fn no_cap_for_very_high_voltage() {
        assert!(matches!(choose(10.0, 150.0), Err(Error::InvalidInput(_))));
        assert!(matches!(choose(0.0, 36.0), Err(Error::InvalidInput(_))));
    }
}
