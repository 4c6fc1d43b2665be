//! Synthesis of the raw ADC sweep that the curve tracer would capture for a
//! given diode model and circuit.
//!
//! The load capacitors charge from the PV source, so the time between two
//! samples on the modeled curve follows `I_avg = C * dV / dt`. The firmware
//! records a point every `us_per_point` microseconds and stops once the
//! current channel falls to the "done" code.

use crate::{
    reducer, AdcPair, AdcScale, CurveModel, Error, HardwareConfig, ReductionTarget, Result,
};

/// Circuit timing inputs of the generator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingParams {
    /// Points below this load resistance are never sampled by the hardware.
    pub short_circuit_ohms: f64,
    /// Total load capacitance, uF.
    pub load_caps_uf: f64,
    /// Firmware intersample period, us.
    pub us_per_point: f64,
    /// CH1 code at which the firmware considers the curve done.
    pub done_current_code: i32,
    pub bleed_ohms: f64,
    /// Number of equal voltage steps between 0 and Voc.
    pub num_synth_points: u32,
}

impl TimingParams {
    pub fn from_hardware(hw: &HardwareConfig, num_synth_points: u32) -> Self {
        Self {
            short_circuit_ohms: hw.short_circuit_ohms(),
            load_caps_uf: hw.load_caps_uf(),
            us_per_point: hw.us_per_point,
            done_current_code: hw.done_ch1_adc,
            bleed_ohms: hw.rb_ohms,
            num_synth_points,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Synthesis {
    /// Reduced sweep with the synthetic Isc and Voc points at either end.
    pub adc_pairs: Vec<AdcPair>,
    pub isc_code: i32,
    pub voc_code: i32,
    pub swing_time_us: f64,
    pub discarded: u32,
    /// Percentage of the Voc charge bled off before the next curve, one
    /// second after the start of this one.
    pub bleed_pct: f64,
    pub unbled_volts: f64,
}

pub fn generate(
    model: &CurveModel,
    timing: &TimingParams,
    reduction: &ReductionTarget,
    scale: &AdcScale,
) -> Result<Synthesis> {
    reducer::validate_target(reduction)?;
    if timing.num_synth_points == 0 {
        return Err(Error::InvalidInput(
            "at least one synthesis step is required".to_owned(),
        ));
    }

    let voc = model.voc();
    let voc_code = scale.volts_to_code(voc);
    let steps = timing.num_synth_points as f64;

    let mut recorded: Vec<AdcPair> = vec![];
    let mut isc_code = None;
    let mut us_since_prev = 0.0;
    let mut swing_time_us = 0.0;
    let mut prev: Option<(f64, f64)> = None;

    for step in 0..=timing.num_synth_points {
        let volts = voc * step as f64 / steps;
        let amps = model.current(volts);
        let load_ohms = model.load_ohms(volts, scale.infinite_val);

        if !(load_ohms > timing.short_circuit_ohms) {
            continue;
        }

        if let Some((v1, i1)) = prev {
            let i_avg = (i1 + amps) / 2.0;
            if i_avg > 0.0 {
                let delta_t = timing.load_caps_uf * (volts - v1) / i_avg;
                us_since_prev += delta_t;
                swing_time_us += delta_t;
            }
        }
        prev = Some((volts, amps));

        if us_since_prev > timing.us_per_point {
            let pair = AdcPair::new(scale.volts_to_code(volts), scale.amps_to_code(amps));
            // the firmware takes its Isc from the first recorded point
            let isc = *isc_code.get_or_insert(pair.current_code);
            recorded.push(pair);
            us_since_prev = 0.0;

            if pair.current_code <= timing.done_current_code {
                return finish(
                    model, timing, reduction, recorded, isc, voc_code, swing_time_us,
                );
            }
        }
    }

    let last_current_code = recorded.last().map(|p| p.current_code);
    tracing::warn!(
        "Sweep ended without reaching done code {} ({} points recorded)",
        timing.done_current_code,
        recorded.len()
    );
    Err(Error::ModelDivergence {
        done_threshold: timing.done_current_code,
        last_current_code,
    })
}

fn finish(
    model: &CurveModel,
    timing: &TimingParams,
    reduction: &ReductionTarget,
    recorded: Vec<AdcPair>,
    isc_code: i32,
    voc_code: i32,
    swing_time_us: f64,
) -> Result<Synthesis> {
    let recorded_len = recorded.len();
    let (mut adc_pairs, discarded) = if recorded_len >= 2 {
        let r = reducer::reduce(&recorded, reduction)?;
        (r.points, r.discarded)
    } else {
        (recorded, 0)
    };

    adc_pairs.insert(0, AdcPair::new(0, isc_code));
    adc_pairs.push(AdcPair::new(voc_code, 0));

    let (bleed_pct, unbled_volts) = bleed(
        swing_time_us,
        timing.bleed_ohms,
        timing.load_caps_uf,
        model.voc(),
    );

    tracing::debug!(
        "Synthesized {} points ({} recorded, {} discarded), swing {:.0} us, bleed {:.3}%",
        adc_pairs.len(),
        recorded_len,
        discarded,
        swing_time_us,
        bleed_pct
    );

    Ok(Synthesis {
        adc_pairs,
        isc_code,
        voc_code,
        swing_time_us,
        discarded,
        bleed_pct,
        unbled_volts,
    })
}

/// Capacitor bleed through `bleed_ohms` during what is left of a one-second
/// interval after the swing. Returns (percent bled, volts left on the caps).
pub fn bleed(swing_time_us: f64, bleed_ohms: f64, load_caps_uf: f64, voc: f64) -> (f64, f64) {
    let time_remaining = 1.0 - swing_time_us / 1000000.0;
    if time_remaining <= 0.0 {
        return (0.0, voc);
    }
    let load_caps_farads = load_caps_uf / 1000000.0;
    let ratio = (-time_remaining / (bleed_ohms * load_caps_farads)).exp();
    ((1.0 - ratio) * 100.0, ratio * voc)
}
