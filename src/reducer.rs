//! Greedy decimation of a raw ADC sweep, identical to what the curve tracer
//! firmware does on live samples: a point is kept only if its scaled
//! Manhattan distance from the last kept point is large enough, or if too
//! many points in a row have already been dropped.

use crate::{AdcPair, Error, ReductionTarget, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Reduction {
    pub points: Vec<AdcPair>,
    pub discarded: u32,
}

pub fn validate_target(target: &ReductionTarget) -> Result<()> {
    if target.max_points < 2 {
        return Err(Error::InvalidInput(format!(
            "reduction needs room for at least 2 points, got max_points={}",
            target.max_points
        )));
    }
    Ok(())
}

/// `points[0]` carries the Isc code, the last point's voltage code stands in
/// for Voc.
pub fn reduce(points: &[AdcPair], target: &ReductionTarget) -> Result<Reduction> {
    validate_target(target)?;
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(Error::InvalidInput("nothing to reduce".to_owned()));
    };
    if points.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "reduction needs at least 2 points, got {}",
            points.len()
        )));
    }

    let isc_code = first.current_code as i64;
    let voc_code = last.voltage_code as i64;
    let v_scale = (target.aspect_width * isc_code as f64).round() as i64;
    let i_scale = (target.aspect_height * voc_code as f64).round() as i64;
    let min_manhattan_distance =
        (isc_code * i_scale + voc_code * v_scale).div_euclid(target.max_points as i64);

    let max_points = target.max_points as usize;
    let mut kept: Vec<AdcPair> = Vec::with_capacity(max_points.min(points.len()));
    let mut consecutive_discards = 0u32;

    for point in points {
        let keep = match kept.last() {
            None => true,
            Some(prev) => {
                let v_delta = (point.voltage_code - prev.voltage_code) as i64;
                // current falls while voltage rises
                let i_delta = (prev.current_code - point.current_code) as i64;
                v_delta * v_scale + i_delta * i_scale >= min_manhattan_distance
                    || consecutive_discards >= target.max_consecutive_discards
            }
        };

        if keep {
            kept.push(*point);
            consecutive_discards = 0;
            if kept.len() >= max_points {
                break;
            }
        } else {
            consecutive_discards += 1;
        }
    }

    let discarded = (points.len() - kept.len()) as u32;
    tracing::debug!(
        "Reduced {} points to {} (min distance {}, {} discarded)",
        points.len(),
        kept.len(),
        min_manhattan_distance,
        discarded
    );

    Ok(Reduction {
        points: kept,
        discarded,
    })
}
