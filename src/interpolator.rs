use itertools::Itertools;

use crate::spline::{catmull_rom_segment, ViPoint};
use crate::{Error, InterpolationMode, Point4, Result};

/// Sub-points inserted into each of the two linear segments around the
/// measured peak.
pub const LINEAR_PEAK_POINTS: usize = 100;

/// Upper bound of spline samples per segment.
pub const SPLINE_MAX_POINTS: usize = 100;

/// Densifies a measured curve and locates its maximum power point.
///
/// The input must be ordered by rising voltage, first point at Isc and last
/// point at Voc. It is never modified.
pub struct Interpolator<'a> {
    points: &'a [Point4],
    infinite_val: f64,
}

impl<'a> Interpolator<'a> {
    pub fn new(points: &'a [Point4], infinite_val: f64) -> Result<Self> {
        if points.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "interpolation needs at least 2 points, got {}",
                points.len()
            )));
        }
        Ok(Self {
            points,
            infinite_val,
        })
    }

    pub fn points(&self) -> &[Point4] {
        self.points
    }

    /// Index of the measured point with the highest power, earliest on ties.
    pub fn peak_index(&self) -> usize {
        find_max_power_index(self.points).unwrap_or_default()
    }

    pub fn curve(&self, mode: InterpolationMode) -> Result<Vec<Point4>> {
        match mode {
            InterpolationMode::Linear => Ok(self.linear_curve()),
            InterpolationMode::Spline => self.spline_curve(),
        }
    }

    /// MPP of the curve interpolated with `mode`.
    pub fn mpp(&self, mode: InterpolationMode) -> Result<Point4> {
        let curve = self.curve(mode)?;
        find_mpp(&curve).ok_or_else(|| Error::InvalidInput("empty curve".to_owned()))
    }

    /// Original points plus linearly interpolated points, only in the two
    /// segments that touch the measured peak.
    pub fn linear_curve(&self) -> Vec<Point4> {
        let peak = self.peak_index();
        let mut curve = Vec::with_capacity(self.points.len() + 2 * LINEAR_PEAK_POINTS);

        for (n, (from, to)) in self.points.iter().tuple_windows().enumerate() {
            curve.push(*from);

            if n != peak && n + 1 != peak {
                continue;
            }

            let parts = (LINEAR_PEAK_POINTS + 1) as f64;
            curve.extend((1..=LINEAR_PEAK_POINTS).map(|k| {
                let frac = k as f64 / parts;
                Point4::from_vi(
                    from.voltage + (to.voltage - from.voltage) * frac,
                    from.current + (to.current - from.current) * frac,
                    self.infinite_val,
                )
            }));
        }

        if let Some(last) = self.points.last() {
            curve.push(*last);
        }

        tracing::debug!(
            "Linear interpolation: {} -> {} points (peak at #{})",
            self.points.len(),
            curve.len(),
            peak
        );
        curve
    }

    /// Original end points plus centripetal Catmull-Rom samples between all
    /// inner points. The first and last segments stay straight.
    pub fn spline_curve(&self) -> Result<Vec<Point4>> {
        let (first, last) = (self.points[0], self.points[self.points.len() - 1]);

        // no interior 4-point window
        if self.points.len() < 4 {
            return Ok(self.points.to_vec());
        }

        let max_v = last.voltage;
        let max_i = first.current;
        if !(max_v > 0.0 && max_i > 0.0) {
            return Err(Error::DegenerateGeometry(format!(
                "curve span must be positive (Voc={max_v}, Isc={max_i})"
            )));
        }

        let epsilon = 1.0 / self.infinite_val;
        let vi = self
            .points
            .iter()
            .map(|p| ViPoint::new(p.voltage, p.current))
            .collect::<Vec<_>>();

        let mut curve = Vec::with_capacity(2 + (vi.len() - 3) * SPLINE_MAX_POINTS);
        curve.push(first);
        for (p0, p1, p2, p3) in vi.iter().tuple_windows() {
            let num_points = spline_num_points(p1, p2, max_v, max_i);
            curve.extend(
                catmull_rom_segment(&[*p0, *p1, *p2, *p3], num_points, epsilon)
                    .into_iter()
                    .map(|p| Point4::from_vi(p.x, p.y, self.infinite_val)),
            );
        }
        curve.push(last);

        tracing::debug!(
            "Spline interpolation: {} -> {} points",
            self.points.len(),
            curve.len()
        );
        Ok(curve)
    }
}

/// Aim for about 1000x1000 resolution over the whole curve: the segment's
/// Manhattan length relative to the curve span, times 1000, in `[1, 100]`.
fn spline_num_points(p1: &ViPoint, p2: &ViPoint, max_v: f64, max_i: f64) -> usize {
    let scaled_v_dist = (p2.x - p1.x) / max_v;
    let scaled_i_dist = (p1.y - p2.y) / max_i;
    let n = ((scaled_v_dist + scaled_i_dist) * 1000.0).trunc();
    n.clamp(1.0, SPLINE_MAX_POINTS as f64) as usize
}

/// Index of the point with the highest power; the first one wins a tie.
pub fn find_max_power_index(points: &[Point4]) -> Option<usize> {
    let (mut best, rest) = points.split_first().map(|(p, rest)| ((0, p.power), rest))?;
    for (n, p) in rest.iter().enumerate() {
        if p.power > best.1 {
            best = (n + 1, p.power);
        }
    }
    Some(best.0)
}

/// Maximum power point of an (interpolated) curve; the last one wins a tie.
pub fn find_mpp(points: &[Point4]) -> Option<Point4> {
    let mut mpp = *points.first()?;
    for p in points {
        if p.power >= mpp.power {
            mpp = *p;
        }
    }
    Some(mpp)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        convert::to_points, generate, AdcConfig, AdcScale, CurveModel, HardwareConfig,
        ReductionTarget, TimingParams,
    };

    const INF: f64 = 99999999.0;

    fn p(current: f64, voltage: f64) -> Point4 {
        Point4::from_vi(voltage, current, INF)
    }

    fn five_points() -> Vec<Point4> {
        vec![
            Point4::new(9.0, 0.0, 0.0, 0.0),
            Point4::new(8.0, 10.0, 1.25, 80.0),
            Point4::new(6.0, 20.0, 3.33, 120.0),
            Point4::new(3.0, 30.0, 10.0, 90.0),
            Point4::new(0.0, 36.0, INF, 0.0),
        ]
    }

    #[test]
    fn too_few_points() {
        assert!(matches!(Interpolator::new(&[], INF), Err(Error::InvalidInput(_))));
        assert!(matches!(
            Interpolator::new(&[p(1.0, 0.0)], INF),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn linear_densifies_only_around_peak() {
        let points = five_points();
        let interp = Interpolator::new(&points, INF).unwrap();
        assert_eq!(interp.peak_index(), 2);

        let curve = interp.linear_curve();
        assert_eq!(curve.len(), points.len() + 2 * LINEAR_PEAK_POINTS);
        assert_eq!(curve[0], points[0]);
        assert_eq!(curve[1], points[1]);
        assert_eq!(curve[3 + 2 * LINEAR_PEAK_POINTS], points[3]);
        assert_eq!(curve.last(), points.last());

        // sub-points sit on the segment and carry consistent derived values
        let sub = &curve[2..2 + LINEAR_PEAK_POINTS];
        for w in sub.windows(2) {
            assert!(w[1].voltage > w[0].voltage);
        }
        for q in sub {
            assert!(q.voltage > 10.0 && q.voltage < 20.0);
            assert!((q.power - q.voltage * q.current).abs() < 1e-9);
            assert!((q.resistance - q.voltage / q.current).abs() < 1e-9);
        }
        assert_eq!(curve[2 + LINEAR_PEAK_POINTS], points[2]);
    }

    #[test]
    fn linear_peak_at_end_densifies_one_segment() {
        let points = vec![p(5.0, 0.0), p(4.0, 10.0), p(3.9, 20.0)];
        let interp = Interpolator::new(&points, INF).unwrap();
        assert_eq!(interp.peak_index(), 2);
        assert_eq!(interp.linear_curve().len(), 3 + LINEAR_PEAK_POINTS);
    }

    #[test]
    fn peak_tie_goes_to_first() {
        let points = vec![p(4.0, 0.0), p(4.0, 5.0), p(2.0, 10.0), p(0.0, 12.0)];
        assert_eq!(find_max_power_index(&points), Some(1));
    }

    #[test]
    fn mpp_tie_goes_to_last() {
        let a = Point4::new(4.0, 5.0, 1.25, 20.0);
        let b = Point4::new(2.0, 10.0, 5.0, 20.0);
        let curve = vec![p(5.0, 0.0), a, b, p(0.0, 12.0)];
        assert_eq!(find_mpp(&curve), Some(b));
        assert_eq!(find_mpp(&[]), None);
    }

    #[test]
    fn spline_keeps_end_points_and_monotonicity() {
        let points = five_points();
        let interp = Interpolator::new(&points, INF).unwrap();
        let curve = interp.spline_curve().unwrap();

        assert_eq!(curve.first(), points.first());
        assert_eq!(curve.last(), points.last());
        assert_eq!(curve.len(), 2 + 2 * SPLINE_MAX_POINTS);

        // first segment is not interpolated
        assert!((curve[1].voltage - 10.0).abs() < 1e-9);
        assert!((curve[1].current - 8.0).abs() < 1e-9);

        for w in curve.windows(2) {
            assert!(w[1].voltage >= w[0].voltage - 1e-9);
            assert!(w[1].current <= w[0].current + 1e-9);
        }

        let mpp = interp.mpp(InterpolationMode::Spline).unwrap();
        assert!(mpp.power >= 120.0 - 1e-9);
        assert!(mpp.voltage > 15.0 && mpp.voltage < 30.0);
    }

    #[test]
    fn spline_on_quantized_sweep_stays_within_one_current_step() {
        let hw = HardwareConfig::default();
        let scale = AdcScale::from_hardware(&hw, &AdcConfig::default()).unwrap();
        let model = CurveModel::new(9.0, 36.0, 10.0).unwrap();
        let synthesis = generate(
            &model,
            &TimingParams::from_hardware(&hw, 100000),
            &ReductionTarget::default(),
            &scale,
        )
        .unwrap();
        let points = to_points(&synthesis.adc_pairs, &scale);

        let curve = Interpolator::new(&points, scale.infinite_val)
            .unwrap()
            .spline_curve()
            .unwrap();
        assert_eq!(curve.first(), points.first());
        assert_eq!(curve.last(), points.last());

        // flat runs of equal current codes near Isc may bulge upwards
        let current_step = 1.0 / scale.steps_per_amp();
        let max_rise = curve
            .windows(2)
            .map(|w| w[1].current - w[0].current)
            .fold(0.0, f64::max);
        assert!(max_rise < current_step, "{} >= {}", max_rise, current_step);
    }

    #[test]
    fn spline_with_few_points_returns_input() {
        let points = vec![p(5.0, 0.0), p(4.0, 10.0), p(0.0, 12.0)];
        let interp = Interpolator::new(&points, INF).unwrap();
        assert_eq!(interp.spline_curve().unwrap(), points);
    }

    #[test]
    fn spline_rejects_zero_span() {
        let points = vec![p(0.0, 0.0), p(0.0, 1.0), p(0.0, 2.0), p(0.0, 3.0)];
        let interp = Interpolator::new(&points, INF).unwrap();
        assert!(matches!(
            interp.spline_curve(),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn close_points_get_few_samples() {
        let p1 = ViPoint::new(10.0, 5.0);
        let near = ViPoint::new(10.01, 4.999);
        let far = ViPoint::new(20.0, 2.0);
        assert_eq!(spline_num_points(&p1, &near, 40.0, 8.0), 1);
        assert_eq!(spline_num_points(&p1, &far, 40.0, 8.0), SPLINE_MAX_POINTS);
        // 0.025 + 0.0125 -> 37
        let mid = ViPoint::new(11.0, 4.9);
        assert_eq!(spline_num_points(&p1, &mid, 40.0, 8.0), 37);
    }
}
