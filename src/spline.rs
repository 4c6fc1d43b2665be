//! Centripetal Catmull-Rom interpolation of one curve segment.
//!
//! Points are `(voltage, current)` vectors. Only the span between the two
//! middle points of a 4-point window is produced.

use nalgebra::Vector2;

pub type ViPoint = Vector2<f64>;

/// Knot exponent that makes the spline "centripetal".
pub const CENTRIPETAL_ALPHA: f64 = 0.5;

/// Flatter knot exponent used when the centripetal pass bends the segment
/// back on itself. Reduces the "S" without going fully linear.
pub const RELAXED_ALPHA: f64 = 0.1;

/// Interpolate `num_points` samples from `window[1]` to `window[2]`, both
/// included.
///
/// If the centripetal result is not monotonic in the direction the segment
/// runs, the segment is evaluated once more with [`RELAXED_ALPHA`] and that
/// second result is used as is.
pub fn catmull_rom_segment(window: &[ViPoint; 4], num_points: usize, epsilon: f64) -> Vec<ViPoint> {
    let points = evaluate(window, num_points, CENTRIPETAL_ALPHA, epsilon);
    if follows_direction(&window[1], &window[2], &points) {
        return points;
    }

    tracing::trace!(
        "Non-monotonic segment {:?} -> {:?}, retrying with alpha={}",
        (window[1].x, window[1].y),
        (window[2].x, window[2].y),
        RELAXED_ALPHA
    );
    evaluate(window, num_points, RELAXED_ALPHA, epsilon)
}

/// Two-level Catmull-Rom blend with knots spaced by `chord^alpha`.
pub fn evaluate(window: &[ViPoint; 4], num_points: usize, alpha: f64, epsilon: f64) -> Vec<ViPoint> {
    let [p0, p1, p2, p3] = window;

    let knot = |t_i: f64, p_i: &ViPoint, p_j: &ViPoint| {
        let t_j = t_i + (p_j - p_i).norm().powf(alpha);
        if t_j == t_i {
            t_j + epsilon
        } else {
            t_j
        }
    };

    let t0 = 0.0;
    let t1 = knot(t0, p0, p1);
    let t2 = knot(t1, p1, p2);
    let t3 = knot(t2, p2, p3);

    linspace(t1, t2, num_points)
        .map(|t| {
            let a1 = p0 * ((t1 - t) / (t1 - t0)) + p1 * ((t - t0) / (t1 - t0));
            let a2 = p1 * ((t2 - t) / (t2 - t1)) + p2 * ((t - t1) / (t2 - t1));
            let a3 = p2 * ((t3 - t) / (t3 - t2)) + p3 * ((t - t2) / (t3 - t2));

            let b1 = a1 * ((t2 - t) / (t2 - t0)) + a2 * ((t - t0) / (t2 - t0));
            let b2 = a2 * ((t3 - t) / (t3 - t1)) + a3 * ((t - t1) / (t3 - t1));

            b1 * ((t2 - t) / (t2 - t1)) + b2 * ((t - t1) / (t2 - t1))
        })
        .collect()
}

/// True if every step between consecutive samples moves voltage and current
/// the same way they move from `from` to `to`.
pub fn follows_direction(from: &ViPoint, to: &ViPoint, samples: &[ViPoint]) -> bool {
    let v_rising = to.x > from.x;
    let i_rising = to.y > from.y;

    samples.windows(2).all(|w| {
        let (a, b) = (&w[0], &w[1]);
        let v_ok = if v_rising { b.x > a.x } else { b.x <= a.x };
        let i_ok = if i_rising { b.y > a.y } else { b.y <= a.y };
        v_ok && i_ok
    })
}

/// `count` evenly spaced values from `start` to `end` inclusive. A single
/// value is just `start`.
fn linspace(start: f64, end: f64, count: usize) -> impl Iterator<Item = f64> {
    let step = if count > 1 {
        (end - start) / (count - 1) as f64
    } else {
        0.0
    };
    (0..count).map(move |n| {
        if n + 1 == count && count > 1 {
            end
        } else {
            start + step * n as f64
        }
    })
}
