use num_traits::Float;
use serde::Serializer;

/// Serialize a float rounded to 6 decimal places, the precision used by the
/// data point files. Non-finite values pass through untouched.
pub fn serialize_float_6dgt<T: Float, S>(x: &T, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let x = x.to_f64().unwrap_or(f64::NAN);
    if x.is_finite() {
        let scale = 1e6;
        s.serialize_f64((x * scale).round() / scale)
    } else {
        s.serialize_f64(x)
    }
}
