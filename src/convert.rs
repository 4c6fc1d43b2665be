use crate::{AdcPair, AdcScale, Point4};

/// Convert raw ADC pairs to physical points.
pub fn to_points(pairs: &[AdcPair], scale: &AdcScale) -> Vec<Point4> {
    pairs.iter().map(|pair| to_point(*pair, scale)).collect()
}

pub fn to_point(pair: AdcPair, scale: &AdcScale) -> Point4 {
    Point4::from_vi(
        scale.code_to_volts(pair.voltage_code),
        scale.code_to_amps(pair.current_code),
        scale.infinite_val,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_to_physical_units() {
        let scale = AdcScale::new(4095, 81.9, 40.95, 99999999.0).unwrap();
        let points = to_points(
            &[AdcPair::new(0, 2000), AdcPair::new(1000, 1000), AdcPair::new(2000, 0)],
            &scale,
        );

        assert_eq!(points.len(), 3);
        assert!((points[0].current - 20.0).abs() < 1e-9);
        assert_eq!(points[0].voltage, 0.0);
        assert_eq!(points[0].resistance, 0.0);

        assert!((points[1].voltage - 20.0).abs() < 1e-9);
        assert!((points[1].current - 10.0).abs() < 1e-9);
        assert!((points[1].resistance - 2.0).abs() < 1e-9);
        assert!((points[1].power - 200.0).abs() < 1e-9);

        // no current: infinite load
        assert_eq!(points[2].resistance, 99999999.0);
        assert_eq!(points[2].power, 0.0);
    }
}
