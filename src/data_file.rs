//! CSV files exchanged with the curve tracer tooling.
//!
//! * raw ADC pairs: `CH0 (voltage), CH1 (current)` then `v,i` per line
//! * data points: `Volts, Amps, Watts, Ohms` then one point per line
//! * plotter table: space separated `volts amps`, no header

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::{AdcPair, Error, Point4, Result};

pub const ADC_PAIRS_HEADER: [&str; 2] = ["CH0 (voltage)", " CH1 (current)"];
pub const DATA_POINTS_HEADER: [&str; 4] = ["Volts", " Amps", " Watts", " Ohms"];

pub fn write_adc_pairs<W: Write>(out: W, pairs: &[AdcPair]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(ADC_PAIRS_HEADER)?;
    for pair in pairs {
        writer.write_record([pair.voltage_code.to_string(), pair.current_code.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Codes written as floats are accepted and rounded.
pub fn read_adc_pairs<R: Read>(input: R) -> Result<Vec<AdcPair>> {
    let mut pairs = vec![];
    for_each_row(input, &ADC_PAIRS_HEADER, |values| {
        pairs.push(AdcPair::new(values[0].round() as i32, values[1].round() as i32));
    })?;
    Ok(pairs)
}

pub fn write_data_points<W: Write>(out: W, points: &[Point4]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(DATA_POINTS_HEADER)?;
    for p in points {
        writer.write_record([
            format!("{:.6}", p.voltage),
            format!("{:.6}", p.current),
            format!("{:.6}", p.power),
            format!("{:.6}", p.resistance),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_data_points<R: Read>(input: R) -> Result<Vec<Point4>> {
    let mut points = vec![];
    for_each_row(input, &DATA_POINTS_HEADER, |values| {
        let (voltage, current, power, resistance) = (values[0], values[1], values[2], values[3]);
        points.push(Point4::new(current, voltage, resistance, power));
    })?;
    Ok(points)
}

/// `volts amps` per line, repeated rows collapsed into one.
pub fn write_plot_table<W: Write>(out: W, points: &[Point4]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .from_writer(out);
    let mut prev: Option<[String; 2]> = None;
    for p in points {
        let row = [format!("{:.6}", p.voltage), format!("{:.6}", p.current)];
        if prev.as_ref() == Some(&row) {
            continue;
        }
        writer.write_record(&row)?;
        prev = Some(row);
    }
    writer.flush()?;
    Ok(())
}

pub fn load_adc_pairs(path: &Path) -> Result<Vec<AdcPair>> {
    read_adc_pairs(BufReader::new(File::open(path)?)).map_err(|e| annotate(e, path))
}

pub fn save_adc_pairs(path: &Path, pairs: &[AdcPair]) -> Result<()> {
    write_adc_pairs(BufWriter::new(File::create(path)?), pairs)?;
    tracing::info!("Raw ADC values written to {:?}", path);
    Ok(())
}

pub fn load_data_points(path: &Path) -> Result<Vec<Point4>> {
    read_data_points(BufReader::new(File::open(path)?)).map_err(|e| annotate(e, path))
}

pub fn save_data_points(path: &Path, points: &[Point4]) -> Result<()> {
    write_data_points(BufWriter::new(File::create(path)?), points)?;
    tracing::info!("{} data points written to {:?}", points.len(), path);
    Ok(())
}

pub fn save_plot_table(path: &Path, points: &[Point4]) -> Result<()> {
    write_plot_table(BufWriter::new(File::create(path)?), points)
}

fn annotate(err: Error, path: &Path) -> Error {
    match err {
        Error::Parse(msg) => Error::Parse(format!("{:?}: {}", path, msg)),
        other => other,
    }
}

/// Check the header, then hand every row to `f` as numbers. Rows must have
/// as many fields as the header.
fn for_each_row<R: Read>(input: R, header: &[&str], mut f: impl FnMut(&[f64])) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let found = reader.headers()?;
    if !found.iter().eq(header.iter().map(|h| h.trim())) {
        return Err(Error::Parse(format!(
            "header is {:?}, expected {:?}",
            found.iter().collect::<Vec<_>>().join(","),
            header.concat()
        )));
    }

    let mut values = Vec::with_capacity(header.len());
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() != header.len() {
            return Err(Error::Parse(format!(
                "line {}: expected {} values, got {}",
                line,
                header.len(),
                record.len()
            )));
        }

        values.clear();
        for field in record.iter() {
            let value = field
                .parse::<f64>()
                .map_err(|e| Error::Parse(format!("line {}: {:?}: {}", line, field, e)))?;
            values.push(value);
        }
        f(&values);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn adc_pairs_file() {
        let pairs = vec![AdcPair::new(0, 2504), AdcPair::new(17, 2498), AdcPair::new(1377, 0)];
        let mut buf = vec![];
        write_adc_pairs(&mut buf, &pairs).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text, "CH0 (voltage), CH1 (current)\n0,2504\n17,2498\n1377,0\n");
        assert_eq!(read_adc_pairs(buf.as_slice()).unwrap(), pairs);
    }

    #[test]
    fn adc_pairs_accept_float_codes() {
        let text = "CH0 (voltage), CH1 (current)\n12.0,2000.0\n\n";
        assert_eq!(
            read_adc_pairs(text.as_bytes()).unwrap(),
            vec![AdcPair::new(12, 2000)]
        );
    }

    #[test]
    fn quoted_fields_are_numbers() {
        let text = "Volts, Amps, Watts, Ohms\n\"1.0\", 2.0 ,\"2.0\",0.5\n";
        let points = read_data_points(text.as_bytes()).unwrap();
        assert_eq!(points, vec![Point4::new(2.0, 1.0, 0.5, 2.0)]);
    }

    #[test]
    fn bad_number_is_parse_error() {
        let text = "CH0 (voltage), CH1 (current)\n12,abc\n";
        match read_adc_pairs(text.as_bytes()) {
            Err(Error::Parse(msg)) => assert!(msg.contains("line 2"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn wrong_header_is_parse_error() {
        let text = "Volts, Amps\n1,2\n";
        assert!(matches!(read_adc_pairs(text.as_bytes()), Err(Error::Parse(_))));
        assert!(matches!(read_data_points("".as_bytes()), Err(Error::Parse(_))));
    }

    #[test]
    fn short_row_is_parse_error() {
        let text = "Volts, Amps, Watts, Ohms\n1.0,2.0,2.0\n";
        match read_data_points(text.as_bytes()) {
            Err(Error::Parse(msg)) => assert!(msg.contains("line 2"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn data_points_file() {
        let points = vec![
            Point4::new(9.0, 0.0, 0.0, 0.0),
            Point4::from_vi(20.0, 6.0, 99999999.0),
            Point4::from_vi(36.0, 0.0, 99999999.0),
        ];
        let mut buf = vec![];
        write_data_points(&mut buf, &points).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Volts, Amps, Watts, Ohms");
        assert_eq!(lines[2], "20.000000,6.000000,120.000000,3.333333");
        assert_eq!(lines[3], "36.000000,0.000000,0.000000,99999999.000000");

        let read = read_data_points(buf.as_slice()).unwrap();
        assert_eq!(read.len(), 3);
        assert_eq!(read[1].voltage, 20.0);
        assert_eq!(read[1].current, 6.0);
        assert_eq!(read[1].power, 120.0);
        assert!((read[1].resistance - 3.333333).abs() < 1e-9);
    }

    #[test]
    fn plot_table_skips_repeats() {
        let a = Point4::from_vi(1.0, 2.0, 99999999.0);
        let b = Point4::from_vi(1.5, 1.0, 99999999.0);
        let mut buf = vec![];
        write_plot_table(&mut buf, &[a, a, b, b, a]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "1.000000 2.000000\n1.500000 1.000000\n1.000000 2.000000\n"
        );
    }
}
