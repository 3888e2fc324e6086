//! Minimal NMEA 0183 reader: RMC and GGA are the only sentences that
//! carry a position we care about.

/// User-equivalent range error used to turn HDOP into meters.
const UERE_M: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Fix { latitude: f64, longitude: f64, hdop: Option<f64> },
    NoFix,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("not an NMEA sentence")]
    NotNmea,
    #[error("checksum mismatch (expected {expected:02X}, got {actual:02X})")]
    Checksum { expected: u8, actual: u8 },
    #[error("malformed {0}")]
    Malformed(&'static str),
}

pub(crate) fn hdop_to_meters(hdop: f64) -> f64 {
    hdop * UERE_M
}

/// Parse one sentence. `Ok(None)` means a valid sentence without position
/// data (GSV, VTG, ...).
pub fn parse_sentence(line: &str) -> Result<Option<Sentence>, ParseError> {
    let line = line.trim();
    let body = line.strip_prefix('$').ok_or(ParseError::NotNmea)?;
    let body = match body.split_once('*') {
        Some((data, sum)) => {
            let expected = u8::from_str_radix(sum.trim(), 16).map_err(|_| ParseError::Malformed("checksum"))?;
            let actual = data.bytes().fold(0u8, |acc, b| acc ^ b);
            if expected != actual {
                return Err(ParseError::Checksum { expected, actual });
            }
            data
        }
        None => body,
    };

    let fields: Vec<&str> = body.split(',').collect();
    let kind = fields[0];
    if kind.len() != 5 || !kind.is_ascii() {
        return Err(ParseError::Malformed("address"));
    }
    match &kind[2..] {
        "RMC" => parse_rmc(&fields),
        "GGA" => parse_gga(&fields),
        _ => Ok(None),
    }
}

fn parse_rmc(f: &[&str]) -> Result<Option<Sentence>, ParseError> {
    if f.len() < 7 {
        return Err(ParseError::Malformed("RMC"));
    }
    if f[2] != "A" {
        return Ok(Some(Sentence::NoFix));
    }
    let latitude = coordinate(f[3], f[4], 'S')?;
    let longitude = coordinate(f[5], f[6], 'W')?;
    Ok(Some(Sentence::Fix { latitude, longitude, hdop: None }))
}

fn parse_gga(f: &[&str]) -> Result<Option<Sentence>, ParseError> {
    if f.len() < 9 {
        return Err(ParseError::Malformed("GGA"));
    }
    if f[6].is_empty() || f[6] == "0" {
        return Ok(Some(Sentence::NoFix));
    }
    let latitude = coordinate(f[2], f[3], 'S')?;
    let longitude = coordinate(f[4], f[5], 'W')?;
    let hdop = f[8].parse::<f64>().ok();
    Ok(Some(Sentence::Fix { latitude, longitude, hdop }))
}

/// `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere to signed degrees.
fn coordinate(value: &str, hemisphere: &str, negative: char) -> Result<f64, ParseError> {
    let raw: f64 = value.parse().map_err(|_| ParseError::Malformed("coordinate"))?;
    if !raw.is_finite() || raw < 0.0 {
        return Err(ParseError::Malformed("coordinate"));
    }
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let limit = if negative == 'S' { 90.0 } else { 180.0 };
    if minutes >= 60.0 || degrees + minutes / 60.0 > limit {
        return Err(ParseError::Malformed("coordinate"));
    }
    let v = degrees + minutes / 60.0;
    match hemisphere.chars().next() {
        Some(c) if c == negative => Ok(-v),
        Some(_) => Ok(v),
        None => Err(ParseError::Malformed("hemisphere")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rmc_fix() {
        let s = parse_sentence("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A")
            .unwrap()
            .unwrap();
        match s {
            Sentence::Fix { latitude, longitude, hdop } => {
                assert!((latitude - (48.0 + 7.038 / 60.0)).abs() < 1e-9);
                assert!((longitude - (11.0 + 31.0 / 60.0)).abs() < 1e-9);
                assert_eq!(hdop, None);
            }
            _ => panic!("expected fix"),
        }
    }

    #[test]
    fn test_southern_western_hemisphere() {
        let s = parse_sentence("$GNGGA,000000,0112.588,S,07716.590,W,1,05,1.2,2500.0,M,,M,,").unwrap();
        match s {
            Some(Sentence::Fix { latitude, longitude, hdop }) => {
                assert!(latitude < 0.0 && longitude < 0.0);
                assert!((latitude + 1.2098).abs() < 1e-4);
                assert_eq!(hdop, Some(1.2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_checksum_mismatch() {
        let err = parse_sentence("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*00")
            .unwrap_err();
        assert!(matches!(err, ParseError::Checksum { expected: 0, actual: 0x6A }));
    }

    #[test]
    fn test_no_fix_and_other_sentences() {
        assert_eq!(parse_sentence("$GPGGA,123519,,,,,0,00,,,M,,M,,").unwrap(), Some(Sentence::NoFix));
        assert_eq!(parse_sentence("$GPVTG,054.7,T,034.4,M,005.5,N,010.2,K").unwrap(), None);
        assert_eq!(parse_sentence("hello").unwrap_err(), ParseError::NotNmea);
    }

    #[test]
    fn test_non_finite_and_out_of_range_coordinates() {
        for line in [
            "$GPRMC,123519,A,NaN,N,01131.000,E",
            "$GPRMC,123519,A,4807.038,N,inf,E",
            "$GPRMC,123519,A,9130.000,N,01131.000,E",
            "$GPGGA,123519,4807.038,N,18100.000,E,1,08,0.9",
        ] {
            assert_eq!(parse_sentence(line).unwrap_err(), ParseError::Malformed("coordinate"), "{line}");
        }
    }

    #[test]
    fn test_non_ascii_address() {
        assert_eq!(parse_sentence("$A\u{e9}xy,1,2").unwrap_err(), ParseError::Malformed("address"));
    }
}
