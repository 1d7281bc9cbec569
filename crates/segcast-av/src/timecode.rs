//! `HH:MM:SS.ff` timecode parsing.

/// Convert a `[[HH:]MM:]SS[.ff]` timecode into seconds.
///
/// The string is read right to left: `:` separates the seconds, minutes and
/// hours fields and a `.` introduces the fractional tail. Fields further left
/// than hours are ignored. A field that does not parse counts as zero; this
/// function never fails.
///
/// The fraction is always read as hundredths, whatever its digit count, so
/// `"1.5"` is 1.05 seconds and `"1.500"` is 6 seconds. ffmpeg prints exactly
/// two fractional digits, which is the only form this is correct for.
///
/// ```
/// use segcast_av::parse_timecode;
///
/// assert_eq!(parse_timecode("00:00:10.00"), 10.0);
/// assert_eq!(parse_timecode("5.00"), 5.0);
/// ```
pub fn parse_timecode(timecode: &str) -> f64 {
    let mut fraction = 0.0;
    let mut fields: Vec<&str> = Vec::with_capacity(3);
    let mut end = timecode.len();

    for (i, byte) in timecode.bytes().enumerate().rev() {
        match byte {
            b'.' => {
                fraction = parse_field(&timecode[i + 1..end]);
                end = i;
            }
            b':' => {
                fields.push(&timecode[i + 1..end]);
                end = i;
            }
            _ => {}
        }
    }
    fields.push(&timecode[..end]);

    let mut fields = fields.into_iter().map(parse_field);
    let seconds = fields.next().unwrap_or(0.0);
    let minutes = fields.next().unwrap_or(0.0);
    let hours = fields.next().unwrap_or(0.0);

    hours * 3600.0 + minutes * 60.0 + seconds + fraction / 100.0
}

fn parse_field(field: &str) -> f64 {
    field.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn parses_full_timecode() {
        assert_close(parse_timecode("01:02:03.45"), 3723.45);
    }

    #[test]
    fn parses_whole_seconds() {
        assert_close(parse_timecode("00:00:10.00"), 10.0);
        assert_close(parse_timecode("5.00"), 5.0);
        assert_close(parse_timecode("7"), 7.0);
    }

    #[test]
    fn parses_minutes_and_seconds() {
        assert_close(parse_timecode("02:30"), 150.0);
        assert_close(parse_timecode("02:30.50"), 150.5);
    }

    #[test]
    fn fraction_is_hundredths_regardless_of_digits() {
        assert_close(parse_timecode("00:00:01.5"), 1.05);
        assert_close(parse_timecode("00:00:01.500"), 6.0);
    }

    #[test]
    fn ignores_fields_left_of_hours() {
        assert_close(parse_timecode("99:01:00:00.00"), 3600.0);
    }

    #[test]
    fn malformed_fields_count_as_zero() {
        assert_close(parse_timecode("aa:01:xx.10"), 60.1);
        assert_close(parse_timecode(""), 0.0);
        assert_close(parse_timecode("garbage"), 0.0);
    }
}
