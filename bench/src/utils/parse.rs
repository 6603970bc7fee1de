use crate::error::PipeBenchError;
use std::time::Duration;

const SIZE_MULTIPLIER: u64 = 1024;

/// Parses a byte count with an optional binary suffix: `k`, `m` or `g`
/// (case insensitive) multiply by 1024, 1024^2 and 1024^3.
pub fn parse_number(value: &str) -> Result<u64, PipeBenchError> {
    let value = value.trim();
    let (digits, exponent) = match value.char_indices().last() {
        Some((index, suffix)) if suffix.is_ascii_alphabetic() => {
            let exponent = match suffix.to_ascii_lowercase() {
                'k' => 1,
                'm' => 2,
                'g' => 3,
                _ => {
                    return Err(PipeBenchError::invalid_argument(format!(
                        "unknown size suffix '{suffix}' in '{value}', expected k, m or g"
                    )))
                }
            };
            (&value[..index], exponent)
        }
        _ => (value, 0),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PipeBenchError::invalid_argument(format!(
            "invalid number '{value}'"
        )));
    }
    let base: u64 = digits
        .parse()
        .map_err(|_| PipeBenchError::invalid_argument(format!("number '{value}' is too large")))?;
    base.checked_mul(SIZE_MULTIPLIER.pow(exponent))
        .ok_or_else(|| PipeBenchError::invalid_argument(format!("number '{value}' is too large")))
}

/// Buffer size for the producer and consumer, at least one byte.
pub fn parse_buffer_size(value: &str) -> Result<usize, PipeBenchError> {
    let size = parse_number(value)?;
    if size == 0 {
        return Err(PipeBenchError::invalid_argument(
            "buffer size must be greater than zero",
        ));
    }
    usize::try_from(size).map_err(|_| {
        PipeBenchError::invalid_argument(format!("buffer size '{value}' does not fit in memory"))
    })
}

/// Parses a duration given as plain seconds (`1.5`), with an `s` or `m`
/// suffix (`10s`, `2m`) or in humantime notation (`1m 30s`, `250ms`).
pub fn parse_duration(value: &str) -> Result<Duration, PipeBenchError> {
    let value = value.trim();
    let invalid = || PipeBenchError::invalid_argument(format!("invalid duration '{value}'"));

    let seconds = if let Ok(seconds) = value.parse::<f64>() {
        Some(seconds)
    } else if let Some(seconds) = value.strip_suffix('s') {
        seconds.parse::<f64>().ok()
    } else if let Some(minutes) = value.strip_suffix('m') {
        minutes.parse::<f64>().ok().map(|minutes| minutes * 60.0)
    } else {
        None
    };

    match seconds {
        Some(seconds) => Duration::try_from_secs_f64(seconds).map_err(|_| invalid()),
        None => humantime::parse_duration(value).map_err(|_| invalid()),
    }
}
