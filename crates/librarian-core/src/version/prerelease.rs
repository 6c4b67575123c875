//! Prerelease counter arithmetic.

/// Why a prerelease counter could not be incremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterError {
    /// The suffix does not end in an ASCII digit.
    NoDigits,
    /// The incremented number does not fit in a `u64`.
    Overflow,
}

/// Increment the trailing number of a prerelease suffix.
///
/// `"beta.3"` becomes `"beta.4"` and `"rc09"` becomes `"rc10"`: the digit
/// run never gets narrower, but may grow (`"rc99"` becomes `"rc100"`).
pub fn increment(prerelease: &str) -> Result<String, CounterError> {
    let digits = prerelease
        .bytes()
        .rev()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return Err(CounterError::NoDigits);
    }

    let (prefix, number) = prerelease.split_at(prerelease.len() - digits);
    let next = number
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or(CounterError::Overflow)?;
    Ok(format!("{prefix}{next:0width$}", width = number.len()))
}
