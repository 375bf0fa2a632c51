//! Volume lifecycle operations and safe teardown.
//!
//! Volumes are removed in two phases: destroy leaves the volume pending
//! eradication and eradicate removes it permanently. [`smarter_delete`]
//! clears host connections first and tolerates the states in which the work
//! is already done.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::array::{ArrayApi, ArrayError, Volume};

/// Arrays address storage in 512-byte sectors.
pub const SECTOR_SIZE: u64 = 512;

/// Lists volumes, optionally including those pending eradication.
///
/// # Errors
///
/// Returns [`ArrayError`] when the listing fails.
pub async fn list_all<A: ArrayApi + ?Sized>(
    array: &A,
    pending: bool,
) -> Result<Vec<Volume>, ArrayError> {
    array.list_volumes(pending).await
}

/// Creates a volume of `size_bytes`.
///
/// # Errors
///
/// Returns [`ArrayError`] when the array rejects the request.
pub async fn create<A: ArrayApi + ?Sized>(
    array: &A,
    name: &str,
    size_bytes: u64,
) -> Result<Volume, ArrayError> {
    info!(volume = name, size_bytes, "creating volume");
    array.create_volume(name, size_bytes).await
}

/// Destroys a volume, leaving it pending eradication.
///
/// # Errors
///
/// Returns [`ArrayError`] when the array rejects the request.
pub async fn destroy<A: ArrayApi + ?Sized>(array: &A, name: &str) -> Result<(), ArrayError> {
    info!(volume = name, "destroying volume");
    array.destroy_volume(name).await
}

/// Permanently removes a destroyed volume.
///
/// # Errors
///
/// Returns [`ArrayError`] when the array rejects the request.
pub async fn eradicate<A: ArrayApi + ?Sized>(array: &A, name: &str) -> Result<(), ArrayError> {
    info!(volume = name, "eradicating volume");
    array.eradicate_volume(name).await
}

/// What [`smarter_delete`] did.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TeardownSummary {
    /// Hosts disconnected from the volume.
    pub disconnected: Vec<String>,
    /// Hosts the array reported as already disconnected.
    pub already_disconnected: Vec<String>,
    /// Destroy failed because the volume was missing or already destroyed.
    pub destroy_skipped: bool,
    /// Eradicate failed because the volume was already gone.
    pub eradicate_skipped: bool,
}

/// Disconnects every host from a volume, then destroys and eradicates it.
///
/// A disconnect the array rejects as "is not connected" counts as done, as
/// does a destroy or eradicate rejected because the volume "does not exist"
/// or "has been destroyed". A skipped destroy still proceeds to eradicate.
/// Any other failure stops the teardown and is returned; hosts after the
/// failing one are left connected.
///
/// # Errors
///
/// Returns [`ArrayError`] for transport failures and for any array error
/// other than the conditions above.
pub async fn smarter_delete<A: ArrayApi + ?Sized>(
    array: &A,
    name: &str,
) -> Result<TeardownSummary, ArrayError> {
    let mut summary = TeardownSummary::default();

    let connections = array.list_volume_connections(name).await?;
    debug!(volume = name, hosts = connections.len(), "clearing host connections");

    for conn in connections {
        match array.disconnect_host(&conn.host, name).await {
            Ok(()) => summary.disconnected.push(conn.host),
            Err(err) if err.is_not_connected() => {
                warn!(volume = name, host = %conn.host, %err, "host already disconnected");
                summary.already_disconnected.push(conn.host);
            }
            Err(err) => return Err(err),
        }
    }

    summary.destroy_skipped = skip_if_gone(array.destroy_volume(name).await, name, "destroy")?;
    summary.eradicate_skipped =
        skip_if_gone(array.eradicate_volume(name).await, name, "eradicate")?;

    info!(
        volume = name,
        disconnected = summary.disconnected.len(),
        already_disconnected = summary.already_disconnected.len(),
        "volume removed"
    );
    Ok(summary)
}

/// Returns `Ok(true)` when `result` failed only because the volume is gone.
fn skip_if_gone(
    result: Result<(), ArrayError>,
    volume: &str,
    step: &str,
) -> Result<bool, ArrayError> {
    match result {
        Ok(()) => Ok(false),
        Err(err) if err.is_volume_gone() => {
            warn!(volume, step, %err, "volume already removed");
            Ok(true)
        }
        Err(err) => Err(err),
    }
}

/// Errors raised when parsing a volume size.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SizeParseError {
    /// Raised for empty input.
    #[error("volume size is empty")]
    Empty,
    /// Raised when the input is not a number with an optional unit suffix.
    #[error("invalid volume size '{0}': expected bytes or a number with a K, M, G, T or P suffix")]
    Invalid(String),
    /// Raised when the size rounds to zero bytes.
    #[error("volume size '{0}' must be greater than zero")]
    Zero(String),
    /// Raised when the size does not fit in 64 bits.
    #[error("volume size '{0}' is too large")]
    Overflow(String),
}

/// Parses a size such as `1024`, `10G` or `1.5T` into bytes.
///
/// Suffixes are binary multiples and case-insensitive. A fractional part is
/// allowed with a suffix. The result is rounded up to a whole number of
/// [`SECTOR_SIZE`] sectors.
///
/// # Errors
///
/// Returns [`SizeParseError`] when the input is malformed, zero, or too
/// large.
pub fn parse_size(input: &str) -> Result<u64, SizeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SizeParseError::Empty);
    }

    let invalid = || SizeParseError::Invalid(trimmed.to_owned());
    let overflow = || SizeParseError::Overflow(trimmed.to_owned());

    let (number, shift) = match trimmed.char_indices().last() {
        Some((at, unit)) if unit.is_ascii_alphabetic() => {
            let bits = unit_shift(unit).ok_or_else(invalid)?;
            (trimmed.get(..at).ok_or_else(invalid)?, bits)
        }
        _ => (trimmed, 0),
    };

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
        return Err(invalid());
    }
    if number.contains('.') && (fraction.is_empty() || shift == 0) {
        return Err(invalid());
    }

    let multiplier = 1_u128 << shift;
    let whole_value: u128 = whole.parse().map_err(|_| overflow())?;
    let mut exact = whole_value.checked_mul(multiplier).ok_or_else(overflow)?;

    if !fraction.is_empty() {
        let digits = u32::try_from(fraction.len()).map_err(|_| invalid())?;
        let scale = 10_u128.checked_pow(digits).ok_or_else(invalid)?;
        let numerator: u128 = fraction.parse().map_err(|_| invalid())?;
        let scaled = numerator.checked_mul(multiplier).ok_or_else(overflow)?;
        let fractional_bytes = scaled.div_ceil(scale);
        exact = exact.checked_add(fractional_bytes).ok_or_else(overflow)?;
    }

    if exact == 0 {
        return Err(SizeParseError::Zero(trimmed.to_owned()));
    }
    let sector = u128::from(SECTOR_SIZE);
    let aligned = exact
        .div_ceil(sector)
        .checked_mul(sector)
        .ok_or_else(overflow)?;
    u64::try_from(aligned).map_err(|_| overflow())
}

const fn unit_shift(unit: char) -> Option<u32> {
    match unit.to_ascii_uppercase() {
        'K' => Some(10),
        'M' => Some(20),
        'G' => Some(30),
        'T' => Some(40),
        'P' => Some(50),
        _ => None,
    }
}

fn is_digits(value: &str) -> bool {
    value.chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1024", 1024)]
    #[case("1K", 1024)]
    #[case("1.5K", 1536)]
    #[case("1G", 1_073_741_824)]
    #[case("10g", 10_737_418_240)]
    #[case(" 2T ", 2_199_023_255_552)]
    #[case("0.5M", 524_288)]
    #[case("1.2T", 1_319_413_953_536)]
    #[case("1.1G", 1_181_116_416)]
    #[case("1.5G", 1_610_612_736)]
    #[case("1000", 1024)]
    #[case("0.0001K", 512)]
    fn parse_size_accepts_bytes_and_suffixes(#[case] input: &str, #[case] expected: u64) {
        assert_eq!(parse_size(input), Ok(expected));
    }

    #[rstest]
    #[case("abc")]
    #[case("1X")]
    #[case("G")]
    #[case("1.G")]
    #[case("1.5")]
    #[case("-1G")]
    #[case("1 G")]
    fn parse_size_rejects_malformed_input(#[case] input: &str) {
        assert!(
            matches!(parse_size(input), Err(SizeParseError::Invalid(_))),
            "input {input:?} should be rejected"
        );
    }

    #[rstest]
    fn parse_size_rejects_empty_and_zero_sizes() {
        assert_eq!(parse_size(""), Err(SizeParseError::Empty));
        assert!(matches!(parse_size("0"), Err(SizeParseError::Zero(_))));
        assert!(matches!(parse_size("0.0G"), Err(SizeParseError::Zero(_))));
    }

    #[rstest]
    fn parse_size_results_are_whole_sectors() {
        for input in ["1", "511", "513", "1.3K", "2.7M", "1.2T"] {
            let bytes = parse_size(input).expect("size should parse");
            assert_eq!(bytes.checked_rem(SECTOR_SIZE), Some(0), "input {input:?}");
        }
    }

    #[rstest]
    fn parse_size_rejects_overflow() {
        assert!(matches!(
            parse_size("99999999P"),
            Err(SizeParseError::Overflow(_))
        ));
    }
}
