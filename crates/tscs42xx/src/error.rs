//! Driver error type.

use crate::clock::ClockError;
use crate::dapm::DapmError;

/// Coarse classification of [`Error`] values.
///
/// Callers that only need to decide between "fix the configuration",
/// "the bus is broken" and "the chip did not respond in time" match on this
/// instead of every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// Unsupported frequency, rate, format or clock mode. Rejected before
    /// touching hardware where feasible.
    Configuration,
    /// A register transaction or external clock call failed.
    Io,
    /// A PLL did not report lock within the retry budget.
    LockTimeout,
    /// The caller broke the driver's usage contract.
    ProtocolViolation,
}

impl ErrorKind {
    /// Short static name, suitable for log output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Io => "io",
            Self::LockTimeout => "lock-timeout",
            Self::ProtocolViolation => "protocol-violation",
        }
    }
}

/// TSCS42xx driver error, generic over the register I/O error `E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Register I/O failed.
    Bus(E),
    /// External MCLK2 oscillator call failed.
    Clock(ClockError),
    /// Power-domain graph rejected the request.
    Dapm(DapmError),
    /// No PLL table entry for this input clock frequency (Hz).
    UnsupportedClock(u32),
    /// Sample rate (Hz) not supported. `0` means no rate was configured yet.
    UnsupportedRate(u32),
    /// Sample width (bits) not supported.
    UnsupportedFormat(u8),
    /// BCLK/LRCLK ratio not supported.
    UnsupportedBclkRatio(u32),
    /// DAI clocking mode not supported (the codec must be clock master).
    UnsupportedDaiFormat,
    /// PLL did not lock within the retry budget.
    PllLockTimeout,
    /// Coefficient RAM stayed busy for the whole retry budget.
    CoeffRamBusy,
    /// PLL power-down without a matching power-up.
    PllRefCountUnderflow,
    /// Buffer length does not match what the operation requires.
    InvalidSize {
        /// Required length in bytes.
        expected: usize,
        /// Supplied length in bytes.
        actual: usize,
    },
    /// Coefficient write would run past the last coefficient address.
    AddressOutOfRange {
        /// First coefficient address.
        address: u8,
        /// Number of coefficients requested.
        count: usize,
    },
    /// Firmware image is truncated or has an invalid length.
    MalformedImage,
    /// No control or coefficient with that name.
    UnknownControl,
}

impl<E> Error<E> {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Bus(_) | Self::Clock(_) => ErrorKind::Io,
            Self::UnsupportedClock(_)
            | Self::UnsupportedRate(_)
            | Self::UnsupportedFormat(_)
            | Self::UnsupportedBclkRatio(_)
            | Self::UnsupportedDaiFormat
            | Self::MalformedImage
            | Self::UnknownControl
            | Self::Dapm(_) => ErrorKind::Configuration,
            Self::PllLockTimeout | Self::CoeffRamBusy => ErrorKind::LockTimeout,
            Self::PllRefCountUnderflow
            | Self::InvalidSize { .. }
            | Self::AddressOutOfRange { .. } => ErrorKind::ProtocolViolation,
        }
    }
}

impl<E> From<ClockError> for Error<E> {
    fn from(e: ClockError) -> Self {
        Self::Clock(e)
    }
}

impl<E> From<DapmError> for Error<E> {
    fn from(e: DapmError) -> Self {
        Self::Dapm(e)
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug> std::error::Error for Error<E> {}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    #[allow(clippy::use_debug)] // bus error types only guarantee Debug
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "register I/O failed: {e:?}"),
            Self::Clock(e) => write!(f, "MCLK2 oscillator: {e}"),
            Self::Dapm(e) => write!(f, "power domain: {e}"),
            Self::UnsupportedClock(hz) => write!(f, "no PLL setting for a {hz} Hz input clock"),
            Self::UnsupportedRate(0) => write!(f, "no sample rate configured"),
            Self::UnsupportedRate(hz) => write!(f, "unsupported sample rate {hz} Hz"),
            Self::UnsupportedFormat(bits) => write!(f, "unsupported sample width {bits} bits"),
            Self::UnsupportedBclkRatio(r) => write!(f, "unsupported BCLK ratio {r}"),
            Self::UnsupportedDaiFormat => write!(f, "codec must be BCLK and LRCLK master"),
            Self::PllLockTimeout => write!(f, "PLL failed to lock"),
            Self::CoeffRamBusy => write!(f, "coefficient RAM stayed busy"),
            Self::PllRefCountUnderflow => write!(f, "PLL powered down more often than up"),
            Self::InvalidSize { expected, actual } => {
                write!(f, "buffer is {actual} bytes, expected {expected}")
            }
            Self::AddressOutOfRange { address, count } => write!(
                f,
                "{count} coefficients at {address:#04x} run past the end of coefficient RAM"
            ),
            Self::MalformedImage => write!(f, "malformed firmware image"),
            Self::UnknownControl => write!(f, "unknown control"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        type E = Error<()>;
        assert_eq!(E::Bus(()).kind(), ErrorKind::Io);
        assert_eq!(E::UnsupportedClock(1).kind(), ErrorKind::Configuration);
        assert_eq!(E::UnsupportedRate(12_345).kind(), ErrorKind::Configuration);
        assert_eq!(E::UnsupportedFormat(18).kind(), ErrorKind::Configuration);
        assert_eq!(E::PllLockTimeout.kind(), ErrorKind::LockTimeout);
        assert_eq!(E::PllRefCountUnderflow.kind(), ErrorKind::ProtocolViolation);
        assert_eq!(
            E::AddressOutOfRange { address: 0xC0, count: 20 }.kind(),
            ErrorKind::ProtocolViolation
        );
        assert_eq!(
            E::InvalidSize { expected: 618, actual: 3 }.kind(),
            ErrorKind::ProtocolViolation
        );
    }

    #[test]
    fn display_mentions_the_values() {
        let s = std::format!("{}", Error::<()>::UnsupportedRate(12_345));
        assert!(s.contains("12345"));
        let s = std::format!("{}", Error::<()>::AddressOutOfRange { address: 0xC0, count: 20 });
        assert!(s.contains("0xc0"));
        assert!(s.contains("20"));
    }
}
