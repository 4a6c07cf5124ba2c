//! PLL reference clock selection.
//!
//! The PLLs are fed either from the crystal / MCLK1 pin or from an external
//! oscillator on MCLK2. In MCLK2 mode the driver owns that oscillator through
//! the [`ExternalClock`] collaborator: it programs its rate, enables it before
//! switching the reference select, and stops it across runtime suspend.

use core::str::FromStr;

use crate::error::Error;
use crate::pll::{apply_pll_setting, find_pll_setting};
use crate::registers::{
    RV_PLLREFSEL_PLL1_REF_SEL_MCLK2, RV_PLLREFSEL_PLL1_REF_SEL_XTAL_MCLK1,
    RV_PLLREFSEL_PLL2_REF_SEL_MCLK2, RV_PLLREFSEL_PLL2_REF_SEL_XTAL_MCLK1, R_PLLREFSEL,
};
use crate::regmap::RegisterIo;

/// PLL reference clock input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PllSource {
    /// Crystal or MCLK1 pin.
    #[default]
    Xtal,
    /// External oscillator on MCLK2.
    Mclk2,
}

impl PllSource {
    /// PLLREFSEL value routing both PLLs to this source.
    pub const fn refsel(self) -> u8 {
        match self {
            Self::Xtal => RV_PLLREFSEL_PLL1_REF_SEL_XTAL_MCLK1 | RV_PLLREFSEL_PLL2_REF_SEL_XTAL_MCLK1,
            Self::Mclk2 => RV_PLLREFSEL_PLL1_REF_SEL_MCLK2 | RV_PLLREFSEL_PLL2_REF_SEL_MCLK2,
        }
    }

    /// Device-tree style name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xtal => "xtal",
            Self::Mclk2 => "mclk",
        }
    }
}

/// Unrecognised clock source name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnknownPllSource;

impl core::fmt::Display for UnknownPllSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "clock source must be \"xtal\" or \"mclk\"")
    }
}

impl FromStr for PllSource {
    type Err = UnknownPllSource;

    /// Accepts `"xtal"` and `"mclk"`; only the first four bytes are compared,
    /// so `"mclk2"` also selects MCLK2.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes().get(..4) {
            Some(b"xtal") => Ok(Self::Xtal),
            Some(b"mclk") => Ok(Self::Mclk2),
            _ => Err(UnknownPllSource),
        }
    }
}

/// External oscillator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// The oscillator cannot produce the requested rate (Hz).
    RateNotSupported(u32),
    /// Enabling the oscillator failed.
    EnableFailed,
    /// No oscillator is wired to MCLK2.
    Missing,
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RateNotSupported(hz) => write!(f, "cannot run at {hz} Hz"),
            Self::EnableFailed => write!(f, "enable failed"),
            Self::Missing => write!(f, "no oscillator on MCLK2"),
        }
    }
}

/// External oscillator on MCLK2.
pub trait ExternalClock {
    /// Program the output frequency in Hz.
    fn set_rate(&mut self, hz: u32) -> Result<(), ClockError>;
    /// Start the oscillator.
    fn enable(&mut self) -> Result<(), ClockError>;
    /// Stop the oscillator.
    fn disable(&mut self);
}

/// Placeholder for boards that run from the crystal.
///
/// Any attempt to use it reports [`ClockError::Missing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClock;

impl ExternalClock for NoClock {
    fn set_rate(&mut self, _hz: u32) -> Result<(), ClockError> {
        Err(ClockError::Missing)
    }

    fn enable(&mut self) -> Result<(), ClockError> {
        Err(ClockError::Missing)
    }

    fn disable(&mut self) {}
}

impl<T: ExternalClock + ?Sized> ExternalClock for &mut T {
    fn set_rate(&mut self, hz: u32) -> Result<(), ClockError> {
        T::set_rate(self, hz)
    }

    fn enable(&mut self) -> Result<(), ClockError> {
        T::enable(self)
    }

    fn disable(&mut self) {
        T::disable(self);
    }
}

/// Program the PLLs for `mclk_frequency` and route them to `source`.
///
/// The PLL table entry is looked up before anything is written, so an
/// unsupported frequency is rejected without bus traffic. In MCLK2 mode the
/// oscillator is left running if the final reference select write fails.
pub fn configure_clocks<R, C>(
    regs: &mut R,
    clock: &mut C,
    source: PllSource,
    mclk_frequency: u32,
) -> Result<(), Error<R::Error>>
where
    R: RegisterIo + ?Sized,
    C: ExternalClock + ?Sized,
{
    let ctl = find_pll_setting(mclk_frequency).ok_or(Error::UnsupportedClock(mclk_frequency))?;
    apply_pll_setting(regs, ctl).map_err(Error::Bus)?;

    if source == PllSource::Mclk2 {
        clock.set_rate(mclk_frequency)?;
        clock.enable()?;
    }
    regs.write(R_PLLREFSEL, source.refsel()).map_err(Error::Bus)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registers::R_TIMEBASE;
    use crate::sim::{SimClock, SimulatedTscs42xx};

    #[test]
    fn parses_device_tree_names() {
        assert_eq!("xtal".parse::<PllSource>(), Ok(PllSource::Xtal));
        assert_eq!("mclk".parse::<PllSource>(), Ok(PllSource::Mclk2));
        assert_eq!("mclk2".parse::<PllSource>(), Ok(PllSource::Mclk2));
        assert_eq!("xta".parse::<PllSource>(), Err(UnknownPllSource));
        assert_eq!("pll".parse::<PllSource>(), Err(UnknownPllSource));
    }

    #[test]
    fn xtal_routes_both_plls_to_mclk1() {
        let mut chip = SimulatedTscs42xx::new();
        chip.set_register(R_PLLREFSEL, 0xFF);
        let mut clk = SimClock::new();
        configure_clocks(&mut chip, &mut clk, PllSource::Xtal, 12_288_000).unwrap();
        assert_eq!(chip.register(R_PLLREFSEL), 0x00);
        assert!(!clk.is_enabled());
        assert_eq!(chip.register(R_TIMEBASE), 0x2F);
    }

    #[test]
    fn mclk2_programs_and_enables_oscillator_first() {
        let mut chip = SimulatedTscs42xx::new();
        let mut clk = SimClock::new();
        configure_clocks(&mut chip, &mut clk, PllSource::Mclk2, 24_576_000).unwrap();
        assert_eq!(chip.register(R_PLLREFSEL), 0x11);
        assert!(clk.is_enabled());
        assert_eq!(clk.rate(), Some(24_576_000));
    }

    #[test]
    fn unsupported_frequency_touches_nothing() {
        let mut chip = SimulatedTscs42xx::new();
        let mut clk = SimClock::new();
        assert_eq!(
            configure_clocks(&mut chip, &mut clk, PllSource::Mclk2, 11_111_111),
            Err(Error::UnsupportedClock(11_111_111))
        );
        assert_eq!(chip.total_writes(), 0);
        assert_eq!(clk.rate(), None);
    }

    #[test]
    fn refsel_failure_leaves_oscillator_running() {
        let mut chip = SimulatedTscs42xx::new();
        chip.fail_writes_to(R_PLLREFSEL);
        let mut clk = SimClock::new();
        let err = configure_clocks(&mut chip, &mut clk, PllSource::Mclk2, 24_576_000).unwrap_err();
        assert!(matches!(err, Error::Bus(_)));
        assert!(clk.is_enabled());
    }

    #[test]
    fn oscillator_failure_is_reported_before_refsel() {
        let mut chip = SimulatedTscs42xx::new();
        let mut clk = SimClock::new();
        clk.fail_enable(true);
        assert_eq!(
            configure_clocks(&mut chip, &mut clk, PllSource::Mclk2, 24_576_000),
            Err(Error::Clock(ClockError::EnableFailed))
        );
        assert_eq!(chip.write_count(R_PLLREFSEL), 0);
    }
}
