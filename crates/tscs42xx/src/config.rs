//! Static codec configuration.

use crate::clock::PllSource;
use crate::poll::RetryPolicy;
use crate::registers::TSCS42XX_I2C_ADDR;

/// Reference clock frequency most boards use (Hz).
pub const DEFAULT_MCLK_FREQUENCY: u32 = 24_576_000;

/// Board-level codec settings.
///
/// Defaults: crystal reference at 24.576 MHz, PLL lock wait of ten reads
/// 1 ms apart, coefficient RAM ready wait of ten back-to-back reads, I²C
/// address `0x69`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CodecConfig {
    /// Which pin feeds the PLLs.
    pub pll_source: PllSource,
    /// Reference clock frequency in Hz. Must have a PLL table entry.
    pub mclk_frequency: u32,
    /// PLL lock status poll.
    pub pll_lock: RetryPolicy,
    /// Coefficient RAM ready poll.
    pub coeff_ram_ready: RetryPolicy,
    /// 7-bit I²C address.
    pub i2c_address: u8,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            pll_source: PllSource::Xtal,
            mclk_frequency: DEFAULT_MCLK_FREQUENCY,
            pll_lock: RetryPolicy::PLL_LOCK,
            coeff_ram_ready: RetryPolicy::COEFF_RAM_READY,
            i2c_address: TSCS42XX_I2C_ADDR,
        }
    }
}

impl CodecConfig {
    /// Default settings with the given reference clock.
    pub fn with_clock(pll_source: PllSource, mclk_frequency: u32) -> Self {
        Self {
            pll_source,
            mclk_frequency,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_board() {
        let c = CodecConfig::default();
        assert_eq!(c.pll_source, PllSource::Xtal);
        assert_eq!(c.mclk_frequency, 24_576_000);
        assert_eq!(c.pll_lock.max_attempts, 10);
        assert_eq!(c.pll_lock.interval_us, 1_000);
        assert_eq!(c.coeff_ram_ready.interval_us, 0);
        assert_eq!(c.i2c_address, 0x69);
    }

    #[test]
    fn with_clock_keeps_other_defaults() {
        let c = CodecConfig::with_clock(PllSource::Mclk2, 12_000_000);
        assert_eq!(c.pll_source, PllSource::Mclk2);
        assert_eq!(c.mclk_frequency, 12_000_000);
        assert_eq!(c.pll_lock, RetryPolicy::PLL_LOCK);
    }
}
