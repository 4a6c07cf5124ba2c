//! PLL configuration table and power-enable bits.
//!
//! The TSCS42xx derives its internal converter clocks from two PLLs fed by a
//! common reference (crystal/MCLK1 or MCLK2). PLL1 produces 122.880 MHz for
//! the 8 kHz/48 kHz rate family and PLL2 produces 112.896 MHz for the
//! 11.025 kHz family. Both are programmed from one table entry keyed by the
//! reference frequency.
//!
//! Each entry is a fixed 13-step register sequence. Steps are applied as
//! masked read-modify-writes in order; PLLCTL1B is split across two steps
//! (low nibble first, high nibble after PLLCTL12).

use crate::registers::{
    RM_PLLCTL1C_PDB_PLL1, RM_PLLCTL1C_PDB_PLL2, R_PLLCTL10, R_PLLCTL11, R_PLLCTL12, R_PLLCTL1B,
    R_PLLCTL9, R_PLLCTLA, R_PLLCTLB, R_PLLCTLC, R_PLLCTLD, R_PLLCTLE, R_PLLCTLF, R_TIMEBASE,
};
use crate::regmap::RegisterIo;

/// One masked register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterSetting {
    /// Register address.
    pub address: u8,
    /// Bits of `value` that are applied.
    pub mask: u8,
    /// New field contents.
    pub value: u8,
}

/// Number of register writes in one PLL configuration.
pub const PLL_SETTING_COUNT: usize = 13;

/// PLL register sequence for one reference clock frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PllControl {
    /// Reference clock frequency in Hz.
    pub input_freq: u32,
    /// Writes in application order.
    pub settings: [RegisterSetting; PLL_SETTING_COUNT],
}

const fn rs(address: u8, value: u8, mask: u8) -> RegisterSetting {
    RegisterSetting {
        address,
        mask,
        value,
    }
}

#[allow(clippy::too_many_arguments)]
const fn pll(
    input_freq: u32,
    rt: u8,
    rd: u8,
    r1b_l: u8,
    r9: u8,
    ra: u8,
    rb: u8,
    rc: u8,
    r12: u8,
    r1b_h: u8,
    re: u8,
    rf: u8,
    r10: u8,
    r11: u8,
) -> PllControl {
    PllControl {
        input_freq,
        settings: [
            rs(R_TIMEBASE, rt, 0xFF),
            rs(R_PLLCTLD, rd, 0xFF),
            rs(R_PLLCTL1B, r1b_l, 0x0F),
            rs(R_PLLCTL9, r9, 0xFF),
            rs(R_PLLCTLA, ra, 0xFF),
            rs(R_PLLCTLB, rb, 0xFF),
            rs(R_PLLCTLC, rc, 0xFF),
            rs(R_PLLCTL12, r12, 0xFF),
            rs(R_PLLCTL1B, r1b_h, 0xF0),
            rs(R_PLLCTLE, re, 0xFF),
            rs(R_PLLCTLF, rf, 0xFF),
            rs(R_PLLCTL10, r10, 0xFF),
            rs(R_PLLCTL11, r11, 0xFF),
        ],
    }
}

/// Every supported reference clock, one entry each.
#[rustfmt::skip]
pub const PLL_CONTROLS: [PllControl; 23] = [
    pll( 1_411_200, 0x05, 0x39, 0x04, 0x07, 0x02, 0xC3, 0x04, 0x1B, 0x10, 0x03, 0x03, 0xD0, 0x02),
    pll( 1_536_000, 0x05, 0x1A, 0x04, 0x02, 0x03, 0xE0, 0x01, 0x1A, 0x10, 0x02, 0x03, 0xB9, 0x01),
    pll( 2_822_400, 0x0A, 0x23, 0x04, 0x07, 0x04, 0xC3, 0x04, 0x22, 0x10, 0x05, 0x03, 0x58, 0x02),
    pll( 3_072_000, 0x0B, 0x22, 0x04, 0x07, 0x03, 0x48, 0x03, 0x1A, 0x10, 0x04, 0x03, 0xB9, 0x01),
    pll( 5_644_800, 0x15, 0x23, 0x04, 0x0E, 0x04, 0xC3, 0x04, 0x1A, 0x10, 0x08, 0x03, 0xE0, 0x01),
    pll( 6_144_000, 0x17, 0x1A, 0x04, 0x08, 0x03, 0xE0, 0x01, 0x1A, 0x10, 0x08, 0x03, 0xB9, 0x01),
    pll(12_000_000, 0x2E, 0x1B, 0x04, 0x19, 0x03, 0x00, 0x03, 0x2A, 0x10, 0x19, 0x05, 0x98, 0x04),
    pll(19_200_000, 0x4A, 0x13, 0x04, 0x14, 0x03, 0x80, 0x01, 0x1A, 0x10, 0x19, 0x03, 0xB9, 0x01),
    pll(22_000_000, 0x55, 0x2A, 0x04, 0x37, 0x05, 0x00, 0x06, 0x22, 0x10, 0x26, 0x03, 0x49, 0x02),
    pll(22_579_200, 0x57, 0x22, 0x04, 0x31, 0x03, 0x20, 0x03, 0x1A, 0x10, 0x1D, 0x03, 0xB3, 0x01),
    pll(24_000_000, 0x5D, 0x13, 0x04, 0x19, 0x03, 0x80, 0x01, 0x1B, 0x10, 0x19, 0x05, 0x4C, 0x02),
    pll(24_576_000, 0x5F, 0x13, 0x04, 0x1D, 0x03, 0xB3, 0x01, 0x22, 0x10, 0x40, 0x03, 0x72, 0x03),
    pll(27_000_000, 0x68, 0x22, 0x04, 0x4B, 0x03, 0x00, 0x04, 0x2A, 0x10, 0x7D, 0x03, 0x20, 0x06),
    pll(36_000_000, 0x8C, 0x1B, 0x04, 0x4B, 0x03, 0x00, 0x03, 0x2A, 0x10, 0x7D, 0x03, 0x98, 0x04),
    pll(25_000_000, 0x61, 0x1B, 0x04, 0x37, 0x03, 0x2B, 0x03, 0x1A, 0x10, 0x2A, 0x03, 0x39, 0x02),
    pll(26_000_000, 0x65, 0x23, 0x04, 0x41, 0x05, 0x00, 0x06, 0x1A, 0x10, 0x26, 0x03, 0xEF, 0x01),
    pll(12_288_000, 0x2F, 0x1A, 0x04, 0x12, 0x03, 0x1C, 0x02, 0x22, 0x10, 0x20, 0x03, 0x72, 0x03),
    pll(40_000_000, 0x9B, 0x22, 0x08, 0x7D, 0x03, 0x80, 0x04, 0x23, 0x10, 0x7D, 0x05, 0xE4, 0x06),
    pll(   512_000, 0x01, 0x22, 0x04, 0x01, 0x03, 0xD0, 0x02, 0x1B, 0x10, 0x01, 0x04, 0x72, 0x03),
    pll(   705_600, 0x02, 0x22, 0x04, 0x02, 0x03, 0x15, 0x04, 0x22, 0x10, 0x01, 0x04, 0x80, 0x02),
    pll( 1_024_000, 0x03, 0x22, 0x04, 0x02, 0x03, 0xD0, 0x02, 0x1B, 0x10, 0x02, 0x04, 0x72, 0x03),
    pll( 2_048_000, 0x07, 0x22, 0x04, 0x04, 0x03, 0xD0, 0x02, 0x1B, 0x10, 0x04, 0x04, 0x72, 0x03),
    pll( 2_400_000, 0x08, 0x22, 0x04, 0x05, 0x03, 0x00, 0x03, 0x23, 0x10, 0x05, 0x05, 0x98, 0x04),
];

/// Exact-match lookup of the PLL sequence for a reference clock in Hz.
pub fn find_pll_setting(input_freq: u32) -> Option<&'static PllControl> {
    PLL_CONTROLS.iter().find(|c| c.input_freq == input_freq)
}

/// Write every step of `ctl` in table order.
///
/// Fails fast: the first register error is returned and earlier steps stay
/// applied.
pub fn apply_pll_setting<R>(regs: &mut R, ctl: &PllControl) -> Result<(), R::Error>
where
    R: RegisterIo + ?Sized,
{
    debug!("tscs42xx: programming PLLs for {} Hz reference", ctl.input_freq);
    for s in &ctl.settings {
        regs.update_bits(s.address, s.mask, s.value)?;
    }
    Ok(())
}

/// One of the two on-chip PLLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pll {
    /// 122.880 MHz, 48 kHz family.
    Pll1,
    /// 112.896 MHz, 44.1 kHz family.
    Pll2,
}

impl Pll {
    /// PLLCTL1C power-down-bar bit for this PLL.
    pub const fn enable_mask(self) -> u8 {
        match self {
            Self::Pll1 => RM_PLLCTL1C_PDB_PLL1,
            Self::Pll2 => RM_PLLCTL1C_PDB_PLL2,
        }
    }
}

/// Internal clock frequency a sample rate needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllOutput {
    /// 112.896 MHz.
    Hz112_896M,
    /// 122.880 MHz.
    Hz122_880M,
}

impl PllOutput {
    /// Frequency in Hz.
    pub const fn hz(self) -> u32 {
        match self {
            Self::Hz112_896M => 112_896_000,
            Self::Hz122_880M => 122_880_000,
        }
    }

    /// PLL that produces this frequency.
    pub const fn pll(self) -> Pll {
        match self {
            Self::Hz112_896M => Pll::Pll2,
            Self::Hz122_880M => Pll::Pll1,
        }
    }
}
