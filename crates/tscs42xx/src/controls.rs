//! Named DSP parameters.
//!
//! Tuning tools address the DSP by name rather than by address: biquad and
//! general coefficients in coefficient RAM, single-bit feature enables, and
//! the raw DSP control registers.

use crate::registers::{
    RM_CLECTL_COMP_EN, RM_CLECTL_EXP_EN, RM_CLECTL_LIMIT_EN, RM_CONFIG1_EQ1_BE, RM_CONFIG1_EQ1_EN,
    RM_FXCTL_3DEN, RM_FXCTL_BEEN, RM_FXCTL_TEEN, R_CATKTCH, R_CATKTCL, R_CLECTL, R_CMPRAT,
    R_COMPTH, R_CONFIG0, R_CONFIG1, R_CRELTCH, R_CRELTCL, R_DACCRADDR, R_DACCRRDH, R_DACCRRDL,
    R_DACCRRDM, R_DACCRSTAT, R_DACCRWRH, R_DACCRWRL, R_DACCRWRM, R_DACMBCATK1H, R_DACMBCATK1L,
    R_DACMBCATK2H, R_DACMBCATK2L, R_DACMBCATK3H, R_DACMBCATK3L, R_DACMBCCTL, R_DACMBCEN,
    R_DACMBCMUG1, R_DACMBCMUG2, R_DACMBCMUG3, R_DACMBCRAT1, R_DACMBCRAT2, R_DACMBCRAT3,
    R_DACMBCREL1H, R_DACMBCREL1L, R_DACMBCREL2H, R_DACMBCREL2L, R_DACMBCREL3H, R_DACMBCREL3L,
    R_DACMBCTHR1, R_DACMBCTHR2, R_DACMBCTHR3, R_DCOFSEL, R_EXPRAT, R_EXPTH, R_FXCTL, R_LATKTCH,
    R_LATKTCL, R_LIMTGT, R_LIMTH, R_LRELTCH, R_LRELTCL, R_MUGAIN, R_XATKTCH, R_XATKTCL,
    R_XRELTCH, R_XRELTCL,
};

/// Coefficient names within one biquad, in address order.
pub const BIQUAD_COEFFICIENTS: [&str; 5] = ["b0", "b1", "b2", "a1", "a2"];

/// Biquad filters: name and address of `b0`.
pub const BIQUADS: [(&str, u8); 38] = [
    ("eq1_ch0_band1", 0x00),
    ("eq1_ch0_band2", 0x05),
    ("eq1_ch0_band3", 0x0a),
    ("eq1_ch0_band4", 0x0f),
    ("eq1_ch0_band5", 0x14),
    ("eq1_ch0_band6", 0x19),
    ("eq1_ch1_band1", 0x20),
    ("eq1_ch1_band2", 0x25),
    ("eq1_ch1_band3", 0x2a),
    ("eq1_ch1_band4", 0x2f),
    ("eq1_ch1_band5", 0x34),
    ("eq1_ch1_band6", 0x39),
    ("eq2_ch0_band1", 0x40),
    ("eq2_ch0_band2", 0x45),
    ("eq2_ch0_band3", 0x4a),
    ("eq2_ch0_band4", 0x4f),
    ("eq2_ch0_band5", 0x54),
    ("eq2_ch0_band6", 0x59),
    ("eq2_ch1_band1", 0x60),
    ("eq2_ch1_band2", 0x65),
    ("eq2_ch1_band3", 0x6a),
    ("eq2_ch1_band4", 0x6f),
    ("eq2_ch1_band5", 0x74),
    ("eq2_ch1_band6", 0x79),
    ("bass_ext1", 0x80),
    ("bass_ext2", 0x85),
    ("bass_lmt", 0x8c),
    ("bass_cto", 0x91),
    ("treb_ext1", 0x97),
    ("treb_ext2", 0x9c),
    ("treb_lmt", 0xa3),
    ("treb_cto", 0xa8),
    ("mbc_1_bq1", 0xb0),
    ("mbc_1_bq2", 0xb5),
    ("mbc_2_bq1", 0xba),
    ("mbc_2_bq2", 0xbf),
    ("mbc_3_bq1", 0xc4),
    ("mbc_3_bq2", 0xc9),
];

/// Stand-alone coefficients.
pub const GENERAL_COEFFICIENTS: [(&str, u8); 12] = [
    ("3d_coef", 0xae),
    ("3d_mix", 0xaf),
    ("eq1_ch0_prescale", 0x1f),
    ("eq1_ch1_prescale", 0x3f),
    ("eq2_ch0_prescale", 0x5f),
    ("eq2_ch1_prescale", 0x7f),
    ("bass_nlf_m1", 0x8a),
    ("bass_nlf_m2", 0x8b),
    ("bass_mix", 0x96),
    ("treb_nlf_m1", 0xa1),
    ("treb_nlf_m2", 0xa2),
    ("treb_mix", 0xad),
];

/// Coefficient RAM address for `name`.
///
/// Biquad coefficients are named `<biquad>_<coef>`, e.g. `bass_lmt_a1`.
pub fn coefficient_address(name: &str) -> Option<u8> {
    if let Some(&(_, addr)) = GENERAL_COEFFICIENTS.iter().find(|(n, _)| *n == name) {
        return Some(addr);
    }
    let (biquad, coef) = name.rsplit_once('_')?;
    let base = BIQUADS
        .iter()
        .find(|(n, _)| *n == biquad)
        .map(|&(_, a)| a)?;
    let offset = BIQUAD_COEFFICIENTS.iter().position(|c| *c == coef)?;
    base.checked_add(u8::try_from(offset).ok()?)
}

/// Register bit field exposed as a feature switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitControl {
    /// Control name.
    pub name: &'static str,
    /// Register address.
    pub reg: u8,
    /// Field mask (already shifted).
    pub mask: u8,
}

impl BitControl {
    /// Field position.
    pub const fn shift(&self) -> u32 {
        self.mask.trailing_zeros()
    }

    /// Largest field value.
    pub const fn max(&self) -> u8 {
        self.field(self.mask)
    }

    /// Field value within a register value.
    pub const fn field(&self, reg_value: u8) -> u8 {
        match (reg_value & self.mask).checked_shr(self.shift()) {
            Some(v) => v,
            None => 0,
        }
    }

    /// Register bits for field value `value`; excess bits are dropped.
    pub const fn bits(&self, value: u8) -> u8 {
        match value.checked_shl(self.shift()) {
            Some(v) => v & self.mask,
            None => 0,
        }
    }
}

/// DSP feature switches.
pub const BIT_CONTROLS: [BitControl; 8] = [
    BitControl { name: "eq1_en", reg: R_CONFIG1, mask: RM_CONFIG1_EQ1_EN },
    BitControl { name: "eq1_bands_en", reg: R_CONFIG1, mask: RM_CONFIG1_EQ1_BE },
    BitControl { name: "exp_en", reg: R_CLECTL, mask: RM_CLECTL_EXP_EN },
    BitControl { name: "limit_en", reg: R_CLECTL, mask: RM_CLECTL_LIMIT_EN },
    BitControl { name: "comp_en", reg: R_CLECTL, mask: RM_CLECTL_COMP_EN },
    BitControl { name: "3d_en", reg: R_FXCTL, mask: RM_FXCTL_3DEN },
    BitControl { name: "te_en", reg: R_FXCTL, mask: RM_FXCTL_TEEN },
    BitControl { name: "be_en", reg: R_FXCTL, mask: RM_FXCTL_BEEN },
];

/// Feature switch named `name`.
pub fn bit_control(name: &str) -> Option<&'static BitControl> {
    BIT_CONTROLS.iter().find(|c| c.name == name)
}

/// DSP control registers by name.
pub const CONTROL_REGISTERS: [(&str, u8); 55] = [
    ("config0", R_CONFIG0),
    ("config1", R_CONFIG1),
    ("clectl", R_CLECTL),
    ("mugain", R_MUGAIN),
    ("compth", R_COMPTH),
    ("cmprat", R_CMPRAT),
    ("catktcl", R_CATKTCL),
    ("catktch", R_CATKTCH),
    ("creltcl", R_CRELTCL),
    ("creltch", R_CRELTCH),
    ("limth", R_LIMTH),
    ("limtgt", R_LIMTGT),
    ("latktcl", R_LATKTCL),
    ("latktch", R_LATKTCH),
    ("lreltcl", R_LRELTCL),
    ("lreltch", R_LRELTCH),
    ("expth", R_EXPTH),
    ("exprat", R_EXPRAT),
    ("xatktcl", R_XATKTCL),
    ("xatktch", R_XATKTCH),
    ("xreltcl", R_XRELTCL),
    ("xreltch", R_XRELTCH),
    ("fxctl", R_FXCTL),
    ("daccrwrl", R_DACCRWRL),
    ("daccrwrm", R_DACCRWRM),
    ("daccrwrh", R_DACCRWRH),
    ("daccrrdl", R_DACCRRDL),
    ("daccrrdm", R_DACCRRDM),
    ("daccrrdh", R_DACCRRDH),
    ("daccraddr", R_DACCRADDR),
    ("dcofsel", R_DCOFSEL),
    ("daccrstat", R_DACCRSTAT),
    ("dacmbcen", R_DACMBCEN),
    ("dacmbcctl", R_DACMBCCTL),
    ("dacmbcmug1", R_DACMBCMUG1),
    ("dacmbcthr1", R_DACMBCTHR1),
    ("dacmbcrat1", R_DACMBCRAT1),
    ("dacmbcatk1l", R_DACMBCATK1L),
    ("dacmbcatk1h", R_DACMBCATK1H),
    ("dacmbcrel1l", R_DACMBCREL1L),
    ("dacmbcrel1h", R_DACMBCREL1H),
    ("dacmbcmug2", R_DACMBCMUG2),
    ("dacmbcthr2", R_DACMBCTHR2),
    ("dacmbcrat2", R_DACMBCRAT2),
    ("dacmbcatk2l", R_DACMBCATK2L),
    ("dacmbcatk2h", R_DACMBCATK2H),
    ("dacmbcrel2l", R_DACMBCREL2L),
    ("dacmbcrel2h", R_DACMBCREL2H),
    ("dacmbcmug3", R_DACMBCMUG3),
    ("dacmbcthr3", R_DACMBCTHR3),
    ("dacmbcrat3", R_DACMBCRAT3),
    ("dacmbcatk3l", R_DACMBCATK3L),
    ("dacmbcatk3h", R_DACMBCATK3H),
    ("dacmbcrel3l", R_DACMBCREL3L),
    ("dacmbcrel3h", R_DACMBCREL3H),
];

/// Register address of the DSP control register `name`.
pub fn control_register(name: &str) -> Option<u8> {
    CONTROL_REGISTERS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, a)| a)
}
