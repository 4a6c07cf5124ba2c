//! TSCS42xx register addresses and field constants.
//!
//! Reference: Tempo Semiconductor TSCS42xx datasheet, "Register Map".
//!
//! All registers are 8 bits wide with 8-bit addresses. Multi-byte fields
//! (coefficient RAM data, compressor time constants) are split across
//! consecutive little-endian register pairs/triples and the device
//! auto-increments the address on burst transfers.

/// Default 7-bit I²C address (ADDR pin tied high).
pub const TSCS42XX_I2C_ADDR: u8 = 0x69;
/// Alternate 7-bit I²C address (ADDR pin tied low).
pub const TSCS42XX_I2C_ADDR_ALT: u8 = 0x68;

// ── Volume ─────────────────────────────────────────────────────────────────

/// Headphone volume, left.
pub const R_HPVOLL: u8 = 0x00;
/// Headphone volume, right.
pub const R_HPVOLR: u8 = 0x01;
/// Speaker volume, left.
pub const R_SPKVOLL: u8 = 0x02;
/// Speaker volume, right.
pub const R_SPKVOLR: u8 = 0x03;
/// DAC digital volume, left.
pub const R_DACVOLL: u8 = 0x04;
/// DAC digital volume, right.
pub const R_DACVOLR: u8 = 0x05;
/// ADC digital volume, left.
pub const R_ADCVOLL: u8 = 0x06;
/// ADC digital volume, right.
pub const R_ADCVOLR: u8 = 0x07;
/// Input PGA volume, left.
pub const R_INVOLL: u8 = 0x08;
/// Input PGA volume, right.
pub const R_INVOLR: u8 = 0x09;

// ── Input selection / audio interface ──────────────────────────────────────

/// Input mode (differential/single-ended).
pub const R_INMODE: u8 = 0x0B;
/// Input select, left channel.
pub const R_INSELL: u8 = 0x0C;
/// Input select, right channel.
pub const R_INSELR: u8 = 0x0D;
/// Audio interface control 1: word length, master/slave, format.
pub const R_AIC1: u8 = 0x13;
/// Audio interface control 2: BCLK/LRCLK sharing.
pub const R_AIC2: u8 = 0x14;
/// Converter control 0: ADC mute, ADC high-pass.
pub const R_CNVRTR0: u8 = 0x16;
/// ADC sample rate: base rate, multiplier, BCLK ratio.
pub const R_ADCSR: u8 = 0x17;
/// Converter control 1: DAC mute.
pub const R_CNVRTR1: u8 = 0x18;
/// DAC sample rate: base rate, multiplier, BCLK ratio.
pub const R_DACSR: u8 = 0x19;
/// Power management 1: analog input path.
pub const R_PWRM1: u8 = 0x1A;
/// Power management 2: output path, input muxes, VREF.
pub const R_PWRM2: u8 = 0x1B;

// ── DSP control ────────────────────────────────────────────────────────────

/// DSP configuration 0.
pub const R_CONFIG0: u8 = 0x1F;
/// DSP configuration 1: EQ enables.
pub const R_CONFIG1: u8 = 0x20;
/// Digital microphone control.
pub const R_DMICCTL: u8 = 0x24;
/// Compressor/limiter/expander control.
pub const R_CLECTL: u8 = 0x25;
/// Make-up gain.
pub const R_MUGAIN: u8 = 0x26;
/// Compressor threshold.
pub const R_COMPTH: u8 = 0x27;
/// Compressor ratio.
pub const R_CMPRAT: u8 = 0x28;
/// Compressor attack time constant, low byte.
pub const R_CATKTCL: u8 = 0x29;
/// Compressor attack time constant, high byte.
pub const R_CATKTCH: u8 = 0x2A;
/// Compressor release time constant, low byte.
pub const R_CRELTCL: u8 = 0x2B;
/// Compressor release time constant, high byte.
pub const R_CRELTCH: u8 = 0x2C;
/// Limiter threshold.
pub const R_LIMTH: u8 = 0x2D;
/// Limiter target.
pub const R_LIMTGT: u8 = 0x2E;
/// Limiter attack time constant, low byte.
pub const R_LATKTCL: u8 = 0x2F;
/// Limiter attack time constant, high byte.
pub const R_LATKTCH: u8 = 0x30;
/// Limiter release time constant, low byte.
pub const R_LRELTCL: u8 = 0x31;
/// Limiter release time constant, high byte.
pub const R_LRELTCH: u8 = 0x32;
/// Expander threshold.
pub const R_EXPTH: u8 = 0x33;
/// Expander ratio.
pub const R_EXPRAT: u8 = 0x34;
/// Expander attack time constant, low byte.
pub const R_XATKTCL: u8 = 0x35;
/// Expander attack time constant, high byte.
pub const R_XATKTCH: u8 = 0x36;
/// Expander release time constant, low byte.
pub const R_XRELTCL: u8 = 0x37;
/// Expander release time constant, high byte.
pub const R_XRELTCH: u8 = 0x38;
/// Effects control: 3D, treble and bass enhancement enables.
pub const R_FXCTL: u8 = 0x39;

// ── DAC coefficient RAM transfer ───────────────────────────────────────────

/// Coefficient write data, low byte.
pub const R_DACCRWRL: u8 = 0x3A;
/// Coefficient write data, mid byte.
pub const R_DACCRWRM: u8 = 0x3B;
/// Coefficient write data, high byte. Writing it commits the coefficient.
pub const R_DACCRWRH: u8 = 0x3C;
/// Coefficient read data, low byte.
pub const R_DACCRRDL: u8 = 0x3D;
/// Coefficient read data, mid byte.
pub const R_DACCRRDM: u8 = 0x3E;
/// Coefficient read data, high byte.
pub const R_DACCRRDH: u8 = 0x3F;
/// Coefficient RAM address.
pub const R_DACCRADDR: u8 = 0x40;
/// DC offset select.
pub const R_DCOFSEL: u8 = 0x41;
/// Coefficient RAM status. Non-zero while a transfer is in flight.
pub const R_DACCRSTAT: u8 = 0x8A;

// ── PLL ────────────────────────────────────────────────────────────────────

/// PLL control 9.
pub const R_PLLCTL9: u8 = 0x4E;
/// PLL control A.
pub const R_PLLCTLA: u8 = 0x4F;
/// PLL control B.
pub const R_PLLCTLB: u8 = 0x50;
/// PLL control C.
pub const R_PLLCTLC: u8 = 0x51;
/// PLL control D.
pub const R_PLLCTLD: u8 = 0x52;
/// PLL control E.
pub const R_PLLCTLE: u8 = 0x53;
/// PLL control F.
pub const R_PLLCTLF: u8 = 0x54;
/// PLL control 10.
pub const R_PLLCTL10: u8 = 0x55;
/// PLL control 11.
pub const R_PLLCTL11: u8 = 0x56;
/// PLL control 12.
pub const R_PLLCTL12: u8 = 0x57;
/// PLL control 1B: split nibbles, low written first.
pub const R_PLLCTL1B: u8 = 0x60;
/// PLL control 1C: PLL power-down-bar enables.
pub const R_PLLCTL1C: u8 = 0x61;
/// Time base divider for the reference clock.
pub const R_TIMEBASE: u8 = 0x77;
/// PLL lock status. Non-zero once a PLL is locked.
pub const R_PLLCTL0: u8 = 0x8E;
/// PLL reference clock select.
pub const R_PLLREFSEL: u8 = 0x8F;

// ── Identification / reset ─────────────────────────────────────────────────

/// Device ID, low byte.
pub const R_DEVIDL: u8 = 0x7D;
/// Device ID, high byte.
pub const R_DEVIDH: u8 = 0x7E;
/// Software reset. Self-clearing.
pub const R_RESET: u8 = 0x80;

// ── Multiband compressor ───────────────────────────────────────────────────

/// Multiband compressor enables.
pub const R_DACMBCEN: u8 = 0xC7;
/// Multiband compressor control.
pub const R_DACMBCCTL: u8 = 0xC8;
/// Multiband compressor band 1 make-up gain.
pub const R_DACMBCMUG1: u8 = 0xC9;
/// Multiband compressor band 1 threshold.
pub const R_DACMBCTHR1: u8 = 0xCA;
/// Multiband compressor band 1 ratio.
pub const R_DACMBCRAT1: u8 = 0xCB;
/// Multiband compressor band 1 attack, low byte.
pub const R_DACMBCATK1L: u8 = 0xCC;
/// Multiband compressor band 1 attack, high byte.
pub const R_DACMBCATK1H: u8 = 0xCD;
/// Multiband compressor band 1 release, low byte.
pub const R_DACMBCREL1L: u8 = 0xCE;
/// Multiband compressor band 1 release, high byte.
pub const R_DACMBCREL1H: u8 = 0xCF;
/// Multiband compressor band 2 make-up gain.
pub const R_DACMBCMUG2: u8 = 0xD0;
/// Multiband compressor band 2 threshold.
pub const R_DACMBCTHR2: u8 = 0xD1;
/// Multiband compressor band 2 ratio.
pub const R_DACMBCRAT2: u8 = 0xD2;
/// Multiband compressor band 2 attack, low byte.
pub const R_DACMBCATK2L: u8 = 0xD3;
/// Multiband compressor band 2 attack, high byte.
pub const R_DACMBCATK2H: u8 = 0xD4;
/// Multiband compressor band 2 release, low byte.
pub const R_DACMBCREL2L: u8 = 0xD5;
/// Multiband compressor band 2 release, high byte.
pub const R_DACMBCREL2H: u8 = 0xD6;
/// Multiband compressor band 3 make-up gain.
pub const R_DACMBCMUG3: u8 = 0xD7;
/// Multiband compressor band 3 threshold.
pub const R_DACMBCTHR3: u8 = 0xD8;
/// Multiband compressor band 3 ratio.
pub const R_DACMBCRAT3: u8 = 0xD9;
/// Multiband compressor band 3 attack, low byte.
pub const R_DACMBCATK3L: u8 = 0xDA;
/// Multiband compressor band 3 attack, high byte.
pub const R_DACMBCATK3H: u8 = 0xDB;
/// Multiband compressor band 3 release, low byte.
pub const R_DACMBCREL3L: u8 = 0xDC;
/// Multiband compressor band 3 release, high byte.
pub const R_DACMBCREL3H: u8 = 0xDD;

/// Highest register address exposed by the device.
pub const MAX_REGISTER: u8 = R_DACMBCREL3H;
/// Number of addressable registers (`MAX_REGISTER + 1`).
pub const REGISTER_COUNT: usize = MAX_REGISTER as usize + 1;

// ── Field masks and values ─────────────────────────────────────────────────

/// AIC1 word length field, bits [3:2].
pub const RM_AIC1_WL: u8 = 0b0000_1100;
/// 16-bit word length.
pub const RV_AIC1_WL_16: u8 = 0b00 << 2;
/// 20-bit word length.
pub const RV_AIC1_WL_20: u8 = 0b01 << 2;
/// 24-bit word length.
pub const RV_AIC1_WL_24: u8 = 0b10 << 2;
/// 32-bit word length.
pub const RV_AIC1_WL_32: u8 = 0b11 << 2;
/// AIC1 master-mode bit (codec drives BCLK and LRCLK).
pub const RM_AIC1_MS: u8 = 1 << 5;
/// AIC1 data format field, bits [1:0].
pub const RM_AIC1_FORMAT: u8 = 0b0000_0011;
/// Right-justified data format.
pub const RV_AIC1_FORMAT_RIGHTJ: u8 = 0b00;
/// Left-justified data format.
pub const RV_AIC1_FORMAT_LEFTJ: u8 = 0b01;
/// I²S data format.
pub const RV_AIC1_FORMAT_I2S: u8 = 0b10;
/// DSP (TDM) data format.
pub const RV_AIC1_FORMAT_DSP: u8 = 0b11;
/// AIC1 BCLK polarity inversion.
pub const RM_AIC1_BCLKINV: u8 = 1 << 6;
/// AIC1 LRCLK polarity inversion.
pub const RM_AIC1_LRCLKINV: u8 = 1 << 4;

/// AIC2 BCLK/LRCLK mode field, bits [4:3].
pub const RM_AIC2_BLRCM: u8 = 0b0001_1000;
/// DAC and ADC share one BCLK/LRCLK pair.
pub const RV_AIC2_BLRCM_DAC_BCLK_LRCLK_SHARED: u8 = 0b11 << 3;

/// Sample-rate register base rate field, bits [6:5].
pub const RM_SR_BR: u8 = 0b0110_0000;
/// 32 kHz base rate.
pub const RV_SR_BR_32K: u8 = 0b00 << 5;
/// 44.1 kHz base rate.
pub const RV_SR_BR_44_1K: u8 = 0b01 << 5;
/// 48 kHz base rate.
pub const RV_SR_BR_48K: u8 = 0b10 << 5;
/// Sample-rate register multiplier field, bits [3:2].
pub const RM_SR_BM: u8 = 0b0000_1100;
/// Base rate × 0.25.
pub const RV_SR_BM_0_25: u8 = 0b00 << 2;
/// Base rate × 0.5.
pub const RV_SR_BM_0_5: u8 = 0b01 << 2;
/// Base rate × 1.
pub const RV_SR_BM_1: u8 = 0b10 << 2;
/// Base rate × 2.
pub const RV_SR_BM_2: u8 = 0b11 << 2;
/// Sample-rate register BCLK/LRCLK ratio field, bits [1:0].
pub const RM_SR_BCM: u8 = 0b0000_0011;
/// BCLK = 32 × LRCLK.
pub const RV_SR_BCM_32: u8 = 0b01;
/// BCLK = 40 × LRCLK.
pub const RV_SR_BCM_40: u8 = 0b10;
/// BCLK = 64 × LRCLK.
pub const RV_SR_BCM_64: u8 = 0b11;

/// CNVRTR0 ADC mute.
pub const RM_CNVRTR0_ADCMU: u8 = 1 << 7;
/// CNVRTR0 ADC high-pass output enable (drives the "ADC Mute" widget, inverted).
pub const RM_CNVRTR0_HPOR: u8 = 1 << 5;
/// CNVRTR1 DAC mute.
pub const RM_CNVRTR1_DACMU: u8 = 1 << 7;

/// PWRM1 boost stage, left.
pub const RM_PWRM1_BSTL: u8 = 1 << 7;
/// PWRM1 boost stage, right.
pub const RM_PWRM1_BSTR: u8 = 1 << 6;
/// PWRM1 input PGA, left.
pub const RM_PWRM1_PGAL: u8 = 1 << 5;
/// PWRM1 input PGA, right.
pub const RM_PWRM1_PGAR: u8 = 1 << 4;
/// PWRM1 ADC, left.
pub const RM_PWRM1_ADCL: u8 = 1 << 3;
/// PWRM1 ADC, right.
pub const RM_PWRM1_ADCR: u8 = 1 << 2;
/// PWRM1 microphone bias.
pub const RM_PWRM1_MICB: u8 = 1 << 1;

/// PWRM2 differential-to-single-ended converter.
pub const RM_PWRM2_D2S: u8 = 1 << 7;
/// PWRM2 headphone driver (and DAC) left.
pub const RM_PWRM2_HPL: u8 = 1 << 6;
/// PWRM2 headphone driver (and DAC) right.
pub const RM_PWRM2_HPR: u8 = 1 << 5;
/// PWRM2 class-D speaker driver, left.
pub const RM_PWRM2_SPKL: u8 = 1 << 4;
/// PWRM2 class-D speaker driver, right.
pub const RM_PWRM2_SPKR: u8 = 1 << 3;
/// PWRM2 input selector, left.
pub const RM_PWRM2_INSELL: u8 = 1 << 2;
/// PWRM2 input selector, right.
pub const RM_PWRM2_INSELR: u8 = 1 << 1;
/// PWRM2 voltage reference.
pub const RM_PWRM2_VREF: u8 = 1 << 0;

/// INSELL/INSELR input select field, bits [7:6].
pub const RM_INSEL: u8 = 0b1100_0000;
/// Bit position of the input select field.
pub const FB_INSEL: u8 = 6;
/// Line input 1 (analog microphone on the reference board).
pub const RV_INSEL_IN1: u8 = 0b00 << 6;
/// Line input 2.
pub const RV_INSEL_IN2: u8 = 0b01 << 6;
/// Line input 3 (digital microphone on the reference board).
pub const RV_INSEL_IN3: u8 = 0b10 << 6;
/// Differential-to-single-ended converter output.
pub const RV_INSEL_D2S: u8 = 0b11 << 6;

/// DMICCTL digital microphone enable.
pub const RM_DMICCTL_DMICEN: u8 = 1 << 7;

/// CONFIG1 EQ1 enable.
pub const RM_CONFIG1_EQ1_EN: u8 = 1 << 7;
/// CONFIG1 EQ1 band enables, bits [6:4].
pub const RM_CONFIG1_EQ1_BE: u8 = 0b0111_0000;
/// CLECTL expander enable.
pub const RM_CLECTL_EXP_EN: u8 = 1 << 3;
/// CLECTL limiter enable.
pub const RM_CLECTL_LIMIT_EN: u8 = 1 << 2;
/// CLECTL compressor enable.
pub const RM_CLECTL_COMP_EN: u8 = 1 << 1;
/// FXCTL 3D enhancement enable.
pub const RM_FXCTL_3DEN: u8 = 1 << 4;
/// FXCTL treble enhancement enable.
pub const RM_FXCTL_TEEN: u8 = 1 << 3;
/// FXCTL bass enhancement enable.
pub const RM_FXCTL_BEEN: u8 = 1 << 1;

/// PLLCTL1C PLL2 power-down-bar (1 = PLL2 running).
pub const RM_PLLCTL1C_PDB_PLL2: u8 = 1 << 2;
/// PLLCTL1C PLL1 power-down-bar (1 = PLL1 running).
pub const RM_PLLCTL1C_PDB_PLL1: u8 = 1 << 1;

/// PLLREFSEL PLL1 reference field, bits [2:0].
pub const RM_PLLREFSEL_PLL1: u8 = 0b0000_0111;
/// PLLREFSEL PLL2 reference field, bits [6:4].
pub const RM_PLLREFSEL_PLL2: u8 = 0b0111_0000;
/// PLL1 referenced to the crystal / MCLK1 pin.
pub const RV_PLLREFSEL_PLL1_REF_SEL_XTAL_MCLK1: u8 = 0x00;
/// PLL1 referenced to MCLK2.
pub const RV_PLLREFSEL_PLL1_REF_SEL_MCLK2: u8 = 0x01;
/// PLL2 referenced to the crystal / MCLK1 pin.
pub const RV_PLLREFSEL_PLL2_REF_SEL_XTAL_MCLK1: u8 = 0x00;
/// PLL2 referenced to MCLK2.
pub const RV_PLLREFSEL_PLL2_REF_SEL_MCLK2: u8 = 0x10;

/// Value written to [`R_RESET`] to trigger a software reset.
pub const RV_RESET_ENABLE: u8 = 0x85;

/// Device ID of TSCS42A1.
pub const DEVID_TSCS42A1: u16 = 0x4A74;
/// Device ID of TSCS42A2.
pub const DEVID_TSCS42A2: u16 = 0x4A73;

/// Registers whose value can change behind the driver's back.
///
/// PLL lock status plus the whole coefficient-RAM transfer window. These
/// always go to the bus.
pub const fn is_volatile(reg: u8) -> bool {
    matches!(
        reg,
        R_DACCRWRL
            | R_DACCRWRM
            | R_DACCRWRH
            | R_DACCRRDL
            | R_DACCRRDM
            | R_DACCRRDH
            | R_DACCRSTAT
            | R_DACCRADDR
            | R_PLLCTL0
    )
}

/// Registers with side effects on access. Never served from cache, even for
/// bulk reads.
pub const fn is_precious(reg: u8) -> bool {
    matches!(
        reg,
        R_DACCRWRL
            | R_DACCRWRM
            | R_DACCRWRH
            | R_DACCRRDL
            | R_DACCRRDM
            | R_DACCRRDH
            | R_DACCRSTAT
            | R_DACCRADDR
    )
}

/// Registers whose last written value is worth keeping and replaying.
///
/// Excludes volatile and precious registers and the self-clearing reset.
pub const fn is_cacheable(reg: u8) -> bool {
    reg <= MAX_REGISTER && !is_volatile(reg) && !is_precious(reg) && reg != R_RESET
}

/// Register defaults written once during probe.
pub const REGISTER_INITS: [(u8, u8); 3] = [
    (R_ADCSR, RV_SR_BCM_64),
    (R_DACSR, RV_SR_BCM_64),
    (R_AIC2, RV_AIC2_BLRCM_DAC_BCLK_LRCLK_SHARED),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_window_is_volatile_and_precious() {
        for reg in [
            R_DACCRWRL,
            R_DACCRWRM,
            R_DACCRWRH,
            R_DACCRRDL,
            R_DACCRRDM,
            R_DACCRRDH,
            R_DACCRADDR,
            R_DACCRSTAT,
        ] {
            assert!(is_volatile(reg), "reg {reg:#x} must be volatile");
            assert!(is_precious(reg), "reg {reg:#x} must be precious");
            assert!(!is_cacheable(reg));
        }
    }

    #[test]
    fn lock_status_is_volatile_but_not_precious() {
        assert!(is_volatile(R_PLLCTL0));
        assert!(!is_precious(R_PLLCTL0));
        assert!(!is_cacheable(R_PLLCTL0));
    }

    #[test]
    fn reset_and_out_of_range_registers_are_not_cached() {
        assert!(!is_cacheable(R_RESET));
        assert!(!is_cacheable(MAX_REGISTER + 1));
        assert!(is_cacheable(R_PLLCTL1C));
        assert!(is_cacheable(R_PWRM2));
    }

    #[test]
    fn word_length_values_fit_mask() {
        for v in [RV_AIC1_WL_16, RV_AIC1_WL_20, RV_AIC1_WL_24, RV_AIC1_WL_32] {
            assert_eq!(v & !RM_AIC1_WL, 0);
        }
    }

    #[test]
    fn pll_enable_bits_do_not_overlap() {
        assert_eq!(RM_PLLCTL1C_PDB_PLL1 & RM_PLLCTL1C_PDB_PLL2, 0);
    }
}
