//! Sample rate, sample width, BCLK ratio and DAI format encodings.
//!
//! The DAC and ADC share one clock domain, so every rate or BCLK change is
//! written identically to both sample-rate registers.

use crate::pll::PllOutput;
use crate::registers::{
    RM_AIC1_BCLKINV, RM_AIC1_FORMAT, RM_AIC1_LRCLKINV, RM_AIC1_MS, RM_AIC1_WL, RM_SR_BCM,
    RM_SR_BM, RM_SR_BR, RV_AIC1_FORMAT_DSP, RV_AIC1_FORMAT_I2S, RV_AIC1_FORMAT_LEFTJ,
    RV_AIC1_FORMAT_RIGHTJ, RV_AIC1_WL_16, RV_AIC1_WL_20, RV_AIC1_WL_24, RV_AIC1_WL_32,
    RV_SR_BCM_32, RV_SR_BCM_40, RV_SR_BCM_64, RV_SR_BM_0_25, RV_SR_BM_0_5, RV_SR_BM_1,
    RV_SR_BM_2, RV_SR_BR_32K, RV_SR_BR_44_1K, RV_SR_BR_48K,
};

/// Supported sample rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleRate {
    /// 8 kHz
    Hz8000,
    /// 11.025 kHz
    Hz11025,
    /// 16 kHz
    Hz16000,
    /// 22.05 kHz
    Hz22050,
    /// 24 kHz
    Hz24000,
    /// 32 kHz
    Hz32000,
    /// 44.1 kHz
    Hz44100,
    /// 48 kHz
    Hz48000,
    /// 88.2 kHz
    Hz88200,
    /// 96 kHz
    Hz96000,
}

/// Base rate the sample-rate register multiplies from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaseRate {
    /// 32 kHz
    Hz32000,
    /// 44.1 kHz
    Hz44100,
    /// 48 kHz
    Hz48000,
}

/// Multiplier applied to the base rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RateMultiplier {
    /// × 0.25
    Quarter,
    /// × 0.5
    Half,
    /// × 1
    Single,
    /// × 2
    Double,
}

impl SampleRate {
    /// Every supported rate, ascending.
    pub const ALL: [Self; 10] = [
        Self::Hz8000,
        Self::Hz11025,
        Self::Hz16000,
        Self::Hz22050,
        Self::Hz24000,
        Self::Hz32000,
        Self::Hz44100,
        Self::Hz48000,
        Self::Hz88200,
        Self::Hz96000,
    ];

    /// Rate for `hz`, if supported.
    pub fn from_hz(hz: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.hz() == hz)
    }

    /// Rate in Hz.
    pub const fn hz(self) -> u32 {
        match self {
            Self::Hz8000 => 8_000,
            Self::Hz11025 => 11_025,
            Self::Hz16000 => 16_000,
            Self::Hz22050 => 22_050,
            Self::Hz24000 => 24_000,
            Self::Hz32000 => 32_000,
            Self::Hz44100 => 44_100,
            Self::Hz48000 => 48_000,
            Self::Hz88200 => 88_200,
            Self::Hz96000 => 96_000,
        }
    }

    /// Base rate / multiplier pair for the sample-rate registers.
    pub const fn divisor(self) -> (BaseRate, RateMultiplier) {
        match self {
            Self::Hz8000 => (BaseRate::Hz32000, RateMultiplier::Quarter),
            Self::Hz16000 => (BaseRate::Hz32000, RateMultiplier::Half),
            Self::Hz24000 => (BaseRate::Hz48000, RateMultiplier::Half),
            Self::Hz32000 => (BaseRate::Hz32000, RateMultiplier::Single),
            Self::Hz48000 => (BaseRate::Hz48000, RateMultiplier::Single),
            Self::Hz96000 => (BaseRate::Hz48000, RateMultiplier::Double),
            Self::Hz11025 => (BaseRate::Hz44100, RateMultiplier::Quarter),
            Self::Hz22050 => (BaseRate::Hz44100, RateMultiplier::Half),
            Self::Hz44100 => (BaseRate::Hz44100, RateMultiplier::Single),
            Self::Hz88200 => (BaseRate::Hz44100, RateMultiplier::Double),
        }
    }

    /// Base rate and multiplier fields as one sample-rate register value.
    pub const fn register_bits(self) -> u8 {
        let (br, bm) = self.divisor();
        br.bits() | bm.bits()
    }

    /// Mask covering [`register_bits`](Self::register_bits).
    pub const REGISTER_MASK: u8 = RM_SR_BR | RM_SR_BM;

    /// Internal clock this rate is derived from.
    pub const fn pll_output(self) -> PllOutput {
        match self.divisor().0 {
            BaseRate::Hz44100 => PllOutput::Hz112_896M,
            BaseRate::Hz32000 | BaseRate::Hz48000 => PllOutput::Hz122_880M,
        }
    }
}

impl BaseRate {
    /// Register field value.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Hz32000 => RV_SR_BR_32K,
            Self::Hz44100 => RV_SR_BR_44_1K,
            Self::Hz48000 => RV_SR_BR_48K,
        }
    }
}

impl RateMultiplier {
    /// Register field value.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Quarter => RV_SR_BM_0_25,
            Self::Half => RV_SR_BM_0_5,
            Self::Single => RV_SR_BM_1,
            Self::Double => RV_SR_BM_2,
        }
    }
}

/// Sample word length on the audio interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleWidth {
    /// 16-bit
    Bits16,
    /// 20-bit
    Bits20,
    /// 24-bit
    Bits24,
    /// 32-bit
    Bits32,
}

impl SampleWidth {
    /// Width for `bits`, if supported.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            16 => Some(Self::Bits16),
            20 => Some(Self::Bits20),
            24 => Some(Self::Bits24),
            32 => Some(Self::Bits32),
            _ => None,
        }
    }

    /// Width in bits.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Bits16 => 16,
            Self::Bits20 => 20,
            Self::Bits24 => 24,
            Self::Bits32 => 32,
        }
    }

    /// AIC1 word-length field value.
    pub const fn register_bits(self) -> u8 {
        match self {
            Self::Bits16 => RV_AIC1_WL_16,
            Self::Bits20 => RV_AIC1_WL_20,
            Self::Bits24 => RV_AIC1_WL_24,
            Self::Bits32 => RV_AIC1_WL_32,
        }
    }

    /// Mask covering [`register_bits`](Self::register_bits).
    pub const REGISTER_MASK: u8 = RM_AIC1_WL;
}

/// BCLK cycles per LRCLK frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BclkRatio {
    /// 32 × fs
    X32,
    /// 40 × fs
    X40,
    /// 64 × fs
    X64,
}

impl BclkRatio {
    /// Ratio for `ratio`, if supported.
    pub const fn from_ratio(ratio: u32) -> Option<Self> {
        match ratio {
            32 => Some(Self::X32),
            40 => Some(Self::X40),
            64 => Some(Self::X64),
            _ => None,
        }
    }

    /// Ratio as an integer.
    pub const fn ratio(self) -> u32 {
        match self {
            Self::X32 => 32,
            Self::X40 => 40,
            Self::X64 => 64,
        }
    }

    /// Sample-rate register BCLK field value.
    pub const fn register_bits(self) -> u8 {
        match self {
            Self::X32 => RV_SR_BCM_32,
            Self::X40 => RV_SR_BCM_40,
            Self::X64 => RV_SR_BCM_64,
        }
    }

    /// Mask covering [`register_bits`](Self::register_bits).
    pub const REGISTER_MASK: u8 = RM_SR_BCM;
}

/// Which side drives BCLK and LRCLK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockProvider {
    /// Codec drives both clocks.
    CodecMaster,
    /// Codec receives both clocks.
    CodecSlave,
    /// Codec drives BCLK, receives LRCLK.
    CodecBclkMaster,
    /// Codec drives LRCLK, receives BCLK.
    CodecFrameMaster,
}

/// Serial data framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DaiProtocol {
    /// Philips I²S.
    I2s,
    /// Left justified.
    LeftJustified,
    /// Right justified.
    RightJustified,
    /// DSP / PCM mode A.
    DspA,
}

/// Digital audio interface format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DaiFormat {
    /// Data framing.
    pub protocol: DaiProtocol,
    /// Clock direction.
    pub provider: ClockProvider,
    /// BCLK inverted.
    pub bclk_inverted: bool,
    /// LRCLK inverted.
    pub frame_inverted: bool,
}

impl DaiProtocol {
    /// AIC1 format field value.
    pub const fn register_bits(self) -> u8 {
        match self {
            Self::I2s => RV_AIC1_FORMAT_I2S,
            Self::LeftJustified => RV_AIC1_FORMAT_LEFTJ,
            Self::RightJustified => RV_AIC1_FORMAT_RIGHTJ,
            Self::DspA => RV_AIC1_FORMAT_DSP,
        }
    }
}

impl DaiFormat {
    /// I²S, normal polarity, codec is clock master.
    pub const I2S_CODEC_MASTER: Self = Self {
        protocol: DaiProtocol::I2s,
        provider: ClockProvider::CodecMaster,
        bclk_inverted: false,
        frame_inverted: false,
    };

    /// AIC1 bits this format touches.
    pub const AIC1_MASK: u8 = RM_AIC1_MS | RM_AIC1_FORMAT | RM_AIC1_BCLKINV | RM_AIC1_LRCLKINV;

    /// AIC1 value for this format, or `None` if the codec cannot run in
    /// this clocking mode. Only codec-master is supported.
    pub const fn aic1_bits(self) -> Option<u8> {
        if !matches!(self.provider, ClockProvider::CodecMaster) {
            return None;
        }
        let mut bits = RM_AIC1_MS | self.protocol.register_bits();
        if self.bclk_inverted {
            bits |= RM_AIC1_BCLKINV;
        }
        if self.frame_inverted {
            bits |= RM_AIC1_LRCLKINV;
        }
        Some(bits)
    }
}
