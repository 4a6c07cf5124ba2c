//! Board description: which clock feeds the codec and which jacks have a
//! detect GPIO.

use tscs42xx::{CodecConfig, PllSource};

/// Detect-line polarity of a jack switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JackPolarity {
    /// High level means plugged in.
    #[default]
    ActiveHigh,
    /// Low level means plugged in.
    ActiveLow,
}

impl JackPolarity {
    /// Polarity from a GPIO active-low flag.
    pub const fn from_active_low(active_low: bool) -> Self {
        if active_low {
            Self::ActiveLow
        } else {
            Self::ActiveHigh
        }
    }

    /// Whether the line is flagged active-low.
    pub const fn is_active_low(self) -> bool {
        matches!(self, Self::ActiveLow)
    }

    /// Whether a jack is present given the sampled line level.
    pub const fn is_active(self, level_high: bool) -> bool {
        level_high != self.is_active_low()
    }
}

/// Board property problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoardConfigError {
    /// `mclk-src` is missing.
    MissingClockSource,
    /// `mclk-src` names neither `xtal` nor `mclk`.
    UnsupportedClockSource,
    /// `mclk-src-freq` is missing.
    MissingClockFrequency,
}

impl core::fmt::Display for BoardConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingClockSource => write!(f, "mclk-src is needed"),
            Self::UnsupportedClockSource => write!(f, "mclk-src is unsupported"),
            Self::MissingClockFrequency => write!(f, "mclk-src-freq not provided"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BoardConfigError {}

/// Static board settings.
///
/// A `None` jack means the board has no detect GPIO for it; the card then
/// assumes headphones and an analog microphone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoardConfig {
    /// PLL reference input.
    pub mclk_src: PllSource,
    /// Reference frequency in Hz.
    pub mclk_src_freq: u32,
    /// Headphone detect polarity, if the board has a detect line.
    #[cfg_attr(feature = "serde", serde(default))]
    pub headphone_jack: Option<JackPolarity>,
    /// Microphone detect polarity, if the board has a detect line.
    #[cfg_attr(feature = "serde", serde(default))]
    pub mic_jack: Option<JackPolarity>,
}

impl BoardConfig {
    /// Board without jack detection.
    pub const fn new(mclk_src: PllSource, mclk_src_freq: u32) -> Self {
        Self {
            mclk_src,
            mclk_src_freq,
            headphone_jack: None,
            mic_jack: None,
        }
    }

    /// Build from the `mclk-src` and `mclk-src-freq` board properties.
    ///
    /// Both are required. The source name is matched on its first four
    /// characters.
    pub fn from_properties(
        mclk_src: Option<&str>,
        mclk_src_freq: Option<u32>,
    ) -> Result<Self, BoardConfigError> {
        let name = mclk_src.ok_or_else(|| {
            error!("rpi-tscs42xx: mclk-src is needed");
            BoardConfigError::MissingClockSource
        })?;
        let source = name.parse::<PllSource>().map_err(|_| {
            error!("rpi-tscs42xx: mclk-src {} is unsupported", name);
            BoardConfigError::UnsupportedClockSource
        })?;
        let freq = mclk_src_freq.ok_or_else(|| {
            error!("rpi-tscs42xx: mclk-src-freq not provided");
            BoardConfigError::MissingClockFrequency
        })?;
        Ok(Self::new(source, freq))
    }

    /// Add a headphone detect line.
    #[must_use]
    pub const fn with_headphone_jack(mut self, polarity: JackPolarity) -> Self {
        self.headphone_jack = Some(polarity);
        self
    }

    /// Add a microphone detect line.
    #[must_use]
    pub const fn with_mic_jack(mut self, polarity: JackPolarity) -> Self {
        self.mic_jack = Some(polarity);
        self
    }

    /// Codec settings for this board's clock.
    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig::with_clock(self.mclk_src, self.mclk_src_freq)
    }
}
