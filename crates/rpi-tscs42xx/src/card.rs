//! The sound card: board widgets, their routes into the codec, and the
//! one-time DAI link setup.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use tscs42xx::dapm::route;
use tscs42xx::registers::{RM_AIC2_BLRCM, RV_AIC2_BLRCM_DAC_BCLK_LRCLK_SHARED, R_AIC2};
use tscs42xx::{
    Dapm, DapmError, DaiFormat, Error, ExternalClock, RegisterIo, Route, Tscs42xx, Widget,
};

use crate::config::BoardConfig;

/// Card name.
pub const CARD_NAME: &str = "snd_rpi_tscs42xx";

/// BCLK cycles per frame on both ends of the link.
pub const BCLK_RATIO: u32 = 64;

/// Speaker output widget; muted while headphones are plugged in.
pub const SPEAKER: &str = "Speaker";
/// Headphone jack widget.
pub const HEADPHONE_JACK: &str = "Headphone Jack";
/// Analog microphone widget.
pub const ANALOG_MIC: &str = "Analog Mic";
/// Digital microphone widget.
pub const DIGITAL_MIC: &str = "Digital Mic";
/// Line input widget.
pub const LINE_IN: &str = "Line In";

/// Board-level endpoints.
pub const BOARD_WIDGETS: [Widget; 5] = [
    Widget::speaker(SPEAKER),
    Widget::headphone(HEADPHONE_JACK),
    Widget::mic(ANALOG_MIC),
    Widget::mic(DIGITAL_MIC),
    Widget::line(LINE_IN),
];

/// How the board endpoints are wired to the codec pins.
pub const BOARD_ROUTES: [Route; 11] = [
    route(HEADPHONE_JACK, "Headphone L"),
    route(HEADPHONE_JACK, "Headphone R"),
    route(SPEAKER, "Speaker L"),
    route(SPEAKER, "Speaker R"),
    route("Line In 1 L", ANALOG_MIC),
    route("Line In 1 R", ANALOG_MIC),
    route(ANALOG_MIC, "Mic Bias"),
    route("Line In 2 L", LINE_IN),
    route("Line In 2 R", LINE_IN),
    route("Line In 3 L", DIGITAL_MIC),
    route("Line In 3 R", DIGITAL_MIC),
];

/// The SoC side of the I²S link.
pub trait CpuDai {
    /// Controller error.
    type Error: core::fmt::Debug;

    /// Set BCLK cycles per LRCLK frame.
    fn set_bclk_ratio(&mut self, ratio: u32) -> Result<(), Self::Error>;
}

impl<T: CpuDai + ?Sized> CpuDai for &mut T {
    type Error = T::Error;

    fn set_bclk_ratio(&mut self, ratio: u32) -> Result<(), Self::Error> {
        T::set_bclk_ratio(self, ratio)
    }
}

/// Card setup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardError<E, F> {
    /// Codec operation failed.
    Codec(Error<E>),
    /// CPU DAI rejected the request.
    CpuDai(F),
    /// Board widgets could not be added to the codec graph.
    Dapm(DapmError),
}

impl<E, F> From<Error<E>> for CardError<E, F> {
    fn from(e: Error<E>) -> Self {
        Self::Codec(e)
    }
}

impl<E, F> From<DapmError> for CardError<E, F> {
    fn from(e: DapmError) -> Self {
        Self::Dapm(e)
    }
}

impl<E: core::fmt::Debug, F: core::fmt::Debug> core::fmt::Display for CardError<E, F> {
    #[allow(clippy::use_debug)] // controller error types only guarantee Debug
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::CpuDai(e) => write!(f, "cpu dai: {e:?}"),
            Self::Dapm(e) => write!(f, "board widgets: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug, F: core::fmt::Debug> std::error::Error for CardError<E, F> {}

/// A TSCS42xx codec on a Raspberry Pi I²S port.
pub struct Card<'a, M: RawMutex, R, C, D, Cpu> {
    codec: &'a Tscs42xx<M, R, C, Dapm, D>,
    cpu_dai: Cpu,
    config: BoardConfig,
}

impl<'a, M: RawMutex, R, C, D, Cpu> Card<'a, M, R, C, D, Cpu> {
    /// Register the board widgets and routes with the codec's graph.
    pub fn new(
        codec: &'a Tscs42xx<M, R, C, Dapm, D>,
        cpu_dai: Cpu,
        config: BoardConfig,
    ) -> Result<Self, DapmError> {
        codec.with_power(|dapm| {
            dapm.add_widgets(&BOARD_WIDGETS)?;
            dapm.add_routes(&BOARD_ROUTES)
        })?;
        Ok(Self {
            codec,
            cpu_dai,
            config,
        })
    }

    /// The codec.
    pub fn codec(&self) -> &'a Tscs42xx<M, R, C, Dapm, D> {
        self.codec
    }

    /// Board configuration.
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// The CPU side of the link.
    pub fn cpu_dai(&mut self) -> &mut Cpu {
        &mut self.cpu_dai
    }
}

impl<M, R, C, D, Cpu> Card<'_, M, R, C, D, Cpu>
where
    M: RawMutex,
    R: RegisterIo,
    C: ExternalClock,
    D: DelayNs,
    Cpu: CpuDai,
{
    /// Bring up the DAI link.
    ///
    /// Sets I²S with the codec as clock master, shares the DAC BCLK and
    /// LRCLK with the ADC, runs both ends at 64 BCLKs per frame and selects
    /// the board's reference clock. Stops at the first failure.
    pub fn init(&mut self) -> Result<(), CardError<R::Error, Cpu::Error>> {
        info!("rpi-tscs42xx: initialising {}", CARD_NAME);

        self.codec
            .set_dai_format(DaiFormat::I2S_CODEC_MASTER)
            .map_err(|e| {
                error!("rpi-tscs42xx: failed to set DAI format");
                e
            })?;

        self.codec
            .update_bits(R_AIC2, RM_AIC2_BLRCM, RV_AIC2_BLRCM_DAC_BCLK_LRCLK_SHARED)
            .map_err(|e| {
                error!("rpi-tscs42xx: failed to set up audio interface");
                e
            })?;

        self.codec
            .set_bclk_ratio(BCLK_RATIO)
            .map_err(|e| {
                error!("rpi-tscs42xx: failed to set codec bclk ratio");
                e
            })?;

        self.cpu_dai.set_bclk_ratio(BCLK_RATIO).map_err(|e| {
            error!("rpi-tscs42xx: failed to set cpu dai bclk ratio");
            CardError::CpuDai(e)
        })?;

        info!("rpi-tscs42xx: setting sysclk");
        self.codec
            .set_sysclk(self.config.mclk_src, self.config.mclk_src_freq)
            .map_err(|e| {
                error!("rpi-tscs42xx: failed to set sysclk");
                e
            })?;
        Ok(())
    }
}
