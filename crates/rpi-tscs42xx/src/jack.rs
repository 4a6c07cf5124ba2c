//! Headphone and microphone jack detection.
//!
//! Each jack is a GPIO switch. A check samples the line, combines it with
//! the configured polarity and applies the result to the codec; nothing is
//! remembered between checks. Debouncing is the caller's interrupt / timer
//! framework's job, [`DEBOUNCE_MS`] is the interval it should use.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use tscs42xx::registers::{RM_INSEL, RV_INSEL_IN1, RV_INSEL_IN3, R_INSELL, R_INSELR};
use tscs42xx::{Dapm, ExternalClock, RegisterIo, Tscs42xx};

use crate::card::{ANALOG_MIC, HEADPHONE_JACK, SPEAKER};
use crate::config::{BoardConfig, JackPolarity};

/// Settle time before a detect line is trusted.
pub const DEBOUNCE_MS: u32 = 150;

/// Which jack a detector watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JackKind {
    /// Headphone socket. Plugged in mutes the speaker.
    Headphone,
    /// Microphone socket. Plugged in selects the analog mic input.
    Microphone,
}

impl JackKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Headphone => "headphone",
            Self::Microphone => "mic",
        }
    }
}

/// Detect line could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JackError<G> {
    /// GPIO read failed.
    Gpio(G),
}

impl<G: core::fmt::Debug> core::fmt::Display for JackError<G> {
    #[allow(clippy::use_debug)] // GPIO error types only guarantee Debug
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Gpio(e) => write!(f, "jack detect gpio: {e:?}"),
        }
    }
}

#[cfg(feature = "std")]
impl<G: core::fmt::Debug> std::error::Error for JackError<G> {}

/// One jack switch.
#[derive(Debug)]
pub struct JackDetector<P> {
    pin: P,
    polarity: JackPolarity,
    kind: JackKind,
}

impl<P: InputPin> JackDetector<P> {
    /// Headphone detect on `pin`.
    pub fn headphone(pin: P, polarity: JackPolarity) -> Self {
        Self {
            pin,
            polarity,
            kind: JackKind::Headphone,
        }
    }

    /// Microphone detect on `pin`.
    pub fn microphone(pin: P, polarity: JackPolarity) -> Self {
        Self {
            pin,
            polarity,
            kind: JackKind::Microphone,
        }
    }

    /// Jack this detector watches.
    pub fn kind(&self) -> JackKind {
        self.kind
    }

    /// Configured polarity.
    pub fn polarity(&self) -> JackPolarity {
        self.polarity
    }

    /// Sample the line.
    pub fn is_active(&mut self) -> Result<bool, JackError<P::Error>> {
        let high = self.pin.is_high().map_err(JackError::Gpio)?;
        Ok(self.polarity.is_active(high))
    }

    /// Sample the line and reconfigure the codec to match.
    ///
    /// Returns whether the jack is plugged in. Codec failures are logged and
    /// otherwise ignored.
    pub fn check<M, R, C, D>(
        &mut self,
        codec: &Tscs42xx<M, R, C, Dapm, D>,
    ) -> Result<bool, JackError<P::Error>>
    where
        M: RawMutex,
        R: RegisterIo,
        C: ExternalClock,
        D: DelayNs,
    {
        let active = self.is_active()?;
        debug!("rpi-tscs42xx: {} jack {}", self.kind.as_str(), active);
        match self.kind {
            JackKind::Headphone => apply_headphone(codec, active),
            JackKind::Microphone => apply_microphone(codec, active),
        }
        Ok(active)
    }

    /// Wait [`DEBOUNCE_MS`], then [`check`](Self::check).
    pub fn check_debounced<M, R, C, D, W>(
        &mut self,
        codec: &Tscs42xx<M, R, C, Dapm, D>,
        delay: &mut W,
    ) -> Result<bool, JackError<P::Error>>
    where
        M: RawMutex,
        R: RegisterIo,
        C: ExternalClock,
        D: DelayNs,
        W: DelayNs,
    {
        delay.delay_ms(DEBOUNCE_MS);
        self.check(codec)
    }

    /// Give the pin back.
    pub fn release(self) -> P {
        self.pin
    }
}

/// Route audio to the headphones (`true`) or the speaker (`false`).
pub fn apply_headphone<M, R, C, D>(codec: &Tscs42xx<M, R, C, Dapm, D>, plugged: bool)
where
    M: RawMutex,
    R: RegisterIo,
    C: ExternalClock,
    D: DelayNs,
{
    let (on, off) = if plugged {
        (HEADPHONE_JACK, SPEAKER)
    } else {
        (SPEAKER, HEADPHONE_JACK)
    };
    if codec.disable_pin(off).is_err() {
        warn!("rpi-tscs42xx: failed to disable {}", off);
    }
    if codec.enable_pin(on).is_err() {
        warn!("rpi-tscs42xx: failed to enable {}", on);
    }
    if codec.sync_power().is_err() {
        error!("rpi-tscs42xx: failed to resync power after headphone change");
    }
}

/// Capture from the analog mic on input 1 (`true`) or the digital mic on
/// input 3 (`false`).
pub fn apply_microphone<M, R, C, D>(codec: &Tscs42xx<M, R, C, Dapm, D>, plugged: bool)
where
    M: RawMutex,
    R: RegisterIo,
    C: ExternalClock,
    D: DelayNs,
{
    let (input, name) = if plugged {
        (RV_INSEL_IN1, "analog")
    } else {
        (RV_INSEL_IN3, "digital")
    };
    for reg in [R_INSELL, R_INSELR] {
        if codec.update_bits(reg, RM_INSEL, input).is_err() {
            error!("rpi-tscs42xx: failed to select {} mic", name);
        }
    }
    let pin = if plugged {
        codec.enable_pin(ANALOG_MIC)
    } else {
        codec.disable_pin(ANALOG_MIC)
    };
    if pin.is_err() {
        warn!("rpi-tscs42xx: failed to switch {}", ANALOG_MIC);
    }
    if codec.sync_power().is_err() {
        error!("rpi-tscs42xx: failed to resync power after mic change");
    }
}

/// Jack status from one [`Jacks::check`]. `None` for a jack without a
/// detect line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JackStatus {
    /// Headphones plugged in.
    pub headphone: Option<bool>,
    /// Microphone plugged in.
    pub microphone: Option<bool>,
}

/// The board's jack detectors.
///
/// A jack with no detect line keeps the codec defaults: headphone output
/// enabled and the analog mic on input 1.
#[derive(Debug)]
pub struct Jacks<P> {
    headphone: Option<JackDetector<P>>,
    microphone: Option<JackDetector<P>>,
}

impl<P: InputPin> Jacks<P> {
    /// Pair the board's detect lines with their configured polarity.
    ///
    /// A line without a configured polarity is treated as active-high.
    pub fn new(config: &BoardConfig, headphone: Option<P>, microphone: Option<P>) -> Self {
        let headphone = match headphone {
            Some(pin) => Some(JackDetector::headphone(
                pin,
                config.headphone_jack.unwrap_or_default(),
            )),
            None => {
                info!("rpi-tscs42xx: no headphone detect line, defaulting to headphone");
                None
            }
        };
        let microphone = match microphone {
            Some(pin) => Some(JackDetector::microphone(
                pin,
                config.mic_jack.unwrap_or_default(),
            )),
            None => {
                info!("rpi-tscs42xx: no mic detect line, defaulting to analog mic");
                None
            }
        };
        Self {
            headphone,
            microphone,
        }
    }

    /// Headphone detector, if present.
    pub fn headphone(&mut self) -> Option<&mut JackDetector<P>> {
        self.headphone.as_mut()
    }

    /// Microphone detector, if present.
    pub fn microphone(&mut self) -> Option<&mut JackDetector<P>> {
        self.microphone.as_mut()
    }

    /// Check every present jack.
    pub fn check<M, R, C, D>(
        &mut self,
        codec: &Tscs42xx<M, R, C, Dapm, D>,
    ) -> Result<JackStatus, JackError<P::Error>>
    where
        M: RawMutex,
        R: RegisterIo,
        C: ExternalClock,
        D: DelayNs,
    {
        let headphone = match self.headphone.as_mut() {
            Some(jack) => Some(jack.check(codec)?),
            None => None,
        };
        let microphone = match self.microphone.as_mut() {
            Some(jack) => Some(jack.check(codec)?),
            None => None,
        };
        Ok(JackStatus {
            headphone,
            microphone,
        })
    }

    /// Give the pins back as `(headphone, microphone)`.
    pub fn release(self) -> (Option<P>, Option<P>) {
        (
            self.headphone.map(JackDetector::release),
            self.microphone.map(JackDetector::release),
        )
    }
}
