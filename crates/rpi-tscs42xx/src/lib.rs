//! Raspberry Pi sound card for the TSCS42xx codec
//!
//! Board glue on top of the [`tscs42xx`] driver:
//!
//! - [`BoardConfig`]: reference clock source and frequency, jack detect
//!   polarity
//! - [`Card`]: board widgets and routes, DAI link bring-up (I²S, codec
//!   clock master, shared BCLK/LRCLK, 64 BCLKs per frame, sysclk)
//! - [`Jacks`]: headphone detect mutes the speaker, mic detect switches the
//!   capture input between the analog and digital microphone
//!
//! # Example
//!
//! ```no_run
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//! use rpi_tscs42xx::{BoardConfig, Card, CpuDai};
//! use tscs42xx::sim::{SimClock, SimDelay, SimulatedTscs42xx};
//! use tscs42xx::Tscs42xx;
//!
//! struct I2sPort;
//! impl CpuDai for I2sPort {
//!     type Error = ();
//!     fn set_bclk_ratio(&mut self, _ratio: u32) -> Result<(), ()> {
//!         Ok(())
//!     }
//! }
//!
//! let board = BoardConfig::from_properties(Some("mclk"), Some(24_576_000)).unwrap();
//! let codec: Tscs42xx<NoopRawMutex, _, _, _, _> = Tscs42xx::with_dapm(
//!     SimulatedTscs42xx::new(),
//!     SimClock::new(),
//!     SimDelay::new(),
//!     board.codec_config(),
//! )
//! .unwrap();
//! let mut card = Card::new(&codec, I2sPort, board).unwrap();
//! card.init().unwrap();
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

// Must come first: the logging macros are textually scoped.
mod fmt;

pub mod card;
pub mod config;
pub mod jack;

pub use card::{Card, CardError, CpuDai, BCLK_RATIO, BOARD_ROUTES, BOARD_WIDGETS};
pub use config::{BoardConfig, BoardConfigError, JackPolarity};
pub use jack::{JackDetector, JackError, JackKind, JackStatus, Jacks, DEBOUNCE_MS};
