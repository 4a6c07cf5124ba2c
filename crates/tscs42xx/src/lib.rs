//! Driver for the Tempo Semiconductor TSCS42xx audio codec
//!
//! Register-level, `no_std` driver written against `embedded-hal` 1.0. It
//! covers the parts of the chip that need sequencing rather than plain
//! register pokes:
//!
//! - PLL programming from a reference-clock table and reference-counted PLL
//!   power with a bounded lock wait
//! - sample rate, width, BCLK ratio and DAI format setup
//! - the DAPM widget graph that powers audio paths in order
//! - the DSP coefficient RAM handshake and its power bracket
//! - runtime suspend / resume with a replayable register cache
//!
//! # Architecture
//!
//! ```text
//! Tscs42xx  (one lock, DeviceState)
//!     ├── RegisterIo / RegisterCache ── I2cRegmap<I2c> | sim::SimulatedTscs42xx
//!     ├── ExternalClock ─────────────── MCLK2 oscillator | NoClock
//!     ├── PowerDomain ───────────────── Dapm
//!     └── DelayNs
//! ```
//!
//! # Features
//!
//! - `std`: `std::error::Error` impls
//! - `defmt`: defmt logging and `defmt::Format` derives (hardware)
//! - `tracing`: tracing logging (desktop, simulator)
//! - `serde`: serialize configuration types
//!
//! # Example
//!
//! ```no_run
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//! use tscs42xx::sim::{SimClock, SimDelay, SimulatedTscs42xx};
//! use tscs42xx::{CodecConfig, FirmwareImages, Stream, Tscs42xx};
//!
//! let codec: Tscs42xx<NoopRawMutex, _, _, _, _> = Tscs42xx::with_dapm(
//!     SimulatedTscs42xx::new(),
//!     SimClock::new(),
//!     SimDelay::new(),
//!     CodecConfig::default(),
//! )
//! .unwrap();
//! codec.probe(FirmwareImages::default()).unwrap();
//! codec.hw_params(44_100, 24).unwrap();
//! codec.mute_stream(Stream::Playback, false).unwrap();
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
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]

// Must come first: the logging macros are textually scoped.
mod fmt;

pub mod clock;
pub mod codec;
pub mod coeff_ram;
pub mod config;
pub mod controls;
pub mod dapm;
pub mod error;
pub mod format;
pub mod pll;
pub mod poll;
pub mod registers;
pub mod regmap;
pub mod sim;

pub use clock::{ClockError, ExternalClock, NoClock, PllSource, UnknownPllSource};
pub use codec::{
    DeviceState, FirmwareImages, ImageStatus, PartDetection, PartId, ProbeReport, Tscs42xx,
};
pub use coeff_ram::{Coefficient, COEFF_RAM_MAX_ADDR, COEFF_RAM_SIZE};
pub use config::CodecConfig;
pub use dapm::{Dapm, DapmError, PowerDomain, Route, Stream, Widget, WidgetKind};
pub use error::{Error, ErrorKind};
pub use format::{BclkRatio, ClockProvider, DaiFormat, DaiProtocol, SampleRate, SampleWidth};
pub use poll::RetryPolicy;
pub use regmap::{I2cRegmap, RegisterCache, RegisterIo, RegmapError};
