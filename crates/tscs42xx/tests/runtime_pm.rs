//! Runtime suspend / resume.
//!
//! While suspended the register map is cache-only and the MCLK2 oscillator
//! is stopped. Resume restarts the oscillator, resets the chip and replays
//! every cached register.

#![allow(clippy::unwrap_used)]

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use tscs42xx::registers::{R_ADCSR, R_AIC1, R_DACSR, R_PLLREFSEL, R_PWRM2};
use tscs42xx::sim::{SimClock, SimDelay, SimError, SimulatedTscs42xx};
use tscs42xx::{ClockError, CodecConfig, Dapm, Error, PllSource, Stream, Tscs42xx};

type SimCodec = Tscs42xx<NoopRawMutex, SimulatedTscs42xx, SimClock, Dapm, SimDelay>;

fn running_codec(source: PllSource) -> SimCodec {
    let codec = Tscs42xx::with_dapm(
        SimulatedTscs42xx::new(),
        SimClock::new(),
        SimDelay::new(),
        CodecConfig::with_clock(source, 24_576_000),
    )
    .unwrap();
    codec.configure_clocks().unwrap();
    codec.set_bclk_ratio(64).unwrap();
    codec.hw_params(48_000, 24).unwrap();
    codec
}

#[test]
fn suspend_stops_mclk2_and_resume_restores_registers() {
    let codec = running_codec(PllSource::Mclk2);

    codec.suspend();
    assert!(codec.is_suspended());
    codec.with_clock(|clk| {
        assert!(!clk.is_enabled());
        assert_eq!(clk.disables(), 1);
    });

    // Lands in the cache only.
    codec.setup_sample_rate(44_100).unwrap();
    assert_eq!(codec.with_regs(|s| s.register(R_DACSR)), 0x4B);

    codec.resume().unwrap();
    assert!(!codec.is_suspended());
    codec.with_clock(|clk| {
        assert!(clk.is_enabled());
        assert_eq!(clk.rate(), Some(24_576_000));
        assert_eq!(clk.enables(), 2);
    });
    codec.with_regs(|s| {
        assert_eq!(s.resets(), 1);
        assert_eq!(s.register(R_DACSR), 0x2B);
        assert_eq!(s.register(R_ADCSR), 0x2B);
        assert_eq!(s.register(R_AIC1), 0x08);
        assert_eq!(s.register(R_PLLREFSEL), 0x11);
    });
}

#[test]
fn xtal_suspend_leaves_oscillator_alone() {
    let codec = running_codec(PllSource::Xtal);
    codec.suspend();
    codec.resume().unwrap();
    codec.with_clock(|clk| {
        assert_eq!(clk.enables(), 0);
        assert_eq!(clk.disables(), 0);
    });
    assert_eq!(codec.with_regs(|s| s.register(R_DACSR)), 0x4B);
}

#[test]
fn uncached_access_while_suspended_fails() {
    let codec = running_codec(PllSource::Xtal);
    codec.suspend();
    assert_eq!(
        codec.pll_power_up(),
        Err(Error::Bus(SimError::CacheOnly))
    );
    assert_eq!(codec.pll_users(), 0);
    assert_eq!(codec.with_regs(|s| s.resets()), 0);
}

#[test]
fn failed_oscillator_start_keeps_device_suspended() {
    let codec = running_codec(PllSource::Mclk2);
    codec.suspend();
    codec.with_clock(|clk| clk.fail_enable(true));

    assert_eq!(codec.resume(), Err(Error::Clock(ClockError::EnableFailed)));
    assert!(codec.is_suspended());
    assert_eq!(codec.with_regs(|s| s.resets()), 0);

    codec.with_clock(|clk| clk.fail_enable(false));
    codec.resume().unwrap();
    assert_eq!(codec.with_regs(|s| s.resets()), 1);
}

#[test]
fn power_bits_are_rewritten_after_reset() {
    let codec = running_codec(PllSource::Xtal);
    codec.stream_event(Stream::Playback, true).unwrap();
    let powered = codec.with_regs(|s| s.register(R_PWRM2));
    assert_ne!(powered, 0);

    codec.reset().unwrap();
    assert_eq!(codec.with_regs(|s| s.register(R_PWRM2)), 0);
    assert_eq!(codec.pll_users(), 0);

    codec.sync_power().unwrap();
    assert_eq!(codec.with_regs(|s| s.register(R_PWRM2)), powered);
}
