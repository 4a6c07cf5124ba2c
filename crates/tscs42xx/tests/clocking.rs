//! Reference clock and PLL programming.
//!
//! Covers the PLL table lookup and the MCLK2 bring-up path end to end
//! against the register simulator.
//!
//! Run with: cargo test -p tscs42xx --test clocking

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use tscs42xx::pll::{find_pll_setting, PLL_CONTROLS};
use tscs42xx::registers::{
    R_PLLCTL1C, R_PLLREFSEL, RM_PLLCTL1C_PDB_PLL1, RM_PLLCTL1C_PDB_PLL2,
};
use tscs42xx::sim::{SimClock, SimDelay, SimulatedTscs42xx};
use tscs42xx::{ClockError, CodecConfig, Dapm, Error, PllSource, Tscs42xx};

type SimCodec = Tscs42xx<NoopRawMutex, SimulatedTscs42xx, SimClock, Dapm, SimDelay>;

fn codec(config: CodecConfig) -> SimCodec {
    Tscs42xx::with_dapm(SimulatedTscs42xx::new(), SimClock::new(), SimDelay::new(), config)
        .unwrap()
}

fn pll_bits(codec: &SimCodec) -> u8 {
    codec.with_regs(|s| s.register(R_PLLCTL1C)) & (RM_PLLCTL1C_PDB_PLL1 | RM_PLLCTL1C_PDB_PLL2)
}

// ---------------------------------------------------------------------------
// PLL table
// ---------------------------------------------------------------------------

#[test]
fn every_table_frequency_is_found() {
    for ctl in &PLL_CONTROLS {
        let found = find_pll_setting(ctl.input_freq).unwrap();
        assert_eq!(found.input_freq, ctl.input_freq);
    }
}

#[test]
fn table_covers_common_reference_clocks() {
    for hz in [12_000_000, 12_288_000, 19_200_000, 24_576_000, 27_000_000] {
        assert!(find_pll_setting(hz).is_some(), "{hz} Hz missing");
    }
    assert!(find_pll_setting(0).is_none());
    assert!(find_pll_setting(13_000_000).is_none());
}

proptest::proptest! {
    /// Frequencies outside the table never resolve to a setting.
    #[test]
    fn unlisted_frequencies_are_not_found(hz in proptest::num::u32::ANY) {
        proptest::prop_assume!(!PLL_CONTROLS.iter().any(|c| c.input_freq == hz));
        proptest::prop_assert!(find_pll_setting(hz).is_none());
    }
}

// ---------------------------------------------------------------------------
// Reference selection
// ---------------------------------------------------------------------------

#[test]
fn mclk2_at_24_576_mhz_runs_44_1k_from_pll2() {
    let codec = codec(CodecConfig::with_clock(PllSource::Mclk2, 24_576_000));

    codec.configure_clocks().unwrap();
    codec.with_clock(|clk| {
        assert!(clk.is_enabled());
        assert_eq!(clk.rate(), Some(24_576_000));
    });
    assert_eq!(codec.with_regs(|s| s.register(R_PLLREFSEL)), 0x11);

    codec.setup_sample_rate(44_100).unwrap();
    codec.pll_power_up().unwrap();
    assert_eq!(pll_bits(&codec), RM_PLLCTL1C_PDB_PLL2);

    codec.with_regs(|s| s.clear_counters());
    codec.pll_power_down().unwrap();
    assert_eq!(pll_bits(&codec), 0);
    // PLL1 was never on, so only the PLL2 bit needed a write.
    assert_eq!(codec.with_regs(|s| s.write_count(R_PLLCTL1C)), 1);
}

#[test]
fn xtal_leaves_the_oscillator_alone() {
    let codec = codec(CodecConfig::default());
    codec.with_regs(|s| s.set_register(R_PLLREFSEL, 0xFF));
    codec.configure_clocks().unwrap();
    assert_eq!(codec.with_regs(|s| s.register(R_PLLREFSEL)), 0x00);
    codec.with_clock(|clk| assert_eq!(clk.enables(), 0));
}

#[test]
fn unsupported_reference_is_rejected_without_bus_traffic() {
    let codec = codec(CodecConfig::with_clock(PllSource::Xtal, 13_000_000));
    assert_eq!(
        codec.configure_clocks(),
        Err(Error::UnsupportedClock(13_000_000))
    );
    assert_eq!(codec.with_regs(|s| s.total_writes()), 0);
}

#[test]
fn oscillator_failure_skips_reference_select() {
    let codec = codec(CodecConfig::with_clock(PllSource::Mclk2, 12_288_000));
    codec.with_clock(|clk| clk.fail_enable(true));
    assert_eq!(
        codec.configure_clocks(),
        Err(Error::Clock(ClockError::EnableFailed))
    );
    assert_eq!(codec.with_regs(|s| s.write_count(R_PLLREFSEL)), 0);
}

#[test]
fn set_sysclk_switches_between_sources() {
    let codec = codec(CodecConfig::default());

    codec.set_sysclk(PllSource::Mclk2, 12_288_000).unwrap();
    assert_eq!(codec.state().pll_source, PllSource::Mclk2);
    assert_eq!(codec.state().mclk_frequency, 12_288_000);
    assert_eq!(codec.with_regs(|s| s.register(R_PLLREFSEL)), 0x11);
    codec.with_clock(|clk| assert!(clk.is_enabled()));

    codec.set_sysclk(PllSource::Xtal, 24_576_000).unwrap();
    assert_eq!(codec.state().pll_source, PllSource::Xtal);
    assert_eq!(codec.with_regs(|s| s.register(R_PLLREFSEL)), 0x00);
    codec.with_clock(|clk| {
        assert!(!clk.is_enabled());
        assert_eq!(clk.disables(), 1);
    });
}

#[test]
fn set_sysclk_rejects_unknown_frequency_and_keeps_state() {
    let codec = codec(CodecConfig::default());
    let before = codec.state();
    assert_eq!(
        codec.set_sysclk(PllSource::Mclk2, 10_000_000),
        Err(Error::UnsupportedClock(10_000_000))
    );
    assert_eq!(codec.state(), before);
    assert_eq!(codec.with_regs(|s| s.total_writes()), 0);
    codec.with_clock(|clk| assert_eq!(clk.enables(), 0));
}
