//! Jack detection: GPIO level in, codec routing out.
//!
//! Run with: cargo test -p rpi-tscs42xx --test jack

#![allow(clippy::unwrap_used)]

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal_mock::eh1::digital::{
    Mock as PinMock, State as PinState, Transaction as PinTransaction,
};
use embedded_hal_mock::eh1::MockError;
use proptest::prelude::*;
use rpi_tscs42xx::{
    BoardConfig, Card, CpuDai, JackDetector, JackError, JackKind, JackPolarity, JackStatus, Jacks,
};
use tscs42xx::registers::{
    RM_INSEL, RM_PWRM1_MICB, RM_PWRM2_HPL, RM_PWRM2_HPR, RM_PWRM2_SPKL, RM_PWRM2_SPKR,
    RV_INSEL_IN1, RV_INSEL_IN3, R_INSELL, R_INSELR, R_PWRM1, R_PWRM2,
};
use tscs42xx::sim::{SimClock, SimDelay, SimulatedTscs42xx};
use tscs42xx::{Dapm, PllSource, Stream, Tscs42xx};

type SimCodec = Tscs42xx<NoopRawMutex, SimulatedTscs42xx, SimClock, Dapm, SimDelay>;

struct NullDai;

impl CpuDai for NullDai {
    type Error = ();

    fn set_bclk_ratio(&mut self, _ratio: u32) -> Result<(), ()> {
        Ok(())
    }
}

const BOARD: BoardConfig = BoardConfig::new(PllSource::Mclk2, 24_576_000);

fn codec() -> SimCodec {
    Tscs42xx::with_dapm(
        SimulatedTscs42xx::new(),
        SimClock::new(),
        SimDelay::new(),
        BOARD.codec_config(),
    )
    .unwrap()
}

fn pin(levels: &[PinState]) -> PinMock {
    let txns: Vec<PinTransaction> = levels.iter().map(|&l| PinTransaction::get(l)).collect();
    PinMock::new(&txns)
}

fn done(jack: JackDetector<PinMock>) {
    let mut pin = jack.release();
    pin.done();
}

// ---------------------------------------------------------------------------
// Headphone
// ---------------------------------------------------------------------------

#[test]
fn headphone_plug_moves_playback_off_the_speaker() {
    let codec = codec();
    let _card = Card::new(&codec, NullDai, BOARD).unwrap();
    codec.stream_event(Stream::Playback, true).unwrap();

    let mut jack = JackDetector::headphone(
        pin(&[PinState::High, PinState::Low]),
        JackPolarity::ActiveHigh,
    );

    assert!(jack.check(&codec).unwrap());
    let pwrm2 = codec.with_regs(|s| s.register(R_PWRM2));
    assert_eq!(pwrm2 & (RM_PWRM2_SPKL | RM_PWRM2_SPKR), 0);
    assert_eq!(pwrm2 & (RM_PWRM2_HPL | RM_PWRM2_HPR), RM_PWRM2_HPL | RM_PWRM2_HPR);

    assert!(!jack.check(&codec).unwrap());
    let pwrm2 = codec.with_regs(|s| s.register(R_PWRM2));
    assert_eq!(pwrm2 & (RM_PWRM2_SPKL | RM_PWRM2_SPKR), RM_PWRM2_SPKL | RM_PWRM2_SPKR);
    assert_eq!(pwrm2 & (RM_PWRM2_HPL | RM_PWRM2_HPR), 0);

    done(jack);
}

#[test]
fn active_low_headphone_reads_inverted() {
    let codec = codec();
    let _card = Card::new(&codec, NullDai, BOARD).unwrap();
    let mut jack = JackDetector::headphone(pin(&[PinState::Low]), JackPolarity::ActiveLow);
    assert_eq!(jack.kind(), JackKind::Headphone);
    assert!(jack.check(&codec).unwrap());
    done(jack);
}

#[test]
fn gpio_error_is_returned_without_touching_the_codec() {
    let codec = codec();
    let _card = Card::new(&codec, NullDai, BOARD).unwrap();
    let failing = PinMock::new(&[PinTransaction::get(PinState::High)
        .with_error(MockError::Io(std::io::ErrorKind::NotConnected))]);
    let mut jack = JackDetector::headphone(failing, JackPolarity::ActiveHigh);

    assert!(matches!(jack.check(&codec), Err(JackError::Gpio(_))));
    codec.with_regs(|s| assert_eq!(s.total_writes(), 0));
    done(jack);
}

#[test]
fn debounced_check_waits_before_sampling() {
    let codec = codec();
    let _card = Card::new(&codec, NullDai, BOARD).unwrap();
    let mut delay = SimDelay::new();
    let mut jack = JackDetector::headphone(pin(&[PinState::High]), JackPolarity::ActiveHigh);

    assert!(jack.check_debounced(&codec, &mut delay).unwrap());
    assert_eq!(delay.total_us(), 150_000);
    done(jack);
}

// ---------------------------------------------------------------------------
// Microphone
// ---------------------------------------------------------------------------

fn insel(codec: &SimCodec) -> (u8, u8) {
    codec.with_regs(|s| (s.register(R_INSELL) & RM_INSEL, s.register(R_INSELR) & RM_INSEL))
}

#[test]
fn mic_plug_switches_capture_between_analog_and_digital() {
    let codec = codec();
    let _card = Card::new(&codec, NullDai, BOARD).unwrap();
    codec.stream_event(Stream::Capture, true).unwrap();

    let mut jack = JackDetector::microphone(
        pin(&[PinState::Low, PinState::High]),
        JackPolarity::ActiveHigh,
    );

    assert!(!jack.check(&codec).unwrap());
    assert_eq!(insel(&codec), (RV_INSEL_IN3, RV_INSEL_IN3));
    assert_eq!(codec.with_power(|d| d.is_powered("Digital Mic")), Some(true));
    assert_eq!(codec.with_power(|d| d.is_powered("Analog Mic")), Some(false));
    assert_eq!(codec.with_regs(|s| s.register(R_PWRM1)) & RM_PWRM1_MICB, 0);

    assert!(jack.check(&codec).unwrap());
    assert_eq!(insel(&codec), (RV_INSEL_IN1, RV_INSEL_IN1));
    assert_eq!(codec.with_power(|d| d.is_powered("Analog Mic")), Some(true));
    assert_ne!(codec.with_regs(|s| s.register(R_PWRM1)) & RM_PWRM1_MICB, 0);

    assert_eq!(jack.kind(), JackKind::Microphone);
    done(jack);
}

// ---------------------------------------------------------------------------
// Jacks
// ---------------------------------------------------------------------------

#[test]
fn missing_detect_lines_report_nothing_and_change_nothing() {
    let codec = codec();
    let _card = Card::new(&codec, NullDai, BOARD).unwrap();
    let mut jacks: Jacks<PinMock> = Jacks::new(&BOARD, None, None);
    assert!(jacks.headphone().is_none());
    assert!(jacks.microphone().is_none());
    assert_eq!(jacks.check(&codec).unwrap(), JackStatus::default());
    codec.with_regs(|s| assert_eq!(s.total_writes(), 0));
}

#[test]
fn jacks_use_configured_polarity() {
    let codec = codec();
    let _card = Card::new(&codec, NullDai, BOARD).unwrap();
    let board = BOARD.with_headphone_jack(JackPolarity::ActiveLow);
    let mut jacks = Jacks::new(
        &board,
        Some(pin(&[PinState::Low])),
        Some(pin(&[PinState::Low])),
    );
    assert_eq!(
        jacks.headphone().map(|j| j.polarity()),
        Some(JackPolarity::ActiveLow)
    );
    // No polarity configured for the mic line.
    assert_eq!(
        jacks.microphone().map(|j| j.polarity()),
        Some(JackPolarity::ActiveHigh)
    );
    assert_eq!(
        jacks.check(&codec).unwrap(),
        JackStatus {
            headphone: Some(true),
            microphone: Some(false),
        }
    );
    assert_eq!(insel(&codec), (RV_INSEL_IN3, RV_INSEL_IN3));

    let (headphone, microphone) = jacks.release();
    headphone.unwrap().done();
    microphone.unwrap().done();
}

proptest! {
    #[test]
    fn detection_is_level_xor_active_low(high in any::<bool>(), active_low in any::<bool>()) {
        let level = if high { PinState::High } else { PinState::Low };
        let mut jack = JackDetector::headphone(
            pin(&[level]),
            JackPolarity::from_active_low(active_low),
        );
        prop_assert_eq!(jack.is_active().unwrap(), high != active_low);
        done(jack);
    }
}
