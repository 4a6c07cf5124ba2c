//! Coefficient RAM transfers and firmware loading.
//!
//! Every transfer must run with "DAC L" and a PLL powered and must hand
//! both back afterwards, including when the transfer fails. The simulator
//! counts accesses made while the RAM is unpowered as violations.
//!
//! Run with: cargo test -p tscs42xx --test coeff_ram

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use proptest::prelude::*;
use tscs42xx::registers::{
    R_CONFIG0, R_PLLCTL1C, R_PWRM2, RM_PLLCTL1C_PDB_PLL1, RM_PLLCTL1C_PDB_PLL2, RM_PWRM2_HPL,
};
use tscs42xx::sim::{SimClock, SimDelay, SimError, SimulatedTscs42xx};
use tscs42xx::{
    Coefficient, CodecConfig, Dapm, Error, ErrorKind, FirmwareImages, ImageStatus, Tscs42xx,
    COEFF_RAM_MAX_ADDR, COEFF_RAM_SIZE,
};

type SimCodec = Tscs42xx<NoopRawMutex, SimulatedTscs42xx, SimClock, Dapm, SimDelay>;

const WORDS: usize = COEFF_RAM_MAX_ADDR as usize + 1;

fn codec() -> SimCodec {
    Tscs42xx::with_dapm(
        SimulatedTscs42xx::new(),
        SimClock::new(),
        SimDelay::new(),
        CodecConfig::default(),
    )
    .unwrap()
}

/// Access fully released: no PLL hold, PLLs off, "DAC L" not forced.
fn assert_released(codec: &SimCodec) {
    assert_eq!(codec.pll_users(), 0);
    let pll = codec.with_regs(|s| s.register(R_PLLCTL1C));
    assert_eq!(pll & (RM_PLLCTL1C_PDB_PLL1 | RM_PLLCTL1C_PDB_PLL2), 0);
    assert_eq!(codec.with_power(|p| p.is_forced("DAC L")), Some(false));
    assert_eq!(codec.with_regs(|s| s.register(R_PWRM2)) & RM_PWRM2_HPL, 0);
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A write at `address` shows up in a full dump at that offset and
    /// nowhere else.
    #[test]
    fn write_then_dump_matches(
        (address, data) in (0u8..=COEFF_RAM_MAX_ADDR).prop_flat_map(|a| {
            let room = (WORDS - usize::from(a)).min(8);
            let words = (1..=room).prop_flat_map(|n| proptest::collection::vec(any::<u8>(), n * 3));
            (Just(a), words)
        }),
    ) {
        let codec = codec();
        codec.write_coeff_ram(address, &data).unwrap();

        let mut dump = [0u8; COEFF_RAM_SIZE];
        codec.read_coeff_ram(&mut dump).unwrap();

        let start = usize::from(address) * 3;
        let end = start + data.len();
        prop_assert_eq!(&dump[start..end], &data[..]);
        prop_assert!(dump[..start].iter().all(|&b| b == 0));
        prop_assert!(dump[end..].iter().all(|&b| b == 0));
        prop_assert_eq!(codec.with_regs(|s| s.violations()), 0);
        prop_assert_eq!(codec.pll_users(), 0);
    }
}

#[test]
fn words_are_stored_little_endian() {
    let codec = codec();
    codec.write_coeff_ram(0x10, &[0x01, 0x02, 0x03]).unwrap();
    assert_eq!(codec.with_regs(|s| s.coefficient(0x10)), [0x01, 0x02, 0x03]);
    assert_eq!(codec.read_coefficient(0x10).unwrap().raw(), 0x03_0201);
    assert_released(&codec);
}

#[test]
fn last_address_accepts_exactly_the_remaining_room() {
    let codec = codec();
    // 0xC0..=0xCD is fourteen coefficients.
    codec.write_coeff_ram(0xC0, &[0xAA; 42]).unwrap();
    assert_eq!(codec.with_regs(|s| s.coefficient(COEFF_RAM_MAX_ADDR)), [0xAA; 3]);
}

#[test]
fn bad_sizes_are_rejected_without_bus_traffic() {
    let codec = codec();

    assert_eq!(
        codec.write_coeff_ram(0xC0, &[0; 20]),
        Err(Error::InvalidSize {
            expected: 21,
            actual: 20
        })
    );
    assert_eq!(
        codec.write_coeff_ram(0xC0, &[0; 60]),
        Err(Error::AddressOutOfRange {
            address: 0xC0,
            count: 20
        })
    );

    let mut short = [0u8; COEFF_RAM_SIZE - 1];
    assert_eq!(
        codec.read_coeff_ram(&mut short),
        Err(Error::InvalidSize {
            expected: COEFF_RAM_SIZE,
            actual: COEFF_RAM_SIZE - 1
        })
    );
    assert!(matches!(
        codec.read_coefficient(0xCE),
        Err(Error::AddressOutOfRange { address: 0xCE, .. })
    ));

    assert_eq!(codec.with_regs(|s| s.total_writes()), 0);
    assert_eq!(codec.pll_users(), 0);
}

#[test]
fn stuck_busy_flag_releases_access() {
    let codec = codec();
    codec.with_regs(|s| s.set_coeff_ram_stuck_busy(true));
    assert_eq!(
        codec.write_coefficient(0x20, Coefficient::new(1).unwrap()),
        Err(Error::CoeffRamBusy)
    );
    assert_released(&codec);
    assert_eq!(codec.with_regs(|s| s.violations()), 0);
}

#[test]
fn slow_busy_flag_is_waited_out() {
    let codec = codec();
    codec.with_regs(|s| s.set_coeff_ram_busy_reads(4));
    codec.write_coeff_ram(0x00, &[1, 0, 0, 2, 0, 0]).unwrap();
    assert_eq!(codec.with_regs(|s| s.coefficient(0x01)), [2, 0, 0]);
}

#[test]
fn pll_lock_failure_releases_dac() {
    let codec = codec();
    codec.with_regs(|s| s.set_pll_never_locks(true));
    assert_eq!(codec.read_coefficient(0x00), Err(Error::PllLockTimeout));
    assert_eq!(codec.pll_users(), 0);
    assert_eq!(codec.with_power(|p| p.is_forced("DAC L")), Some(false));
    assert_eq!(codec.with_regs(|s| s.register(R_PWRM2)) & RM_PWRM2_HPL, 0);
    assert_eq!(codec.with_regs(|s| s.violations()), 0);
}

#[test]
fn failed_power_up_unforces_dac() {
    let codec = codec();
    codec.with_regs(|s| s.fail_writes_to(R_PWRM2));
    assert_eq!(
        codec.read_coefficient(0x00),
        Err(Error::Bus(SimError::Fault(R_PWRM2)))
    );
    assert_eq!(codec.pll_users(), 0);
    assert_eq!(codec.with_power(|p| p.is_forced("DAC L")), Some(false));

    codec.with_regs(|s| s.clear_faults());
    codec.sync_power().unwrap();
    assert_released(&codec);
    assert_eq!(codec.with_regs(|s| s.violations()), 0);
}

#[test]
fn failed_release_still_drops_the_pll_hold() {
    let codec = codec();
    codec.enable_coeff_ram_access().unwrap();
    assert_eq!(codec.pll_users(), 1);

    codec.with_regs(|s| s.fail_writes_to(R_PWRM2));
    assert_eq!(
        codec.disable_coeff_ram_access(),
        Err(Error::Bus(SimError::Fault(R_PWRM2)))
    );
    assert_eq!(codec.pll_users(), 0);
    let pll = codec.with_regs(|s| s.register(R_PLLCTL1C));
    assert_eq!(pll & (RM_PLLCTL1C_PDB_PLL1 | RM_PLLCTL1C_PDB_PLL2), 0);

    // Once the bus recovers, DAC L powers down and the next stream picks
    // its own PLL.
    codec.with_regs(|s| s.clear_faults());
    codec.sync_power().unwrap();
    assert_released(&codec);

    codec.setup_sample_rate(44_100).unwrap();
    codec.dac_unmute().unwrap();
    let pll = codec.with_regs(|s| s.register(R_PLLCTL1C));
    assert_eq!(pll & RM_PLLCTL1C_PDB_PLL2, RM_PLLCTL1C_PDB_PLL2);
    assert_eq!(pll & RM_PLLCTL1C_PDB_PLL1, 0);
    codec.dac_mute().unwrap();
    assert_eq!(codec.pll_users(), 0);
}

#[test]
fn running_stream_keeps_its_pll_across_access() {
    let codec = codec();
    codec.setup_sample_rate(44_100).unwrap();
    codec.pll_power_up().unwrap();

    codec
        .write_coefficient(0x05, Coefficient::new(-2).unwrap())
        .unwrap();

    assert_eq!(codec.pll_users(), 1);
    let pll = codec.with_regs(|s| s.register(R_PLLCTL1C));
    assert_eq!(pll & RM_PLLCTL1C_PDB_PLL2, RM_PLLCTL1C_PDB_PLL2);
    assert_eq!(pll & RM_PLLCTL1C_PDB_PLL1, 0);
    assert_eq!(codec.read_coefficient(0x05).unwrap().value(), -2);
}

// ---------------------------------------------------------------------------
// Named coefficients
// ---------------------------------------------------------------------------

#[test]
fn named_coefficients_round_trip() {
    let codec = codec();
    codec
        .write_named_coefficient("bass_mix", Coefficient::new(-5).unwrap())
        .unwrap();
    assert_eq!(codec.read_named_coefficient("bass_mix").unwrap().value(), -5);
    assert_eq!(codec.with_regs(|s| s.coefficient(0x96)), [0xFB, 0xFF, 0xFF]);

    codec
        .write_named_coefficient("eq1_ch1_band2_a1", Coefficient::new(0x40_0000).unwrap())
        .unwrap();
    assert_eq!(codec.with_regs(|s| s.coefficient(0x28)), [0x00, 0x00, 0x40]);
    assert_eq!(
        codec.read_named_coefficient("eq1_ch1_band2_a1").unwrap().value(),
        0x40_0000
    );
}

#[test]
fn unknown_coefficient_name_is_rejected() {
    let codec = codec();
    assert_eq!(
        codec.read_named_coefficient("no_such_coef"),
        Err(Error::UnknownControl)
    );
    assert_eq!(codec.with_regs(|s| s.total_writes()), 0);
}

// ---------------------------------------------------------------------------
// Firmware images
// ---------------------------------------------------------------------------

#[test]
fn probe_loads_both_images() {
    let codec = codec();
    let coefficients: [u8; 6] = [0x12, 0x34, 0x56, 0xAB, 0xCD, 0xEF];
    let controls = [R_CONFIG0, 0x5A];

    let report = codec
        .probe(FirmwareImages {
            coefficients: Some(&coefficients[..]),
            controls: Some(&controls[..]),
        })
        .unwrap();

    assert_eq!(report.coefficients, ImageStatus::Loaded(2));
    assert_eq!(report.controls, ImageStatus::Loaded(1));
    // Images are big-endian; RAM words are little-endian.
    assert_eq!(codec.with_regs(|s| s.coefficient(0)), [0x56, 0x34, 0x12]);
    assert_eq!(codec.with_regs(|s| s.coefficient(1)), [0xEF, 0xCD, 0xAB]);
    assert_eq!(codec.with_regs(|s| s.register(R_CONFIG0)), 0x5A);
    assert_eq!(codec.with_regs(|s| s.violations()), 0);
    assert_eq!(codec.pll_users(), 0);
    assert_eq!(codec.with_regs(|s| s.register(R_PWRM2)) & RM_PWRM2_HPL, 0);
}

#[test]
fn probe_survives_malformed_images() {
    let codec = codec();
    let report = codec
        .probe(FirmwareImages {
            coefficients: Some(&[0x12, 0x34, 0x56, 0x78][..]),
            controls: Some(&[R_CONFIG0][..]),
        })
        .unwrap();
    assert_eq!(report.coefficients, ImageStatus::Failed(ErrorKind::Configuration));
    assert_eq!(report.controls, ImageStatus::Failed(ErrorKind::Configuration));
    assert_eq!(codec.with_regs(|s| s.coefficient(0)), [0; 3]);
    assert_eq!(codec.pll_users(), 0);
}

#[test]
fn probe_without_images_reports_absent() {
    let codec = codec();
    let report = codec.probe(FirmwareImages::default()).unwrap();
    assert_eq!(report.coefficients, ImageStatus::Absent);
    assert_eq!(report.controls, ImageStatus::Absent);
    assert_eq!(codec.sample_rate().map(|r| r.hz()), Some(48_000));
}

#[test]
fn load_coeff_ram_runs_inside_an_access_bracket() {
    let codec = codec();
    let n = codec.load_coeff_ram(&[0x00, 0x00, 0x01]).unwrap();
    assert_eq!(n, 1);
    assert_eq!(codec.with_regs(|s| s.coefficient(0)), [0x01, 0x00, 0x00]);
    assert_released(&codec);

    assert_eq!(codec.load_coeff_ram(&[0x00, 0x01]), Err(Error::MalformedImage));
}
