//! The TSCS42xx device object.
//!
//! [`Tscs42xx`] owns the register I/O, the MCLK2 oscillator, the power
//! domain and a delay provider together with the device state, all behind
//! one blocking mutex. Every public operation takes `&self`, acquires the
//! lock once and runs to completion inside it, blocking delays included.
//!
//! # PLL ownership
//!
//! Playback and capture each hold the PLL while unmuted, and coefficient
//! RAM access holds it for the length of a transfer. The first holder
//! selects PLL1 or PLL2 from the current sample rate and waits for lock;
//! later holders only bump the count. Both PLLs are switched off when the
//! last holder lets go.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::clock::{configure_clocks, ExternalClock, PllSource};
use crate::coeff_ram::{
    check_range, coefficient_count, read_coefficients, write_coefficients, write_words,
    Coefficient, CoefficientImage, ControlImage, COEFF_RAM_SIZE,
};
use crate::config::CodecConfig;
use crate::controls::{bit_control, coefficient_address, control_register};
use crate::dapm::{Dapm, DapmError, PowerDomain, Stream, DAC_L};
use crate::error::{Error, ErrorKind};
use crate::format::{BclkRatio, DaiFormat, SampleRate, SampleWidth};
use crate::pll::find_pll_setting;
use crate::poll::{poll_until, PollOutcome};
use crate::registers::{
    DEVID_TSCS42A1, DEVID_TSCS42A2, REGISTER_INITS, RM_CNVRTR0_ADCMU, RM_CNVRTR1_DACMU,
    RM_PLLCTL1C_PDB_PLL1, RM_PLLCTL1C_PDB_PLL2, RM_PWRM2_HPL, RV_RESET_ENABLE, R_ADCSR, R_AIC1,
    R_CATKTCL, R_CNVRTR0, R_CNVRTR1, R_DACSR, R_DEVIDH, R_DEVIDL, R_PLLCTL0, R_PLLCTL1C,
    R_PWRM2, R_RESET,
};
use crate::regmap::{I2cRegmap, RegisterCache, RegisterIo};

/// Time the chip needs after a software reset.
pub const RESET_SETTLE_MS: u32 = 5;

/// Time the DAC and PLL need before coefficient RAM accepts writes at probe.
pub const PROBE_SETTLE_MS: u32 = 5;

type CodecResult<T, R> = Result<T, Error<<R as RegisterIo>::Error>>;

/// TSCS42xx variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PartId {
    /// TSCS42A1
    Tscs42A1,
    /// TSCS42A2
    Tscs42A2,
}

impl PartId {
    /// Variant with this 16-bit device ID.
    pub const fn from_device_id(id: u16) -> Option<Self> {
        match id {
            DEVID_TSCS42A1 => Some(Self::Tscs42A1),
            DEVID_TSCS42A2 => Some(Self::Tscs42A2),
            _ => None,
        }
    }

    /// 16-bit device ID.
    pub const fn device_id(self) -> u16 {
        match self {
            Self::Tscs42A1 => DEVID_TSCS42A1,
            Self::Tscs42A2 => DEVID_TSCS42A2,
        }
    }
}

/// Result of reading the device ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PartDetection {
    /// A supported part answered.
    Found(PartId),
    /// Something answered with this unrecognised ID.
    NotFound(u16),
}

/// Optional firmware blobs loaded by [`Tscs42xx::probe`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FirmwareImages<'a> {
    /// DSP coefficients, big-endian 3-byte words from address 0.
    pub coefficients: Option<&'a [u8]>,
    /// `(register, value)` pairs.
    pub controls: Option<&'a [u8]>,
}

/// What happened to one firmware image during probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageStatus {
    /// No image supplied.
    Absent,
    /// Image applied; number of coefficients or register writes.
    Loaded(usize),
    /// Image rejected or partially applied.
    Failed(ErrorKind),
}

/// Probe outcome. Image failures are reported here rather than failing probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProbeReport {
    /// Coefficient image.
    pub coefficients: ImageStatus,
    /// Control register image.
    pub controls: ImageStatus,
}

/// Mutable per-device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
    /// Current PLL reference.
    pub pll_source: PllSource,
    /// Current reference frequency in Hz.
    pub mclk_frequency: u32,
    /// Last BCLK ratio set.
    pub bclk_ratio: Option<BclkRatio>,
    /// Last sample rate set. Selects the PLL on power-up.
    pub sample_rate: Option<SampleRate>,
    /// Last sample width set.
    pub sample_width: Option<SampleWidth>,
    /// PLL holders.
    pub pll_users: u32,
    /// Runtime suspended.
    pub suspended: bool,
}

impl DeviceState {
    fn new(config: &CodecConfig) -> Self {
        Self {
            pll_source: config.pll_source,
            mclk_frequency: config.mclk_frequency,
            bclk_ratio: None,
            sample_rate: None,
            sample_width: None,
            pll_users: 0,
            suspended: false,
        }
    }
}

struct Core<R, C, P, D> {
    regs: R,
    clock: C,
    power: P,
    delay: D,
    config: CodecConfig,
    state: DeviceState,
}

/// TSCS42xx codec.
///
/// - `M`: raw mutex guarding the device (`NoopRawMutex` when only one
///   context touches it, `CriticalSectionRawMutex` otherwise)
/// - `R`: register I/O, usually [`I2cRegmap`]
/// - `C`: MCLK2 oscillator, [`NoClock`](crate::NoClock) on crystal boards
/// - `P`: power domain, usually [`Dapm`]
/// - `D`: blocking delay
pub struct Tscs42xx<M: RawMutex, R, C, P, D> {
    inner: Mutex<M, RefCell<Core<R, C, P, D>>>,
}

impl<M: RawMutex, R, C, P, D> Tscs42xx<M, R, C, P, D> {
    /// Assemble a codec from its collaborators. Nothing is written.
    pub fn new(regs: R, clock: C, power: P, delay: D, config: CodecConfig) -> Self {
        let state = DeviceState::new(&config);
        Self {
            inner: Mutex::new(RefCell::new(Core {
                regs,
                clock,
                power,
                delay,
                config,
                state,
            })),
        }
    }

    /// Take the collaborators back.
    pub fn release(self) -> (R, C, P, D) {
        let core = self.inner.into_inner().into_inner();
        (core.regs, core.clock, core.power, core.delay)
    }

    fn with<T>(&self, f: impl FnOnce(&mut Core<R, C, P, D>) -> T) -> T {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Snapshot of the device state.
    pub fn state(&self) -> DeviceState {
        self.with(|c| c.state)
    }

    /// Configuration in use.
    pub fn config(&self) -> CodecConfig {
        self.with(|c| c.config)
    }

    /// Current PLL holders.
    pub fn pll_users(&self) -> u32 {
        self.with(|c| c.state.pll_users)
    }

    /// Last sample rate set.
    pub fn sample_rate(&self) -> Option<SampleRate> {
        self.with(|c| c.state.sample_rate)
    }

    /// Last BCLK ratio set.
    pub fn bclk_ratio(&self) -> Option<BclkRatio> {
        self.with(|c| c.state.bclk_ratio)
    }

    /// Whether [`suspend`](Self::suspend) is in effect.
    pub fn is_suspended(&self) -> bool {
        self.with(|c| c.state.suspended)
    }

    /// Run `f` on the register I/O under the device lock.
    pub fn with_regs<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        self.with(|c| f(&mut c.regs))
    }

    /// Run `f` on the MCLK2 oscillator under the device lock.
    pub fn with_clock<T>(&self, f: impl FnOnce(&mut C) -> T) -> T {
        self.with(|c| f(&mut c.clock))
    }

    /// Run `f` on the power domain under the device lock.
    pub fn with_power<T>(&self, f: impl FnOnce(&mut P) -> T) -> T {
        self.with(|c| f(&mut c.power))
    }

    /// Run `f` on the delay provider under the device lock.
    pub fn with_delay<T>(&self, f: impl FnOnce(&mut D) -> T) -> T {
        self.with(|c| f(&mut c.delay))
    }
}

impl<M: RawMutex, R, C, D> Tscs42xx<M, R, C, Dapm, D> {
    /// Codec with its own widget graph as the power domain.
    pub fn with_dapm(regs: R, clock: C, delay: D, config: CodecConfig) -> Result<Self, DapmError> {
        Ok(Self::new(regs, clock, Dapm::for_codec()?, delay, config))
    }
}

impl<M: RawMutex, I: I2c, C, D> Tscs42xx<M, I2cRegmap<I>, C, Dapm, D> {
    /// Codec on an I²C bus at `config.i2c_address`.
    pub fn from_i2c(i2c: I, clock: C, delay: D, config: CodecConfig) -> Result<Self, DapmError> {
        Self::with_dapm(I2cRegmap::new(i2c, config.i2c_address), clock, delay, config)
    }
}

impl<M, R, C, P, D> Tscs42xx<M, R, C, P, D>
where
    M: RawMutex,
    R: RegisterIo,
    C: ExternalClock,
    P: PowerDomain,
    D: DelayNs,
{
    // ── Identity and setup ─────────────────────────────────────────────────

    /// Read the device ID.
    pub fn detect_part(&self) -> CodecResult<PartDetection, R> {
        self.with(Core::detect_part)
    }

    /// Software reset followed by the settle delay.
    ///
    /// Clears the PLL hold count and the power domain's record of what is
    /// powered, so the next [`sync_power`](Self::sync_power) rewrites every
    /// power bit. Cached register values are not invalidated; with
    /// [`I2cRegmap`] call [`I2cRegmap::invalidate`] through
    /// [`with_regs`](Self::with_regs) when resetting after registers were
    /// written.
    pub fn reset(&self) -> CodecResult<(), R> {
        self.with(Core::reset)
    }

    /// Bring the codec up.
    ///
    /// Configures the PLLs, writes register defaults, then powers the DAC
    /// interface and a PLL long enough to load the optional firmware images
    /// and powers both back down. Image problems are logged and reported in
    /// the [`ProbeReport`]; everything else fails probe.
    pub fn probe(&self, firmware: FirmwareImages<'_>) -> CodecResult<ProbeReport, R> {
        self.with(|c| c.probe(firmware))
    }

    /// Program the PLLs and reference select for the current clock settings.
    pub fn configure_clocks(&self) -> CodecResult<(), R> {
        self.with(Core::configure_clocks)
    }

    /// Switch the PLL reference clock and reprogram the PLLs.
    ///
    /// The frequency is checked against the PLL table before anything is
    /// touched. The device state only changes once programming succeeds.
    pub fn set_sysclk(&self, source: PllSource, mclk_frequency: u32) -> CodecResult<(), R> {
        self.with(|c| c.set_sysclk(source, mclk_frequency))
    }

    /// Set protocol, clock polarity and master mode. Only codec-master
    /// formats are accepted.
    pub fn set_dai_format(&self, format: DaiFormat) -> CodecResult<(), R> {
        self.with(|c| c.set_dai_format(format))
    }

    /// BCLK cycles per frame (32, 40 or 64), applied to DAC and ADC.
    pub fn set_bclk_ratio(&self, ratio: u32) -> CodecResult<(), R> {
        self.with(|c| c.set_bclk_ratio(ratio))
    }

    /// Stream parameters. Both values are validated before any write.
    pub fn hw_params(&self, rate_hz: u32, width_bits: u8) -> CodecResult<(), R> {
        self.with(|c| c.hw_params(rate_hz, width_bits))
    }

    /// Sample width in bits (16, 20, 24 or 32).
    pub fn setup_sample_format(&self, width_bits: u8) -> CodecResult<(), R> {
        self.with(|c| c.setup_sample_format(width_bits))
    }

    /// Sample rate in Hz, written to both DAC and ADC.
    pub fn setup_sample_rate(&self, rate_hz: u32) -> CodecResult<(), R> {
        self.with(|c| c.setup_sample_rate(rate_hz))
    }

    // ── PLL and mute ───────────────────────────────────────────────────────

    /// Take a PLL hold; the first holder powers and locks the PLL.
    pub fn pll_power_up(&self) -> CodecResult<(), R> {
        self.with(Core::pll_power_up)
    }

    /// Drop a PLL hold; the last holder powers both PLLs down.
    pub fn pll_power_down(&self) -> CodecResult<(), R> {
        self.with(Core::pll_power_down)
    }

    /// Mute the DAC, then drop its PLL hold.
    pub fn dac_mute(&self) -> CodecResult<(), R> {
        self.with(Core::dac_mute)
    }

    /// Take a PLL hold, then unmute the DAC. The hold is dropped again if
    /// unmuting fails.
    pub fn dac_unmute(&self) -> CodecResult<(), R> {
        self.with(Core::dac_unmute)
    }

    /// Mute the ADC, then drop its PLL hold.
    pub fn adc_mute(&self) -> CodecResult<(), R> {
        self.with(Core::adc_mute)
    }

    /// Take a PLL hold, then unmute the ADC.
    pub fn adc_unmute(&self) -> CodecResult<(), R> {
        self.with(Core::adc_unmute)
    }

    /// Mute or unmute the converter for `stream`.
    pub fn mute_stream(&self, stream: Stream, mute: bool) -> CodecResult<(), R> {
        self.with(|c| c.mute_stream(stream, mute))
    }

    /// Mark `stream` started or stopped and resync power.
    pub fn stream_event(&self, stream: Stream, active: bool) -> CodecResult<(), R> {
        self.with(|c| c.stream_event(stream, active))
    }

    // ── Coefficient RAM ────────────────────────────────────────────────────

    /// Power what coefficient RAM needs: force "DAC L" on, resync, then
    /// take a PLL hold (at 48 kHz if nobody holds the PLL).
    ///
    /// Every successful call must be paired with
    /// [`disable_coeff_ram_access`](Self::disable_coeff_ram_access). The
    /// transfer helpers below do that themselves.
    pub fn enable_coeff_ram_access(&self) -> CodecResult<(), R> {
        self.with(Core::enable_coeff_ram_access)
    }

    /// Release "DAC L", resync, and drop the PLL hold.
    pub fn disable_coeff_ram_access(&self) -> CodecResult<(), R> {
        self.with(Core::disable_coeff_ram_access)
    }

    /// Dump the whole coefficient RAM. `buf` must be exactly
    /// [`COEFF_RAM_SIZE`] bytes; other sizes are rejected before anything is
    /// powered.
    pub fn read_coeff_ram(&self, buf: &mut [u8]) -> CodecResult<(), R> {
        self.with(|c| c.read_coeff_ram(buf))
    }

    /// Write little-endian 3-byte words starting at coefficient `address`.
    /// Length and range are validated before anything is powered.
    pub fn write_coeff_ram(&self, address: u8, data: &[u8]) -> CodecResult<(), R> {
        self.with(|c| c.write_coeff_ram(address, data))
    }

    /// Load a coefficient firmware image (big-endian words from address 0).
    /// Returns the number of coefficients written.
    pub fn load_coeff_ram(&self, image: &[u8]) -> CodecResult<usize, R> {
        self.with(|c| c.load_coeff_ram(image))
    }

    /// Read one coefficient.
    pub fn read_coefficient(&self, address: u8) -> CodecResult<Coefficient, R> {
        self.with(|c| c.read_coefficient(address))
    }

    /// Write one coefficient.
    pub fn write_coefficient(&self, address: u8, value: Coefficient) -> CodecResult<(), R> {
        self.with(|c| c.write_coefficient(address, value))
    }

    /// Read a coefficient by name, e.g. `"eq1_ch0_band3_a1"` or `"bass_mix"`.
    pub fn read_named_coefficient(&self, name: &str) -> CodecResult<Coefficient, R> {
        let address = coefficient_address(name).ok_or(Error::UnknownControl)?;
        self.read_coefficient(address)
    }

    /// Write a coefficient by name.
    pub fn write_named_coefficient(&self, name: &str, value: Coefficient) -> CodecResult<(), R> {
        let address = coefficient_address(name).ok_or(Error::UnknownControl)?;
        self.write_coefficient(address, value)
    }

    // ── Controls ───────────────────────────────────────────────────────────

    /// Compressor attack time, CATKTCL/CATKTCH as one little-endian value.
    pub fn compressor_attack_time(&self) -> CodecResult<u16, R> {
        self.with(Core::compressor_attack_time)
    }

    /// Set the compressor attack time.
    pub fn set_compressor_attack_time(&self, value: u16) -> CodecResult<(), R> {
        self.with(|c| c.set_compressor_attack_time(value))
    }

    /// Read a named bit-field control (`"eq1_en"`, ...) or DSP control
    /// register (`"config0"`, ...). Bit fields are returned shifted down.
    pub fn read_control(&self, name: &str) -> CodecResult<u8, R> {
        self.with(|c| c.read_control(name))
    }

    /// Write a named bit-field control or DSP control register. Bit-field
    /// values are shifted into place and masked.
    pub fn write_control(&self, name: &str, value: u8) -> CodecResult<(), R> {
        self.with(|c| c.write_control(name, value))
    }

    // ── Registers and power ────────────────────────────────────────────────

    /// Read a register.
    pub fn read_register(&self, reg: u8) -> CodecResult<u8, R> {
        self.with(|c| c.regs.read(reg).map_err(Error::Bus))
    }

    /// Write a register.
    pub fn write_register(&self, reg: u8, value: u8) -> CodecResult<(), R> {
        self.with(|c| c.regs.write(reg, value).map_err(Error::Bus))
    }

    /// Masked read-modify-write. Returns whether the register changed.
    pub fn update_bits(&self, reg: u8, mask: u8, value: u8) -> CodecResult<bool, R> {
        self.with(|c| c.regs.update_bits(reg, mask, value).map_err(Error::Bus))
    }

    /// Allow widget `name` to be powered. Takes effect on the next sync.
    pub fn enable_pin(&self, name: &str) -> CodecResult<(), R> {
        self.with(|c| c.power.enable_pin(name).map_err(Error::from))
    }

    /// Keep widget `name` off. Takes effect on the next sync.
    pub fn disable_pin(&self, name: &str) -> CodecResult<(), R> {
        self.with(|c| c.power.disable_pin(name).map_err(Error::from))
    }

    /// Bring power bits in line with pin and stream state.
    pub fn sync_power(&self) -> CodecResult<(), R> {
        self.with(Core::sync_power)
    }
}

impl<M, R, C, P, D> Tscs42xx<M, R, C, P, D>
where
    M: RawMutex,
    R: RegisterCache,
    C: ExternalClock,
    P: PowerDomain,
    D: DelayNs,
{
    /// Runtime suspend: buffer register writes and stop the MCLK2 oscillator.
    pub fn suspend(&self) {
        self.with(Core::suspend);
    }

    /// Runtime resume: restart the oscillator, reset the chip and replay the
    /// register cache.
    pub fn resume(&self) -> CodecResult<(), R> {
        self.with(Core::resume)
    }
}

impl<R, C, P, D> Core<R, C, P, D>
where
    R: RegisterIo,
    C: ExternalClock,
    P: PowerDomain,
    D: DelayNs,
{
    fn detect_part(&mut self) -> CodecResult<PartDetection, R> {
        let hi = self.regs.read(R_DEVIDH).map_err(Error::Bus)?;
        let lo = self.regs.read(R_DEVIDL).map_err(Error::Bus)?;
        let id = u16::from_be_bytes([hi, lo]);
        match PartId::from_device_id(id) {
            Some(part) => {
                info!("tscs42xx: found part {:#x}", id);
                Ok(PartDetection::Found(part))
            }
            None => {
                error!("tscs42xx: {:#x} is not a valid part", id);
                Ok(PartDetection::NotFound(id))
            }
        }
    }

    fn reset(&mut self) -> CodecResult<(), R> {
        self.regs.write(R_RESET, RV_RESET_ENABLE).map_err(Error::Bus)?;
        self.delay.delay_ms(RESET_SETTLE_MS);
        self.state.pll_users = 0;
        self.power.mark_unpowered();
        Ok(())
    }

    fn probe(&mut self, firmware: FirmwareImages<'_>) -> CodecResult<ProbeReport, R> {
        self.configure_clocks()?;
        for (reg, value) in REGISTER_INITS {
            self.regs.write(reg, value).map_err(|e| {
                error!("tscs42xx: failed to write register defaults");
                Error::Bus(e)
            })?;
        }

        // Coefficient RAM needs the DAC interface and a PLL.
        self.regs
            .update_bits(R_PWRM2, RM_PWRM2_HPL, RM_PWRM2_HPL)
            .map_err(Error::Bus)?;
        self.state.sample_rate = Some(SampleRate::Hz48000);
        self.pll_power_up()?;
        self.delay.delay_ms(PROBE_SETTLE_MS);

        let coefficients = match firmware.coefficients {
            None => {
                info!("tscs42xx: no coefficient image");
                ImageStatus::Absent
            }
            Some(data) => match self.load_coefficient_image(data) {
                Ok(n) => ImageStatus::Loaded(n),
                Err(e) => {
                    warn!("tscs42xx: coefficient image not loaded ({})", e.kind().as_str());
                    ImageStatus::Failed(e.kind())
                }
            },
        };
        let controls = match firmware.controls {
            None => {
                info!("tscs42xx: no control image");
                ImageStatus::Absent
            }
            Some(data) => match self.load_control_image(data) {
                Ok(n) => ImageStatus::Loaded(n),
                Err(e) => {
                    warn!("tscs42xx: control image not loaded ({})", e.kind().as_str());
                    ImageStatus::Failed(e.kind())
                }
            },
        };

        self.pll_power_down()?;
        self.regs
            .update_bits(R_PWRM2, RM_PWRM2_HPL, 0)
            .map_err(Error::Bus)?;
        Ok(ProbeReport {
            coefficients,
            controls,
        })
    }

    /// Caller must have the DAC and a PLL powered.
    fn load_coefficient_image(&mut self, data: &[u8]) -> CodecResult<usize, R> {
        let image = CoefficientImage::parse(data)?;
        write_words(
            &mut self.regs,
            &mut self.delay,
            self.config.coeff_ram_ready,
            0,
            image.words(),
        )?;
        info!("tscs42xx: loaded {} coefficients", image.len());
        Ok(image.len())
    }

    fn load_control_image(&mut self, data: &[u8]) -> CodecResult<usize, R> {
        let image = ControlImage::parse(data)?;
        for (reg, value) in image.entries() {
            self.regs.write(reg, value).map_err(Error::Bus)?;
        }
        info!("tscs42xx: loaded {} control registers", image.len());
        Ok(image.len())
    }

    fn apply_clocks(&mut self, source: PllSource, mclk_frequency: u32) -> CodecResult<(), R> {
        configure_clocks(&mut self.regs, &mut self.clock, source, mclk_frequency).map_err(|e| {
            error!("tscs42xx: failed to configure clocks for {} Hz", mclk_frequency);
            e
        })
    }

    fn configure_clocks(&mut self) -> CodecResult<(), R> {
        self.apply_clocks(self.state.pll_source, self.state.mclk_frequency)
    }

    fn set_sysclk(&mut self, source: PllSource, mclk_frequency: u32) -> CodecResult<(), R> {
        if find_pll_setting(mclk_frequency).is_none() {
            error!("tscs42xx: {} Hz reference unsupported", mclk_frequency);
            return Err(Error::UnsupportedClock(mclk_frequency));
        }
        self.apply_clocks(source, mclk_frequency)?;
        if self.state.pll_source == PllSource::Mclk2 && source == PllSource::Xtal {
            self.clock.disable();
        }
        self.state.pll_source = source;
        self.state.mclk_frequency = mclk_frequency;
        debug!("tscs42xx: sysclk {} at {} Hz", source.as_str(), mclk_frequency);
        Ok(())
    }

    fn set_dai_format(&mut self, format: DaiFormat) -> CodecResult<(), R> {
        let Some(bits) = format.aic1_bits() else {
            error!("tscs42xx: codec must be clock master");
            return Err(Error::UnsupportedDaiFormat);
        };
        self.regs
            .update_bits(R_AIC1, DaiFormat::AIC1_MASK, bits)
            .map_err(Error::Bus)?;
        Ok(())
    }

    fn set_bclk_ratio(&mut self, ratio: u32) -> CodecResult<(), R> {
        let r = BclkRatio::from_ratio(ratio).ok_or(Error::UnsupportedBclkRatio(ratio))?;
        for reg in [R_DACSR, R_ADCSR] {
            self.regs
                .update_bits(reg, BclkRatio::REGISTER_MASK, r.register_bits())
                .map_err(Error::Bus)?;
        }
        self.state.bclk_ratio = Some(r);
        Ok(())
    }

    fn hw_params(&mut self, rate_hz: u32, width_bits: u8) -> CodecResult<(), R> {
        let width = SampleWidth::from_bits(width_bits).ok_or(Error::UnsupportedFormat(width_bits))?;
        let rate = SampleRate::from_hz(rate_hz).ok_or(Error::UnsupportedRate(rate_hz))?;
        self.write_sample_width(width)?;
        self.write_sample_rate(rate)
    }

    fn setup_sample_format(&mut self, width_bits: u8) -> CodecResult<(), R> {
        let width = SampleWidth::from_bits(width_bits).ok_or(Error::UnsupportedFormat(width_bits))?;
        self.write_sample_width(width)
    }

    fn setup_sample_rate(&mut self, rate_hz: u32) -> CodecResult<(), R> {
        let rate = SampleRate::from_hz(rate_hz).ok_or(Error::UnsupportedRate(rate_hz))?;
        self.write_sample_rate(rate)
    }

    fn write_sample_width(&mut self, width: SampleWidth) -> CodecResult<(), R> {
        self.regs
            .update_bits(R_AIC1, SampleWidth::REGISTER_MASK, width.register_bits())
            .map_err(Error::Bus)?;
        self.state.sample_width = Some(width);
        Ok(())
    }

    fn write_sample_rate(&mut self, rate: SampleRate) -> CodecResult<(), R> {
        for reg in [R_DACSR, R_ADCSR] {
            self.regs
                .update_bits(reg, SampleRate::REGISTER_MASK, rate.register_bits())
                .map_err(Error::Bus)?;
        }
        self.state.sample_rate = Some(rate);
        Ok(())
    }

    fn pll_power_up(&mut self) -> CodecResult<(), R> {
        if self.state.pll_users > 0 {
            self.state.pll_users = self.state.pll_users.saturating_add(1);
            return Ok(());
        }

        let rate = self.state.sample_rate.ok_or(Error::UnsupportedRate(0))?;
        let pll = rate.pll_output().pll();
        self.regs
            .update_bits(R_PLLCTL1C, pll.enable_mask(), pll.enable_mask())
            .map_err(|e| {
                error!("tscs42xx: failed to turn PLL on");
                Error::Bus(e)
            })?;

        let locked = poll_until(
            &mut self.regs,
            &mut self.delay,
            R_PLLCTL0,
            self.config.pll_lock,
            |v| v != 0,
        )
        .map_err(|e| {
            error!("tscs42xx: failed to read PLL lock status");
            Error::Bus(e)
        })?;
        match locked {
            PollOutcome::Ready(reads) => {
                debug!("tscs42xx: PLL locked after {} reads for {} Hz", reads, rate.hz());
            }
            PollOutcome::Exhausted => {
                error!("tscs42xx: PLL failed to lock");
                return Err(Error::PllLockTimeout);
            }
        }

        self.state.pll_users = 1;
        Ok(())
    }

    fn pll_power_down(&mut self) -> CodecResult<(), R> {
        let Some(users) = self.state.pll_users.checked_sub(1) else {
            error!("tscs42xx: PLL power-down without power-up");
            return Err(Error::PllRefCountUnderflow);
        };
        if users > 0 {
            self.state.pll_users = users;
            return Ok(());
        }
        // The last hold is only dropped once both PLLs are off.
        for mask in [RM_PLLCTL1C_PDB_PLL1, RM_PLLCTL1C_PDB_PLL2] {
            self.regs.update_bits(R_PLLCTL1C, mask, 0).map_err(|e| {
                error!("tscs42xx: failed to turn PLL off");
                Error::Bus(e)
            })?;
        }
        self.state.pll_users = 0;
        debug!("tscs42xx: PLLs off");
        Ok(())
    }

    fn mute(&mut self, reg: u8, mask: u8) -> CodecResult<(), R> {
        self.regs.update_bits(reg, mask, mask).map_err(|e| {
            error!("tscs42xx: failed to mute {:#x}", reg);
            Error::Bus(e)
        })?;
        self.pll_power_down()
    }

    fn unmute(&mut self, reg: u8, mask: u8) -> CodecResult<(), R> {
        self.pll_power_up()?;
        if let Err(e) = self.regs.update_bits(reg, mask, 0) {
            error!("tscs42xx: failed to unmute {:#x}", reg);
            if self.pll_power_down().is_err() {
                warn!("tscs42xx: PLL release after failed unmute also failed");
            }
            return Err(Error::Bus(e));
        }
        Ok(())
    }

    fn dac_mute(&mut self) -> CodecResult<(), R> {
        self.mute(R_CNVRTR1, RM_CNVRTR1_DACMU)
    }

    fn dac_unmute(&mut self) -> CodecResult<(), R> {
        self.unmute(R_CNVRTR1, RM_CNVRTR1_DACMU)
    }

    fn adc_mute(&mut self) -> CodecResult<(), R> {
        self.mute(R_CNVRTR0, RM_CNVRTR0_ADCMU)
    }

    fn adc_unmute(&mut self) -> CodecResult<(), R> {
        self.unmute(R_CNVRTR0, RM_CNVRTR0_ADCMU)
    }

    fn mute_stream(&mut self, stream: Stream, mute: bool) -> CodecResult<(), R> {
        match (stream, mute) {
            (Stream::Playback, true) => self.dac_mute(),
            (Stream::Playback, false) => self.dac_unmute(),
            (Stream::Capture, true) => self.adc_mute(),
            (Stream::Capture, false) => self.adc_unmute(),
        }
    }

    fn stream_event(&mut self, stream: Stream, active: bool) -> CodecResult<(), R> {
        self.power.set_stream_active(stream, active);
        self.sync_power()
    }

    fn sync_power(&mut self) -> CodecResult<(), R> {
        self.power.sync(&mut self.regs, &mut self.delay).map_err(|e| {
            error!("tscs42xx: failed to sync power state");
            Error::Bus(e)
        })
    }

    fn enable_coeff_ram_access(&mut self) -> CodecResult<(), R> {
        self.power.force_enable_pin(DAC_L)?;
        if let Err(e) = self.sync_power() {
            if self.release_dac_l().is_err() {
                warn!("tscs42xx: failed to release DAC L after power failure");
            }
            return Err(e);
        }
        if self.state.pll_users == 0 {
            self.state.sample_rate = Some(SampleRate::Hz48000);
        }
        if let Err(e) = self.pll_power_up() {
            if self.release_dac_l().is_err() {
                warn!("tscs42xx: failed to release DAC L after PLL failure");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Drop the PLL hold even when "DAC L" could not be powered down; the
    /// first error is returned.
    fn disable_coeff_ram_access(&mut self) -> CodecResult<(), R> {
        let unforced = self.release_dac_l();
        if unforced.is_err() {
            warn!("tscs42xx: failed to release DAC L, dropping PLL hold anyway");
        }
        let pll = self.pll_power_down();
        unforced.and(pll)
    }

    /// Clear the "DAC L" force. The pin stays unforced in the graph even if
    /// the sync fails, so the next sync powers it down.
    fn release_dac_l(&mut self) -> CodecResult<(), R> {
        self.power.disable_pin(DAC_L)?;
        self.sync_power()
    }

    /// Run `transfer` with coefficient RAM powered. Access is always
    /// released; the transfer's own error wins over a release error.
    fn with_coeff_ram<T>(
        &mut self,
        transfer: impl FnOnce(&mut Self) -> CodecResult<T, R>,
    ) -> CodecResult<T, R> {
        self.enable_coeff_ram_access()?;
        let result = transfer(self);
        let released = self.disable_coeff_ram_access();
        match (result, released) {
            (Ok(v), Ok(())) => Ok(v),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(_)) => {
                warn!("tscs42xx: releasing coefficient RAM after a failed transfer also failed");
                Err(e)
            }
        }
    }

    fn read_coeff_ram(&mut self, buf: &mut [u8]) -> CodecResult<(), R> {
        if buf.len() != COEFF_RAM_SIZE {
            return Err(Error::InvalidSize {
                expected: COEFF_RAM_SIZE,
                actual: buf.len(),
            });
        }
        self.with_coeff_ram(|c| {
            read_coefficients(&mut c.regs, &mut c.delay, c.config.coeff_ram_ready, 0, buf)
        })
    }

    fn write_coeff_ram(&mut self, address: u8, data: &[u8]) -> CodecResult<(), R> {
        let count = coefficient_count(data.len())?;
        check_range(address, count)?;
        self.with_coeff_ram(|c| {
            write_coefficients(&mut c.regs, &mut c.delay, c.config.coeff_ram_ready, address, data)
        })
    }

    fn load_coeff_ram(&mut self, image: &[u8]) -> CodecResult<usize, R> {
        CoefficientImage::parse::<R::Error>(image)?;
        self.with_coeff_ram(|c| c.load_coefficient_image(image))
    }

    fn read_coefficient(&mut self, address: u8) -> CodecResult<Coefficient, R> {
        check_range(address, 1)?;
        self.with_coeff_ram(|c| {
            let mut word = [0u8; 3];
            read_coefficients(&mut c.regs, &mut c.delay, c.config.coeff_ram_ready, address, &mut word)?;
            Ok(Coefficient::from_le_bytes(word))
        })
    }

    fn write_coefficient(&mut self, address: u8, value: Coefficient) -> CodecResult<(), R> {
        check_range(address, 1)?;
        let word = value.to_le_bytes();
        self.with_coeff_ram(|c| {
            write_coefficients(&mut c.regs, &mut c.delay, c.config.coeff_ram_ready, address, &word)
        })
    }

    fn compressor_attack_time(&mut self) -> CodecResult<u16, R> {
        let mut bytes = [0u8; 2];
        self.regs.bulk_read(R_CATKTCL, &mut bytes).map_err(Error::Bus)?;
        Ok(u16::from_le_bytes(bytes))
    }

    fn set_compressor_attack_time(&mut self, value: u16) -> CodecResult<(), R> {
        self.regs
            .bulk_write(R_CATKTCL, &value.to_le_bytes())
            .map_err(Error::Bus)
    }

    fn read_control(&mut self, name: &str) -> CodecResult<u8, R> {
        if let Some(ctl) = bit_control(name) {
            let v = self.regs.read(ctl.reg).map_err(Error::Bus)?;
            return Ok(ctl.field(v));
        }
        let reg = control_register(name).ok_or(Error::UnknownControl)?;
        self.regs.read(reg).map_err(Error::Bus)
    }

    fn write_control(&mut self, name: &str, value: u8) -> CodecResult<(), R> {
        if let Some(ctl) = bit_control(name) {
            self.regs
                .update_bits(ctl.reg, ctl.mask, ctl.bits(value))
                .map_err(Error::Bus)?;
            return Ok(());
        }
        let reg = control_register(name).ok_or(Error::UnknownControl)?;
        self.regs.write(reg, value).map_err(Error::Bus)
    }
}

impl<R, C, P, D> Core<R, C, P, D>
where
    R: RegisterCache,
    C: ExternalClock,
    P: PowerDomain,
    D: DelayNs,
{
    fn suspend(&mut self) {
        self.regs.set_cache_only(true);
        if self.state.pll_source == PllSource::Mclk2 {
            self.clock.disable();
        }
        self.state.suspended = true;
        debug!("tscs42xx: suspended");
    }

    fn resume(&mut self) -> CodecResult<(), R> {
        if self.state.pll_source == PllSource::Mclk2 {
            self.clock.set_rate(self.state.mclk_frequency)?;
            self.clock.enable()?;
        }
        self.regs.set_cache_only(false);
        self.state.suspended = false;
        self.regs.write(R_RESET, RV_RESET_ENABLE).map_err(|e| {
            error!("tscs42xx: failed to reset on resume");
            Error::Bus(e)
        })?;
        self.regs.mark_dirty();
        self.regs.sync().map_err(|e| {
            error!("tscs42xx: failed to restore registers");
            Error::Bus(e)
        })?;
        debug!("tscs42xx: resumed");
        Ok(())
    }
}
