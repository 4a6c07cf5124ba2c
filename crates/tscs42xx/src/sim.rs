//! Behavioural TSCS42xx model for host tests and desktop simulation.
//!
//! [`SimulatedTscs42xx`] implements [`RegisterIo`] and [`RegisterCache`] over
//! an in-memory register file and reproduces the parts of the chip the
//! driver depends on:
//!
//! - device ID and software reset,
//! - PLL lock status that follows the PLLCTL1C enable bits,
//! - the coefficient RAM handshake (busy flag, address latch, commit on
//!   high-byte write, auto-increment),
//! - coefficient RAM only responding while "DAC L" and a PLL are powered.
//!
//! It also counts reads and writes per register, keeps a short write log and
//! can inject bus faults. [`SimClock`] and [`SimDelay`] stand in for the
//! MCLK2 oscillator and the delay provider.

use embedded_hal::delay::DelayNs;
use heapless::{Deque, Vec};

use crate::clock::{ClockError, ExternalClock};
use crate::coeff_ram::COEFF_RAM_COEFF_COUNT;
use crate::registers::{
    is_cacheable, DEVID_TSCS42A1, MAX_REGISTER, RM_PLLCTL1C_PDB_PLL1, RM_PLLCTL1C_PDB_PLL2,
    RM_PWRM2_HPL, RV_RESET_ENABLE, R_DACCRADDR, R_DACCRRDH, R_DACCRRDL, R_DACCRRDM, R_DACCRSTAT,
    R_DACCRWRH, R_DACCRWRL, R_DACCRWRM, R_DEVIDH, R_DEVIDL, R_PLLCTL0, R_PLLCTL1C, R_PWRM2,
    R_RESET,
};
use crate::regmap::{RegisterCache, RegisterIo};

/// Number of writes kept by [`SimulatedTscs42xx::recent_writes`].
pub const WRITE_LOG_LEN: usize = 64;

const SLOTS: usize = 256;

/// Simulated bus failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimError {
    /// Fault injected on this register.
    Fault(u8),
    /// Register does not exist.
    InvalidRegister(u8),
    /// Access needs the bus but the model is in cache-only mode.
    CacheOnly,
}

/// In-memory TSCS42xx.
#[derive(Debug, Clone)]
pub struct SimulatedTscs42xx {
    regs: [u8; SLOTS],
    reads: [u32; SLOTS],
    writes: [u32; SLOTS],
    log: Deque<(u8, u8), WRITE_LOG_LEN>,
    ram: [[u8; 3]; COEFF_RAM_COEFF_COUNT],
    ram_addr: u8,
    device_id: u16,
    fail_write: Option<u8>,
    fail_read: Option<u8>,
    pll_never_locks: bool,
    pll_lock_reads: u16,
    pll_lock_countdown: u16,
    busy_reads: u16,
    busy_countdown: u16,
    stuck_busy: bool,
    violations: u32,
    resets: u32,
    cache: [Option<u8>; SLOTS],
    dirty: [bool; SLOTS],
    cache_only: bool,
}

impl Default for SimulatedTscs42xx {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTscs42xx {
    /// A freshly powered TSCS42A1 with all registers zero.
    pub fn new() -> Self {
        let mut sim = Self {
            regs: [0; SLOTS],
            reads: [0; SLOTS],
            writes: [0; SLOTS],
            log: Deque::new(),
            ram: [[0; 3]; COEFF_RAM_COEFF_COUNT],
            ram_addr: 0,
            device_id: DEVID_TSCS42A1,
            fail_write: None,
            fail_read: None,
            pll_never_locks: false,
            pll_lock_reads: 0,
            pll_lock_countdown: 0,
            busy_reads: 0,
            busy_countdown: 0,
            stuck_busy: false,
            violations: 0,
            resets: 0,
            cache: [None; SLOTS],
            dirty: [false; SLOTS],
            cache_only: false,
        };
        sim.load_id();
        sim
    }

    fn load_id(&mut self) {
        let [lo, hi] = self.device_id.to_le_bytes();
        self.poke(R_DEVIDL, lo);
        self.poke(R_DEVIDH, hi);
    }

    fn poke(&mut self, reg: u8, value: u8) {
        if let Some(r) = self.regs.get_mut(usize::from(reg)) {
            *r = value;
        }
    }

    fn bump(counts: &mut [u32; SLOTS], reg: u8) {
        if let Some(c) = counts.get_mut(usize::from(reg)) {
            *c = c.saturating_add(1);
        }
    }

    // ── Inspection ─────────────────────────────────────────────────────────

    /// Current register contents.
    pub fn register(&self, reg: u8) -> u8 {
        self.regs.get(usize::from(reg)).copied().unwrap_or(0)
    }

    /// Set a register without counting it as a bus write.
    pub fn set_register(&mut self, reg: u8, value: u8) {
        self.poke(reg, value);
    }

    /// Bus reads of `reg` so far.
    pub fn read_count(&self, reg: u8) -> u32 {
        self.reads.get(usize::from(reg)).copied().unwrap_or(0)
    }

    /// Bus writes to `reg` so far (failed writes excluded).
    pub fn write_count(&self, reg: u8) -> u32 {
        self.writes.get(usize::from(reg)).copied().unwrap_or(0)
    }

    /// Bus writes to any register.
    pub fn total_writes(&self) -> u32 {
        self.writes.iter().fold(0u32, |a, &c| a.saturating_add(c))
    }

    /// The most recent writes, oldest first.
    pub fn recent_writes(&self) -> Vec<(u8, u8), WRITE_LOG_LEN> {
        self.log.iter().copied().collect()
    }

    /// Forget counters and the write log.
    pub fn clear_counters(&mut self) {
        self.reads = [0; SLOTS];
        self.writes = [0; SLOTS];
        self.log.clear();
    }

    /// Stored coefficient, register-window byte order.
    pub fn coefficient(&self, addr: u8) -> [u8; 3] {
        self.ram.get(usize::from(addr)).copied().unwrap_or([0; 3])
    }

    /// Preload a coefficient, register-window byte order.
    pub fn set_coefficient(&mut self, addr: u8, word: [u8; 3]) {
        if let Some(w) = self.ram.get_mut(usize::from(addr)) {
            *w = word;
        }
    }

    /// Coefficient RAM accesses made while the RAM was unpowered.
    pub fn violations(&self) -> u32 {
        self.violations
    }

    /// Software resets seen.
    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Whether DAC L and at least one PLL are currently powered.
    pub fn coeff_ram_powered(&self) -> bool {
        let dac = self.register(R_PWRM2) & RM_PWRM2_HPL != 0;
        dac && self.pll_enabled()
    }

    fn pll_enabled(&self) -> bool {
        self.register(R_PLLCTL1C) & (RM_PLLCTL1C_PDB_PLL1 | RM_PLLCTL1C_PDB_PLL2) != 0
    }

    // ── Behaviour knobs ────────────────────────────────────────────────────

    /// Report a different device ID.
    pub fn set_device_id(&mut self, id: u16) {
        self.device_id = id;
        self.load_id();
    }

    /// Fail every write to `reg`.
    pub fn fail_writes_to(&mut self, reg: u8) {
        self.fail_write = Some(reg);
    }

    /// Fail every read of `reg`.
    pub fn fail_reads_of(&mut self, reg: u8) {
        self.fail_read = Some(reg);
    }

    /// Remove injected faults.
    pub fn clear_faults(&mut self) {
        self.fail_write = None;
        self.fail_read = None;
    }

    /// Keep the PLL lock status at zero.
    pub fn set_pll_never_locks(&mut self, never: bool) {
        self.pll_never_locks = never;
    }

    /// Lock status reads that return zero after a PLL is enabled.
    pub fn set_pll_lock_reads(&mut self, reads: u16) {
        self.pll_lock_reads = reads;
    }

    /// Status reads that return busy after each committed coefficient.
    pub fn set_coeff_ram_busy_reads(&mut self, reads: u16) {
        self.busy_reads = reads;
    }

    /// Keep the coefficient RAM status busy.
    pub fn set_coeff_ram_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    // ── Register side effects ──────────────────────────────────────────────

    fn on_read(&mut self, reg: u8) -> u8 {
        match reg {
            R_PLLCTL0 => {
                if !self.pll_enabled() || self.pll_never_locks {
                    return 0;
                }
                if self.pll_lock_countdown > 0 {
                    self.pll_lock_countdown = self.pll_lock_countdown.saturating_sub(1);
                    return 0;
                }
                1
            }
            R_DACCRSTAT => {
                if self.stuck_busy {
                    return 1;
                }
                if self.busy_countdown > 0 {
                    self.busy_countdown = self.busy_countdown.saturating_sub(1);
                    return 1;
                }
                0
            }
            _ => self.register(reg),
        }
    }

    fn on_write(&mut self, reg: u8, value: u8) {
        match reg {
            R_RESET => {
                if value == RV_RESET_ENABLE {
                    self.regs = [0; SLOTS];
                    self.load_id();
                    self.resets = self.resets.saturating_add(1);
                }
            }
            R_PLLCTL1C => {
                let was = self.pll_enabled();
                self.poke(reg, value);
                if !was && self.pll_enabled() {
                    self.pll_lock_countdown = self.pll_lock_reads;
                }
            }
            R_DACCRADDR => {
                self.poke(reg, value);
                self.ram_addr = value;
                self.load_read_window();
            }
            R_DACCRWRH => {
                self.poke(reg, value);
                self.commit_word();
            }
            _ => self.poke(reg, value),
        }
    }

    fn load_read_window(&mut self) {
        let word = if self.coeff_ram_powered() {
            self.coefficient(self.ram_addr)
        } else {
            self.violations = self.violations.saturating_add(1);
            [0; 3]
        };
        let [l, m, h] = word;
        self.poke(R_DACCRRDL, l);
        self.poke(R_DACCRRDM, m);
        self.poke(R_DACCRRDH, h);
    }

    fn commit_word(&mut self) {
        if !self.coeff_ram_powered() {
            self.violations = self.violations.saturating_add(1);
            return;
        }
        let word = [
            self.register(R_DACCRWRL),
            self.register(R_DACCRWRM),
            self.register(R_DACCRWRH),
        ];
        self.set_coefficient(self.ram_addr, word);
        self.ram_addr = self.ram_addr.wrapping_add(1);
        self.busy_countdown = self.busy_reads;
    }

    fn check(reg: u8) -> Result<(), SimError> {
        if reg > MAX_REGISTER {
            return Err(SimError::InvalidRegister(reg));
        }
        Ok(())
    }
}

impl RegisterIo for SimulatedTscs42xx {
    type Error = SimError;

    fn read(&mut self, reg: u8) -> Result<u8, SimError> {
        Self::check(reg)?;
        if self.cache_only {
            return self
                .cache
                .get(usize::from(reg))
                .copied()
                .flatten()
                .ok_or(SimError::CacheOnly);
        }
        if self.fail_read == Some(reg) {
            Self::bump(&mut self.reads, reg);
            return Err(SimError::Fault(reg));
        }
        Self::bump(&mut self.reads, reg);
        Ok(self.on_read(reg))
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<(), SimError> {
        Self::check(reg)?;
        if self.cache_only {
            if !is_cacheable(reg) {
                return Err(SimError::CacheOnly);
            }
            if let (Some(c), Some(d)) = (
                self.cache.get_mut(usize::from(reg)),
                self.dirty.get_mut(usize::from(reg)),
            ) {
                *c = Some(value);
                *d = true;
            }
            return Ok(());
        }
        if self.fail_write == Some(reg) {
            return Err(SimError::Fault(reg));
        }
        Self::bump(&mut self.writes, reg);
        if self.log.is_full() {
            self.log.pop_front();
        }
        let _ = self.log.push_back((reg, value));
        self.on_write(reg, value);
        if is_cacheable(reg) {
            if let Some(c) = self.cache.get_mut(usize::from(reg)) {
                *c = Some(value);
            }
        }
        Ok(())
    }
}

impl RegisterCache for SimulatedTscs42xx {
    fn set_cache_only(&mut self, enable: bool) {
        self.cache_only = enable;
    }

    fn mark_dirty(&mut self) {
        for (d, c) in self.dirty.iter_mut().zip(self.cache.iter()) {
            *d = c.is_some();
        }
    }

    fn sync(&mut self) -> Result<(), SimError> {
        if self.cache_only {
            return Err(SimError::CacheOnly);
        }
        for reg in 0..=MAX_REGISTER {
            let i = usize::from(reg);
            let pending = self.dirty.get(i).copied().unwrap_or(false);
            if let (true, Some(Some(value))) = (pending, self.cache.get(i).copied()) {
                self.write(reg, value)?;
                if let Some(d) = self.dirty.get_mut(i) {
                    *d = false;
                }
            }
        }
        Ok(())
    }
}

/// Delay provider that only records elapsed time.
#[derive(Debug, Clone, Default)]
pub struct SimDelay {
    elapsed_ns: u64,
}

impl SimDelay {
    /// Zero elapsed time.
    pub const fn new() -> Self {
        Self { elapsed_ns: 0 }
    }

    /// Total requested delay in microseconds.
    pub fn total_us(&self) -> u64 {
        self.elapsed_ns / 1_000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns = self.elapsed_ns.saturating_add(u64::from(ns));
    }
}

/// MCLK2 oscillator stand-in.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    rate: Option<u32>,
    enabled: bool,
    fail_enable: bool,
    enables: u32,
    disables: u32,
}

impl SimClock {
    /// Stopped oscillator with no rate set.
    pub const fn new() -> Self {
        Self {
            rate: None,
            enabled: false,
            fail_enable: false,
            enables: 0,
            disables: 0,
        }
    }

    /// Programmed rate.
    pub fn rate(&self) -> Option<u32> {
        self.rate
    }

    /// Whether running.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Successful enable calls.
    pub fn enables(&self) -> u32 {
        self.enables
    }

    /// Disable calls.
    pub fn disables(&self) -> u32 {
        self.disables
    }

    /// Make `enable` fail.
    pub fn fail_enable(&mut self, fail: bool) {
        self.fail_enable = fail;
    }
}

impl ExternalClock for SimClock {
    fn set_rate(&mut self, hz: u32) -> Result<(), ClockError> {
        if hz == 0 {
            return Err(ClockError::RateNotSupported(hz));
        }
        self.rate = Some(hz);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), ClockError> {
        if self.fail_enable {
            return Err(ClockError::EnableFailed);
        }
        self.enabled = true;
        self.enables = self.enables.saturating_add(1);
        Ok(())
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.disables = self.disables.saturating_add(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registers::R_AIC1;

    #[test]
    fn reset_clears_registers_but_keeps_id() {
        let mut sim = SimulatedTscs42xx::new();
        sim.write(R_AIC1, 0x2C).unwrap();
        sim.write(R_RESET, RV_RESET_ENABLE).unwrap();
        assert_eq!(sim.register(R_AIC1), 0);
        assert_eq!(sim.read(R_DEVIDH).unwrap(), 0x4A);
        assert_eq!(sim.read(R_DEVIDL).unwrap(), 0x74);
        assert_eq!(sim.resets(), 1);
    }

    #[test]
    fn unpowered_coefficient_ram_counts_violations() {
        let mut sim = SimulatedTscs42xx::new();
        sim.write(R_DACCRADDR, 3).unwrap();
        sim.bulk_write(R_DACCRWRL, &[1, 2, 3]).unwrap();
        assert_eq!(sim.coefficient(3), [0; 3]);
        assert_eq!(sim.violations(), 2);
    }

    #[test]
    fn powered_write_commits_and_auto_increments() {
        let mut sim = SimulatedTscs42xx::new();
        sim.write(R_PWRM2, RM_PWRM2_HPL).unwrap();
        sim.write(R_PLLCTL1C, RM_PLLCTL1C_PDB_PLL1).unwrap();
        sim.write(R_DACCRADDR, 0x10).unwrap();
        sim.bulk_write(R_DACCRWRL, &[1, 2, 3]).unwrap();
        sim.bulk_write(R_DACCRWRL, &[4, 5, 6]).unwrap();
        assert_eq!(sim.coefficient(0x10), [1, 2, 3]);
        assert_eq!(sim.coefficient(0x11), [4, 5, 6]);
        sim.write(R_DACCRADDR, 0x11).unwrap();
        assert_eq!(sim.read(R_DACCRRDH).unwrap(), 6);
        assert_eq!(sim.violations(), 0);
    }

    #[test]
    fn lock_status_follows_enable_after_countdown() {
        let mut sim = SimulatedTscs42xx::new();
        sim.set_pll_lock_reads(2);
        assert_eq!(sim.read(R_PLLCTL0).unwrap(), 0);
        sim.write(R_PLLCTL1C, RM_PLLCTL1C_PDB_PLL2).unwrap();
        assert_eq!(sim.read(R_PLLCTL0).unwrap(), 0);
        assert_eq!(sim.read(R_PLLCTL0).unwrap(), 0);
        assert_ne!(sim.read(R_PLLCTL0).unwrap(), 0);
    }

    #[test]
    fn write_log_keeps_the_latest_entries() {
        let mut sim = SimulatedTscs42xx::new();
        for i in 0..70u8 {
            sim.write(R_AIC1, i).unwrap();
        }
        let log = sim.recent_writes();
        assert_eq!(log.len(), WRITE_LOG_LEN);
        assert_eq!(log.first(), Some(&(R_AIC1, 6)));
        assert_eq!(log.last(), Some(&(R_AIC1, 69)));
    }

    #[test]
    fn cache_only_defers_until_sync() {
        let mut sim = SimulatedTscs42xx::new();
        sim.set_cache_only(true);
        sim.write(R_AIC1, 0x20).unwrap();
        assert_eq!(sim.register(R_AIC1), 0);
        assert_eq!(sim.write(R_DACCRADDR, 0), Err(SimError::CacheOnly));
        sim.set_cache_only(false);
        sim.sync().unwrap();
        assert_eq!(sim.register(R_AIC1), 0x20);
    }
}
