//! Register I/O layer.
//!
//! [`RegisterIo`] is the boundary the codec logic is written against: 8-bit
//! address, 8-bit value, with masked read-modify-write and burst transfers.
//! [`I2cRegmap`] implements it over any `embedded_hal::i2c::I2c` bus and
//! keeps a write-through cache of non-volatile registers so runtime suspend
//! can record writes while the chip is unpowered and replay them on resume.

use embedded_hal::i2c::I2c;

use crate::registers::{is_cacheable, is_precious, is_volatile, MAX_REGISTER, REGISTER_COUNT};

/// Largest burst supported by [`I2cRegmap::bulk_write`] (register byte excluded).
pub const MAX_BURST: usize = 8;

/// Register read/write access to a TSCS42xx.
pub trait RegisterIo {
    /// Transport error.
    type Error: core::fmt::Debug;

    /// Read one register.
    fn read(&mut self, reg: u8) -> Result<u8, Self::Error>;

    /// Write one register.
    fn write(&mut self, reg: u8, value: u8) -> Result<(), Self::Error>;

    /// Masked read-modify-write.
    ///
    /// Only bits in `mask` are replaced by the corresponding bits of `value`.
    /// The write is skipped when the register already holds the result.
    /// Returns whether a write was issued.
    fn update_bits(&mut self, reg: u8, mask: u8, value: u8) -> Result<bool, Self::Error> {
        let old = self.read(reg)?;
        let new = (old & !mask) | (value & mask);
        if new == old {
            return Ok(false);
        }
        self.write(reg, new)?;
        Ok(true)
    }

    /// Read consecutive registers starting at `reg`.
    fn bulk_read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        let mut addr = reg;
        for b in buf.iter_mut() {
            *b = self.read(addr)?;
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }

    /// Write consecutive registers starting at `reg`.
    fn bulk_write(&mut self, reg: u8, data: &[u8]) -> Result<(), Self::Error> {
        let mut addr = reg;
        for &b in data {
            self.write(addr, b)?;
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for &mut T {
    type Error = T::Error;

    fn read(&mut self, reg: u8) -> Result<u8, Self::Error> {
        T::read(self, reg)
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        T::write(self, reg, value)
    }

    fn update_bits(&mut self, reg: u8, mask: u8, value: u8) -> Result<bool, Self::Error> {
        T::update_bits(self, reg, mask, value)
    }

    fn bulk_read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        T::bulk_read(self, reg, buf)
    }

    fn bulk_write(&mut self, reg: u8, data: &[u8]) -> Result<(), Self::Error> {
        T::bulk_write(self, reg, data)
    }
}

/// Register I/O that can stand in for an unpowered chip.
pub trait RegisterCache: RegisterIo {
    /// In cache-only mode writes to cacheable registers are recorded but not
    /// sent, and anything needing the bus is rejected.
    fn set_cache_only(&mut self, enable: bool);

    /// Flag every cached value as needing to be written on the next [`sync`](Self::sync).
    fn mark_dirty(&mut self);

    /// Write dirty cached registers back to the device.
    fn sync(&mut self) -> Result<(), Self::Error>;
}

impl<T: RegisterCache + ?Sized> RegisterCache for &mut T {
    fn set_cache_only(&mut self, enable: bool) {
        T::set_cache_only(self, enable);
    }

    fn mark_dirty(&mut self) {
        T::mark_dirty(self);
    }

    fn sync(&mut self) -> Result<(), Self::Error> {
        T::sync(self)
    }
}

/// [`I2cRegmap`] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegmapError<E> {
    /// I²C transaction failed.
    Bus(E),
    /// Register address above [`MAX_REGISTER`].
    InvalidRegister(u8),
    /// Bus access attempted while in cache-only mode.
    CacheOnly,
    /// Burst longer than [`MAX_BURST`] or running past [`MAX_REGISTER`].
    BurstTooLong,
}

impl<E: core::fmt::Debug> core::fmt::Display for RegmapError<E> {
    #[allow(clippy::use_debug)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "I2C transaction failed: {e:?}"),
            Self::InvalidRegister(r) => write!(f, "register {r:#04x} out of range"),
            Self::CacheOnly => write!(f, "bus access while in cache-only mode"),
            Self::BurstTooLong => write!(f, "burst transfer too long"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug> std::error::Error for RegmapError<E> {}

#[derive(Clone, Copy, Default)]
struct CacheSlot {
    value: Option<u8>,
    dirty: bool,
}

/// Cached register map over a blocking I²C bus.
pub struct I2cRegmap<I> {
    i2c: I,
    addr: u8,
    cache: [CacheSlot; REGISTER_COUNT],
    cache_only: bool,
}

impl<I: I2c> I2cRegmap<I> {
    /// Create a register map for the device at 7-bit address `addr`.
    pub fn new(i2c: I, addr: u8) -> Self {
        Self {
            i2c,
            addr,
            cache: [CacheSlot::default(); REGISTER_COUNT],
            cache_only: false,
        }
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.i2c
    }

    /// I²C address in use.
    pub fn address(&self) -> u8 {
        self.addr
    }

    /// Last known value of `reg`, if cached.
    pub fn cached(&self, reg: u8) -> Option<u8> {
        self.cache.get(usize::from(reg)).and_then(|s| s.value)
    }

    /// Drop every cached value.
    pub fn invalidate(&mut self) {
        self.cache = [CacheSlot::default(); REGISTER_COUNT];
    }

    fn check(reg: u8) -> Result<(), RegmapError<I::Error>> {
        if reg > MAX_REGISTER {
            return Err(RegmapError::InvalidRegister(reg));
        }
        Ok(())
    }

    fn store(&mut self, reg: u8, value: u8, dirty: bool) {
        if !is_cacheable(reg) {
            return;
        }
        if let Some(slot) = self.cache.get_mut(usize::from(reg)) {
            slot.value = Some(value);
            slot.dirty = dirty;
        }
    }

    /// Range `reg..reg + len` as an end address, rejecting bursts that run
    /// past the register map.
    fn burst_end(reg: u8, len: usize) -> Result<u8, RegmapError<I::Error>> {
        if len > MAX_BURST {
            return Err(RegmapError::BurstTooLong);
        }
        let len = u8::try_from(len).map_err(|_| RegmapError::BurstTooLong)?;
        let end = reg.checked_add(len).ok_or(RegmapError::BurstTooLong)?;
        if usize::from(end) > REGISTER_COUNT {
            return Err(RegmapError::BurstTooLong);
        }
        Ok(end)
    }
}

impl<I: I2c> RegisterIo for I2cRegmap<I> {
    type Error = RegmapError<I::Error>;

    fn read(&mut self, reg: u8) -> Result<u8, Self::Error> {
        Self::check(reg)?;
        if !is_volatile(reg) && !is_precious(reg) {
            if let Some(v) = self.cached(reg) {
                return Ok(v);
            }
        }
        if self.cache_only {
            return Err(RegmapError::CacheOnly);
        }
        let mut buf = [0u8];
        self.i2c
            .write_read(self.addr, &[reg], &mut buf)
            .map_err(RegmapError::Bus)?;
        let [value] = buf;
        self.store(reg, value, false);
        Ok(value)
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        Self::check(reg)?;
        if self.cache_only {
            if !is_cacheable(reg) {
                return Err(RegmapError::CacheOnly);
            }
            self.store(reg, value, true);
            return Ok(());
        }
        self.i2c
            .write(self.addr, &[reg, value])
            .map_err(RegmapError::Bus)?;
        self.store(reg, value, false);
        Ok(())
    }

    fn bulk_read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        Self::check(reg)?;
        Self::burst_end(reg, buf.len())?;
        if self.cache_only {
            return Err(RegmapError::CacheOnly);
        }
        // Always from the bus: the burst may span precious registers.
        self.i2c
            .write_read(self.addr, &[reg], buf)
            .map_err(RegmapError::Bus)?;
        let mut addr = reg;
        for &b in buf.iter() {
            self.store(addr, b, false);
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }

    fn bulk_write(&mut self, reg: u8, data: &[u8]) -> Result<(), Self::Error> {
        Self::check(reg)?;
        Self::burst_end(reg, data.len())?;
        if self.cache_only {
            return Err(RegmapError::CacheOnly);
        }
        let mut frame = [0u8; MAX_BURST + 1];
        let len = data.len().saturating_add(1);
        let (head, tail) = frame.split_at_mut(1);
        if let Some(first) = head.first_mut() {
            *first = reg;
        }
        if let Some(dst) = tail.get_mut(..data.len()) {
            dst.copy_from_slice(data);
        }
        let frame = frame.get(..len).ok_or(RegmapError::BurstTooLong)?;
        self.i2c.write(self.addr, frame).map_err(RegmapError::Bus)?;
        let mut addr = reg;
        for &b in data {
            self.store(addr, b, false);
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }
}

impl<I: I2c> RegisterCache for I2cRegmap<I> {
    fn set_cache_only(&mut self, enable: bool) {
        self.cache_only = enable;
    }

    fn mark_dirty(&mut self) {
        for slot in &mut self.cache {
            if slot.value.is_some() {
                slot.dirty = true;
            }
        }
    }

    fn sync(&mut self) -> Result<(), Self::Error> {
        if self.cache_only {
            return Err(RegmapError::CacheOnly);
        }
        for reg in 0..=MAX_REGISTER {
            let Some(slot) = self.cache.get(usize::from(reg)).copied() else {
                continue;
            };
            if let (Some(value), true) = (slot.value, slot.dirty) {
                self.i2c
                    .write(self.addr, &[reg, value])
                    .map_err(RegmapError::Bus)?;
                if let Some(s) = self.cache.get_mut(usize::from(reg)) {
                    s.dirty = false;
                }
            }
        }
        Ok(())
    }
}
