//! DAC coefficient RAM (DACCRAM) transfer protocol.
//!
//! The DSP's filter coefficients live in a 206-entry RAM of 24-bit words
//! reached through a small register window:
//!
//! 1. wait until `DACCRSTAT` reads zero,
//! 2. write the coefficient index to `DACCRADDR`,
//! 3. burst 3 bytes to `DACCRWRL..H` (write) or from `DACCRRDL..H` (read).
//!
//! Writing the high byte commits the word. Data in the register window is
//! little-endian; firmware images store each word big-endian.
//!
//! The RAM only responds while the DAC and a PLL are running. Bracketing a
//! transfer with power-up and power-down is the caller's job
//! (see [`Tscs42xx::enable_coeff_ram_access`](crate::Tscs42xx::enable_coeff_ram_access)).

use embedded_hal::delay::DelayNs;

use crate::error::Error;
use crate::poll::{poll_until, PollOutcome, RetryPolicy};
use crate::registers::{R_DACCRADDR, R_DACCRRDL, R_DACCRSTAT, R_DACCRWRL};
use crate::regmap::RegisterIo;

/// Bytes per coefficient.
pub const COEFF_SIZE: usize = 3;
/// Last valid coefficient index.
pub const COEFF_RAM_MAX_ADDR: u8 = 0xCD;
/// Number of coefficients.
pub const COEFF_RAM_COEFF_COUNT: usize = COEFF_RAM_MAX_ADDR as usize + 1;
/// Size of a full dump in bytes.
pub const COEFF_RAM_SIZE: usize = COEFF_RAM_COEFF_COUNT * COEFF_SIZE;

/// One 24-bit signed coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Coefficient(i32);

impl Coefficient {
    /// Largest representable value.
    pub const MAX: i32 = 0x7F_FFFF;
    /// Smallest representable value.
    pub const MIN: i32 = -0x80_0000;

    /// Coefficient from a signed value; `None` if it does not fit 24 bits.
    pub const fn new(value: i32) -> Option<Self> {
        if value < Self::MIN || value > Self::MAX {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Coefficient from its raw 24-bit pattern; higher bits are ignored.
    pub const fn from_raw(raw: u32) -> Self {
        let [l, m, h, _] = raw.to_le_bytes();
        Self::from_le_bytes([l, m, h])
    }

    /// Signed value.
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Raw 24-bit pattern.
    #[allow(clippy::cast_sign_loss)]
    pub const fn raw(self) -> u32 {
        (self.0 as u32) & 0x00FF_FFFF
    }

    /// Decode register-window order (low, mid, high).
    pub const fn from_le_bytes(b: [u8; 3]) -> Self {
        let [l, m, h] = b;
        let sign = if h & 0x80 != 0 { 0xFF } else { 0x00 };
        Self(i32::from_le_bytes([l, m, h, sign]))
    }

    /// Encode in register-window order (low, mid, high).
    pub const fn to_le_bytes(self) -> [u8; 3] {
        let [l, m, h, _] = self.0.to_le_bytes();
        [l, m, h]
    }

    /// Decode firmware-image order (high, mid, low).
    pub const fn from_be_bytes(b: [u8; 3]) -> Self {
        let [h, m, l] = b;
        Self::from_le_bytes([l, m, h])
    }
}

/// Validate a coefficient range `address .. address + count`.
///
/// `count` is in coefficients. The last address may not pass
/// [`COEFF_RAM_MAX_ADDR`].
pub fn check_range<E>(address: u8, count: usize) -> Result<(), Error<E>> {
    let end = usize::from(address).checked_add(count);
    match end {
        Some(end) if end <= COEFF_RAM_COEFF_COUNT => Ok(()),
        _ => Err(Error::AddressOutOfRange { address, count }),
    }
}

/// Number of whole coefficients in `len` bytes, rejecting partial words.
pub fn coefficient_count<E>(len: usize) -> Result<usize, Error<E>> {
    if len % COEFF_SIZE != 0 {
        return Err(Error::InvalidSize {
            expected: len.saturating_sub(len % COEFF_SIZE).saturating_add(COEFF_SIZE),
            actual: len,
        });
    }
    Ok(len / COEFF_SIZE)
}

/// Wait for the coefficient RAM to finish the previous word.
pub fn wait_ready<R, D>(regs: &mut R, delay: &mut D, policy: RetryPolicy) -> Result<(), Error<R::Error>>
where
    R: RegisterIo + ?Sized,
    D: DelayNs + ?Sized,
{
    match poll_until(regs, delay, R_DACCRSTAT, policy, |v| v == 0).map_err(Error::Bus)? {
        PollOutcome::Ready(_) => Ok(()),
        PollOutcome::Exhausted => {
            error!("tscs42xx: coefficient RAM busy");
            Err(Error::CoeffRamBusy)
        }
    }
}

/// Write words in register-window order to consecutive addresses.
///
/// The range must already have been validated.
pub fn write_words<R, D, I>(
    regs: &mut R,
    delay: &mut D,
    policy: RetryPolicy,
    address: u8,
    words: I,
) -> Result<(), Error<R::Error>>
where
    R: RegisterIo + ?Sized,
    D: DelayNs + ?Sized,
    I: IntoIterator<Item = [u8; 3]>,
{
    let mut addr = address;
    for word in words {
        wait_ready(regs, delay, policy)?;
        regs.write(R_DACCRADDR, addr).map_err(Error::Bus)?;
        regs.bulk_write(R_DACCRWRL, &word).map_err(Error::Bus)?;
        addr = addr.wrapping_add(1);
    }
    Ok(())
}

/// Write `data` (little-endian words) starting at coefficient `address`.
pub fn write_coefficients<R, D>(
    regs: &mut R,
    delay: &mut D,
    policy: RetryPolicy,
    address: u8,
    data: &[u8],
) -> Result<(), Error<R::Error>>
where
    R: RegisterIo + ?Sized,
    D: DelayNs + ?Sized,
{
    let count = coefficient_count(data.len())?;
    check_range(address, count)?;
    write_words(
        regs,
        delay,
        policy,
        address,
        data.chunks_exact(COEFF_SIZE).map(|c| match *c {
            [l, m, h] => [l, m, h],
            _ => [0; 3],
        }),
    )
}

/// Fill `buf` (little-endian words) from coefficient `address` onward.
pub fn read_coefficients<R, D>(
    regs: &mut R,
    delay: &mut D,
    policy: RetryPolicy,
    address: u8,
    buf: &mut [u8],
) -> Result<(), Error<R::Error>>
where
    R: RegisterIo + ?Sized,
    D: DelayNs + ?Sized,
{
    let count = coefficient_count(buf.len())?;
    check_range(address, count)?;
    let mut addr = address;
    for word in buf.chunks_exact_mut(COEFF_SIZE) {
        wait_ready(regs, delay, policy)?;
        regs.write(R_DACCRADDR, addr).map_err(Error::Bus)?;
        regs.bulk_read(R_DACCRRDL, word).map_err(Error::Bus)?;
        addr = addr.wrapping_add(1);
    }
    Ok(())
}

/// Coefficient firmware image: big-endian 3-byte words loaded from
/// address 0 upward.
#[derive(Debug, Clone, Copy)]
pub struct CoefficientImage<'a> {
    data: &'a [u8],
}

impl<'a> CoefficientImage<'a> {
    /// Validate an image.
    pub fn parse<E>(data: &'a [u8]) -> Result<Self, Error<E>> {
        if data.len() % COEFF_SIZE != 0 {
            return Err(Error::MalformedImage);
        }
        check_range(0, data.len() / COEFF_SIZE)?;
        Ok(Self { data })
    }

    /// Number of coefficients.
    pub fn len(&self) -> usize {
        self.data.len() / COEFF_SIZE
    }

    /// Whether the image is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Words in register-window order.
    pub fn words(&self) -> impl Iterator<Item = [u8; 3]> + 'a {
        self.data.chunks_exact(COEFF_SIZE).map(|c| match *c {
            [h, m, l] => [l, m, h],
            _ => [0; 3],
        })
    }
}

/// Control register firmware image: `(register, value)` byte pairs.
#[derive(Debug, Clone, Copy)]
pub struct ControlImage<'a> {
    data: &'a [u8],
}

impl<'a> ControlImage<'a> {
    /// Validate an image.
    pub fn parse<E>(data: &'a [u8]) -> Result<Self, Error<E>> {
        if data.len() % 2 != 0 {
            return Err(Error::MalformedImage);
        }
        Ok(Self { data })
    }

    /// Number of register writes.
    pub fn len(&self) -> usize {
        self.data.len() / 2
    }

    /// Whether the image is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `(register, value)` pairs in file order.
    pub fn entries(&self) -> impl Iterator<Item = (u8, u8)> + 'a {
        self.data.chunks_exact(2).map(|c| match *c {
            [reg, value] => (reg, value),
            _ => (0, 0),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sim::{SimDelay, SimulatedTscs42xx};

    type E = Error<()>;

    #[test]
    fn sizes() {
        assert_eq!(COEFF_RAM_COEFF_COUNT, 206);
        assert_eq!(COEFF_RAM_SIZE, 618);
    }

    #[test]
    fn coefficient_sign_extends() {
        assert_eq!(Coefficient::from_le_bytes([0xFF, 0xFF, 0xFF]).value(), -1);
        assert_eq!(Coefficient::from_le_bytes([0x00, 0x00, 0x80]).value(), Coefficient::MIN);
        assert_eq!(Coefficient::from_be_bytes([0x12, 0x34, 0x56]).raw(), 0x12_3456);
        assert_eq!(Coefficient::new(-1).unwrap().to_le_bytes(), [0xFF, 0xFF, 0xFF]);
        assert_eq!(Coefficient::new(0x80_0000), None);
        assert_eq!(Coefficient::from_raw(0xFF80_0001).value(), -0x7F_FFFF);
    }

    #[test]
    fn range_check_allows_last_address_only() {
        assert!(check_range::<()>(COEFF_RAM_MAX_ADDR, 1).is_ok());
        assert!(check_range::<()>(0, COEFF_RAM_COEFF_COUNT).is_ok());
        assert_eq!(
            check_range::<()>(0xC0, 20),
            Err(E::AddressOutOfRange { address: 0xC0, count: 20 })
        );
        assert!(check_range::<()>(COEFF_RAM_MAX_ADDR, 2).is_err());
    }

    #[test]
    fn partial_words_are_rejected() {
        assert_eq!(
            coefficient_count::<()>(20),
            Err(E::InvalidSize { expected: 21, actual: 20 })
        );
        assert_eq!(coefficient_count::<()>(18), Ok(6));
    }

    #[test]
    fn image_words_are_byte_swapped() {
        let img = CoefficientImage::parse::<()>(&[0x12, 0x34, 0x56, 0xAB, 0xCD, 0xEF]).unwrap();
        let words: std::vec::Vec<_> = img.words().collect();
        assert_eq!(words, [[0x56, 0x34, 0x12], [0xEF, 0xCD, 0xAB]]);
        assert!(CoefficientImage::parse::<()>(&[0; 4]).is_err());
        assert!(CoefficientImage::parse::<()>(&[0; COEFF_RAM_SIZE + 3]).is_err());
    }

    #[test]
    fn control_image_pairs() {
        let img = ControlImage::parse::<()>(&[0x25, 0x02, 0x39, 0x10]).unwrap();
        let e: std::vec::Vec<_> = img.entries().collect();
        assert_eq!(e, [(0x25, 0x02), (0x39, 0x10)]);
        assert_eq!(ControlImage::parse::<()>(&[1, 2, 3]).unwrap_err(), E::MalformedImage);
    }

    #[test]
    fn stuck_busy_flag_times_out() {
        let mut chip = SimulatedTscs42xx::new();
        chip.set_coeff_ram_stuck_busy(true);
        let mut delay = SimDelay::new();
        let err = write_coefficients(
            &mut chip,
            &mut delay,
            RetryPolicy::COEFF_RAM_READY,
            0,
            &[1, 2, 3],
        )
        .unwrap_err();
        assert_eq!(err, Error::CoeffRamBusy);
        assert_eq!(chip.write_count(R_DACCRADDR), 0);
    }
}
