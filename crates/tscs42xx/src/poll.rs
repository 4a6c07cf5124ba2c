//! Bounded register polling.

use embedded_hal::delay::DelayNs;

use crate::regmap::RegisterIo;

/// How often and how long to poll a status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    /// Number of reads before giving up. `0` behaves like `1`.
    pub max_attempts: u16,
    /// Delay between unsuccessful reads, in microseconds.
    pub interval_us: u32,
}

impl RetryPolicy {
    /// PLL lock wait: ten reads, 1 ms apart.
    pub const PLL_LOCK: Self = Self {
        max_attempts: 10,
        interval_us: 1_000,
    };

    /// Coefficient RAM ready wait: ten back-to-back reads.
    ///
    /// The chip clears the busy flag within one I²C transaction time, so no
    /// delay is inserted between reads.
    pub const COEFF_RAM_READY: Self = Self {
        max_attempts: 10,
        interval_us: 0,
    };
}

/// Outcome of a bounded poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollOutcome {
    /// The condition held after this many reads.
    Ready(u16),
    /// Retry budget exhausted.
    Exhausted,
}

/// Read `reg` until `done(value)` holds or the policy runs out.
///
/// Register I/O errors abort the poll immediately.
pub fn poll_until<R, D>(
    regs: &mut R,
    delay: &mut D,
    reg: u8,
    policy: RetryPolicy,
    mut done: impl FnMut(u8) -> bool,
) -> Result<PollOutcome, R::Error>
where
    R: RegisterIo + ?Sized,
    D: DelayNs + ?Sized,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        if done(regs.read(reg)?) {
            return Ok(PollOutcome::Ready(attempt));
        }
        if attempt < attempts && policy.interval_us > 0 {
            delay.delay_us(policy.interval_us);
        }
    }
    Ok(PollOutcome::Exhausted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sim::{SimDelay, SimulatedTscs42xx};
    use crate::registers::{R_DACCRSTAT, R_PLLCTL0};

    #[test]
    fn ready_on_first_read_does_not_wait() {
        let mut chip = SimulatedTscs42xx::new();
        let mut delay = SimDelay::new();
        let out = poll_until(&mut chip, &mut delay, R_DACCRSTAT, RetryPolicy::PLL_LOCK, |v| v == 0)
            .unwrap();
        assert_eq!(out, PollOutcome::Ready(1));
        assert_eq!(delay.total_us(), 0);
    }

    #[test]
    fn exhausted_after_max_attempts_with_interval_between_reads() {
        let mut chip = SimulatedTscs42xx::new();
        chip.set_pll_never_locks(true);
        let mut delay = SimDelay::new();
        let out =
            poll_until(&mut chip, &mut delay, R_PLLCTL0, RetryPolicy::PLL_LOCK, |v| v != 0).unwrap();
        assert_eq!(out, PollOutcome::Exhausted);
        assert_eq!(chip.read_count(R_PLLCTL0), 10);
        assert_eq!(delay.total_us(), 9_000);
    }

    #[test]
    fn read_error_aborts_poll() {
        let mut chip = SimulatedTscs42xx::new();
        chip.fail_reads_of(R_DACCRSTAT);
        let mut delay = SimDelay::new();
        assert!(poll_until(
            &mut chip,
            &mut delay,
            R_DACCRSTAT,
            RetryPolicy::COEFF_RAM_READY,
            |v| v == 0
        )
        .is_err());
        assert_eq!(chip.read_count(R_DACCRSTAT), 1);
    }
}
