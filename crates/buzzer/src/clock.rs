/// A free-running millisecond clock.
///
/// The counter starts at an arbitrary value and wraps around to zero after
/// [`u32::MAX`], the same way a microcontroller tick counter does. Durations
/// must therefore always be computed with [`elapsed_ms`] rather than with a
/// plain subtraction.
pub trait Clock {
    /// Returns the current value of the millisecond counter.
    fn now_ms(&self) -> u32;

    /// Returns the milliseconds elapsed since `since`, a value previously
    /// returned by [`Clock::now_ms`].
    #[inline]
    fn elapsed_since(&self, since: u32) -> u32 {
        elapsed_ms(since, self.now_ms())
    }
}

impl<K: Clock + ?Sized> Clock for &K {
    #[inline]
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Computes the time elapsed between `start` and `now` on a wrapping
/// millisecond counter.
///
/// When `now` is smaller than `start`, the counter overflowed in between and
/// the result is the distance from `start` to the end of the counter range
/// plus the distance from zero to `now`.
#[must_use]
#[inline]
pub const fn elapsed_ms(start: u32, now: u32) -> u32 {
    if now >= start {
        now - start
    } else {
        (u32::MAX - start) + now
    }
}
