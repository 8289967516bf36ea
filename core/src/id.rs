//! Sequential id generation.
//!
//! A sequential id is `seconds * 10^9 + nanoseconds` of the current clock
//! reading, written in base 36. Ids read at least one clock tick apart are
//! distinct, and ids of equal length sort in time order. Nothing guards
//! against two ids taken within the same tick; callers issuing many requests
//! per tick must supply their own `IdGenerator`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Produces sequential ids for new gift-card requests.
///
/// Swapping the generator makes request bodies and signatures reproducible in
/// tests.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Default generator backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockIdGenerator;

impl IdGenerator for ClockIdGenerator {
    fn next_id(&self) -> String {
        id_at(SystemTime::now())
    }
}

/// Sequential id for a given instant. Instants before the epoch map to `"0"`.
pub fn id_at(time: SystemTime) -> String {
    let elapsed = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    let nanos = u128::from(elapsed.as_secs()) * 1_000_000_000 + u128::from(elapsed.subsec_nanos());
    to_base36(nanos)
}

/// Lowercase base-36 rendering of `value`.
pub fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    // DIGITS is ASCII
    digits.into_iter().map(char::from).collect()
}
