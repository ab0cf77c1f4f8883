//! Chronologically ordered push keys.
//!
//! A key is 20 characters: 8 encode the millisecond timestamp, 12 are
//! random. Keys generated within the same millisecond reuse the previous
//! random tail incremented by one, so successive keys always sort after
//! the ones before them.

use rand::Rng;

/// Alphabet in ascending ASCII order.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_LEN: usize = 8;
const RANDOM_LEN: usize = 12;

/// Monotonic push key generator.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_time: u64,
    last_random: [u8; RANDOM_LEN],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a key stamped with the current wall-clock time.
    pub fn generate(&mut self) -> String {
        // pre-epoch clocks clamp to zero
        let now_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        self.generate_at(now_ms)
    }

    /// Generate a key stamped with `now_ms`.
    ///
    /// A clock that moved backwards is treated as the same millisecond as
    /// the previous key.
    pub fn generate_at(&mut self, now_ms: u64) -> String {
        if now_ms <= self.last_time {
            self.increment();
        } else {
            self.last_time = now_ms;
            let mut rng = rand::thread_rng();
            for digit in self.last_random.iter_mut() {
                *digit = rng.gen_range(0..64);
            }
        }

        let mut id = String::with_capacity(TIME_LEN + RANDOM_LEN);
        let mut time = self.last_time;
        let mut stamp = [0u8; TIME_LEN];
        for slot in stamp.iter_mut().rev() {
            *slot = PUSH_CHARS[(time % 64) as usize];
            time /= 64;
        }
        id.extend(stamp.iter().map(|&c| c as char));
        id.extend(
            self.last_random
                .iter()
                .map(|&digit| PUSH_CHARS[digit as usize] as char),
        );
        id
    }

    fn increment(&mut self) {
        for digit in self.last_random.iter_mut().rev() {
            if *digit == 63 {
                *digit = 0;
            } else {
                *digit += 1;
                return;
            }
        }
    }
}
