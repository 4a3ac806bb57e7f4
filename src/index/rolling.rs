//! Rabin-Karp rolling hash over token hash streams.
//!
//! Computes the polynomial hash
//!
//! ```text
//! H = (t[0] * BASE^(k-1) + t[1] * BASE^(k-2) + ... + t[k-1]) mod MOD
//! ```
//!
//! over a sliding window of `k` token hashes, rolling in O(1) per position:
//!
//! ```text
//! H' = ((H - t[0] * BASE^(k-1)) * BASE + t[k]) mod MOD
//! ```
//!
//! Constants: `BASE = 31`, `MOD = 1_000_000_009` (a prime). The window
//! contents live in a ring buffer indexed modulo `k` rather than a deque;
//! only the outgoing element is ever needed.

/// Polynomial base.
pub const BASE: u64 = 31;

/// Hash modulus, a 30-bit prime.
pub const MOD: u64 = 1_000_000_009;

/// Rolling hash over a fixed-size window of token hashes.
#[derive(Debug, Clone)]
pub struct RollingHash {
    window_size: usize,
    hash: u64,
    /// BASE^(window_size-1) mod MOD, for removing the outgoing element.
    base_power: u64,
    /// Ring buffer of the current window contents.
    ring: Vec<u64>,
    /// Total elements pushed; `pushed % window_size` is the ring slot.
    pushed: usize,
}

impl RollingHash {
    /// Create a rolling hash with the given window size.
    ///
    /// `window_size` of 1 is legal: every element is its own window.
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        let mut base_power = 1u64;
        for _ in 1..window_size {
            base_power = (base_power * BASE) % MOD;
        }
        Self {
            window_size,
            hash: 0,
            base_power,
            ring: vec![0; window_size],
            pushed: 0,
        }
    }

    /// Reset to the initial state, as when starting a new file.
    pub fn reset(&mut self) {
        self.hash = 0;
        self.pushed = 0;
    }

    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of elements currently in the window.
    #[must_use]
    pub fn current_size(&self) -> usize {
        self.pushed.min(self.window_size)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.pushed >= self.window_size
    }

    /// Push a token hash into the window.
    ///
    /// Returns the window hash once the window is full, `None` before that.
    pub fn push(&mut self, token_hash: u64) -> Option<u64> {
        let slot = self.pushed % self.window_size;

        if self.pushed >= self.window_size {
            // Remove the outgoing element's contribution, guarding the
            // subtraction against underflow.
            let outgoing = (self.ring[slot] % MOD * self.base_power) % MOD;
            self.hash = if self.hash >= outgoing {
                self.hash - outgoing
            } else {
                MOD - (outgoing - self.hash)
            };
        }

        self.hash = (self.hash * BASE + token_hash % MOD) % MOD;
        self.ring[slot] = token_hash;
        self.pushed += 1;

        if self.pushed >= self.window_size {
            Some(self.hash)
        } else {
            None
        }
    }

    /// Non-rolling hash of a whole sequence. The empty sequence hashes to 0.
    #[must_use]
    pub fn compute_hash(token_hashes: &[u64]) -> u64 {
        let mut hash = 0u64;
        for &h in token_hashes {
            hash = (hash * BASE + h % MOD) % MOD;
        }
        hash
    }

    /// BASE^exp mod MOD by binary exponentiation.
    #[must_use]
    pub fn power_mod(mut exp: u64) -> u64 {
        let mut result = 1u64;
        let mut base = BASE;
        while exp > 0 {
            if exp % 2 == 1 {
                result = (result * base) % MOD;
            }
            base = (base * base) % MOD;
            exp /= 2;
        }
        result
    }
}

/// All window hashes of a sequence as `(start_position, hash)` pairs.
///
/// Equivalent to feeding the sequence through [`RollingHash::push`];
/// sequences shorter than the window produce nothing.
#[must_use]
pub fn compute_all(token_hashes: &[u64], window_size: usize) -> Vec<(usize, u64)> {
    if token_hashes.len() < window_size || window_size == 0 {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(token_hashes.len() - window_size + 1);
    let mut hasher = RollingHash::new(window_size);

    for (i, &h) in token_hashes.iter().enumerate() {
        if let Some(hash) = hasher.push(h) {
            result.push((i + 1 - window_size, hash));
        }
    }

    result
}
