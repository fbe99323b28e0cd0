//! Cookie Generator

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

/// Produces hex-encoded random auth cookies from an injectable source
pub struct CookieGenerator<R = OsRng> {
    rng: R,
}

impl CookieGenerator<OsRng> {
    /// Generator backed by the operating system's entropy source
    pub fn new() -> Self {
        Self { rng: OsRng }
    }
}

impl Default for CookieGenerator<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> CookieGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Generate `length` random bytes and return them as lowercase hex.
    ///
    /// Returns an empty string when the random source cannot fill the buffer;
    /// callers decide whether an empty cookie is acceptable.
    pub fn generate(&mut self, length: usize) -> String {
        let mut raw = vec![0u8; length];
        if let Err(e) = self.rng.try_fill_bytes(&mut raw) {
            warn!("Random source failed while generating cookie: {}", e);
            return String::new();
        }
        hex::encode(raw)
    }
}
