//! Client-side encryption seam
//!
//! The cipher algorithm itself is external; the engine only needs the two
//! wrapping operations. When a cipher is configured, writes pass through
//! `encrypt` before transmission and reads pass through `decrypt` as bytes
//! arrive. The logical byte sequence seen by callers is unchanged.

use shoal_core::BoxAsyncRead;

/// Transparent stream cipher adapter
///
/// Implementations must preserve the plaintext byte sequence across an
/// encrypt/decrypt round trip but are free to change the ciphertext length,
/// so encrypted uploads are always sent with chunked transfer.
pub trait ContentCipher: Send + Sync {
    /// Wrap an outbound plaintext stream so it yields ciphertext
    fn encrypt(&self, plaintext: BoxAsyncRead) -> BoxAsyncRead;

    /// Wrap an inbound ciphertext stream so it yields plaintext
    fn decrypt(&self, ciphertext: BoxAsyncRead) -> BoxAsyncRead;
}
