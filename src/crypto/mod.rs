use rand::{CryptoRng, Rng};
use sha2::{Digest, Sha256};

pub const OTP_MIN: u32 = 100_000;
pub const OTP_MAX: u32 = 999_999;

/// One-way, deterministic transform of a secret into its stored digest
pub trait SecretHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> String;
}

/// Hex-encoded SHA-256 digest
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl SecretHasher for Sha256Hasher {
    fn hash(&self, plaintext: &str) -> String {
        hex::encode(Sha256::digest(plaintext.as_bytes()))
    }
}

/// Draw a six digit code uniformly from 100000..=999999.
pub fn generate_otp<R: Rng + CryptoRng>(rng: &mut R) -> String {
    rng.random_range(OTP_MIN..=OTP_MAX).to_string()
}
