//! Credentials management infrastructure
//!
//! Generation of the cookie-encryption secret.

use rand::distr::Alphanumeric;
use rand::Rng;

use super::config::SECRET_LEN;

/// Fresh random secret of exactly [`SECRET_LEN`] bytes.
///
/// Every byte is an independent alphanumeric draw from the thread-local
/// CSPRNG, which is seeded from the OS.
pub fn generate_secret() -> String {
    let secret: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect();
    debug_assert_eq!(secret.len(), SECRET_LEN);
    secret
}
