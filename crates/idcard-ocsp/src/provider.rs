//! Process-wide cryptographic provider registration

use std::sync::Once;
use tracing::debug;

static INIT: Once = Once::new();

/// Install the `ring` rustls provider as the process default, once
///
/// Safe to call from any number of threads. If another provider has already
/// been installed by the embedding application it is left in place.
pub fn ensure_crypto_provider() {
    INIT.call_once(|| {
        match rustls::crypto::ring::default_provider().install_default() {
            Ok(()) => debug!("Installed ring crypto provider"),
            Err(_) => debug!("Crypto provider already installed, keeping it"),
        }
    });
}

/// `true` once [`ensure_crypto_provider`] has completed
pub fn is_initialized() -> bool {
    INIT.is_completed()
}
