use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

use super::service::IdentityError;

/// Argon2id hashing with a fresh random salt per credential.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    #[cfg(test)]
    verifications: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl CredentialHasher {
    fn from_argon2(argon2: Argon2<'static>) -> Self {
        Self {
            argon2,
            #[cfg(test)]
            verifications: Default::default(),
        }
    }

    pub fn with_params(params: Params) -> Self {
        Self::from_argon2(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Argon2id with explicit memory (KiB) and iteration costs on a single lane.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, IdentityError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|err| IdentityError::Credential(err.to_string()))?;
        Ok(Self::with_params(params))
    }

    pub fn hash(&self, raw_password: &str) -> Result<String, IdentityError> {
        let salt = SaltString::generate(&mut rand_core::OsRng);
        let hash = self
            .argon2
            .hash_password(raw_password.as_bytes(), &salt)
            .map_err(|err| IdentityError::Credential(err.to_string()))?;
        Ok(hash.to_string())
    }

    /// Any parse or verification failure counts as a mismatch.
    pub fn verify(&self, raw_password: &str, stored_hash: &str) -> bool {
        #[cfg(test)]
        self.verifications
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        self.argon2
            .verify_password(raw_password.as_bytes(), &parsed)
            .is_ok()
    }

    #[cfg(test)]
    pub(crate) fn verifications(&self) -> usize {
        self.verifications
            .load(std::sync::atomic::Ordering::Relaxed)
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::from_argon2(Argon2::default())
    }
}
