//! Session tokens and password hashing for the in-process backend.

use anyhow::{bail, Result};

use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

const AUTH_TOKEN_LENGTH: usize = 64;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct AuthTokenValue(pub String);

impl AuthTokenValue {
    pub fn generate() -> AuthTokenValue {
        let rng = rand::rng();
        let random_string: String = rng
            .sample_iter(&Alphanumeric)
            .take(AUTH_TOKEN_LENGTH)
            .map(char::from)
            .collect();
        AuthTokenValue(random_string)
    }
}

mod timeslot_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Algorithm, Argon2, Params, Version,
    };

    fn argon2(fast: bool) -> Result<Argon2<'static>> {
        if !fast {
            return Ok(Argon2::default());
        }
        let params = Params::new(8, 1, 1, None).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash<T: AsRef<str>>(plain: &[u8], b64_salt: T, fast: bool) -> Result<String> {
        let salt = SaltString::from_b64(b64_salt.as_ref()).map_err(|err| anyhow!("{}", err))?;
        let hash_string = argon2(fast)?
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    /// Parameters are read back from the PHC string, so the configured
    /// instance only matters for hashing.
    pub fn verify<T: AsRef<str>>(plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default()
            .verify_password(plain_pw, &password_hash)
            .is_ok())
    }
}

/// Password hashing scheme. `Argon2Fast` uses minimal cost parameters and is
/// only meant for throwaway local data.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum PasswordHasher {
    Argon2,
    Argon2Fast,
}

impl FromStr for PasswordHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(PasswordHasher::Argon2),
            "argon2-fast" => Ok(PasswordHasher::Argon2Fast),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl fmt::Display for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordHasher::Argon2 => write!(f, "argon2"),
            PasswordHasher::Argon2Fast => write!(f, "argon2-fast"),
        }
    }
}

impl PasswordHasher {
    pub fn generate_b64_salt(&self) -> String {
        timeslot_argon2::generate_b64_salt()
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        timeslot_argon2::hash(plain, b64_salt, *self == PasswordHasher::Argon2Fast)
    }

    pub fn verify<T: AsRef<str>>(&self, plain_pw: T, target_hash: T) -> Result<bool> {
        timeslot_argon2::verify(plain_pw.as_ref().as_bytes(), target_hash)
    }
}

#[derive(Clone, Debug)]
pub struct PasswordCredentials {
    pub user_id: String,
    pub email: String,
    pub hash: String,
    pub hasher: PasswordHasher,
}

impl PasswordCredentials {
    pub fn new(user_id: String, email: String, password: &str, hasher: PasswordHasher) -> Result<Self> {
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(PasswordCredentials {
            user_id,
            email,
            hash,
            hasher,
        })
    }

    pub fn verify(&self, password: &str) -> Result<bool> {
        self.hasher.verify(password, &self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon2_hash() {
        let pw = "123mypw";
        let b64_salt = PasswordHasher::Argon2.generate_b64_salt();

        let hash1 = PasswordHasher::Argon2.hash(pw.as_bytes(), &b64_salt).unwrap();
        let hash2 = PasswordHasher::Argon2.hash(b"123mypw", &b64_salt).unwrap();
        assert_eq!(hash1, hash2);

        assert!(PasswordHasher::Argon2.verify("123mypw", &hash1).unwrap());
        assert!(!PasswordHasher::Argon2.verify("not the pw", &hash1).unwrap());
    }

    #[test]
    fn fast_hash_verifies_with_its_own_params() {
        let credentials = PasswordCredentials::new(
            "u1".to_string(),
            "a@b.c".to_string(),
            "secret1",
            PasswordHasher::Argon2Fast,
        )
        .unwrap();

        assert!(credentials.hash.starts_with("$argon2id$"));
        assert!(credentials.verify("secret1").unwrap());
        assert!(!credentials.verify("secret2").unwrap());
    }

    #[test]
    fn hasher_names() {
        for hasher in [PasswordHasher::Argon2, PasswordHasher::Argon2Fast] {
            assert_eq!(hasher.to_string().parse::<PasswordHasher>().unwrap(), hasher);
        }
        assert!("bcrypt".parse::<PasswordHasher>().is_err());
    }

    #[test]
    fn generated_tokens_are_alphanumeric() {
        let a = AuthTokenValue::generate();
        let b = AuthTokenValue::generate();
        assert_eq!(a.0.len(), AUTH_TOKEN_LENGTH);
        assert!(a.0.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
