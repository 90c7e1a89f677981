// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One-time password generation and hashing for the provisioned user

use crate::constants::password::{LENGTH, MIN_DIGITS, MIN_SYMBOLS};
use crate::error::{BindError, Result};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"~!@#$%^&*()_+`-={}|[]\\:\"<>?,./";

/// A plaintext password, wiped from memory when dropped
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// A freshly generated password together with its bcrypt hash
#[derive(Debug)]
pub struct Credential {
    pub plaintext: Secret,
    pub hash: String,
}

/// Generate a random password and hash it with bcrypt at `cost`.
///
/// Hashing is CPU bound and runs on the blocking thread pool.
pub async fn generate_credential(cost: u32) -> Result<Credential> {
    let plaintext = generate_password()?;

    let to_hash = plaintext.clone();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(to_hash.expose(), cost))
        .await
        .map_err(|e| BindError::CredentialError(format!("hashing task failed: {}", e)))?
        .map_err(|e| BindError::CredentialError(format!("problem hashing password: {}", e)))?;

    debug!("Generated a {}-character password", plaintext.expose().len());
    Ok(Credential { plaintext, hash })
}

/// Build a password of [`LENGTH`] characters with at least [`MIN_DIGITS`] digits
/// and [`MIN_SYMBOLS`] symbols, the rest letters. Characters may repeat.
pub fn generate_password() -> Result<Secret> {
    let mut rng = OsRng;
    let letters = LENGTH
        .checked_sub(MIN_DIGITS + MIN_SYMBOLS)
        .ok_or_else(|| {
            BindError::CredentialError("password too short for required digits and symbols".into())
        })?;

    let mut chars: Vec<u8> = Vec::with_capacity(LENGTH);
    chars.extend((0..MIN_DIGITS).map(|_| pick(&mut rng, DIGITS)));
    chars.extend((0..MIN_SYMBOLS).map(|_| pick(&mut rng, SYMBOLS)));
    chars.extend((0..letters).map(|_| {
        if rng.gen_bool(0.5) {
            pick(&mut rng, LOWER)
        } else {
            pick(&mut rng, UPPER)
        }
    }));
    chars.shuffle(&mut rng);

    let password = String::from_utf8(chars)
        .map_err(|e| BindError::CredentialError(format!("problem generating password: {}", e)))?;
    Ok(Secret(password))
}

fn pick<R: Rng>(rng: &mut R, set: &[u8]) -> u8 {
    set[rng.gen_range(0..set.len())]
}
