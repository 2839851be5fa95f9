// src/auth/mod.rs — Password hashing and opaque tokens
//
// Hashes are stored as `pbkdf2:sha256:<rounds>$<salt hex>$<hash hex>` so the
// round count can be raised later without invalidating existing accounts.

use anyhow::{anyhow, bail, Result};
use sha2::{Digest, Sha256};

pub const PASSWORD_ROUNDS: u32 = 50_000;
pub const MIN_PASSWORD_LEN: usize = 6;

const SALT_BYTES: usize = 16;
const TOKEN_BYTES: usize = 32;
const SCHEME: &str = "pbkdf2:sha256";

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = random_bytes(SALT_BYTES)?;
    Ok(hash_with(password, &salt, PASSWORD_ROUNDS))
}

fn hash_with(password: &str, salt: &[u8], rounds: u32) -> String {
    let derived = pbkdf2_sha256(password.as_bytes(), salt, rounds);
    format!(
        "{SCHEME}:{rounds}${}${}",
        hex::encode(salt),
        hex::encode(derived)
    )
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match parse_stored(stored) {
        Ok((rounds, salt, expected)) => {
            let derived = pbkdf2_sha256(password.as_bytes(), &salt, rounds);
            constant_time_eq(&derived, &expected)
        }
        Err(e) => {
            tracing::warn!("unreadable password hash: {e}");
            false
        }
    }
}

fn parse_stored(stored: &str) -> Result<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = stored.split('$');
    let (Some(method), Some(salt), Some(hash), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("expected method$salt$hash");
    };
    let rounds = method
        .strip_prefix(SCHEME)
        .and_then(|r| r.strip_prefix(':'))
        .ok_or_else(|| anyhow!("unsupported method '{method}'"))?
        .parse::<u32>()?;
    if rounds == 0 {
        bail!("zero rounds");
    }
    Ok((rounds, hex::decode(salt)?, hex::decode(hash)?))
}

/// PBKDF2-HMAC-SHA256 with a single 32-byte output block.
fn pbkdf2_sha256(password: &[u8], salt: &[u8], rounds: u32) -> [u8; 32] {
    const BLOCK: usize = 64;

    let key = if password.len() > BLOCK {
        Sha256::digest(password).to_vec()
    } else {
        password.to_vec()
    };
    let mut ipad = [0x36u8; BLOCK];
    let mut opad = [0x5cu8; BLOCK];
    for (i, &b) in key.iter().enumerate() {
        ipad[i] ^= b;
        opad[i] ^= b;
    }

    // Keyed states are reused for every round.
    let mut inner = Sha256::new();
    inner.update(ipad);
    let mut outer = Sha256::new();
    outer.update(opad);
    let prf = |data: &[u8]| -> [u8; 32] {
        let mut i = inner.clone();
        i.update(data);
        let mut o = outer.clone();
        o.update(i.finalize());
        o.finalize().into()
    };

    let mut first = salt.to_vec();
    first.extend_from_slice(&1u32.to_be_bytes());
    let mut u = prf(&first);
    let mut out = u;
    for _ in 1..rounds {
        u = prf(&u);
        for (o, x) in out.iter_mut().zip(u.iter()) {
            *o ^= x;
        }
    }
    out
}

/// Random hex token for login session cookies and anti-forgery tokens.
pub fn random_token() -> Result<String> {
    Ok(hex::encode(random_bytes(TOKEN_BYTES)?))
}

fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    getrandom::getrandom(&mut buf).map_err(|e| anyhow!("OS CSPRNG unavailable: {e}"))?;
    Ok(buf)
}

/// Constant-time byte comparison to prevent timing attacks on token checks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
