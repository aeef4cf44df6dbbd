//! Password obfuscation keystreams
//!
//! RADIUS hides a handful of attribute values behind MD5-chained XOR
//! keystreams keyed by the shared secret and a packet authenticator:
//!
//! - User-Password (RFC 2865 Section 5.2)
//! - Tunnel-Password (RFC 2868 Section 3.5), which prepends a two-octet salt
//!   and a one-octet cleartext length
//! - Ascend-Secret, a single-block XOR used by Ascend equipment
//!
//! All three share the recurrence `b(0) = MD5(secret || seed)`,
//! `b(i) = MD5(secret || c(i-1))`, `c(i) = p(i) XOR b(i)` over 16-octet
//! blocks. The digest state over the secret is computed once per call and
//! cloned per block.
//!
//! The decrypt halves exist for response processing and for the round-trip
//! tests; full packet decoding lives elsewhere.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use thiserror::Error;

/// Obfuscation block size (one MD5 digest)
pub const BLOCK_LEN: usize = 16;

/// RFC 2865 caps User-Password cleartext at 128 octets
pub const MAX_PASS_LEN: usize = 128;

/// Diversifies Tunnel-Password salts within a packet. Only the low four
/// bits are observable in the salt, so wrapping is harmless.
static SALT_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Error)]
pub enum CryptError {
    #[error("ciphertext too short: {0} octets")]
    TooShort(usize),
    #[error("embedded cleartext length {0} exceeds the ciphertext")]
    BadLength(usize),
}

fn secret_context(secret: &str) -> md5::Context {
    let mut ctx = md5::Context::new();
    ctx.consume(secret.as_bytes());
    ctx
}

/// Build a Tunnel-Password salt: high bit of octet 0 forced, a packet
/// counter in bits 3..6, CSPRNG bits elsewhere.
pub(crate) fn make_salt() -> [u8; 2] {
    let mut rng = rand::rng();
    let counter = SALT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let low: u32 = rng.random();
    [
        0x80 | (((counter & 0x0f) as u8) << 3) | (low & 0x07) as u8,
        rng.random::<u32>() as u8,
    ]
}

/// Obfuscate a User-Password value into `out` (RFC 2865 Section 5.2).
///
/// The cleartext is capped at [`MAX_PASS_LEN`] and zero-padded to a
/// multiple of 16 octets (an empty password pads to one block). Returns the
/// number of octets written, clamped to `out.len()`.
pub fn encrypt_user_password(
    out: &mut [u8],
    cleartext: &[u8],
    secret: &str,
    authenticator: &[u8; 16],
) -> usize {
    let mut buf = [0u8; MAX_PASS_LEN];
    let len = cleartext.len().min(MAX_PASS_LEN);
    buf[..len].copy_from_slice(&cleartext[..len]);

    let padded = if len == 0 {
        BLOCK_LEN
    } else {
        (len + BLOCK_LEN - 1) & !(BLOCK_LEN - 1)
    };

    let secret_ctx = secret_context(secret);
    let mut digest = {
        let mut ctx = secret_ctx.clone();
        ctx.consume(authenticator);
        ctx.compute().0
    };

    let mut n = 0;
    while n < padded {
        if n > 0 {
            let mut ctx = secret_ctx.clone();
            ctx.consume(&buf[n - BLOCK_LEN..n]);
            digest = ctx.compute().0;
        }
        for i in 0..BLOCK_LEN {
            buf[n + i] ^= digest[i];
        }
        n += BLOCK_LEN;
    }

    let written = padded.min(out.len());
    out[..written].copy_from_slice(&buf[..written]);
    written
}

/// Recover a User-Password cleartext, with trailing zero padding stripped.
pub fn decrypt_user_password(
    ciphertext: &[u8],
    secret: &str,
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, CryptError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CryptError::TooShort(ciphertext.len()));
    }

    let secret_ctx = secret_context(secret);
    let mut clear = vec![0u8; ciphertext.len()];

    for n in (0..ciphertext.len()).step_by(BLOCK_LEN) {
        let mut ctx = secret_ctx.clone();
        if n == 0 {
            ctx.consume(authenticator);
        } else {
            ctx.consume(&ciphertext[n - BLOCK_LEN..n]);
        }
        let digest = ctx.compute().0;
        for i in 0..BLOCK_LEN {
            clear[n + i] = ciphertext[n + i] ^ digest[i];
        }
    }

    while clear.last() == Some(&0) {
        clear.pop();
    }
    Ok(clear)
}

/// Obfuscate a Tunnel-Password value into `out` (RFC 2868 Section 3.5).
///
/// The output layout is `salt(2) || cipher(16k)`, where the first cleartext
/// octet inside the cipher is the password length. Callers must supply at
/// least 18 octets; the cleartext is truncated to the available room. The
/// final keystream block is XORed only over the octets that fit, matching
/// deployed implementations; interoperable decrypters see the same bytes.
///
/// Returns the number of octets written (ciphertext plus the salt).
pub fn encrypt_tunnel_password(
    out: &mut [u8],
    cleartext: &[u8],
    secret: &str,
    authenticator: &[u8; 16],
) -> usize {
    // The encoded form carries a one-octet length, so it can never use more
    // than one attribute's worth of value space.
    let freespace = out.len().min(253);

    let inlen = cleartext.len().min(freespace - 3);

    // Cleartext length plus the length octet, rounded up to a whole block.
    let mut encrypted_len = inlen + 1;
    if encrypted_len % BLOCK_LEN != 0 {
        encrypted_len += BLOCK_LEN - (encrypted_len % BLOCK_LEN);
    }
    if encrypted_len > freespace - 2 {
        encrypted_len = freespace - 2;
    }
    let outlen = encrypted_len + 2;

    out[3..3 + inlen].copy_from_slice(&cleartext[..inlen]);
    out[3 + inlen..outlen].fill(0);

    let salt = make_salt();
    out[0] = salt[0];
    out[1] = salt[1];
    out[2] = inlen as u8;

    let secret_ctx = secret_context(secret);
    let mut n = 0;
    while n < encrypted_len {
        let mut ctx = secret_ctx.clone();
        if n == 0 {
            ctx.consume(authenticator);
            ctx.consume(&out[0..2]);
        } else {
            ctx.consume(&out[2 + n - BLOCK_LEN..2 + n]);
        }
        let digest = ctx.compute().0;

        let block_len = if 2 + n + BLOCK_LEN < freespace {
            BLOCK_LEN
        } else {
            freespace - 2 - n
        };
        for i in 0..block_len {
            out[2 + n + i] ^= digest[i];
        }
        n += BLOCK_LEN;
    }

    outlen
}

/// Recover a Tunnel-Password cleartext from `salt || cipher`.
pub fn decrypt_tunnel_password(
    data: &[u8],
    secret: &str,
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, CryptError> {
    if data.len() < 2 + BLOCK_LEN {
        return Err(CryptError::TooShort(data.len()));
    }
    let salt = &data[..2];
    let cipher = &data[2..];

    let secret_ctx = secret_context(secret);
    let mut clear = vec![0u8; cipher.len()];

    for n in (0..cipher.len()).step_by(BLOCK_LEN) {
        let mut ctx = secret_ctx.clone();
        if n == 0 {
            ctx.consume(authenticator);
            ctx.consume(salt);
        } else {
            ctx.consume(&cipher[n - BLOCK_LEN..n]);
        }
        let digest = ctx.compute().0;
        let block = BLOCK_LEN.min(cipher.len() - n);
        for i in 0..block {
            clear[n + i] = cipher[n + i] ^ digest[i];
        }
    }

    let plen = usize::from(clear[0]);
    if plen >= clear.len() {
        return Err(CryptError::BadLength(plen));
    }
    Ok(clear[1..=plen].to_vec())
}

/// Ascend-Secret obfuscation: `MD5(secret || authenticator) XOR input`,
/// one 16-octet block. Applying it twice recovers the input.
pub fn make_secret(out: &mut [u8], input: &[u8], secret: &str, authenticator: &[u8; 16]) {
    let mut ctx = secret_context(secret);
    ctx.consume(authenticator);
    let digest = ctx.compute().0;
    for i in 0..BLOCK_LEN.min(out.len()).min(input.len()) {
        out[i] = input[i] ^ digest[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "xyzzy5461";
    const AUTHENTICATOR: [u8; 16] = [
        0x0d, 0xbe, 0x70, 0x8d, 0x93, 0xd4, 0x13, 0xce, 0x31, 0x96, 0xe4, 0x3f, 0x78, 0x2a, 0x0a,
        0xee,
    ];

    #[test]
    fn test_user_password_rfc2865_vector() {
        let mut out = [0u8; 128];
        let written = encrypt_user_password(&mut out, b"arctangent", SECRET, &AUTHENTICATOR);
        assert_eq!(written, 16);
        assert_eq!(
            &out[..16],
            &[
                0x19, 0x78, 0x9b, 0xfe, 0x86, 0xb1, 0xe6, 0x77, 0x98, 0x6e, 0x0a, 0x45, 0xb3,
                0xea, 0x47, 0x27,
            ]
        );
    }

    #[test]
    fn test_user_password_round_trip() {
        for password in [&b""[..], b"a", b"exactly16bytes!!", b"a much longer password than one block"] {
            let mut out = [0u8; 160];
            let written = encrypt_user_password(&mut out, password, "s3cr3t", &AUTHENTICATOR);
            assert_eq!(written % BLOCK_LEN, 0);
            let clear = decrypt_user_password(&out[..written], "s3cr3t", &AUTHENTICATOR).unwrap();
            assert_eq!(clear, *password);
        }
    }

    #[test]
    fn test_user_password_empty_pads_to_one_block() {
        let mut out = [0u8; 32];
        assert_eq!(encrypt_user_password(&mut out, b"", SECRET, &AUTHENTICATOR), 16);
    }

    #[test]
    fn test_user_password_caps_at_128() {
        let long = [b'x'; 200];
        let mut out = [0u8; 256];
        assert_eq!(
            encrypt_user_password(&mut out, &long, SECRET, &AUTHENTICATOR),
            MAX_PASS_LEN
        );
    }

    #[test]
    fn test_tunnel_password_round_trip() {
        for password in [&b"secret"[..], b"0123456789abcdef0123456789abcdef", b"x"] {
            let mut out = [0u8; 253];
            let written = encrypt_tunnel_password(&mut out, password, SECRET, &AUTHENTICATOR);
            assert!(written >= 18);
            assert_eq!((written - 2) % BLOCK_LEN, 0);
            let clear = decrypt_tunnel_password(&out[..written], SECRET, &AUTHENTICATOR).unwrap();
            assert_eq!(clear, *password);
        }
    }

    #[test]
    fn test_tunnel_password_embeds_length() {
        let mut out = [0u8; 64];
        let written = encrypt_tunnel_password(&mut out, b"secret", SECRET, &AUTHENTICATOR);
        assert_eq!(written, 18);
        // Undo only the first keystream block and check the length octet.
        let mut ctx = md5::Context::new();
        ctx.consume(SECRET.as_bytes());
        ctx.consume(AUTHENTICATOR);
        ctx.consume(&out[..2]);
        let digest = ctx.compute().0;
        assert_eq!(out[2] ^ digest[0], 6);
    }

    #[test]
    fn test_salt_well_formed() {
        let salts: Vec<[u8; 2]> = (0..8).map(|_| make_salt()).collect();
        for salt in &salts {
            assert_eq!(salt[0] & 0x80, 0x80);
        }
        assert!(
            salts.windows(2).any(|pair| pair[0] != pair[1]),
            "eight consecutive salts should not all collide"
        );
    }

    #[test]
    fn test_tunnel_password_truncates_to_freespace() {
        let long = [b'p'; 250];
        let mut out = [0u8; 40];
        let written = encrypt_tunnel_password(&mut out, &long, SECRET, &AUTHENTICATOR);
        assert_eq!(written, 40);
        let clear = decrypt_tunnel_password(&out[..written], SECRET, &AUTHENTICATOR).unwrap();
        // Room for salt, length octet and 37 cleartext octets.
        assert_eq!(clear, vec![b'p'; 37]);
    }

    #[test]
    fn test_make_secret_is_an_involution() {
        let input = [0x5a; 16];
        let mut cipher = [0u8; 16];
        make_secret(&mut cipher, &input, SECRET, &AUTHENTICATOR);
        assert_ne!(cipher, input);
        let mut back = [0u8; 16];
        make_secret(&mut back, &cipher, SECRET, &AUTHENTICATOR);
        assert_eq!(back, input);
    }
}
