//! Private key material.
//!
//! Construction validates the key, delegating the arithmetic to the
//! respective crypto crates. This module never implements curve or
//! modular arithmetic itself.

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use core::fmt;

use ed25519_dalek::SigningKey;
use rsa::{BigUint, RsaPrivateKey};

use alloc::vec;

use crate::*;
use packets::{Ed25519PubKey, EcdsaCurve, EcdsaPubKey};
use sshnames::*;
use sshwire::MpInt;

/// A decoded private key, one variant per supported algorithm.
///
/// `ssh-dss` is deliberately absent, those keys are historic and only
/// their public halves are still decoded.
pub enum PrivKey {
    Ed25519(SigningKey),
    Rsa(RsaPrivateKey),
    EcdsaP256(p256::SecretKey),
    EcdsaP384(p384::SecretKey),
    EcdsaP521(p521::SecretKey),
}

impl PrivKey {
    /// Builds an Ed25519 key from a key file record.
    ///
    /// `secret` is the record's 64 byte field, the seed followed by a
    /// copy of the public key. Both the copy and `pubkey` must match
    /// the public key recomputed from the seed.
    pub fn from_ed25519(pubkey: &Ed25519PubKey, secret: &[u8]) -> Result<Self> {
        if secret.len() != 64 {
            return Err(Error::BadKey);
        }
        let (seed, dup) = secret.split_at(32);
        let seed: [u8; 32] = seed.try_into().map_err(|_| Error::BadKey)?;
        let k = SigningKey::from_bytes(&seed);
        let v = k.verifying_key();
        if v.as_bytes() != dup || v.as_bytes() != pubkey.key.0 {
            debug!("ed25519 public key doesn't match its secret");
            return Err(Error::BadKey);
        }
        Ok(Self::Ed25519(k))
    }

    /// Builds an RSA key from a key file record.
    ///
    /// dP and dQ are derived from d and the primes, and the whole key
    /// is checked for consistency. `iqmp` is carried by the file format
    /// but recomputed rather than trusted.
    pub fn from_rsa(
        n: &MpInt,
        e: &MpInt,
        d: &MpInt,
        iqmp: &MpInt,
        p: &MpInt,
        q: &MpInt,
    ) -> Result<Self> {
        let big = |m: &MpInt| -> Result<BigUint> {
            Ok(BigUint::from_bytes_be(m.magnitude()?))
        };
        let _ = big(iqmp)?;
        let k = RsaPrivateKey::from_components(
            big(n)?,
            big(e)?,
            big(d)?,
            vec![big(p)?, big(q)?],
        )
        .map_err(|_| Error::BadKey)?;
        k.validate().map_err(|_| Error::BadKey)?;
        Ok(Self::Rsa(k))
    }

    /// Builds an ECDSA key from a key file record.
    ///
    /// The public point must be a valid curve point and must match the
    /// point derived from the scalar.
    pub fn from_ecdsa(pubkey: &EcdsaPubKey, scalar: &MpInt) -> Result<Self> {
        let d = scalar.magnitude()?;
        let point = pubkey.point.0;
        match pubkey.curve {
            EcdsaCurve::NistP256 => {
                let p = p256::PublicKey::from_sec1_bytes(point)
                    .map_err(|_| Error::BadKey)?;
                let k = p256::SecretKey::from_slice(&left_pad::<32>(d)?)
                    .map_err(|_| Error::BadKey)?;
                if k.public_key() != p {
                    debug!("nistp256 public point doesn't match its scalar");
                    return Err(Error::BadKey);
                }
                Ok(Self::EcdsaP256(k))
            }
            EcdsaCurve::NistP384 => {
                let p = p384::PublicKey::from_sec1_bytes(point)
                    .map_err(|_| Error::BadKey)?;
                let k = p384::SecretKey::from_slice(&left_pad::<48>(d)?)
                    .map_err(|_| Error::BadKey)?;
                if k.public_key() != p {
                    debug!("nistp384 public point doesn't match its scalar");
                    return Err(Error::BadKey);
                }
                Ok(Self::EcdsaP384(k))
            }
            EcdsaCurve::NistP521 => {
                let p = p521::PublicKey::from_sec1_bytes(point)
                    .map_err(|_| Error::BadKey)?;
                let k = p521::SecretKey::from_slice(&left_pad::<66>(d)?)
                    .map_err(|_| Error::BadKey)?;
                if k.public_key() != p {
                    debug!("nistp521 public point doesn't match its scalar");
                    return Err(Error::BadKey);
                }
                Ok(Self::EcdsaP521(k))
            }
        }
    }

    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Self::Ed25519(_) => SSH_NAME_ED25519,
            Self::Rsa(_) => SSH_NAME_RSA,
            Self::EcdsaP256(_) => SSH_NAME_ECDSA_256,
            Self::EcdsaP384(_) => SSH_NAME_ECDSA_384,
            Self::EcdsaP521(_) => SSH_NAME_ECDSA_521,
        }
    }
}

// Key material must not end up in logs
impl fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivKey({})", self.algorithm_name())
    }
}

/// The scalar in a key file is an mpint, shorter than the curve's field
/// width when it has leading zero bytes. The crypto crates want exact
/// width.
fn left_pad<const N: usize>(b: &[u8]) -> Result<[u8; N]> {
    if b.len() > N {
        return Err(Error::BadKey);
    }
    let mut out = [0u8; N];
    out[N - b.len()..].copy_from_slice(b);
    Ok(out)
}
