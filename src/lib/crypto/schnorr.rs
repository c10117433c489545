//! Schnorr signatures over Grumpkin.
//!
//! Grumpkin's base field is the BN254 scalar field, so public-key and
//! commitment coordinates are ordinary ledger field elements.
//!
//! ```text
//! k  = H_sha256(DOMAIN_NONCE ‖ sk ‖ m)  mod q
//! R  = k·G
//! e  = poseidon(R.x, R.y, PK.x, PK.y, m)  mod q
//! s  = k + e·sk
//! ok ⇔ s·G == R + e·PK
//! ```

use std::fmt;

use alloy_primitives::B256;
use ark_ec::{AffineRepr, CurveGroup, PrimeGroup};
use ark_ff::{BigInteger, PrimeField, Zero};
use ark_grumpkin::{Affine, Fr as GrumpkinScalar, Projective};
use ark_std::UniformRand;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use super::poseidon::poseidon5;
use crate::domain::field::fe_to_b256;
use crate::domain::keys::{PublicKey, Signature};
use crate::ports::signature::SignatureError;

const DOMAIN_KEYGEN: &[u8] = b"zk-rollup.keygen";
const DOMAIN_NONCE: &[u8] = b"zk-rollup.schnorr.nonce";

fn scalar_to_bytes(scalar: &GrumpkinScalar) -> [u8; 32] {
    let bytes = scalar.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

fn scalar_from_digest(digest: &[u8]) -> GrumpkinScalar {
    GrumpkinScalar::from_be_bytes_mod_order(digest)
}

fn point_to_public_key(point: &Affine) -> PublicKey {
    PublicKey::new(point.x, point.y)
}

/// Interpret raw coordinates as a Grumpkin point, rejecting anything off the curve.
fn point_from_coordinates(public_key: &PublicKey) -> Option<Affine> {
    let point = Affine::new_unchecked(public_key.x, public_key.y);
    if point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve() {
        Some(point)
    } else {
        None
    }
}

fn challenge(r: &Affine, public_key: &PublicKey, message: &B256) -> GrumpkinScalar {
    let e = poseidon5(
        fe_to_b256(&r.x),
        fe_to_b256(&r.y),
        public_key.x_b256(),
        public_key.y_b256(),
        *message,
    );
    scalar_from_digest(e.as_slice())
}

/// Signing key and its public key.
#[derive(Clone)]
pub struct KeyPair {
    secret: GrumpkinScalar,
    public: PublicKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    pub fn from_secret(secret: GrumpkinScalar) -> Self {
        let point = (Projective::generator() * secret).into_affine();
        Self {
            secret,
            public: point_to_public_key(&point),
        }
    }

    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut secret = GrumpkinScalar::rand(rng);
        while secret.is_zero() {
            secret = GrumpkinScalar::rand(rng);
        }
        Self::from_secret(secret)
    }

    /// Deterministic key pair for provisioning fixtures.
    pub fn from_seed(seed: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_KEYGEN);
        hasher.update(seed.to_be_bytes());
        let mut secret = scalar_from_digest(&hasher.finalize());
        if secret.is_zero() {
            secret = GrumpkinScalar::from(1u64);
        }
        Self::from_secret(secret)
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    pub fn sign(&self, message: &B256) -> Signature {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_NONCE);
        hasher.update(scalar_to_bytes(&self.secret));
        hasher.update(message.as_slice());
        let mut k = scalar_from_digest(&hasher.finalize());
        if k.is_zero() {
            k = GrumpkinScalar::from(1u64);
        }

        let r = (Projective::generator() * k).into_affine();
        let e = challenge(&r, &self.public, message);
        let s = k + e * self.secret;

        Signature {
            r_x: r.x,
            r_y: r.y,
            s: scalar_to_bytes(&s),
        }
    }
}

/// Verify `signature` over `message` under `public_key`.
///
/// Returns `Err` when the inputs are not a well-formed key or signature and
/// `Ok(false)` when they are but the equation does not hold.
pub fn verify(
    public_key: &PublicKey,
    message: &B256,
    signature: &Signature,
) -> Result<bool, SignatureError> {
    let pk = point_from_coordinates(public_key).ok_or(SignatureError::InvalidPublicKey)?;
    let r = point_from_coordinates(&PublicKey::new(signature.r_x, signature.r_y))
        .ok_or(SignatureError::InvalidCommitment)?;

    let s = GrumpkinScalar::from_be_bytes_mod_order(&signature.s);
    if scalar_to_bytes(&s) != signature.s {
        return Err(SignatureError::NonCanonicalScalar);
    }

    let e = challenge(&r, public_key, message);
    let lhs = Projective::generator() * s;
    let rhs = r.into_group() + pk.into_group() * e;
    Ok(lhs == rhs)
}
