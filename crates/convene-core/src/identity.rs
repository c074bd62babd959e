//! Identity material issued by the certificate authority.
//!
//! An [`Identity`] is a named certificate + private key pair, tagged with
//! the membership-service-provider id of the issuing organization. The
//! private key is wrapped in `Zeroizing` — wiped from memory on drop —
//! and never appears in `Debug` output or logs.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Role an identity was enrolled under at the certificate authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityRole {
    /// May register new identities with the CA.
    Admin,
    /// Application user — may sign transactions, not register others.
    Client,
}

/// A stored identity: certificate, private key, and issuer metadata.
#[derive(Clone)]
pub struct Identity {
    /// Unique label within a wallet.
    pub label: String,
    /// Signed certificate as issued by the CA (PEM bytes, opaque here).
    pub certificate: Bytes,
    /// Private key — zeroized on drop, never exposed through Debug.
    private_key: Zeroizing<Vec<u8>>,
    /// MSP id of the issuing organization, e.g. "Org1MSP".
    pub msp_id: String,
    pub role: IdentityRole,
}

impl Identity {
    pub fn new(
        label: impl Into<String>,
        certificate: Bytes,
        private_key: Vec<u8>,
        msp_id: impl Into<String>,
        role: IdentityRole,
    ) -> Self {
        Self {
            label: label.into(),
            certificate,
            private_key: Zeroizing::new(private_key),
            msp_id: msp_id.into(),
            role,
        }
    }

    /// Raw private key bytes. Callers must not persist these unencoded.
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Hex-encoded BLAKE3 digest of the certificate.
    ///
    /// Stable identifier for a specific issued certificate — changes when
    /// the CA re-issues, which is how store/CA divergence shows up.
    pub fn fingerprint(&self) -> String {
        hex::encode(blake3::hash(&self.certificate).as_bytes())
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("label", &self.label)
            .field("msp_id", &self.msp_id)
            .field("role", &self.role)
            .field("fingerprint", &self.fingerprint())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Certificate + key pair returned by a successful CA enrollment.
pub struct EnrollmentMaterial {
    pub certificate: Bytes,
    pub private_key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for EnrollmentMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentMaterial")
            .field("certificate", &self.certificate)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl EnrollmentMaterial {
    pub fn new(certificate: Bytes, private_key: Vec<u8>) -> Self {
        Self {
            certificate,
            private_key: Zeroizing::new(private_key),
        }
    }

    /// Promote enrollment material into a labeled identity.
    pub fn into_identity(
        self,
        label: impl Into<String>,
        msp_id: impl Into<String>,
        role: IdentityRole,
    ) -> Identity {
        Identity {
            label: label.into(),
            certificate: self.certificate,
            private_key: self.private_key,
            msp_id: msp_id.into(),
            role,
        }
    }
}
