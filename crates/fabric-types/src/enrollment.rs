//! Identity enrollment with the certificate authority

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use thiserror::Error;

/// Certificate validation failures
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CertificateError {
    #[error("Malformed public key")]
    MalformedKey,

    #[error("Malformed signature")]
    MalformedSignature,

    #[error("Signature verification failed")]
    BadSignature,
}

/// Request sent to the certificate authority to enroll an identity
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct EnrollmentRequest {
    /// Identity name (e.g. `admin`)
    pub name: String,
    /// Enrollment secret shared with the authority
    pub secret: String,
    /// Organisation affiliation
    pub affiliation: String,
    /// Membership service provider id
    pub msp_id: String,
    /// ed25519 public key the identity will sign with
    pub public_key: [u8; 32],
}

/// Certificate issued by the authority binding an identity to its key
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct EnrollmentCertificate {
    pub name: String,
    pub affiliation: String,
    pub msp_id: String,
    pub public_key: [u8; 32],
    /// Issuance timestamp, unix millis
    pub issued_at_ms: i64,
    /// Authority signature over the identity fields
    pub signature: Vec<u8>,
}

impl EnrollmentCertificate {
    /// Issue a certificate for `request`, signed with the authority key
    pub fn issue(request: &EnrollmentRequest, issued_at_ms: i64, ca_key: &SigningKey) -> Self {
        let mut cert = Self {
            name: request.name.clone(),
            affiliation: request.affiliation.clone(),
            msp_id: request.msp_id.clone(),
            public_key: request.public_key,
            issued_at_ms,
            signature: Vec::new(),
        };
        cert.signature = ca_key.sign(&cert.signable_bytes()).to_bytes().to_vec();
        cert
    }

    /// Bytes covered by the authority signature
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.affiliation.as_bytes());
        hasher.update(self.msp_id.as_bytes());
        hasher.update(&self.public_key);
        hasher.update(&self.issued_at_ms.to_le_bytes());
        hasher.finalize().as_bytes().to_vec()
    }

    /// The identity's verifying key
    pub fn verifying_key(&self) -> Result<VerifyingKey, CertificateError> {
        VerifyingKey::from_bytes(&self.public_key).map_err(|_| CertificateError::MalformedKey)
    }

    /// Check the certificate was issued by the authority holding `ca_key`
    pub fn verify(&self, ca_key: &VerifyingKey) -> Result<(), CertificateError> {
        let bytes: [u8; 64] = self
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| CertificateError::MalformedSignature)?;
        ca_key
            .verify_strict(&self.signable_bytes(), &Signature::from_bytes(&bytes))
            .map_err(|_| CertificateError::BadSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn request(key: &SigningKey) -> EnrollmentRequest {
        EnrollmentRequest {
            name: "admin".to_string(),
            secret: "adminpw".to_string(),
            affiliation: "org1".to_string(),
            msp_id: "Org1MSP".to_string(),
            public_key: key.verifying_key().to_bytes(),
        }
    }

    #[test]
    fn issued_certificate_verifies() {
        let ca_key = SigningKey::generate(&mut OsRng);
        let identity_key = SigningKey::generate(&mut OsRng);

        let cert = EnrollmentCertificate::issue(&request(&identity_key), 1_700_000_000_000, &ca_key);
        assert!(cert.verify(&ca_key.verifying_key()).is_ok());
    }

    #[test]
    fn tampered_certificate_is_rejected() {
        let ca_key = SigningKey::generate(&mut OsRng);
        let identity_key = SigningKey::generate(&mut OsRng);

        let mut cert =
            EnrollmentCertificate::issue(&request(&identity_key), 1_700_000_000_000, &ca_key);
        cert.msp_id = "Org2MSP".to_string();
        assert_eq!(
            cert.verify(&ca_key.verifying_key()),
            Err(CertificateError::BadSignature)
        );
    }
}
