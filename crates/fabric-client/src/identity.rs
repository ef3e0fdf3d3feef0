//! Identity enrollment and the on-disk credential cache

use std::path::Path;
use std::time::Duration;

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use fabric_types::{EnrollmentCertificate, EnrollmentRequest, GatewayRequest, IdentityConfig, PeerReply};

use crate::error::SessionError;
use crate::link;

/// An identity enrolled with the certificate authority
#[derive(Clone)]
pub struct EnrolledIdentity {
    pub certificate: EnrollmentCertificate,
    pub signing_key: SigningKey,
}

/// Client for the certificate authority endpoint
pub struct CaClient {
    url: String,
    wait: Duration,
}

impl CaClient {
    pub fn new(url: &str, wait: Duration) -> Self {
        Self {
            url: url.to_string(),
            wait,
        }
    }

    /// Enroll `identity`, generating a fresh signing key
    pub async fn enroll(&self, identity: &IdentityConfig) -> Result<EnrolledIdentity, SessionError> {
        let signing_key = SigningKey::generate(&mut OsRng);
        let request = GatewayRequest::Enroll(EnrollmentRequest {
            name: identity.name.clone(),
            secret: identity.secret.clone(),
            affiliation: identity.affiliation.clone(),
            msp_id: identity.msp_id.clone(),
            public_key: signing_key.verifying_key().to_bytes(),
        });

        let reply = link::request_once(&self.url, &request, self.wait)
            .await
            .map_err(|e| SessionError::Enrollment(e.to_string()))?;

        match reply {
            PeerReply::Enrolled(certificate) => {
                tracing::info!(name = %identity.name, msp = %identity.msp_id, "Identity enrolled");
                Ok(EnrolledIdentity {
                    certificate,
                    signing_key,
                })
            }
            PeerReply::Error { message } => Err(SessionError::Enrollment(message)),
            other => Err(SessionError::Enrollment(format!(
                "unexpected authority reply: {other:?}"
            ))),
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize)]
struct StoredIdentity {
    signing_key: [u8; 32],
    certificate: EnrollmentCertificate,
}

/// sled-backed cache of enrolled identities, keyed `identity@channel`
pub struct CredentialCache {
    db: sled::Db,
}

impl CredentialCache {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let db = sled::open(&path).map_err(|e| SessionError::CredentialCache(e.to_string()))?;
        tracing::debug!("Opened credential cache at {:?}", path.as_ref());
        Ok(Self { db })
    }

    /// Load a cached enrollment; a corrupt entry is treated as absent
    pub fn load(&self, key: &str) -> Result<Option<EnrolledIdentity>, SessionError> {
        let bytes = match self
            .db
            .get(key)
            .map_err(|e| SessionError::CredentialCache(e.to_string()))?
        {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        match borsh::from_slice::<StoredIdentity>(&bytes) {
            Ok(stored) => Ok(Some(EnrolledIdentity {
                signing_key: SigningKey::from_bytes(&stored.signing_key),
                certificate: stored.certificate,
            })),
            Err(e) => {
                tracing::warn!(%key, "Discarding corrupt cached credential: {e}");
                Ok(None)
            }
        }
    }

    pub fn store(&self, key: &str, identity: &EnrolledIdentity) -> Result<(), SessionError> {
        let stored = StoredIdentity {
            signing_key: identity.signing_key.to_bytes(),
            certificate: identity.certificate.clone(),
        };
        let bytes =
            borsh::to_vec(&stored).map_err(|e| SessionError::CredentialCache(e.to_string()))?;
        self.db
            .insert(key, bytes)
            .map_err(|e| SessionError::CredentialCache(e.to_string()))?;
        self.db
            .flush()
            .map_err(|e| SessionError::CredentialCache(e.to_string()))?;
        Ok(())
    }

    /// Drop a stale entry so an invalidated credential can never be reused
    pub fn clear(&self, key: &str) -> Result<(), SessionError> {
        self.db
            .remove(key)
            .map_err(|e| SessionError::CredentialCache(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn identity() -> EnrolledIdentity {
        let signing_key = SigningKey::generate(&mut OsRng);
        let ca_key = SigningKey::generate(&mut OsRng);
        let request = EnrollmentRequest {
            name: "admin".to_string(),
            secret: "adminpw".to_string(),
            affiliation: "org1".to_string(),
            msp_id: "Org1MSP".to_string(),
            public_key: signing_key.verifying_key().to_bytes(),
        };
        EnrolledIdentity {
            certificate: EnrollmentCertificate::issue(&request, 1_700_000_000_000, &ca_key),
            signing_key,
        }
    }

    #[test]
    fn store_load_round_trip() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::open(dir.path()).unwrap();
        let enrolled = identity();

        cache.store("admin@mychannel", &enrolled).unwrap();

        let loaded = cache.load("admin@mychannel").unwrap().unwrap();
        assert_eq!(loaded.certificate.name, "admin");
        assert_eq!(
            loaded.signing_key.to_bytes(),
            enrolled.signing_key.to_bytes()
        );
    }

    #[test]
    fn clear_removes_the_entry() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::open(dir.path()).unwrap();

        cache.store("admin@mychannel", &identity()).unwrap();
        cache.clear("admin@mychannel").unwrap();

        assert!(cache.load("admin@mychannel").unwrap().is_none());
    }

    #[test]
    fn corrupt_entries_are_discarded() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::open(dir.path()).unwrap();

        cache.db.insert("admin@mychannel", &b"garbage"[..]).unwrap();

        assert!(cache.load("admin@mychannel").unwrap().is_none());
    }
}
