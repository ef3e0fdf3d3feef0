//! Simulated certificate authority

use std::collections::HashMap;
use std::sync::Arc;

use ed25519_dalek::{SigningKey, VerifyingKey};
use futures_util::{SinkExt, StreamExt};
use rand::rngs::OsRng;
use tokio::net::TcpStream;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use fabric_types::{EnrollmentCertificate, EnrollmentRequest, GatewayRequest, PeerReply};

/// Issues enrollment certificates to identities presenting the right
/// secret
#[derive(Clone)]
pub struct CertificateAuthority {
    signing_key: Arc<SigningKey>,
    secrets: Arc<HashMap<String, String>>,
}

impl CertificateAuthority {
    pub fn new() -> Self {
        let mut secrets = HashMap::new();
        secrets.insert("admin".to_string(), "adminpw".to_string());
        Self {
            signing_key: Arc::new(SigningKey::generate(&mut OsRng)),
            secrets: Arc::new(secrets),
        }
    }

    /// Register an additional identity secret
    pub fn with_secret(mut self, name: &str, secret: &str) -> Self {
        let mut secrets = (*self.secrets).clone();
        secrets.insert(name.to_string(), secret.to_string());
        self.secrets = Arc::new(secrets);
        self
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    fn enroll(&self, request: &EnrollmentRequest) -> PeerReply {
        match self.secrets.get(&request.name) {
            Some(secret) if *secret == request.secret => {
                let issued_at_ms = chrono::Utc::now().timestamp_millis();
                let certificate =
                    EnrollmentCertificate::issue(request, issued_at_ms, &self.signing_key);
                tracing::info!(name = %request.name, msp = %request.msp_id, "Enrolled identity");
                PeerReply::Enrolled(certificate)
            }
            _ => {
                tracing::warn!(name = %request.name, "Enrollment refused");
                PeerReply::Error {
                    message: format!("enrollment refused for identity {:?}", request.name),
                }
            }
        }
    }
}

impl Default for CertificateAuthority {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) async fn handle_connection(
    stream: TcpStream,
    ca: CertificateAuthority,
) -> anyhow::Result<()> {
    let mut ws = accept_async(stream).await?;

    while let Some(message) = ws.next().await {
        match message? {
            Message::Binary(data) => {
                let reply = match GatewayRequest::from_bytes(&data) {
                    Ok(GatewayRequest::Enroll(request)) => ca.enroll(&request),
                    Ok(_) => PeerReply::Error {
                        message: "authority only serves enrollment".to_string(),
                    },
                    Err(e) => PeerReply::Error {
                        message: format!("malformed frame: {e}"),
                    },
                };
                ws.send(Message::Binary(reply.to_bytes())).await?;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}
