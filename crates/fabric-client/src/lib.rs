//! Ledger transaction gateway
//!
//! Turns key/entity operations (add, delete, get, set) into endorsed
//! transactions against a permissioned ledger network:
//! - Session bootstrap: enroll an identity, attach peers, orderer, and
//!   event hub to a channel (all-or-nothing, cached per identity+channel)
//! - Proposal construction with the fixed tracing envelope
//! - Broadcast to endorsing peers within a bounded wait window
//! - Reconciliation of possibly-divergent peer responses into one typed
//!   outcome

pub mod broadcast;
pub mod error;
pub mod identity;
pub mod link;
pub mod ops;
pub mod proposal;
pub mod reconcile;
pub mod session;

pub use error::{GatewayError, SemanticError, SessionError, TransportError, ValidationError};
pub use identity::{CaClient, CredentialCache, EnrolledIdentity};
pub use ops::{Gateway, Operation, OperationOutcome};
pub use proposal::ProposalBuilder;
pub use reconcile::{reconcile, OperationKind, Reconciled};
pub use session::{Session, SessionCache};
