//! Operation façade
//!
//! The four chaincode operations as a tagged enum dispatched through a
//! single `invoke` entry point. Per-kind validation runs before any
//! network call; every invocation resolves to exactly one outcome or
//! error before returning.

use std::sync::Arc;

use fabric_types::{
    EntityState, PeerResponse, SignedProposal, SubmitRequest, TransactionReceipt, NOT_FOUND,
};

use crate::broadcast;
use crate::error::{GatewayError, SemanticError, ValidationError};
use crate::proposal::ProposalBuilder;
use crate::reconcile::{reconcile, OperationKind};
use crate::session::Session;

/// One gateway operation with its argument shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Add { entity: String, value: String },
    Delete { entity: String },
    Get { entity: String },
    Set { entity: String, value: String },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Add { .. } => OperationKind::Add,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::Get { .. } => OperationKind::Get,
            Operation::Set { .. } => OperationKind::Set,
        }
    }

    /// Chaincode function name (wire contract)
    pub fn function(&self) -> &'static str {
        match self {
            Operation::Add { .. } => "add",
            Operation::Delete { .. } => "delete",
            Operation::Get { .. } => "get",
            Operation::Set { .. } => "set",
        }
    }

    /// Positional arguments in chaincode order
    pub fn args(&self) -> Vec<String> {
        match self {
            Operation::Add { entity, value } | Operation::Set { entity, value } => {
                vec![entity.clone(), value.clone()]
            }
            Operation::Delete { entity } | Operation::Get { entity } => vec![entity.clone()],
        }
    }

    /// Reject empty inputs before any network call
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Operation::Add { entity, value } | Operation::Set { entity, value } => {
                if entity.is_empty() {
                    Err(ValidationError::EmptyEntityName)
                } else if value.is_empty() {
                    Err(ValidationError::EmptyValue)
                } else {
                    Ok(())
                }
            }
            Operation::Delete { entity } | Operation::Get { entity } => {
                if entity.is_empty() {
                    Err(ValidationError::EmptyEntityName)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Result of one operation invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// A mutation was endorsed and accepted for ordering
    Committed { transaction_id: String },
    /// A query resolved to the entity's current state
    State { entity_state: String },
}

/// The ledger transaction gateway
pub struct Gateway {
    session: Arc<Session>,
}

impl Gateway {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Run one operation through propose → broadcast → reconcile
    pub async fn invoke(&self, operation: Operation) -> Result<OperationOutcome, GatewayError> {
        operation.validate()?;

        let signed =
            ProposalBuilder::new(&self.session).build_signed(operation.function(), operation.args());
        tracing::debug!(
            function = operation.function(),
            transaction_id = %signed.proposal.transaction_id,
            "Invoking chaincode"
        );

        match operation.kind() {
            OperationKind::Get => self.run_query(signed).await,
            kind => self.run_mutation(kind, signed).await,
        }
    }

    /// Read-only path; absence is a successful outcome, not an error
    async fn run_query(&self, signed: SignedProposal) -> Result<OperationOutcome, GatewayError> {
        let responses = broadcast::query(&self.session, &signed).await?;

        match reconcile(&responses, OperationKind::Get, 1) {
            Ok(reconciled) => {
                if reconciled.payload.is_empty() {
                    return Err(GatewayError::QueryFailed);
                }
                Ok(OperationOutcome::State {
                    entity_state: String::from_utf8_lossy(&reconciled.payload).into_owned(),
                })
            }
            Err(GatewayError::Semantic(SemanticError::EntityNotFound)) => {
                Ok(OperationOutcome::State {
                    entity_state: NOT_FOUND.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Mutating path: endorse on all peers, reconcile, then hand the
    /// endorsed write set to the orderer
    async fn run_mutation(
        &self,
        kind: OperationKind,
        signed: SignedProposal,
    ) -> Result<OperationOutcome, GatewayError> {
        let wait = signed.proposal.wait_time();
        let channel = signed.proposal.channel.clone();

        let endorsements = broadcast::endorse(&self.session, &signed).await?;
        let responses: Vec<PeerResponse> = endorsements
            .iter()
            .map(|endorsement| endorsement.response.clone())
            .collect();

        let reconciled = reconcile(&responses, kind, self.session.config().min_endorsements)?;

        // The authoritative response's write set is what gets ordered.
        let submit = SubmitRequest {
            channel,
            transaction_id: reconciled.transaction_id.clone(),
            write_set: endorsements[0].write_set.clone(),
        };
        broadcast::submit(&self.session, submit, wait).await?;

        tracing::info!(transaction_id = %reconciled.transaction_id, "Transaction committed");
        Ok(OperationOutcome::Committed {
            transaction_id: reconciled.transaction_id,
        })
    }

    pub async fn add(
        &self,
        entity: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<TransactionReceipt, GatewayError> {
        self.mutation(Operation::Add {
            entity: entity.into(),
            value: value.into(),
        })
        .await
    }

    pub async fn delete(&self, entity: impl Into<String>) -> Result<TransactionReceipt, GatewayError> {
        self.mutation(Operation::Delete {
            entity: entity.into(),
        })
        .await
    }

    pub async fn set(
        &self,
        entity: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<TransactionReceipt, GatewayError> {
        self.mutation(Operation::Set {
            entity: entity.into(),
            value: value.into(),
        })
        .await
    }

    pub async fn get(&self, entity: impl Into<String>) -> Result<EntityState, GatewayError> {
        match self
            .invoke(Operation::Get {
                entity: entity.into(),
            })
            .await?
        {
            OperationOutcome::State { entity_state } => Ok(EntityState { entity_state }),
            OperationOutcome::Committed { .. } => Err(GatewayError::Unclassified(
                "query produced a mutation outcome".to_string(),
            )),
        }
    }

    async fn mutation(&self, operation: Operation) -> Result<TransactionReceipt, GatewayError> {
        match self.invoke(operation).await? {
            OperationOutcome::Committed { transaction_id } => {
                Ok(TransactionReceipt { transaction_id })
            }
            OperationOutcome::State { .. } => Err(GatewayError::Unclassified(
                "mutation produced a query outcome".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_function_names_are_fixed() {
        let add = Operation::Add {
            entity: "e".to_string(),
            value: "v".to_string(),
        };
        let delete = Operation::Delete {
            entity: "e".to_string(),
        };
        let get = Operation::Get {
            entity: "e".to_string(),
        };
        let set = Operation::Set {
            entity: "e".to_string(),
            value: "v".to_string(),
        };
        assert_eq!(add.function(), "add");
        assert_eq!(delete.function(), "delete");
        assert_eq!(get.function(), "get");
        assert_eq!(set.function(), "set");
    }

    #[test]
    fn argument_order_matches_the_chaincode_contract() {
        let set = Operation::Set {
            entity: "diploma-123".to_string(),
            value: "hash-abc".to_string(),
        };
        assert_eq!(set.args(), vec!["diploma-123", "hash-abc"]);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let empty_entity = Operation::Add {
            entity: String::new(),
            value: "x".to_string(),
        };
        let empty_value = Operation::Add {
            entity: "e".to_string(),
            value: String::new(),
        };
        let empty_get = Operation::Get {
            entity: String::new(),
        };
        assert_eq!(
            empty_entity.validate(),
            Err(ValidationError::EmptyEntityName)
        );
        assert_eq!(empty_value.validate(), Err(ValidationError::EmptyValue));
        assert_eq!(empty_get.validate(), Err(ValidationError::EmptyEntityName));
    }

    #[test]
    fn entity_name_is_checked_before_value() {
        let both_empty = Operation::Set {
            entity: String::new(),
            value: String::new(),
        };
        assert_eq!(both_empty.validate(), Err(ValidationError::EmptyEntityName));
    }
}
