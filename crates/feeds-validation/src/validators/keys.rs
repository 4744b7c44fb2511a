//! Validator for explicit key rotation transactions.

use crate::context::{ValidationOutcome, ValidatorContext};
use crate::predicates;
use crate::validators::ContentValidator;
use async_trait::async_trait;
use shared_types::transactions::{SignedTransaction, TransactionKind, TransactionPayload};
use std::sync::Arc;

/// `GroupFeedKeyRotation`: structural well-formedness of the rotation
/// payload. Monotonic continuation against the stored epoch sequence is
/// the store's job at persist time.
pub struct GroupFeedKeyRotationValidator {
    ctx: Arc<ValidatorContext>,
}

impl GroupFeedKeyRotationValidator {
    /// Wire up the validator.
    pub fn new(ctx: Arc<ValidatorContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ContentValidator for GroupFeedKeyRotationValidator {
    fn kind(&self) -> TransactionKind {
        TransactionKind::GroupFeedKeyRotation
    }

    async fn validate(&self, tx: SignedTransaction) -> ValidationOutcome {
        let TransactionPayload::GroupFeedKeyRotation(payload) = &tx.payload else {
            return self.ctx.reject("GroupFeedKeyRotation", "payload kind mismatch");
        };

        if payload.new_generation == 0 {
            return self.ctx.reject("GroupFeedKeyRotation", "generation 0 is reserved");
        }
        if payload.new_generation != payload.previous_generation + 1 {
            return self
                .ctx
                .reject("GroupFeedKeyRotation", "generation does not advance by one");
        }
        if payload.valid_from_block == 0 {
            return self.ctx.reject("GroupFeedKeyRotation", "missing valid-from block");
        }
        if !predicates::encrypted_keys_ok(&payload.encrypted_keys) {
            return self.ctx.reject("GroupFeedKeyRotation", "bad member key set");
        }

        self.ctx.attach_signature(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::testutil::{rig, signed};
    use shared_types::entities::{FeedId, RotationTrigger};
    use shared_types::transactions::{EncryptedKeySlot, GroupFeedKeyRotationPayload};

    fn rotation(new: u64, previous: u64, valid_from: u64) -> TransactionPayload {
        TransactionPayload::GroupFeedKeyRotation(GroupFeedKeyRotationPayload {
            feed_id: FeedId::generate(),
            new_generation: new,
            previous_generation: previous,
            valid_from_block: valid_from,
            trigger: RotationTrigger::Manual,
            encrypted_keys: vec![EncryptedKeySlot {
                member_address: "alice".to_string(),
                encrypted_aes_key: vec![1],
            }],
        })
    }

    #[tokio::test]
    async fn test_well_formed_rotation_accepted() {
        let validator = GroupFeedKeyRotationValidator::new(rig().ctx);
        assert!(validator
            .validate(signed(rotation(3, 2, 50), "node"))
            .await
            .is_validated());
    }

    #[tokio::test]
    async fn test_non_consecutive_generation_rejected() {
        let validator = GroupFeedKeyRotationValidator::new(rig().ctx);
        assert!(!validator
            .validate(signed(rotation(4, 2, 50), "node"))
            .await
            .is_validated());
    }

    #[tokio::test]
    async fn test_generation_zero_rejected() {
        let validator = GroupFeedKeyRotationValidator::new(rig().ctx);
        assert!(!validator
            .validate(signed(rotation(0, 0, 50), "node"))
            .await
            .is_validated());
    }

    #[tokio::test]
    async fn test_zero_valid_from_rejected() {
        let validator = GroupFeedKeyRotationValidator::new(rig().ctx);
        assert!(!validator
            .validate(signed(rotation(3, 2, 0), "node"))
            .await
            .is_validated());
    }

    #[tokio::test]
    async fn test_duplicate_member_rejected() {
        let validator = GroupFeedKeyRotationValidator::new(rig().ctx);
        let TransactionPayload::GroupFeedKeyRotation(mut inner) = rotation(3, 2, 50) else {
            unreachable!()
        };
        inner.encrypted_keys.push(inner.encrypted_keys[0].clone());
        assert!(!validator
            .validate(signed(
                TransactionPayload::GroupFeedKeyRotation(inner),
                "node"
            ))
            .await
            .is_validated());
    }
}
