//! Wired node and user fixtures for the integration suite.

use feeds_indexing::IndexingError;
use node_runtime::{FeedsNode, RuntimeConfig};
use shared_crypto::ecies::{self, EncryptionKeyPair};
use shared_crypto::signatures::Ed25519KeyPair;
use shared_crypto::symmetric::SecretKey;
use shared_types::collaborators::Profile;
use shared_types::config::FeedsConfig;
use shared_types::entities::{Block, BlockIndex, FeedId};
use shared_types::transactions::{
    user_signing_bytes, ChatParticipantSlot, EncryptedKeySlot, NewChatFeedPayload,
    NewGroupFeedPayload, SignedTransaction, TransactionPayload, TransactionSignature,
    ValidatedTransaction,
};
use std::collections::HashMap;

/// A test user: an opaque address plus real signing and encryption
/// keys registered with the directory.
pub struct TestUser {
    /// Signing keypair for user signatures.
    pub signing: Ed25519KeyPair,
    /// Encryption keypair the directory maps the address to.
    pub encryption: EncryptionKeyPair,
}

/// A fully wired node plus the cast of users acting against it.
pub struct TestNet {
    /// The node under test.
    pub node: FeedsNode,
    users: HashMap<String, TestUser>,
}

impl TestNet {
    /// Build a node with a fixed operator seed.
    pub fn new() -> Self {
        Self {
            node: FeedsNode::build(RuntimeConfig {
                feeds: FeedsConfig::default(),
                credentials: RuntimeConfig::credentials_from_seed(Some([42u8; 32])),
            }),
            users: HashMap::new(),
        }
    }

    /// Register a user with the identity directory.
    pub fn user(&mut self, address: &str, alias: &str) -> &TestUser {
        let user = TestUser {
            signing: Ed25519KeyPair::generate(),
            encryption: EncryptionKeyPair::generate(),
        };
        self.node.identity.register(
            address,
            Profile {
                public_encrypt_address: user.encryption.public_address(),
                alias: alias.to_string(),
            },
        );
        self.users.insert(address.to_string(), user);
        &self.users[address]
    }

    /// A previously registered user.
    pub fn user_of(&self, address: &str) -> &TestUser {
        &self.users[address]
    }

    /// Sign a payload as `address`.
    pub fn sign(&self, address: &str, payload: TransactionPayload) -> SignedTransaction {
        let value = payload.to_wire_value().expect("payload serializes");
        let bytes = user_signing_bytes(payload.kind(), &value).expect("signing bytes");
        let signature = self.users[address].signing.sign(&bytes);
        SignedTransaction {
            payload,
            user_signature: TransactionSignature {
                signatory: address.to_string(),
                signature,
            },
        }
    }

    /// Run content validation as of `block_index`.
    pub async fn validate_at(
        &self,
        block_index: BlockIndex,
        signed: SignedTransaction,
    ) -> Option<ValidatedTransaction> {
        self.node.clock.set(block_index);
        self.node.validators.validate(signed).await.into_validated()
    }

    /// Apply a block of already validated transactions.
    pub async fn apply(
        &self,
        block_index: BlockIndex,
        transactions: Vec<ValidatedTransaction>,
    ) -> Result<(), IndexingError> {
        self.node.clock.set(block_index);
        self.node
            .indexer
            .index_block(&Block {
                index: block_index,
                transactions,
            })
            .await
    }

    /// Validate one payload and, if accepted, index it in its own
    /// block. Returns whether validation accepted it.
    pub async fn run_one(
        &self,
        block_index: BlockIndex,
        signer: &str,
        payload: TransactionPayload,
    ) -> Result<bool, IndexingError> {
        let signed = self.sign(signer, payload);
        match self.validate_at(block_index, signed).await {
            Some(validated) => {
                self.apply(block_index, vec![validated]).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Build a chat-feed payload with a real shared key wrapped to both
    /// parties.
    pub fn chat_payload(&self, feed_id: FeedId, a: &str, b: &str) -> TransactionPayload {
        let key = SecretKey::generate();
        let participants = [a, b]
            .iter()
            .map(|address| ChatParticipantSlot {
                address: (*address).to_string(),
                encrypted_feed_key: ecies::encrypt(
                    &self.users[*address].encryption.public_key(),
                    key.as_bytes(),
                )
                .expect("wrap"),
            })
            .collect();
        TransactionPayload::NewChatFeed(NewChatFeedPayload {
            feed_id,
            participants,
        })
    }

    /// Build a group-feed payload with genesis wraps for every member.
    pub fn group_payload(
        &self,
        feed_id: FeedId,
        title: &str,
        is_public: bool,
        members: &[&str],
    ) -> TransactionPayload {
        let key = SecretKey::generate();
        let encrypted_keys = members
            .iter()
            .map(|address| EncryptedKeySlot {
                member_address: (*address).to_string(),
                encrypted_aes_key: ecies::encrypt(
                    &self.users[*address].encryption.public_key(),
                    key.as_bytes(),
                )
                .expect("wrap"),
            })
            .collect();
        TransactionPayload::NewGroupFeed(NewGroupFeedPayload {
            feed_id,
            title: title.to_string(),
            description: String::new(),
            is_public,
            participants: members.iter().map(|m| (*m).to_string()).collect(),
            encrypted_keys,
        })
    }
}

impl Default for TestNet {
    fn default() -> Self {
        Self::new()
    }
}
