//! # In-Memory Store Adapter
//!
//! The authoritative store behind a single `tokio::sync::RwLock`. Every
//! mutator runs under one write guard, which is what gives each call its
//! all-or-nothing transaction semantics: the compound writes (group +
//! genesis epoch, new epoch + pointer) are visible to readers only as a
//! whole.

use crate::errors::StoreError;
use crate::ports::FeedsStore;
use async_trait::async_trait;
use shared_types::entities::{
    BlockIndex, EncryptedMemberKey, Feed, FeedId, FeedMessage, FeedParticipant, GroupFeed,
    GroupFeedParticipant, KeyGeneration, PublicAddress,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct StoreState {
    feeds: HashMap<FeedId, Feed>,
    feed_participants: HashMap<FeedId, Vec<FeedParticipant>>,
    personal_by_owner: HashMap<PublicAddress, FeedId>,

    groups: HashMap<FeedId, GroupFeed>,
    group_participants: HashMap<FeedId, Vec<GroupFeedParticipant>>,

    key_generations: HashMap<FeedId, BTreeMap<u64, KeyGeneration>>,
    member_keys: HashMap<(FeedId, u64), Vec<EncryptedMemberKey>>,

    messages: HashMap<FeedId, Vec<FeedMessage>>,
    read_positions: HashMap<(PublicAddress, FeedId), BlockIndex>,
}

impl StoreState {
    fn feed_id_taken(&self, feed_id: FeedId) -> bool {
        self.feeds.contains_key(&feed_id) || self.groups.contains_key(&feed_id)
    }
}

/// In-memory implementation of [`FeedsStore`].
#[derive(Default)]
pub struct MemoryFeedsStore {
    state: RwLock<StoreState>,
}

impl MemoryFeedsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedsStore for MemoryFeedsStore {
    async fn create_personal_feed_if_absent(
        &self,
        feed: Feed,
        participant: FeedParticipant,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;

        if state
            .personal_by_owner
            .contains_key(&participant.participant_address)
        {
            debug!(
                owner = %participant.participant_address,
                "personal feed already exists, skipping create"
            );
            return Ok(false);
        }
        if state.feed_id_taken(feed.feed_id) {
            return Err(StoreError::Conflict(format!(
                "feed id {} already in use",
                feed.feed_id
            )));
        }

        let feed_id = feed.feed_id;
        state
            .personal_by_owner
            .insert(participant.participant_address.clone(), feed_id);
        state.feeds.insert(feed_id, feed);
        state.feed_participants.insert(feed_id, vec![participant]);
        Ok(true)
    }

    async fn get_personal_feed_of(
        &self,
        owner: &PublicAddress,
    ) -> Result<Option<Feed>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .personal_by_owner
            .get(owner)
            .and_then(|id| state.feeds.get(id))
            .cloned())
    }

    async fn insert_chat_feed(
        &self,
        feed: Feed,
        participants: Vec<FeedParticipant>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.feed_id_taken(feed.feed_id) {
            return Err(StoreError::Conflict(format!(
                "feed id {} already in use",
                feed.feed_id
            )));
        }
        let feed_id = feed.feed_id;
        state.feeds.insert(feed_id, feed);
        state.feed_participants.insert(feed_id, participants);
        Ok(())
    }

    async fn get_feed(&self, feed_id: FeedId) -> Result<Option<Feed>, StoreError> {
        Ok(self.state.read().await.feeds.get(&feed_id).cloned())
    }

    async fn list_feed_participants(
        &self,
        feed_id: FeedId,
    ) -> Result<Vec<FeedParticipant>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .feed_participants
            .get(&feed_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_group_feed(
        &self,
        group: GroupFeed,
        participants: Vec<GroupFeedParticipant>,
        genesis: KeyGeneration,
        keys: Vec<EncryptedMemberKey>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.feed_id_taken(group.feed_id) {
            return Err(StoreError::Conflict(format!(
                "feed id {} already in use",
                group.feed_id
            )));
        }
        if genesis.generation != 0 || group.current_key_generation != 0 {
            return Err(StoreError::Conflict(format!(
                "group {} must start at generation 0",
                group.feed_id
            )));
        }

        let feed_id = group.feed_id;
        state.groups.insert(feed_id, group);
        state.group_participants.insert(feed_id, participants);
        state
            .key_generations
            .entry(feed_id)
            .or_default()
            .insert(0, genesis);
        state.member_keys.insert((feed_id, 0), keys);
        Ok(())
    }

    async fn get_group_feed(&self, feed_id: FeedId) -> Result<Option<GroupFeed>, StoreError> {
        Ok(self.state.read().await.groups.get(&feed_id).cloned())
    }

    async fn get_group_participant(
        &self,
        feed_id: FeedId,
        address: &PublicAddress,
    ) -> Result<Option<GroupFeedParticipant>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .group_participants
            .get(&feed_id)
            .and_then(|ps| ps.iter().find(|p| &p.address == address))
            .cloned())
    }

    async fn list_group_participants(
        &self,
        feed_id: FeedId,
    ) -> Result<Vec<GroupFeedParticipant>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .group_participants
            .get(&feed_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_group_participant(
        &self,
        participant: GroupFeedParticipant,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.groups.contains_key(&participant.feed_id) {
            return Err(StoreError::GroupNotFound(participant.feed_id));
        }
        let rows = state
            .group_participants
            .entry(participant.feed_id)
            .or_default();
        match rows.iter_mut().find(|p| p.address == participant.address) {
            Some(row) => *row = participant,
            None => rows.push(participant),
        }
        Ok(())
    }

    async fn count_admins(&self, feed_id: FeedId) -> Result<usize, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .group_participants
            .get(&feed_id)
            .map(|ps| {
                ps.iter()
                    .filter(|p| {
                        p.is_active()
                            && p.participant_type
                                == shared_types::entities::GroupParticipantType::Admin
                    })
                    .count()
            })
            .unwrap_or(0))
    }

    async fn set_group_title(
        &self,
        feed_id: FeedId,
        title: String,
        block: BlockIndex,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let group = state
            .groups
            .get_mut(&feed_id)
            .ok_or(StoreError::GroupNotFound(feed_id))?;
        group.title = title;
        group.last_updated_at_block = block;
        Ok(())
    }

    async fn set_group_description(
        &self,
        feed_id: FeedId,
        description: String,
        block: BlockIndex,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let group = state
            .groups
            .get_mut(&feed_id)
            .ok_or(StoreError::GroupNotFound(feed_id))?;
        group.description = description;
        group.last_updated_at_block = block;
        Ok(())
    }

    async fn set_group_deleted(
        &self,
        feed_id: FeedId,
        block: BlockIndex,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let group = state
            .groups
            .get_mut(&feed_id)
            .ok_or(StoreError::GroupNotFound(feed_id))?;
        group.is_deleted = true;
        group.last_updated_at_block = block;
        Ok(())
    }

    async fn touch_group(&self, feed_id: FeedId, block: BlockIndex) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let group = state
            .groups
            .get_mut(&feed_id)
            .ok_or(StoreError::GroupNotFound(feed_id))?;
        group.last_updated_at_block = block;
        Ok(())
    }

    async fn get_current_key_generation(
        &self,
        feed_id: FeedId,
    ) -> Result<Option<KeyGeneration>, StoreError> {
        let state = self.state.read().await;
        let Some(group) = state.groups.get(&feed_id) else {
            return Ok(None);
        };
        Ok(state
            .key_generations
            .get(&feed_id)
            .and_then(|gens| gens.get(&group.current_key_generation))
            .cloned())
    }

    async fn list_key_generations(
        &self,
        feed_id: FeedId,
    ) -> Result<Vec<KeyGeneration>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .key_generations
            .get(&feed_id)
            .map(|gens| gens.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_encrypted_member_keys(
        &self,
        feed_id: FeedId,
        generation: u64,
    ) -> Result<Vec<EncryptedMemberKey>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .member_keys
            .get(&(feed_id, generation))
            .cloned()
            .unwrap_or_default())
    }

    async fn persist_key_generation(
        &self,
        generation: KeyGeneration,
        keys: Vec<EncryptedMemberKey>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let feed_id = generation.feed_id;

        let current = state
            .groups
            .get(&feed_id)
            .ok_or(StoreError::GroupNotFound(feed_id))?
            .current_key_generation;

        if generation.generation != current + 1 {
            return Err(StoreError::Conflict(format!(
                "generation {} does not continue {} for group {}",
                generation.generation, current, feed_id
            )));
        }

        // Close the superseded epoch; at most one stays open.
        if let Some(previous) = state
            .key_generations
            .entry(feed_id)
            .or_default()
            .get_mut(&current)
        {
            previous.valid_to_block = Some(generation.valid_from_block);
        }

        let new_generation = generation.generation;
        state
            .key_generations
            .entry(feed_id)
            .or_default()
            .insert(new_generation, generation);
        state.member_keys.insert((feed_id, new_generation), keys);
        if let Some(group) = state.groups.get_mut(&feed_id) {
            group.current_key_generation = new_generation;
        }

        debug!(feed = %feed_id, generation = new_generation, "key generation persisted");
        Ok(())
    }

    async fn insert_message(&self, message: FeedMessage) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let feed_id = message.feed_id;
        let block = message.block_index;

        if let Some(feed) = state.feeds.get_mut(&feed_id) {
            feed.last_updated_at_block = block;
        } else if let Some(group) = state.groups.get_mut(&feed_id) {
            group.last_updated_at_block = block;
        } else {
            return Err(StoreError::FeedNotFound(feed_id));
        }

        state.messages.entry(feed_id).or_default().push(message);
        Ok(())
    }

    async fn list_recent_messages(
        &self,
        feed_id: FeedId,
        limit: usize,
    ) -> Result<Vec<FeedMessage>, StoreError> {
        let state = self.state.read().await;
        let Some(messages) = state.messages.get(&feed_id) else {
            return Ok(Vec::new());
        };
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    async fn list_feed_ids_for_user(
        &self,
        user: &PublicAddress,
    ) -> Result<Vec<FeedId>, StoreError> {
        let state = self.state.read().await;
        let mut ids: Vec<FeedId> = Vec::new();

        for (feed_id, participants) in &state.feed_participants {
            if participants.iter().any(|p| &p.participant_address == user) {
                ids.push(*feed_id);
            }
        }
        for (feed_id, participants) in &state.group_participants {
            let visible = participants.iter().any(|p| {
                &p.address == user
                    && p.is_active()
                    && p.participant_type != shared_types::entities::GroupParticipantType::Banned
            });
            if visible {
                ids.push(*feed_id);
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn advance_read_position(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
        block: BlockIndex,
    ) -> Result<BlockIndex, StoreError> {
        let mut state = self.state.write().await;
        let entry = state
            .read_positions
            .entry((user.clone(), feed_id))
            .or_insert(0);
        *entry = (*entry).max(block);
        Ok(*entry)
    }

    async fn get_read_position(
        &self,
        user: &PublicAddress,
        feed_id: FeedId,
    ) -> Result<Option<BlockIndex>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .read_positions
            .get(&(user.clone(), feed_id))
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::entities::{FeedRole, FeedType, GroupParticipantType, RotationTrigger};

    fn personal(owner: &str) -> (Feed, FeedParticipant) {
        let feed_id = FeedId::generate();
        (
            Feed {
                feed_id,
                title: "Personal".to_string(),
                feed_type: FeedType::Personal,
                created_at_block: 1,
                last_updated_at_block: 1,
            },
            FeedParticipant {
                feed_id,
                participant_address: owner.to_string(),
                role: FeedRole::Owner,
                encrypted_feed_key: vec![1, 2, 3],
            },
        )
    }

    fn group(creator: &str, others: &[&str]) -> (GroupFeed, Vec<GroupFeedParticipant>, KeyGeneration, Vec<EncryptedMemberKey>) {
        let feed_id = FeedId::generate();
        let group = GroupFeed {
            feed_id,
            title: "Group".to_string(),
            description: String::new(),
            is_public: true,
            is_deleted: false,
            invite_code: None,
            current_key_generation: 0,
            created_at_block: 1,
            last_updated_at_block: 1,
        };
        let mut participants = vec![GroupFeedParticipant {
            feed_id,
            address: creator.to_string(),
            participant_type: GroupParticipantType::Admin,
            joined_at_block: 1,
            left_at_block: None,
            last_leave_block: None,
        }];
        for other in others {
            participants.push(GroupFeedParticipant {
                feed_id,
                address: (*other).to_string(),
                participant_type: GroupParticipantType::Member,
                joined_at_block: 1,
                left_at_block: None,
                last_leave_block: None,
            });
        }
        let genesis = KeyGeneration {
            feed_id,
            generation: 0,
            valid_from_block: 1,
            valid_to_block: None,
            trigger: RotationTrigger::Join,
        };
        let keys = participants
            .iter()
            .map(|p| EncryptedMemberKey {
                feed_id,
                generation: 0,
                member_address: p.address.clone(),
                encrypted_aes_key: vec![9],
            })
            .collect();
        (group, participants, genesis, keys)
    }

    #[tokio::test]
    async fn test_personal_feed_conditional_insert() {
        let store = MemoryFeedsStore::new();
        let (feed, participant) = personal("alice");

        assert!(store
            .create_personal_feed_if_absent(feed.clone(), participant.clone())
            .await
            .unwrap());

        // A second personal feed for the same owner is a no-op.
        let (feed2, participant2) = personal("alice");
        assert!(!store
            .create_personal_feed_if_absent(feed2, participant2)
            .await
            .unwrap());

        let stored = store
            .get_personal_feed_of(&"alice".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.feed_id, feed.feed_id);
    }

    #[tokio::test]
    async fn test_group_insert_and_lookup() {
        let store = MemoryFeedsStore::new();
        let (g, ps, genesis, keys) = group("alice", &["charlie"]);
        let feed_id = g.feed_id;

        store.insert_group_feed(g, ps, genesis, keys).await.unwrap();

        let stored = store.get_group_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(stored.current_key_generation, 0);
        assert_eq!(store.count_admins(feed_id).await.unwrap(), 1);
        assert_eq!(
            store
                .list_encrypted_member_keys(feed_id, 0)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_persist_key_generation_advances_pointer() {
        let store = MemoryFeedsStore::new();
        let (g, ps, genesis, keys) = group("alice", &["charlie"]);
        let feed_id = g.feed_id;
        store.insert_group_feed(g, ps, genesis, keys).await.unwrap();

        store
            .persist_key_generation(
                KeyGeneration {
                    feed_id,
                    generation: 1,
                    valid_from_block: 10,
                    valid_to_block: None,
                    trigger: RotationTrigger::Join,
                },
                vec![],
            )
            .await
            .unwrap();

        let group = store.get_group_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(group.current_key_generation, 1);

        let generations = store.list_key_generations(feed_id).await.unwrap();
        assert_eq!(generations.len(), 2);
        // The superseded epoch closes at the new epoch's start.
        assert_eq!(generations[0].valid_to_block, Some(10));
        assert_eq!(generations[1].valid_to_block, None);
    }

    #[tokio::test]
    async fn test_persist_key_generation_rejects_gaps() {
        let store = MemoryFeedsStore::new();
        let (g, ps, genesis, keys) = group("alice", &[]);
        let feed_id = g.feed_id;
        store.insert_group_feed(g, ps, genesis, keys).await.unwrap();

        let result = store
            .persist_key_generation(
                KeyGeneration {
                    feed_id,
                    generation: 3,
                    valid_from_block: 10,
                    valid_to_block: None,
                    trigger: RotationTrigger::Manual,
                },
                vec![],
            )
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_message_bumps_last_updated() {
        let store = MemoryFeedsStore::new();
        let (feed, participant) = personal("alice");
        let feed_id = feed.feed_id;
        store
            .create_personal_feed_if_absent(feed, participant)
            .await
            .unwrap();

        store
            .insert_message(FeedMessage {
                message_id: uuid::Uuid::new_v4(),
                feed_id,
                ciphertext: vec![1],
                issuer_address: "alice".to_string(),
                timestamp: 1000,
                block_index: 9,
                reply_to: None,
                author_commitment: None,
                key_generation: None,
            })
            .await
            .unwrap();

        let stored = store.get_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(stored.last_updated_at_block, 9);
    }

    #[tokio::test]
    async fn test_recent_messages_keeps_tail() {
        let store = MemoryFeedsStore::new();
        let (feed, participant) = personal("alice");
        let feed_id = feed.feed_id;
        store
            .create_personal_feed_if_absent(feed, participant)
            .await
            .unwrap();

        for block in 1..=5 {
            store
                .insert_message(FeedMessage {
                    message_id: uuid::Uuid::new_v4(),
                    feed_id,
                    ciphertext: vec![block as u8],
                    issuer_address: "alice".to_string(),
                    timestamp: 1000 + block,
                    block_index: block,
                    reply_to: None,
                    author_commitment: None,
                    key_generation: None,
                })
                .await
                .unwrap();
        }

        let recent = store.list_recent_messages(feed_id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].block_index, 4);
        assert_eq!(recent[1].block_index, 5);
    }

    #[tokio::test]
    async fn test_feed_ids_for_user_excludes_banned() {
        let store = MemoryFeedsStore::new();
        let (g, mut ps, genesis, keys) = group("alice", &["bob"]);
        let feed_id = g.feed_id;
        ps[1].participant_type = GroupParticipantType::Banned;
        store.insert_group_feed(g, ps, genesis, keys).await.unwrap();

        assert_eq!(
            store
                .list_feed_ids_for_user(&"alice".to_string())
                .await
                .unwrap(),
            vec![feed_id]
        );
        assert!(store
            .list_feed_ids_for_user(&"bob".to_string())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_read_position_is_max_wins() {
        let store = MemoryFeedsStore::new();
        let feed_id = FeedId::generate();
        let user = "alice".to_string();

        assert_eq!(
            store.advance_read_position(&user, feed_id, 10).await.unwrap(),
            10
        );
        // A lower proposal loses.
        assert_eq!(
            store.advance_read_position(&user, feed_id, 4).await.unwrap(),
            10
        );
        assert_eq!(
            store.get_read_position(&user, feed_id).await.unwrap(),
            Some(10)
        );
    }
}
