//! End-to-end feed lifecycles over the fully wired node.

#[cfg(test)]
mod tests {
    use crate::integration::harness::TestNet;
    use feeds_store::FeedsStore;
    use shared_types::collaborators::CredentialsProvider;
    use shared_types::entities::{FeedId, FeedType, GroupParticipantType};
    use shared_types::transactions::{
        GroupModerationPayload, JoinGroupFeedPayload, LeaveGroupFeedPayload,
        NewGroupFeedMessagePayload, TransactionPayload,
    };

    async fn keyed_members(net: &TestNet, feed_id: FeedId, generation: u64) -> Vec<String> {
        let mut members: Vec<String> = net
            .node
            .store
            .list_encrypted_member_keys(feed_id, generation)
            .await
            .unwrap()
            .iter()
            .map(|k| k.member_address.clone())
            .collect();
        members.sort();
        members
    }

    /// Scenario: personal feed self-bootstrap. The operator starts with
    /// nothing, the init workflow synthesizes the creation transaction,
    /// and indexing the produced block leaves exactly one personal feed.
    #[tokio::test]
    async fn test_personal_feed_self_bootstrap() {
        let net = TestNet::new();
        let operator = net.node.credentials.get().public_signing_address;

        net.node.clock.set(1);
        net.node.initializer.ensure_personal_feed().await.unwrap();

        let queued = net.node.mempool.drain();
        assert_eq!(queued.len(), 1);
        net.apply(1, queued).await.unwrap();

        let feed = net
            .node
            .store
            .get_personal_feed_of(&operator)
            .await
            .unwrap()
            .expect("personal feed");
        assert_eq!(feed.feed_type, FeedType::Personal);
        assert_eq!(feed.created_at_block, 1);

        let participants = net.node.store.list_feed_participants(feed.feed_id).await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].participant_address, operator);
        assert!(!participants[0].encrypted_feed_key.is_empty());

        // The wrap opens with the operator's own encryption key on the
        // client side; the node never sees the plaintext again.
    }

    /// Scenario: chat feed creation and per-user cache metadata.
    #[tokio::test]
    async fn test_chat_feed_metadata() {
        let mut net = TestNet::new();
        net.user("alice", "Alice");
        net.user("bob", "Bob");

        let feed_id = FeedId::generate();
        let accepted = net
            .run_one(2, "alice", net.chat_payload(feed_id, "alice", "bob"))
            .await
            .unwrap();
        assert!(accepted);

        let participants = net.node.store.list_feed_participants(feed_id).await.unwrap();
        assert_eq!(participants.len(), 2);

        let alice_view = net.node.views.feed_metadata(&"alice".to_string()).await.unwrap();
        let entry = &alice_view[&feed_id];
        assert_eq!(entry.title, "Bob");
        assert_eq!(entry.feed_type, FeedType::Chat);
        let mut addresses = entry.participants.clone();
        addresses.sort();
        assert_eq!(addresses, vec!["alice", "bob"]);

        let bob_view = net.node.views.feed_metadata(&"bob".to_string()).await.unwrap();
        assert_eq!(bob_view[&feed_id].title, "Alice");
    }

    /// Scenarios 3-6 of the group lifecycle, continuing state:
    /// creation, join, ban, block, leave and cooldown-gated rejoin.
    #[tokio::test]
    async fn test_group_lifecycle() {
        let mut net = TestNet::new();
        net.user("alice", "Alice");
        net.user("bob", "Bob");
        net.user("charlie", "Charlie");

        // Creation with {alice, charlie}: KeyGen 0 covers exactly them.
        let feed_id = FeedId::generate();
        let accepted = net
            .run_one(
                5,
                "alice",
                net.group_payload(feed_id, "Reading club", true, &["alice", "charlie"]),
            )
            .await
            .unwrap();
        assert!(accepted);

        let group = net.node.store.get_group_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(group.current_key_generation, 0);
        assert_eq!(keyed_members(&net, feed_id, 0).await, vec!["alice", "charlie"]);
        let alice = net
            .node
            .store
            .get_group_participant(feed_id, &"alice".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice.participant_type, GroupParticipantType::Admin);

        // Bob joins at block 10: generation 1 covers all three.
        let accepted = net
            .run_one(
                10,
                "bob",
                TransactionPayload::JoinGroupFeed(JoinGroupFeedPayload {
                    feed_id,
                    invitation_token: None,
                }),
            )
            .await
            .unwrap();
        assert!(accepted);

        let group = net.node.store.get_group_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(group.current_key_generation, 1);
        assert_eq!(group.last_updated_at_block, 10);
        let bob = net
            .node
            .store
            .get_group_participant(feed_id, &"bob".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob.participant_type, GroupParticipantType::Member);
        assert_eq!(bob.joined_at_block, 10);
        assert_eq!(
            keyed_members(&net, feed_id, 1).await,
            vec!["alice", "bob", "charlie"]
        );

        // Bob can actually open his epoch-1 wrap.
        let bob_wrap = net
            .node
            .store
            .list_encrypted_member_keys(feed_id, 1)
            .await
            .unwrap()
            .into_iter()
            .find(|k| k.member_address == "bob")
            .unwrap();
        let epoch_key = net.user_of("bob").encryption.decrypt(&bob_wrap.encrypted_aes_key).unwrap();
        assert_eq!(epoch_key.len(), 32);

        // Ban charlie at 20: generation 2 excludes him, his views drop
        // the group.
        let accepted = net
            .run_one(
                20,
                "alice",
                TransactionPayload::BanFromGroupFeed(GroupModerationPayload {
                    feed_id,
                    member_address: "charlie".to_string(),
                }),
            )
            .await
            .unwrap();
        assert!(accepted);

        let charlie = net
            .node
            .store
            .get_group_participant(feed_id, &"charlie".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(charlie.participant_type, GroupParticipantType::Banned);
        assert_eq!(keyed_members(&net, feed_id, 2).await, vec!["alice", "bob"]);
        assert!(!net
            .node
            .views
            .user_feeds(&"charlie".to_string())
            .await
            .unwrap()
            .contains(&feed_id));

        // Block bob at 30: role flips, no rotation, bob still keyed in
        // the latest epoch.
        let accepted = net
            .run_one(
                30,
                "alice",
                TransactionPayload::BlockMember(GroupModerationPayload {
                    feed_id,
                    member_address: "bob".to_string(),
                }),
            )
            .await
            .unwrap();
        assert!(accepted);

        let group = net.node.store.get_group_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(group.current_key_generation, 2);
        let bob = net
            .node
            .store
            .get_group_participant(feed_id, &"bob".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob.participant_type, GroupParticipantType::Blocked);
        assert!(keyed_members(&net, feed_id, 2).await.contains(&"bob".to_string()));

        // Unblock so bob can act again, then he leaves at 50.
        assert!(net
            .run_one(
                31,
                "alice",
                TransactionPayload::UnblockMember(GroupModerationPayload {
                    feed_id,
                    member_address: "bob".to_string(),
                }),
            )
            .await
            .unwrap());
        assert!(net
            .run_one(
                50,
                "bob",
                TransactionPayload::LeaveGroupFeed(LeaveGroupFeedPayload { feed_id }),
            )
            .await
            .unwrap());

        // Rejoin at 100: 50 blocks since leaving, inside the cooldown.
        let accepted = net
            .run_one(
                100,
                "bob",
                TransactionPayload::JoinGroupFeed(JoinGroupFeedPayload {
                    feed_id,
                    invitation_token: None,
                }),
            )
            .await
            .unwrap();
        assert!(!accepted);

        // Rejoin at 150: cooldown elapsed, a fresh epoch appears.
        let generations_before = net.node.store.list_key_generations(feed_id).await.unwrap().len();
        let accepted = net
            .run_one(
                150,
                "bob",
                TransactionPayload::JoinGroupFeed(JoinGroupFeedPayload {
                    feed_id,
                    invitation_token: None,
                }),
            )
            .await
            .unwrap();
        assert!(accepted);

        let generations_after = net.node.store.list_key_generations(feed_id).await.unwrap();
        assert_eq!(generations_after.len(), generations_before + 1);
        let bob = net
            .node
            .store
            .get_group_participant(feed_id, &"bob".to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(bob.is_active());
        assert_eq!(bob.joined_at_block, 150);
    }

    /// The unbanned member has wraps only from the unban epoch onward.
    #[tokio::test]
    async fn test_unban_cannot_read_ban_era() {
        let mut net = TestNet::new();
        net.user("alice", "Alice");
        net.user("bob", "Bob");

        let feed_id = FeedId::generate();
        assert!(net
            .run_one(
                5,
                "alice",
                net.group_payload(feed_id, "G", true, &["alice", "bob"]),
            )
            .await
            .unwrap());
        assert!(net
            .run_one(
                10,
                "alice",
                TransactionPayload::BanFromGroupFeed(GroupModerationPayload {
                    feed_id,
                    member_address: "bob".to_string(),
                }),
            )
            .await
            .unwrap());
        // Traffic during the ban era rotates nothing further here; the
        // ban epoch (1) simply has no wrap for bob.
        assert!(net
            .run_one(
                20,
                "alice",
                TransactionPayload::UnbanFromGroupFeed(GroupModerationPayload {
                    feed_id,
                    member_address: "bob".to_string(),
                }),
            )
            .await
            .unwrap());

        let group = net.node.store.get_group_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(group.current_key_generation, 2);

        for generation in 0..=2u64 {
            let keyed = keyed_members(&net, feed_id, generation).await;
            let has_bob = keyed.contains(&"bob".to_string());
            // Wraps exist for bob in the genesis and unban epochs only.
            assert_eq!(has_bob, generation != 1, "generation {generation}");
        }

        let bob = net
            .node
            .store
            .get_group_participant(feed_id, &"bob".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob.participant_type, GroupParticipantType::Member);
    }

    /// Group messages carry their epoch and land in the store and the
    /// write-through cache.
    #[tokio::test]
    async fn test_group_message_flow() {
        let mut net = TestNet::new();
        net.user("alice", "Alice");
        net.user("bob", "Bob");

        let feed_id = FeedId::generate();
        assert!(net
            .run_one(
                5,
                "alice",
                net.group_payload(feed_id, "G", true, &["alice", "bob"]),
            )
            .await
            .unwrap());

        let accepted = net
            .run_one(
                7,
                "bob",
                TransactionPayload::NewGroupFeedMessage(NewGroupFeedMessagePayload {
                    feed_id,
                    message_id: uuid::Uuid::new_v4(),
                    ciphertext: vec![0xC0; 48],
                    timestamp: 1_700_000,
                    reply_to: None,
                    author_commitment: Some(vec![0xAB; 32]),
                    key_generation: 0,
                }),
            )
            .await
            .unwrap();
        assert!(accepted);

        let messages = net.node.views.recent_messages(feed_id, 10).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].key_generation, Some(0));
        assert_eq!(messages[0].issuer_address, "bob");

        let group = net.node.store.get_group_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(group.last_updated_at_block, 7);
    }

    /// The key-generation document view tracks the epochs.
    #[tokio::test]
    async fn test_key_generation_document_view() {
        let mut net = TestNet::new();
        net.user("alice", "Alice");
        net.user("bob", "Bob");

        let feed_id = FeedId::generate();
        assert!(net
            .run_one(5, "alice", net.group_payload(feed_id, "G", true, &["alice"]))
            .await
            .unwrap());
        assert!(net
            .run_one(
                10,
                "bob",
                TransactionPayload::JoinGroupFeed(JoinGroupFeedPayload {
                    feed_id,
                    invitation_token: None,
                }),
            )
            .await
            .unwrap());

        let document = net
            .node
            .views
            .key_generation_document(feed_id)
            .await
            .unwrap()
            .expect("document");
        assert_eq!(document.current_generation, 1);
        assert_eq!(document.generations.len(), 2);
        // The superseded epoch closed when the join epoch began.
        assert_eq!(document.generations[0].valid_to_block, Some(10));
        assert_eq!(document.generations[1].valid_to_block, None);
    }
}
