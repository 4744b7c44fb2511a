//! Boundary tests: cooldown edge, grace-window edge, rotation caps and
//! title bounds, all through the wired pipeline.

#[cfg(test)]
mod tests {
    use crate::integration::harness::TestNet;
    use feeds_keyring::{RotationEngine, RotationError};
    use feeds_store::FeedsStore;
    use shared_types::config::FeedsConfig;
    use shared_types::entities::{FeedId, RotationTrigger};
    use shared_types::transactions::{
        JoinGroupFeedPayload, LeaveGroupFeedPayload, NewGroupFeedMessagePayload,
        TransactionPayload,
    };
    use std::sync::Arc;

    fn join(feed_id: FeedId) -> TransactionPayload {
        TransactionPayload::JoinGroupFeed(JoinGroupFeedPayload {
            feed_id,
            invitation_token: None,
        })
    }

    fn group_message(feed_id: FeedId, generation: u64) -> TransactionPayload {
        TransactionPayload::NewGroupFeedMessage(NewGroupFeedMessagePayload {
            feed_id,
            message_id: uuid::Uuid::new_v4(),
            ciphertext: vec![1, 2, 3],
            timestamp: 1,
            reply_to: None,
            author_commitment: None,
            key_generation: generation,
        })
    }

    /// Rejoin at exactly `last_leave + cooldown` is allowed; one block
    /// earlier is rejected.
    #[tokio::test]
    async fn test_rejoin_cooldown_exact_boundary() {
        let mut net = TestNet::new();
        net.user("alice", "Alice");
        net.user("bob", "Bob");

        let feed_id = FeedId::generate();
        assert!(net
            .run_one(
                1,
                "alice",
                net.group_payload(feed_id, "G", true, &["alice"]),
            )
            .await
            .unwrap());
        assert!(net.run_one(10, "bob", join(feed_id)).await.unwrap());
        assert!(net
            .run_one(
                50,
                "bob",
                TransactionPayload::LeaveGroupFeed(LeaveGroupFeedPayload { feed_id }),
            )
            .await
            .unwrap());

        // last_leave + 99: rejected.
        assert!(!net.run_one(149, "bob", join(feed_id)).await.unwrap());
        // last_leave + 100: accepted.
        assert!(net.run_one(150, "bob", join(feed_id)).await.unwrap());
    }

    /// Previous-generation messages pass at delta 4 after the rotation
    /// and fail at delta 5.
    #[tokio::test]
    async fn test_grace_window_exact_boundary() {
        let mut net = TestNet::new();
        net.user("alice", "Alice");
        net.user("bob", "Bob");

        let feed_id = FeedId::generate();
        assert!(net
            .run_one(
                1,
                "alice",
                net.group_payload(feed_id, "G", true, &["alice"]),
            )
            .await
            .unwrap());
        // Rotation at block 100 (bob joins): epoch 1 valid from 100.
        assert!(net.run_one(100, "bob", join(feed_id)).await.unwrap());

        // Old-epoch message at delta 4: accepted.
        assert!(net
            .run_one(104, "alice", group_message(feed_id, 0))
            .await
            .unwrap());
        // At delta 5: rejected.
        assert!(!net
            .run_one(105, "alice", group_message(feed_id, 0))
            .await
            .unwrap());
        // The current epoch is always accepted.
        assert!(net
            .run_one(105, "alice", group_message(feed_id, 1))
            .await
            .unwrap());
    }

    /// Rotation membership bounds: the cap is inclusive, one past it
    /// fails, and zero entitled members always fails.
    #[tokio::test]
    async fn test_rotation_membership_caps() {
        let mut net = TestNet::new();
        net.user("alice", "Alice");

        let feed_id = FeedId::generate();
        assert!(net
            .run_one(
                1,
                "alice",
                net.group_payload(feed_id, "G", true, &["alice"]),
            )
            .await
            .unwrap());

        // Tighten the cap so the boundary is cheap to reach: 3 members
        // rotate, 4 do not.
        let mut config = FeedsConfig::default();
        config.max_members_per_rotation = 3;
        let engine = RotationEngine::new(
            net.node.store.clone(),
            net.node.identity.clone(),
            config,
        );

        for (index, member) in ["bob", "carol"].iter().enumerate() {
            net.user(member, member);
            assert!(net
                .run_one(10 + index as u64, member, join(feed_id))
                .await
                .unwrap());
        }

        // Exactly at the cap: succeeds.
        let outcome = engine
            .rotate(feed_id, RotationTrigger::Manual, None, None, 20)
            .await
            .unwrap();
        assert_eq!(outcome.payload.encrypted_keys.len(), 3);

        // One over the cap: fails.
        net.user("dave", "Dave");
        assert!(net.run_one(21, "dave", join(feed_id)).await.unwrap());
        let result = engine
            .rotate(feed_id, RotationTrigger::Manual, None, None, 22)
            .await;
        assert!(matches!(
            result,
            Err(RotationError::OversizedMembership { count: 4, max: 3 })
        ));

        // Zero entitled members: fails. Build an engine over an empty
        // membership by draining everyone via the leaving delta on a
        // one-member group.
        let solo = FeedId::generate();
        net.user("erin", "Erin");
        assert!(net
            .run_one(30, "erin", net.group_payload(solo, "Solo", true, &["erin"]))
            .await
            .unwrap());
        let default_engine: Arc<RotationEngine> = net.node.keyring.clone();
        let result = default_engine
            .rotate(
                solo,
                RotationTrigger::Leave,
                None,
                Some(&"erin".to_string()),
                31,
            )
            .await;
        assert!(matches!(result, Err(RotationError::EmptyMembership(_))));
    }

    /// The full default cap: 512 entitled members rotate, 513 do not.
    /// Kept `ignore`d for routine runs; the 500+ ECDH wraps take a
    /// while under the test profile.
    #[tokio::test]
    #[ignore]
    async fn test_rotation_default_cap_512() {
        let mut net = TestNet::new();
        net.user("alice", "Alice");

        let feed_id = FeedId::generate();
        assert!(net
            .run_one(1, "alice", net.group_payload(feed_id, "G", true, &["alice"]))
            .await
            .unwrap());

        for index in 0..511 {
            let member = format!("member-{index}");
            net.user(&member, &member);
            assert!(net
                .run_one(10 + index as u64, &member, join(feed_id))
                .await
                .unwrap());
        }

        // 512 entitled members: the rotation succeeds.
        let outcome = net
            .node
            .keyring
            .rotate(feed_id, RotationTrigger::Manual, None, None, 600)
            .await
            .unwrap();
        assert_eq!(outcome.payload.encrypted_keys.len(), 512);

        // 513: fails.
        net.user("overflow", "Overflow");
        assert!(net.run_one(601, "overflow", join(feed_id)).await.unwrap());
        let result = net
            .node
            .keyring
            .rotate(feed_id, RotationTrigger::Manual, None, None, 602)
            .await;
        assert!(matches!(
            result,
            Err(RotationError::OversizedMembership { count: 513, max: 512 })
        ));
    }

    /// Group titles: 100 code points accepted, 101 rejected, both at
    /// creation and on update.
    #[tokio::test]
    async fn test_title_length_boundary() {
        let mut net = TestNet::new();
        net.user("alice", "Alice");

        let at_limit = FeedId::generate();
        assert!(net
            .run_one(
                1,
                "alice",
                net.group_payload(at_limit, &"x".repeat(100), true, &["alice"]),
            )
            .await
            .unwrap());

        let over_limit = FeedId::generate();
        assert!(!net
            .run_one(
                2,
                "alice",
                net.group_payload(over_limit, &"x".repeat(101), true, &["alice"]),
            )
            .await
            .unwrap());
        assert!(net.node.store.get_group_feed(over_limit).await.unwrap().is_none());
    }
}
