use {
    super::repository::Repository,
    crate::{
        api::ws::UpdateEvent,
        config::AuctionConfig,
        store::DocumentStore,
    },
    std::sync::Arc,
    tokio::sync::broadcast,
};

pub mod conclude_auction;
pub mod get_auction;
pub mod start_auction;
pub mod submit_bid;
pub mod subscribe_auction;
pub mod track_viewers;
pub mod verification;

pub struct ServiceInner {
    repo:   Arc<Repository>,
    config: AuctionConfig,
}

#[derive(Clone)]
pub struct Service(Arc<ServiceInner>);
impl std::ops::Deref for Service {
    type Target = ServiceInner;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Service {
    pub fn new(
        db: DocumentStore,
        config: AuctionConfig,
        event_sender: broadcast::Sender<UpdateEvent>,
    ) -> Self {
        Self(Arc::new(ServiceInner {
            repo: Arc::new(Repository::new(db, event_sender)),
            config,
        }))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{
            conclude_auction::ConcludeAuctionInput,
            get_auction::GetAuctionInput,
            start_auction::StartAuctionInput,
            submit_bid::SubmitBidInput,
            subscribe_auction::SubscribeAuctionInput,
            track_viewers::TrackViewerInput,
            Service,
        },
        crate::{
            api::{
                ws::UpdateEvent,
                RestError,
            },
            auction::entities::{
                now_millis,
                AuctionRecord,
                AuctionStatus,
            },
            config::AuctionConfig,
            store::DocumentStore,
        },
        futures::{
            future::join_all,
            StreamExt,
        },
        live_auction_api_types::auction::{
            ItemSpec,
            StreamSession,
        },
        std::time::Duration,
        uuid::Uuid,
    };

    // Generous slack for the wall clock moving between the service taking
    // its snapshot and the assertion.
    const CLOCK_SLACK_MS: i64 = 2_000;

    fn test_service() -> Service {
        let (event_sender, _event_receiver) = tokio::sync::broadcast::channel(100);
        Service::new(DocumentStore::new(), AuctionConfig::default(), event_sender)
    }

    fn item(start_price: u64, bid_increment: u64) -> ItemSpec {
        ItemSpec {
            name: "Vintage denim jacket".to_string(),
            start_price,
            bid_increment,
            image_url: None,
        }
    }

    async fn start(service: &Service, start_price: u64, duration: Duration) -> AuctionRecord {
        service
            .start_auction(StartAuctionInput {
                item: item(start_price, 50),
                duration,
                stream_session: None,
            })
            .await
            .expect("auction should start")
    }

    async fn bid(
        service: &Service,
        auction_id: Uuid,
        amount: u64,
        bidder: &str,
    ) -> Result<u64, RestError> {
        service
            .submit_bid(SubmitBidInput {
                auction_id,
                amount,
                bidder: bidder.to_string(),
            })
            .await
            .map(|receipt| receipt.amount)
    }

    #[tokio::test]
    async fn start_produces_a_fresh_active_record() {
        let service = test_service();
        let before = now_millis();
        let record = start(&service, 100, Duration::from_secs(60)).await;

        assert_eq!(record.status, AuctionStatus::Active);
        assert_eq!(record.current_bid, 100);
        assert_eq!(record.current_bidder, None);
        assert_eq!(record.viewer_count, 0);
        let expected_end = before + 60_000;
        assert!(record.end_time >= expected_end);
        assert!(record.end_time <= expected_end + CLOCK_SLACK_MS);

        let fetched = service
            .get_auction(GetAuctionInput {
                auction_id: record.id,
            })
            .await
            .unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn invalid_item_creates_no_record() {
        let service = test_service();
        for (start_price, bid_increment, duration) in [
            (0, 50, Duration::from_secs(60)),
            (100, 0, Duration::from_secs(60)),
            (100, 50, Duration::ZERO),
        ] {
            let result = service
                .start_auction(StartAuctionInput {
                    item:           item(start_price, bid_increment),
                    duration,
                    stream_session: None,
                })
                .await;
            assert!(matches!(result, Err(RestError::BadParameters(_))));
        }
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let service = test_service();
        let record = start(&service, 100, Duration::from_secs(600)).await;
        let auction_id = record.id;

        assert_eq!(bid(&service, auction_id, 150, "alice").await, Ok(150));

        assert_eq!(
            bid(&service, auction_id, 140, "bob").await,
            Err(RestError::BidTooLow { current_bid: 150 })
        );

        assert_eq!(bid(&service, auction_id, 200, "bob").await, Ok(200));
        let current = service
            .get_auction(GetAuctionInput { auction_id })
            .await
            .unwrap();
        assert_eq!(current.current_bid, 200);
        assert_eq!(current.current_bidder.as_deref(), Some("bob"));

        let concluded = service
            .conclude_auction(ConcludeAuctionInput { auction_id })
            .await
            .unwrap();
        assert_eq!(concluded.status, AuctionStatus::Ended);
        assert_eq!(concluded.stream_session, None);

        assert_eq!(
            bid(&service, auction_id, 250, "alice").await,
            Err(RestError::AuctionClosed)
        );
        let frozen = service
            .get_auction(GetAuctionInput { auction_id })
            .await
            .unwrap();
        assert_eq!(frozen.current_bid, 200);
        assert_eq!(frozen.current_bidder.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn highest_bidder_cannot_raise_their_own_bid() {
        let service = test_service();
        let record = start(&service, 100, Duration::from_secs(600)).await;

        assert_eq!(bid(&service, record.id, 150, "alice").await, Ok(150));
        assert_eq!(
            bid(&service, record.id, 500, "alice").await,
            Err(RestError::AlreadyHighestBidder)
        );
    }

    #[tokio::test]
    async fn bid_on_unknown_auction_is_not_found() {
        let service = test_service();
        assert_eq!(
            bid(&service, Uuid::new_v4(), 150, "alice").await,
            Err(RestError::AuctionNotFound)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_equal_bids_have_exactly_one_winner() {
        let service = test_service();
        let record = start(&service, 100, Duration::from_secs(600)).await;
        let auction_id = record.id;

        // Both clients computed 100 + 50 from the same snapshot.
        let outcomes: Vec<Result<u64, RestError>> = join_all((0..2).map(|index| {
            let service = service.clone();
            tokio::spawn(async move {
                bid(&service, auction_id, 150, &format!("bidder-{}", index)).await
            })
        }))
        .await
        .into_iter()
        .map(|joined| joined.expect("bidder task should not panic"))
        .collect();

        let accepted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        assert_eq!(accepted, 1);
        // The loser sees the winner's amount as the new floor.
        assert!(outcomes
            .iter()
            .any(|outcome| *outcome == Err(RestError::BidTooLow { current_bid: 150 })));

        let current = service
            .get_auction(GetAuctionInput { auction_id })
            .await
            .unwrap();
        assert_eq!(current.current_bid, 150);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bidding_keeps_the_bid_monotonic() {
        let service = test_service();
        let record = start(&service, 100, Duration::from_secs(600)).await;
        let auction_id = record.id;

        let amounts: Vec<u64> = (1..=32).map(|step| 100 + step * 10).collect();
        let outcomes: Vec<Result<u64, RestError>> = join_all(amounts.iter().map(|&amount| {
            let service = service.clone();
            tokio::spawn(async move {
                bid(&service, auction_id, amount, &format!("bidder-{}", amount)).await
            })
        }))
        .await
        .into_iter()
        .map(|joined| joined.expect("bidder task should not panic"))
        .collect();

        let mut accepted: Vec<u64> = outcomes.into_iter().filter_map(Result::ok).collect();
        assert!(!accepted.is_empty());
        // Accepted amounts are unique, and the record ends at the largest.
        accepted.sort_unstable();
        accepted.dedup();
        let current = service
            .get_auction(GetAuctionInput { auction_id })
            .await
            .unwrap();
        assert_eq!(current.current_bid, *accepted.last().unwrap());
        assert_eq!(amounts.last(), accepted.last());
        // Every rejection was a floor rejection against some accepted amount.
        assert!(current.current_bid >= 100);
    }

    #[tokio::test]
    async fn late_bid_extends_the_countdown_from_now() {
        let service = test_service();
        // Deadline inside the 10s anti-snipe window from the start.
        let record = start(&service, 100, Duration::from_secs(5)).await;

        let before = now_millis();
        let receipt = service
            .submit_bid(SubmitBidInput {
                auction_id: record.id,
                amount:     150,
                bidder:     "alice".to_string(),
            })
            .await
            .unwrap();

        // now + 15s, not old_end + 15s.
        assert!(receipt.end_time >= before + 15_000);
        assert!(receipt.end_time <= before + 15_000 + CLOCK_SLACK_MS);
        assert!(receipt.end_time > record.end_time);
    }

    #[tokio::test]
    async fn conclude_is_idempotent() {
        let service = test_service();
        let record = start(&service, 100, Duration::from_secs(600)).await;

        let first = service
            .conclude_auction(ConcludeAuctionInput {
                auction_id: record.id,
            })
            .await
            .unwrap();
        assert_eq!(first.status, AuctionStatus::Ended);

        let second = service
            .conclude_auction(ConcludeAuctionInput {
                auction_id: record.id,
            })
            .await
            .unwrap();
        assert_eq!(second.status, AuctionStatus::Ended);
    }

    #[tokio::test]
    async fn conclude_detaches_the_stream_session() {
        let service = test_service();
        let record = service
            .start_auction(StartAuctionInput {
                item:           item(100, 50),
                duration:       Duration::from_secs(600),
                stream_session: Some(StreamSession {
                    room_id:   "room-7".to_string(),
                    stream_id: "stream-7".to_string(),
                }),
            })
            .await
            .unwrap();
        assert!(record.stream_session.is_some());

        let concluded = service
            .conclude_auction(ConcludeAuctionInput {
                auction_id: record.id,
            })
            .await
            .unwrap();
        assert_eq!(concluded.status, AuctionStatus::Ended);
        assert_eq!(concluded.stream_session, None);
    }

    #[tokio::test]
    async fn viewer_counts_track_joins_and_leaves() {
        let service = test_service();
        let record = start(&service, 100, Duration::from_secs(600)).await;
        let input = TrackViewerInput {
            auction_id: record.id,
        };

        service.viewer_joined(input.clone()).await.unwrap();
        service.viewer_joined(input.clone()).await.unwrap();
        service.viewer_left(input.clone()).await.unwrap();
        let current = service
            .get_auction(GetAuctionInput {
                auction_id: record.id,
            })
            .await
            .unwrap();
        assert_eq!(current.viewer_count, 1);

        // Leaving twice more clamps at zero instead of underflowing.
        service.viewer_left(input.clone()).await.unwrap();
        service.viewer_left(input).await.unwrap();
        let current = service
            .get_auction(GetAuctionInput {
                auction_id: record.id,
            })
            .await
            .unwrap();
        assert_eq!(current.viewer_count, 0);
    }

    #[tokio::test]
    async fn subscription_sees_the_current_state_then_each_commit() {
        let service = test_service();
        let record = start(&service, 100, Duration::from_secs(600)).await;

        let stream = service
            .subscribe_auction(SubscribeAuctionInput {
                auction_id: record.id,
            })
            .await
            .unwrap();
        futures::pin_mut!(stream);

        let initial = stream.next().await.unwrap();
        assert_eq!(initial.current_bid, 100);

        bid(&service, record.id, 150, "alice").await.unwrap();
        let updated = stream.next().await.unwrap();
        assert_eq!(updated.current_bid, 150);
        assert_eq!(updated.current_bidder.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn event_channel_sees_commits_in_commit_order() {
        let (event_sender, mut event_receiver) = tokio::sync::broadcast::channel(100);
        let service = Service::new(DocumentStore::new(), AuctionConfig::default(), event_sender);
        let record = start(&service, 100, Duration::from_secs(600)).await;

        bid(&service, record.id, 150, "alice").await.unwrap();
        bid(&service, record.id, 200, "bob").await.unwrap();

        // Coalescing may skip intermediate snapshots, but the delivered
        // sequence must follow the committed one: never a lower bid after a
        // higher one.
        let mut last = 0;
        while last < 200 {
            let UpdateEvent::AuctionUpdate(snapshot) = event_receiver
                .recv()
                .await
                .expect("event channel should stay open");
            assert!(snapshot.current_bid >= last);
            last = snapshot.current_bid;
        }
    }

    #[tokio::test]
    async fn subscribing_to_unknown_auction_fails() {
        let service = test_service();
        let result = service
            .subscribe_auction(SubscribeAuctionInput {
                auction_id: Uuid::new_v4(),
            })
            .await;
        assert!(matches!(result, Err(RestError::AuctionNotFound)));
    }
}
