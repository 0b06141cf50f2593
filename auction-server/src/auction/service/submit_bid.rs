use {
    super::{
        verification::validate_bid,
        Service,
    },
    crate::{
        api::RestError,
        auction::entities,
    },
    live_auction_api_types::BidderId,
};

pub struct SubmitBidInput {
    pub auction_id: entities::AuctionId,
    pub amount:     u64,
    pub bidder:     BidderId,
}

impl Service {
    /// The only path by which a bid reaches persistent state. The validator
    /// runs inside the store transaction; under contention the store re-runs
    /// it against the freshly committed record, so "highest bid wins"
    /// without any explicit locking.
    #[tracing::instrument(
        skip_all,
        fields(
            auction_id = %input.auction_id,
            bidder = %input.bidder,
            amount = input.amount,
        ),
        err(level = tracing::Level::TRACE)
    )]
    pub async fn submit_bid(
        &self,
        input: SubmitBidInput,
    ) -> Result<entities::BidReceipt, RestError> {
        let committed = self
            .repo
            .update_auction(input.auction_id, |current| {
                // One clock snapshot per attempt, taken where the commit is
                // serialized, so anti-sniping never trusts a client clock.
                let now = entities::now_millis();
                validate_bid(current, input.amount, &input.bidder, now, &self.config)
            })
            .await?;
        tracing::debug!(end_time = committed.end_time, "Bid committed");
        Ok(entities::BidReceipt {
            auction_id: committed.id,
            amount:     committed.current_bid,
            end_time:   committed.end_time,
        })
    }
}
