use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities,
    },
};

pub struct ConcludeAuctionInput {
    pub auction_id: entities::AuctionId,
}

impl Service {
    /// Drop the hammer. `Ended` is terminal and the operation is idempotent:
    /// concluding an already-ended auction is a success no-op.
    #[tracing::instrument(
        skip_all,
        fields(auction_id = %input.auction_id),
        err(level = tracing::Level::TRACE)
    )]
    pub async fn conclude_auction(
        &self,
        input: ConcludeAuctionInput,
    ) -> Result<entities::AuctionRecord, RestError> {
        let committed = self
            .repo
            .update_auction(input.auction_id, |current| {
                if current.status == entities::AuctionStatus::Ended {
                    return Ok(current.clone());
                }
                let mut next = current.clone();
                next.status = entities::AuctionStatus::Ended;
                next.stream_session = None;
                Ok(next)
            })
            .await?;
        tracing::info!(
            auction_id = %committed.id,
            winning_bid = committed.current_bid,
            winner = committed.current_bidder.as_deref().unwrap_or("none"),
            "Auction concluded"
        );
        Ok(committed)
    }
}
