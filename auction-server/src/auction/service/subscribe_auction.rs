use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities,
    },
    futures::Stream,
};

pub struct SubscribeAuctionInput {
    pub auction_id: entities::AuctionId,
}

impl Service {
    /// Stream of committed records for one auction: the current state
    /// immediately, then every later commit in commit order. Fails up front
    /// if the auction does not exist.
    pub async fn subscribe_auction(
        &self,
        input: SubscribeAuctionInput,
    ) -> Result<impl Stream<Item = entities::AuctionRecord>, RestError> {
        self.repo.get_auction(input.auction_id).await?;
        self.repo.watch_auction(input.auction_id).await
    }
}
