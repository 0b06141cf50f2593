use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities,
    },
};

pub struct GetAuctionInput {
    pub auction_id: entities::AuctionId,
}

impl Service {
    pub async fn get_auction(
        &self,
        input: GetAuctionInput,
    ) -> Result<entities::AuctionRecord, RestError> {
        self.repo.get_auction(input.auction_id).await
    }
}
