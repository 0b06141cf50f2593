use {
    super::Repository,
    crate::{
        api::RestError,
        auction::entities,
    },
};

impl Repository {
    pub async fn get_auction(
        &self,
        auction_id: entities::AuctionId,
    ) -> Result<entities::AuctionRecord, RestError> {
        let value = self
            .db
            .read(&entities::AuctionRecord::key_path(auction_id))
            .await
            .map_err(|err| {
                tracing::error!(error = %err, auction_id = %auction_id, "Failed to read auction record");
                RestError::TransactionFailed
            })?
            .ok_or(RestError::AuctionNotFound)?;
        serde_json::from_value(value).map_err(|err| {
            tracing::error!(error = %err, auction_id = %auction_id, "Malformed auction record in store");
            RestError::TransactionFailed
        })
    }
}
