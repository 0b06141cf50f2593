use {
    super::Repository,
    crate::{
        api::RestError,
        auction::entities,
    },
};

impl Repository {
    pub async fn add_auction(&self, record: &entities::AuctionRecord) -> Result<(), RestError> {
        let value = serde_json::to_value(record).map_err(|err| {
            tracing::error!(error = %err, auction_id = %record.id, "Failed to serialize auction record");
            RestError::TransactionFailed
        })?;
        self.db
            .write(&entities::AuctionRecord::key_path(record.id), value)
            .await
            .map_err(|err| {
                tracing::error!(
                    error = %err,
                    transient = err.is_transient(),
                    auction_id = %record.id,
                    "Failed to create auction record"
                );
                RestError::TransactionFailed
            })?;
        // The forwarder delivers the fresh record as its initial value, then
        // every later commit.
        self.spawn_update_forwarder(self.watch_auction(record.id).await?);
        Ok(())
    }
}
