use {
    super::Repository,
    crate::{
        api::RestError,
        auction::entities,
    },
    futures::Stream,
};

impl Repository {
    /// Stream of committed auction records: the current one immediately,
    /// then every later commit in commit order (coalesced under a slow
    /// consumer). Ends when the record is removed from the store.
    pub async fn watch_auction(
        &self,
        auction_id: entities::AuctionId,
    ) -> Result<impl Stream<Item = entities::AuctionRecord> + Send, RestError> {
        let mut subscription = self
            .db
            .subscribe(&entities::AuctionRecord::key_path(auction_id))
            .await
            .map_err(|err| {
                tracing::error!(error = %err, auction_id = %auction_id, "Failed to subscribe to auction record");
                RestError::TransactionFailed
            })?;
        Ok(async_stream::stream! {
            while let Some(value) = subscription.next().await {
                let Some(value) = value else {
                    // Path removed; nothing more will be committed here.
                    break;
                };
                match serde_json::from_value(value) {
                    Ok(record) => yield record,
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            auction_id = %auction_id,
                            "Skipping malformed auction record from subscription"
                        );
                    }
                }
            }
        })
    }
}
