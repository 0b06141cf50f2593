use {
    super::Repository,
    crate::{
        api::RestError,
        auction::entities,
        store::TransactionDecision,
    },
};

impl Repository {
    /// Typed atomic update of one auction record. The transform runs inside
    /// the store's transaction, so under contention it is re-invoked against
    /// the freshly committed record; a rejection on the final attempt is the
    /// definitive outcome. Returns the committed record.
    pub async fn update_auction<F>(
        &self,
        auction_id: entities::AuctionId,
        mut transform: F,
    ) -> Result<entities::AuctionRecord, RestError>
    where
        F: FnMut(&entities::AuctionRecord) -> Result<entities::AuctionRecord, RestError>,
    {
        let mut rejection: Option<RestError> = None;
        let outcome = self
            .db
            .atomic_update(
                &entities::AuctionRecord::key_path(auction_id),
                |current| {
                    rejection = None;
                    let Some(value) = current else {
                        rejection = Some(RestError::AuctionNotFound);
                        return TransactionDecision::Abort;
                    };
                    let record: entities::AuctionRecord =
                        match serde_json::from_value(value.clone()) {
                            Ok(record) => record,
                            Err(err) => {
                                tracing::error!(
                                    error = %err,
                                    auction_id = %auction_id,
                                    "Malformed auction record in store"
                                );
                                rejection = Some(RestError::TransactionFailed);
                                return TransactionDecision::Abort;
                            }
                        };
                    match transform(&record) {
                        Ok(next) => match serde_json::to_value(&next) {
                            Ok(next_value) => TransactionDecision::Commit(next_value),
                            Err(err) => {
                                tracing::error!(
                                    error = %err,
                                    auction_id = %auction_id,
                                    "Failed to serialize updated auction record"
                                );
                                rejection = Some(RestError::TransactionFailed);
                                TransactionDecision::Abort
                            }
                        },
                        Err(err) => {
                            rejection = Some(err);
                            TransactionDecision::Abort
                        }
                    }
                },
            )
            .await
            .map_err(|err| {
                tracing::error!(
                    error = %err,
                    transient = err.is_transient(),
                    auction_id = %auction_id,
                    "Auction transaction failed"
                );
                RestError::TransactionFailed
            })?;

        if !outcome.committed {
            return Err(rejection.unwrap_or(RestError::TransactionFailed));
        }
        outcome
            .value
            .and_then(|value| serde_json::from_value(value).ok())
            .ok_or(RestError::TransactionFailed)
    }
}
