use {
    super::Repository,
    crate::{
        api::RestError,
        auction::entities,
    },
};

impl Repository {
    /// Viewer presence bump. The count itself is best-effort and nothing
    /// downstream relies on it, but a blind read-then-write here could
    /// overwrite a racing bid commit and retreat `current_bid`, so the bump
    /// rides the same transaction primitive and touches only the count.
    pub async fn update_viewer_count(
        &self,
        auction_id: entities::AuctionId,
        delta: i32,
    ) -> Result<(), RestError> {
        self.update_auction(auction_id, |current| {
            let mut next = current.clone();
            next.viewer_count = next.viewer_count.saturating_add_signed(delta);
            Ok(next)
        })
        .await
        .map(|_| ())
    }
}
