use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities,
    },
};

#[derive(Clone)]
pub struct TrackViewerInput {
    pub auction_id: entities::AuctionId,
}

impl Service {
    /// Best-effort presence counters. Not safety-critical: an undelivered
    /// increment under-counts the audience, nothing more.
    #[tracing::instrument(skip_all, fields(auction_id = %input.auction_id))]
    pub async fn viewer_joined(&self, input: TrackViewerInput) -> Result<(), RestError> {
        self.repo.update_viewer_count(input.auction_id, 1).await
    }

    #[tracing::instrument(skip_all, fields(auction_id = %input.auction_id))]
    pub async fn viewer_left(&self, input: TrackViewerInput) -> Result<(), RestError> {
        self.repo.update_viewer_count(input.auction_id, -1).await
    }
}
