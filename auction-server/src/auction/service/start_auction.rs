use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities,
    },
    live_auction_api_types::auction as api_types,
    std::time::Duration,
    uuid::Uuid,
};

pub struct StartAuctionInput {
    pub item:           api_types::ItemSpec,
    pub duration:       Duration,
    pub stream_session: Option<api_types::StreamSession>,
}

impl Service {
    /// Create a new live auction. All-or-nothing: any validation failure
    /// leaves no record behind.
    #[tracing::instrument(
        skip_all,
        fields(auction_id, item = %input.item.name),
        err(level = tracing::Level::TRACE)
    )]
    pub async fn start_auction(
        &self,
        input: StartAuctionInput,
    ) -> Result<entities::AuctionRecord, RestError> {
        let item = entities::ItemData::try_from(input.item)?;
        if input.duration.is_zero() {
            return Err(RestError::BadParameters(
                "auction duration must be non-zero".to_string(),
            ));
        }

        let now = entities::now_millis();
        let record = entities::AuctionRecord {
            id:             Uuid::new_v4(),
            status:         entities::AuctionStatus::Active,
            current_bid:    item.start_price,
            current_bidder: None,
            start_time:     now,
            end_time:       now + input.duration.as_millis() as i64,
            viewer_count:   0,
            stream_session: input.stream_session.map(Into::into),
            item,
        };
        tracing::Span::current().record("auction_id", record.id.to_string());

        self.repo.add_auction(&record).await?;
        tracing::info!(
            auction_id = %record.id,
            start_price = record.item.start_price,
            end_time = record.end_time,
            "Auction started"
        );
        Ok(record)
    }
}
