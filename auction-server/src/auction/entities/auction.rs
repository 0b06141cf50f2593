use {
    crate::api::RestError,
    live_auction_api_types::auction as api_types,
    serde::{
        Deserialize,
        Serialize,
    },
    time::OffsetDateTime,
};

pub use live_auction_api_types::{
    auction::AuctionId,
    BidderId,
    UnixTimestampMs,
};

/// The server clock, the only clock bid deadlines are evaluated against.
pub fn now_millis() -> UnixTimestampMs {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as UnixTimestampMs
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuctionStatus {
    Pending,
    Active,
    Ended,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub name:          String,
    pub start_price:   u64,
    pub bid_increment: u64,
    pub image_url:     Option<String>,
}

impl TryFrom<api_types::ItemSpec> for ItemData {
    type Error = RestError;

    fn try_from(spec: api_types::ItemSpec) -> Result<Self, Self::Error> {
        if spec.start_price == 0 {
            return Err(RestError::BadParameters(
                "start price must be a positive integer".to_string(),
            ));
        }
        if spec.bid_increment == 0 {
            return Err(RestError::BadParameters(
                "bid increment must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            name:          spec.name,
            start_price:   spec.start_price,
            bid_increment: spec.bid_increment,
            image_url:     spec.image_url,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamSessionRef {
    pub room_id:   String,
    pub stream_id: String,
}

impl From<api_types::StreamSession> for StreamSessionRef {
    fn from(session: api_types::StreamSession) -> Self {
        Self {
            room_id:   session.room_id,
            stream_id: session.stream_id,
        }
    }
}

/// One live auction's shared state. This is the single mutable resource of
/// the whole system; every mutation of the bid fields goes through the
/// store's atomic update, never a blind overwrite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuctionRecord {
    pub id:             AuctionId,
    pub status:         AuctionStatus,
    pub item:           ItemData,
    pub current_bid:    u64,
    pub current_bidder: Option<BidderId>,
    pub start_time:     UnixTimestampMs,
    pub end_time:       UnixTimestampMs,
    pub viewer_count:   u32,
    pub stream_session: Option<StreamSessionRef>,
}

impl AuctionRecord {
    pub fn key_path(auction_id: AuctionId) -> String {
        format!("auctions/{}", auction_id)
    }
}

impl From<AuctionRecord> for api_types::AuctionSnapshot {
    fn from(record: AuctionRecord) -> Self {
        Self {
            id:             record.id,
            status:         match record.status {
                AuctionStatus::Pending => api_types::AuctionStatus::Pending,
                AuctionStatus::Active => api_types::AuctionStatus::Active,
                AuctionStatus::Ended => api_types::AuctionStatus::Ended,
            },
            item:           api_types::ItemSpec {
                name:          record.item.name,
                start_price:   record.item.start_price,
                bid_increment: record.item.bid_increment,
                image_url:     record.item.image_url,
            },
            current_bid:    record.current_bid,
            current_bidder: record.current_bidder,
            start_time:     record.start_time,
            end_time:       record.end_time,
            viewer_count:   record.viewer_count,
            stream_session: record.stream_session.map(|session| {
                api_types::StreamSession {
                    room_id:   session.room_id,
                    stream_id: session.stream_id,
                }
            }),
        }
    }
}
