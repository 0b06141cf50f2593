use {
    crate::{
        BidderId,
        UnixTimestampMs,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    utoipa::{
        ToResponse,
        ToSchema,
    },
    uuid::Uuid,
};

pub type AuctionId = Uuid;

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuctionStatus {
    /// Created but not yet accepting bids.
    Pending,
    /// Live and accepting bids.
    Active,
    /// Hammer fell. Terminal state.
    Ended,
}

/// Description of the item under the hammer.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
pub struct ItemSpec {
    /// Display name of the item.
    #[schema(example = "Vintage denim jacket")]
    pub name:          String,
    /// Opening price. Must be a positive integer.
    #[schema(example = 100)]
    pub start_price:   u64,
    /// Minimum amount a new bid is expected to exceed the current bid by.
    /// The server enforces the floor only; clients compute
    /// `current_bid + bid_increment` as the next amount.
    #[schema(example = 50)]
    pub bid_increment: u64,
    /// Optional image shown next to the item.
    #[schema(example = "https://cdn.example.com/items/jacket.jpg", value_type = Option<String>)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url:     Option<String>,
}

/// Opaque reference to the external streaming session the host publishes
/// through. The server stores and returns it, never interprets it.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
pub struct StreamSession {
    #[schema(example = "room-7f3a")]
    pub room_id:   String,
    #[schema(example = "host-7f3a-main")]
    pub stream_id: String,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct AuctionCreate {
    pub item:           ItemSpec,
    /// How long the auction runs before the hammer falls, in milliseconds.
    #[schema(example = 60000)]
    pub duration_ms:    u64,
    /// Streaming session to attach while the auction is live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_session: Option<StreamSession>,
}

/// The full state of one auction as committed to the store. Every update
/// pushed to subscribers is a snapshot of this shape, never a partial diff.
#[derive(Serialize, Deserialize, ToSchema, ToResponse, Clone, Debug, PartialEq)]
pub struct AuctionSnapshot {
    #[schema(example = "obo3ee3e-58cc-4372-a567-0e02b2c3d479", value_type = String)]
    pub id:             AuctionId,
    pub status:         AuctionStatus,
    pub item:           ItemSpec,
    /// Highest accepted bid so far, or the start price if there is none.
    #[schema(example = 150)]
    pub current_bid:    u64,
    /// Bidder holding the highest bid. Absent until the first bid lands.
    #[schema(example = "viewer-42", value_type = Option<String>)]
    pub current_bidder: Option<BidderId>,
    #[schema(example = 1700000000000i64)]
    pub start_time:     UnixTimestampMs,
    /// Countdown deadline. Only ever moves forward (anti-snipe extension).
    #[schema(example = 1700000060000i64)]
    pub end_time:       UnixTimestampMs,
    /// Best-effort viewer presence count, not transactional.
    #[schema(example = 12)]
    pub viewer_count:   u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_session: Option<StreamSession>,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct BidCreate {
    /// Proposed amount. Must strictly exceed the auction's current bid.
    #[schema(example = 150)]
    pub amount: u64,
    /// Identity of the bidder placing the amount.
    #[schema(example = "viewer-42")]
    pub bidder: BidderId,
}

#[derive(Serialize, Deserialize, ToResponse, ToSchema, Clone, Debug)]
pub struct BidResult {
    #[schema(example = "OK")]
    pub status:   String,
    /// Amount committed as the new highest bid.
    #[schema(example = 150)]
    pub amount:   u64,
    /// Countdown deadline after this bid, reflecting any anti-snipe
    /// extension it triggered.
    #[schema(example = 1700000075000i64)]
    pub end_time: UnixTimestampMs,
}
