use super::{
    AuctionId,
    UnixTimestampMs,
};

/// Proof that a bid committed, with the deadline the commit produced.
#[derive(Clone, Debug, PartialEq)]
pub struct BidReceipt {
    pub auction_id: AuctionId,
    pub amount:     u64,
    pub end_time:   UnixTimestampMs,
}
