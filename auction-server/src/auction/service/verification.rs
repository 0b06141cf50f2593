use {
    crate::{
        api::RestError,
        auction::entities::{
            AuctionRecord,
            AuctionStatus,
            UnixTimestampMs,
        },
        config::AuctionConfig,
    },
    live_auction_api_types::BidderId,
};

/// Decide a proposed bid against a committed auction record.
///
/// Pure and deterministic in its inputs: the transaction coordinator re-runs
/// it on every optimistic retry, each time with the freshly committed record
/// and a fresh `now` snapshot, so a bid that was valid against stale state
/// is correctly rejected without any locking. Rules, in order:
///
/// 1. Only an active auction takes bids.
/// 2. The current highest bidder cannot outbid themselves.
/// 3. The amount must strictly exceed the current bid. The floor, not an
///    exact increment match, is enforced so a client that computed
///    `current_bid + bid_increment` from slightly stale state can still win.
///
/// An accepted bid close to the deadline resets the countdown to
/// `now + anti_snipe_extension` (absolute, not additive).
pub fn validate_bid(
    current: &AuctionRecord,
    amount: u64,
    bidder: &BidderId,
    now: UnixTimestampMs,
    config: &AuctionConfig,
) -> Result<AuctionRecord, RestError> {
    if current.status != AuctionStatus::Active {
        return Err(RestError::AuctionClosed);
    }
    if current.current_bidder.as_deref() == Some(bidder.as_str()) {
        return Err(RestError::AlreadyHighestBidder);
    }
    if amount <= current.current_bid {
        return Err(RestError::BidTooLow {
            current_bid: current.current_bid,
        });
    }

    let mut next = current.clone();
    next.current_bid = amount;
    next.current_bidder = Some(bidder.clone());
    if current.end_time - now < config.anti_snipe_window_ms() {
        // The deadline only ever moves forward, even under a misconfigured
        // extension shorter than the window.
        next.end_time = (now + config.anti_snipe_extension_ms()).max(current.end_time);
    }
    Ok(next)
}
