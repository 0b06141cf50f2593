use {
    crate::{
        api::{
            ErrorBodyResponse,
            RestError,
        },
        auction::service::{
            conclude_auction::ConcludeAuctionInput,
            get_auction::GetAuctionInput,
            start_auction::StartAuctionInput,
            submit_bid::SubmitBidInput,
        },
        state::Store,
    },
    axum::{
        extract::{
            Path,
            State,
        },
        Json,
    },
    live_auction_api_types::auction::{
        AuctionCreate,
        AuctionId,
        AuctionSnapshot,
        BidCreate,
        BidResult,
    },
    std::{
        sync::Arc,
        time::Duration,
    },
};

/// Start a new live auction.
///
/// Creates the shared auction record with the item's start price as the
/// current bid and an end time of now + duration, and returns it. Requires
/// admin authorization.
#[utoipa::path(post, path = "/v1/auctions", request_body = AuctionCreate,
    responses(
    (status = 200, description = "Auction was started successfully", body = AuctionSnapshot),
    (status = 400, response = ErrorBodyResponse),
    (status = 401, description = "Admin authorization is required"),
),)]
pub async fn post_auction(
    State(store): State<Arc<Store>>,
    Json(auction): Json<AuctionCreate>,
) -> Result<Json<AuctionSnapshot>, RestError> {
    let record = store
        .service
        .start_auction(StartAuctionInput {
            item:           auction.item,
            duration:       Duration::from_millis(auction.duration_ms),
            stream_session: auction.stream_session,
        })
        .await?;
    Ok(Json(record.into()))
}

/// Query the current state of an auction.
#[utoipa::path(get, path = "/v1/auctions/{auction_id}",
    params(("auction_id" = String, description = "Auction id to query for")),
    responses(
    (status = 200, description = "Current auction state", body = AuctionSnapshot),
    (status = 404, description = "Auction was not found", body = ErrorBodyResponse),
),)]
pub async fn get_auction(
    State(store): State<Arc<Store>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<AuctionSnapshot>, RestError> {
    let record = store
        .service
        .get_auction(GetAuctionInput { auction_id })
        .await?;
    Ok(Json(record.into()))
}

/// Conclude an auction.
///
/// Marks the auction ended and detaches its streaming session. Idempotent:
/// concluding an ended auction succeeds without changing anything. Requires
/// admin authorization.
#[utoipa::path(post, path = "/v1/auctions/{auction_id}/conclude",
    params(("auction_id" = String, description = "Auction id to conclude")),
    responses(
    (status = 200, description = "Auction is concluded", body = AuctionSnapshot),
    (status = 401, description = "Admin authorization is required"),
    (status = 404, description = "Auction was not found", body = ErrorBodyResponse),
),)]
pub async fn conclude_auction(
    State(store): State<Arc<Store>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<AuctionSnapshot>, RestError> {
    let record = store
        .service
        .conclude_auction(ConcludeAuctionInput { auction_id })
        .await?;
    Ok(Json(record.into()))
}

/// Place a bid on a live auction.
///
/// The bid is validated and committed atomically against the latest auction
/// state; when two bidders race, exactly one of them wins the commit and the
/// other is told the new floor.
#[utoipa::path(post, path = "/v1/auctions/{auction_id}/bids", request_body = BidCreate,
    params(("auction_id" = String, description = "Auction id to bid on")),
    responses(
    (status = 200, description = "Bid was accepted as the new highest bid", body = BidResult,
    example = json!({"status": "OK", "amount": 150, "end_time": 1700000075000i64})),
    (status = 404, description = "Auction was not found", body = ErrorBodyResponse),
    (status = 409, description = "Outbid or already the highest bidder", body = ErrorBodyResponse),
    (status = 410, description = "Auction has ended", body = ErrorBodyResponse),
),)]
pub async fn post_bid(
    State(store): State<Arc<Store>>,
    Path(auction_id): Path<AuctionId>,
    Json(bid): Json<BidCreate>,
) -> Result<Json<BidResult>, RestError> {
    let receipt = store
        .service
        .submit_bid(SubmitBidInput {
            auction_id,
            amount: bid.amount,
            bidder: bid.bidder,
        })
        .await?;
    Ok(Json(BidResult {
        status:   "OK".to_string(),
        amount:   receipt.amount,
        end_time: receipt.end_time,
    }))
}
