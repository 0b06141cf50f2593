use {
    crate::{
        config::RunOptions,
        server::{
            EXIT_CHECK_INTERVAL,
            SHOULD_EXIT,
        },
        state::Store,
    },
    anyhow::Result,
    axum::{
        async_trait,
        extract::{
            self,
            FromRequestParts,
        },
        http::{
            request::Parts,
            StatusCode,
        },
        middleware,
        response::{
            IntoResponse,
            Response,
        },
        routing::{
            get,
            post,
        },
        Json,
        Router,
    },
    axum_extra::{
        headers::{
            authorization::Bearer,
            Authorization,
        },
        TypedHeader,
    },
    clap::crate_version,
    live_auction_api_types::{
        auction::{
            AuctionCreate,
            AuctionSnapshot,
            AuctionStatus,
            BidCreate,
            BidResult,
            ItemSpec,
            StreamSession,
        },
        ws::{
            APIResponse,
            ClientMessage,
            ClientRequest,
            ServerResultMessage,
            ServerResultResponse,
            ServerUpdateResponse,
        },
    },
    serde::Serialize,
    std::sync::{
        atomic::Ordering,
        Arc,
    },
    tower_http::cors::CorsLayer,
    utoipa::{
        OpenApi,
        ToResponse,
        ToSchema,
    },
    utoipa_redoc::{
        Redoc,
        Servable,
    },
};

async fn root() -> String {
    format!("Live Auction Server API {}", crate_version!())
}

pub(crate) mod auction;
pub(crate) mod ws;

#[derive(Clone, Debug, PartialEq)]
pub enum RestError {
    /// The request contained invalid parameters
    BadParameters(String),
    /// The auction was not found
    AuctionNotFound,
    /// The auction is not accepting bids
    AuctionClosed,
    /// The bidder already holds the highest bid
    AlreadyHighestBidder,
    /// The proposed amount no longer exceeds the current bid
    BidTooLow { current_bid: u64 },
    /// The store could not commit the operation; no state change occurred
    TransactionFailed,
    /// The client has too many open websocket connections
    TooManyOpenWebsocketConnections,
}

impl RestError {
    pub fn to_status_and_message(&self) -> (StatusCode, String) {
        match self {
            RestError::BadParameters(msg) => {
                (StatusCode::BAD_REQUEST, format!("Bad parameters: {}", msg))
            }
            RestError::AuctionNotFound => (
                StatusCode::NOT_FOUND,
                "Auction with the specified id was not found".to_string(),
            ),
            RestError::AuctionClosed => (
                StatusCode::GONE,
                "The auction has ended and no longer accepts bids".to_string(),
            ),
            RestError::AlreadyHighestBidder => (
                StatusCode::CONFLICT,
                "You already hold the highest bid".to_string(),
            ),
            RestError::BidTooLow { current_bid } => (
                StatusCode::CONFLICT,
                format!("You were outbid: the current bid is {}", current_bid),
            ),
            RestError::TransactionFailed => (
                StatusCode::SERVICE_UNAVAILABLE,
                "The bid could not be processed, please retry".to_string(),
            ),
            RestError::TooManyOpenWebsocketConnections => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many open websocket connections".to_string(),
            ),
        }
    }
}

impl std::fmt::Display for RestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_status_and_message().1)
    }
}

#[derive(ToResponse, ToSchema, Serialize)]
#[response(description = "An error occurred processing the request")]
pub struct ErrorBodyResponse {
    error: String,
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let (status, msg) = self.to_status_and_message();
        (status, Json(ErrorBodyResponse { error: msg })).into_response()
    }
}

pub async fn live() -> Response {
    (StatusCode::OK, "OK").into_response()
}

/// Placeholder admin guard: lifecycle routes require a Bearer token to be
/// present. Real credential checking is the deployment's concern.
#[derive(Clone)]
pub struct Auth {
    pub is_admin: bool,
}

#[async_trait]
impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(_token) => Ok(Self { is_admin: true }),
            Err(_) => Ok(Self { is_admin: false }),
        }
    }
}

async fn require_admin(auth: Auth, req: extract::Request, next: middleware::Next) -> Response {
    if !auth.is_admin {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(req).await
}

#[macro_export]
macro_rules! admin_only {
    ($route:expr) => {
        $route.layer(middleware::from_fn(require_admin))
    };
}

pub async fn start_api(run_options: RunOptions, store: Arc<Store>) -> Result<()> {
    // Make sure functions included in the paths section have distinct names, otherwise some api generators will fail
    #[derive(OpenApi)]
    #[openapi(
    paths(
    auction::post_auction,
    auction::get_auction,
    auction::conclude_auction,
    auction::post_bid,
    ),
    components(
    schemas(
    AuctionCreate,
    AuctionSnapshot,
    AuctionStatus,
    ItemSpec,
    StreamSession,
    BidCreate,
    BidResult,
    ErrorBodyResponse,
    APIResponse,
    ClientRequest,
    ClientMessage,
    ServerResultMessage,
    ServerResultResponse,
    ServerUpdateResponse,
    ),
    responses(
    ErrorBodyResponse,
    AuctionSnapshot,
    BidResult,
    ),
    ),
    tags(
    (name = "Live Auction Server", description = "The auction server keeps one shared record per live auction \
    and accepts bids against it. Bids are validated and committed atomically, so across any number of \
    concurrent bidders the highest bid wins and the committed sequence is strictly increasing.")
    )
    )]
    struct ApiDoc;

    let auction_routes = Router::new()
        .route("/", admin_only!(post(auction::post_auction)))
        .route("/:auction_id", get(auction::get_auction))
        .route(
            "/:auction_id/conclude",
            admin_only!(post(auction::conclude_auction)),
        )
        .route("/:auction_id/bids", post(auction::post_bid));

    let v1_routes = Router::new().nest(
        "/v1",
        Router::new()
            .nest("/auctions", auction_routes)
            .route("/ws", get(ws::ws_route_handler)),
    );

    let app: Router<()> = Router::new()
        .merge(Redoc::with_url("/docs", ApiDoc::openapi()))
        .merge(v1_routes)
        .route("/", get(root))
        .route("/live", get(live))
        .layer(CorsLayer::permissive())
        .with_state(store);

    let listener = tokio::net::TcpListener::bind(&run_options.server.listen_addr).await?;
    tracing::info!(addr = %run_options.server.listen_addr, "Starting API server");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            while !SHOULD_EXIT.load(Ordering::Acquire) {
                tokio::time::sleep(EXIT_CHECK_INTERVAL).await;
            }
            tracing::info!("Shutting down API server...");
        })
        .await?;
    Ok(())
}
