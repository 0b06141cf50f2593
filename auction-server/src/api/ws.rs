use {
    super::RestError,
    crate::{
        auction::service::{
            get_auction::GetAuctionInput,
            submit_bid::SubmitBidInput,
            track_viewers::TrackViewerInput,
        },
        server::{
            EXIT_CHECK_INTERVAL,
            SHOULD_EXIT,
        },
        state::Store,
    },
    anyhow::{
        anyhow,
        Result,
    },
    axum::{
        extract::{
            ws::{
                Message,
                WebSocket,
            },
            State,
            WebSocketUpgrade,
        },
        http::HeaderMap,
        response::IntoResponse,
    },
    futures::{
        stream::{
            SplitSink,
            SplitStream,
        },
        SinkExt,
        StreamExt,
    },
    live_auction_api_types::{
        auction::{
            AuctionId,
            AuctionSnapshot,
            BidCreate,
            BidResult,
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
    std::{
        collections::{
            HashMap,
            HashSet,
        },
        net::IpAddr,
        sync::{
            atomic::{
                AtomicUsize,
                Ordering,
            },
            Arc,
        },
        time::Duration,
    },
    tokio::sync::{
        broadcast,
        RwLock,
    },
    tracing::instrument,
};

pub struct WsState {
    pub requester_ip_header_name: String,
    subscriber_counter:           AtomicUsize,
    subscriber_per_ip:            RwLock<HashMap<IpAddr, HashSet<SubscriberId>>>,
    pub broadcast_sender:         broadcast::Sender<UpdateEvent>,
    pub broadcast_receiver:       broadcast::Receiver<UpdateEvent>,
}

const MAXIMUM_SUBSCRIBERS_PER_IP: usize = 10;

impl WsState {
    pub fn new(
        requester_ip_header_name: String,
        broadcast_sender: broadcast::Sender<UpdateEvent>,
        broadcast_receiver: broadcast::Receiver<UpdateEvent>,
    ) -> Self {
        Self {
            requester_ip_header_name,
            subscriber_counter: AtomicUsize::new(0),
            subscriber_per_ip: RwLock::new(HashMap::new()),
            broadcast_sender,
            broadcast_receiver,
        }
    }

    /// If the specified IP address has too many open websocket connections, this function will
    /// return none. Otherwise, it will return the new subscriber id.
    pub async fn get_new_subscriber_id(&self, ip: Option<IpAddr>) -> Option<SubscriberId> {
        let id = self.subscriber_counter.fetch_add(1, Ordering::SeqCst);
        if let Some(ip) = ip {
            let mut write_guard = self.subscriber_per_ip.write().await;
            let ids = write_guard.entry(ip).or_insert_with(HashSet::new);
            if ids.len() >= MAXIMUM_SUBSCRIBERS_PER_IP {
                return None;
            }
            ids.insert(id);
        }
        Some(id)
    }

    pub async fn remove_subscriber(&self, id: SubscriberId, ip: Option<IpAddr>) {
        if let Some(ip) = ip {
            let mut write_guard = self.subscriber_per_ip.write().await;
            if let Some(ids) = write_guard.get_mut(&ip) {
                ids.remove(&id);
                if ids.is_empty() {
                    write_guard.remove(&ip);
                }
            }
        }
    }
}

pub async fn ws_route_handler(
    ws: WebSocketUpgrade,
    State(store): State<Arc<Store>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let ws_state = &store.ws;
    let requester_ip = headers
        .get(ws_state.requester_ip_header_name.as_str())
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next()) // Only take the first ip if there are multiple
        .and_then(|value| value.parse().ok());

    if requester_ip.is_none() {
        tracing::warn!("Failed to get requester IP address");
    }

    match ws_state.get_new_subscriber_id(requester_ip).await {
        Some(subscriber_id) => ws.on_upgrade(move |socket| {
            websocket_handler(socket, store, subscriber_id, requester_ip)
        }),
        None => RestError::TooManyOpenWebsocketConnections.into_response(),
    }
}

async fn websocket_handler(
    stream: WebSocket,
    store: Arc<Store>,
    subscriber_id: SubscriberId,
    requester_ip: Option<IpAddr>,
) {
    let (sender, receiver) = stream.split();
    let new_receiver = store.ws.broadcast_receiver.resubscribe();
    let mut subscriber = Subscriber::new(subscriber_id, store.clone(), new_receiver, receiver, sender);
    subscriber.run().await;
    subscriber.clear_presence().await;
    store.ws.remove_subscriber(subscriber_id, requester_ip).await;
}

#[derive(Clone, Debug, PartialEq)]
pub enum UpdateEvent {
    AuctionUpdate(AuctionSnapshot),
}

pub type SubscriberId = usize;

/// Subscriber is an actor that handles a single websocket connection.
/// It listens to the store for auction updates and forwards the ones the
/// client subscribed to.
pub struct Subscriber {
    id:                  SubscriberId,
    closed:              bool,
    store:               Arc<Store>,
    notify_receiver:     broadcast::Receiver<UpdateEvent>,
    receiver:            SplitStream<WebSocket>,
    sender:              SplitSink<WebSocket, Message>,
    auction_ids:         HashSet<AuctionId>,
    viewing:             HashSet<AuctionId>,
    ping_interval:       tokio::time::Interval,
    exit_check_interval: tokio::time::Interval,
    responded_to_ping:   bool,
}

const PING_INTERVAL_DURATION: Duration = Duration::from_secs(30);

fn ok_response(id: String) -> ServerResultResponse {
    ServerResultResponse {
        id:     Some(id),
        result: ServerResultMessage::Success(None),
    }
}

fn error_response(id: Option<String>, error: &RestError) -> ServerResultResponse {
    ServerResultResponse {
        id,
        result: ServerResultMessage::Err(error.to_status_and_message().1),
    }
}

impl Subscriber {
    pub fn new(
        id: SubscriberId,
        store: Arc<Store>,
        notify_receiver: broadcast::Receiver<UpdateEvent>,
        receiver: SplitStream<WebSocket>,
        sender: SplitSink<WebSocket, Message>,
    ) -> Self {
        Self {
            id,
            closed: false,
            store,
            notify_receiver,
            receiver,
            sender,
            auction_ids: HashSet::new(),
            viewing: HashSet::new(),
            ping_interval: tokio::time::interval(PING_INTERVAL_DURATION),
            exit_check_interval: tokio::time::interval(EXIT_CHECK_INTERVAL),
            responded_to_ping: true, // We start with true so we don't close the connection immediately
        }
    }

    pub async fn run(&mut self) {
        while !self.closed {
            if let Err(e) = self.handle_next().await {
                tracing::debug!(subscriber = self.id, error = ?e, "Error Handling Subscriber Message.");
                break;
            }
        }
    }

    /// Undo the presence signals this connection contributed. Best-effort,
    /// like the counters themselves.
    pub async fn clear_presence(&mut self) {
        for auction_id in self.viewing.drain() {
            let _ = self
                .store
                .service
                .viewer_left(TrackViewerInput { auction_id })
                .await;
        }
    }

    async fn handle_next(&mut self) -> Result<()> {
        tokio::select! {
            maybe_update_event = self.notify_receiver.recv() => {
                match maybe_update_event {
                    Ok(event) => self.handle_update(event).await,
                    Err(e) => Err(anyhow!("Error receiving update event: {:?}", e)),
                }
            },
            maybe_message_or_err = self.receiver.next() => {
                self.handle_client_message(
                    maybe_message_or_err.ok_or(anyhow!("Client channel is closed"))??
                ).await
            },
            _ = self.ping_interval.tick() => {
                if !self.responded_to_ping {
                    return Err(anyhow!("Subscriber did not respond to ping. Closing connection."));
                }
                self.responded_to_ping = false;
                self.sender.send(Message::Ping(vec![])).await?;
                Ok(())
            },
            _ = self.exit_check_interval.tick() => {
                if SHOULD_EXIT.load(Ordering::Acquire) {
                    self.sender.close().await?;
                    self.closed = true;
                    return Err(anyhow!("Application is shutting down. Closing connection."));
                }
                Ok(())
            }
        }
    }

    #[instrument(skip_all, fields(subscriber = self.id))]
    async fn handle_update(&mut self, event: UpdateEvent) -> Result<()> {
        let UpdateEvent::AuctionUpdate(auction) = event;
        if !self.auction_ids.contains(&auction.id) {
            // Irrelevant update
            return Ok(());
        }
        let message = serde_json::to_string(&ServerUpdateResponse::AuctionUpdate { auction })?;
        self.sender.send(message.into()).await?;
        Ok(())
    }

    async fn send_response(&mut self, response: ServerResultResponse) -> Result<()> {
        self.sender
            .send(serde_json::to_string(&response)?.into())
            .await?;
        Ok(())
    }

    /// Subscribe to a set of auctions. Rejects the whole request if any id
    /// is unknown, otherwise confirms and pushes the current snapshot of
    /// each auction so the client starts from committed state.
    async fn handle_subscribe(
        &mut self,
        message_id: String,
        auction_ids: Vec<AuctionId>,
    ) -> Result<()> {
        let mut snapshots: Vec<AuctionSnapshot> = Vec::with_capacity(auction_ids.len());
        for auction_id in &auction_ids {
            match self
                .store
                .service
                .get_auction(GetAuctionInput {
                    auction_id: *auction_id,
                })
                .await
            {
                Ok(record) => snapshots.push(record.into()),
                Err(_) => {
                    return self
                        .send_response(ServerResultResponse {
                            id:     Some(message_id),
                            result: ServerResultMessage::Err(format!(
                                "Auction with id {} not found",
                                auction_id
                            )),
                        })
                        .await;
                }
            }
        }
        self.auction_ids.extend(auction_ids);
        self.send_response(ok_response(message_id)).await?;
        for auction in snapshots {
            let message = serde_json::to_string(&ServerUpdateResponse::AuctionUpdate { auction })?;
            self.sender.send(message.into()).await?;
        }
        Ok(())
    }

    async fn handle_unsubscribe(
        &mut self,
        message_id: String,
        auction_ids: Vec<AuctionId>,
    ) -> Result<()> {
        self.auction_ids
            .retain(|auction_id| !auction_ids.contains(auction_id));
        self.send_response(ok_response(message_id)).await
    }

    async fn handle_place_bid(
        &mut self,
        message_id: String,
        auction_id: AuctionId,
        bid: BidCreate,
    ) -> Result<()> {
        let response = match self
            .store
            .service
            .submit_bid(SubmitBidInput {
                auction_id,
                amount: bid.amount,
                bidder: bid.bidder,
            })
            .await
        {
            Ok(receipt) => ServerResultResponse {
                id:     Some(message_id),
                result: ServerResultMessage::Success(Some(APIResponse::BidResult(BidResult {
                    status:   "OK".to_string(),
                    amount:   receipt.amount,
                    end_time: receipt.end_time,
                }))),
            },
            Err(e) => error_response(Some(message_id), &e),
        };
        self.send_response(response).await
    }

    async fn handle_viewer_joined(
        &mut self,
        message_id: String,
        auction_id: AuctionId,
    ) -> Result<()> {
        // One presence count per auction per connection.
        let response = if self.viewing.insert(auction_id) {
            match self
                .store
                .service
                .viewer_joined(TrackViewerInput { auction_id })
                .await
            {
                Ok(()) => ok_response(message_id),
                Err(e) => {
                    self.viewing.remove(&auction_id);
                    error_response(Some(message_id), &e)
                }
            }
        } else {
            ok_response(message_id)
        };
        self.send_response(response).await
    }

    async fn handle_viewer_left(
        &mut self,
        message_id: String,
        auction_id: AuctionId,
    ) -> Result<()> {
        let response = if self.viewing.remove(&auction_id) {
            match self
                .store
                .service
                .viewer_left(TrackViewerInput { auction_id })
                .await
            {
                Ok(()) => ok_response(message_id),
                Err(e) => error_response(Some(message_id), &e),
            }
        } else {
            ok_response(message_id)
        };
        self.send_response(response).await
    }

    #[instrument(skip_all, fields(subscriber = self.id))]
    async fn handle_client_message(&mut self, message: Message) -> Result<()> {
        let maybe_client_message = match message {
            Message::Close(_) => {
                // Closing the connection. Send the close message to gracefully
                // shut down the connection, otherwise the client might get an
                // abnormal Websocket closure error.
                self.sender.close().await?;
                self.closed = true;
                return Ok(());
            }
            Message::Text(text) => serde_json::from_str::<ClientRequest>(&text),
            Message::Binary(data) => serde_json::from_slice::<ClientRequest>(&data),
            Message::Ping(_) => {
                // Axum will send Pong automatically
                return Ok(());
            }
            Message::Pong(_) => {
                self.responded_to_ping = true;
                return Ok(());
            }
        };

        match maybe_client_message {
            Err(e) => {
                self.send_response(ServerResultResponse {
                    id:     None,
                    result: ServerResultMessage::Err(e.to_string()),
                })
                .await
            }
            Ok(ClientRequest { msg, id }) => match msg {
                ClientMessage::Subscribe { auction_ids } => {
                    self.handle_subscribe(id, auction_ids).await
                }
                ClientMessage::Unsubscribe { auction_ids } => {
                    self.handle_unsubscribe(id, auction_ids).await
                }
                ClientMessage::PlaceBid { auction_id, bid } => {
                    self.handle_place_bid(id, auction_id, bid).await
                }
                ClientMessage::ViewerJoined { auction_id } => {
                    self.handle_viewer_joined(id, auction_id).await
                }
                ClientMessage::ViewerLeft { auction_id } => {
                    self.handle_viewer_left(id, auction_id).await
                }
            },
        }
    }
}
