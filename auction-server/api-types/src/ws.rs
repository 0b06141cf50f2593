use {
    crate::auction::{
        AuctionId,
        AuctionSnapshot,
        BidCreate,
        BidResult,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    utoipa::ToSchema,
};

#[derive(Deserialize, Clone, ToSchema, Serialize, Debug)]
#[serde(tag = "method", content = "params")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe {
        #[schema(value_type = Vec<String>)]
        auction_ids: Vec<AuctionId>,
    },
    #[serde(rename = "unsubscribe")]
    Unsubscribe {
        #[schema(value_type = Vec<String>)]
        auction_ids: Vec<AuctionId>,
    },
    #[serde(rename = "place_bid")]
    PlaceBid {
        #[schema(value_type = String)]
        auction_id: AuctionId,
        bid:        BidCreate,
    },
    /// Best-effort presence signal. The server bumps the auction's viewer
    /// count and undoes it when the connection closes.
    #[serde(rename = "viewer_joined")]
    ViewerJoined {
        #[schema(value_type = String)]
        auction_id: AuctionId,
    },
    #[serde(rename = "viewer_left")]
    ViewerLeft {
        #[schema(value_type = String)]
        auction_id: AuctionId,
    },
}

#[derive(Deserialize, Clone, ToSchema, Serialize, Debug)]
pub struct ClientRequest {
    pub id:  String,
    #[serde(flatten)]
    pub msg: ClientMessage,
}

/// This enum is used to send an update to the client for any subscriptions made.
#[derive(Serialize, Clone, ToSchema, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ServerUpdateResponse {
    #[serde(rename = "auction_update")]
    AuctionUpdate { auction: AuctionSnapshot },
}

#[derive(Serialize, Clone, ToSchema, Deserialize, Debug)]
#[serde(untagged)]
pub enum APIResponse {
    BidResult(BidResult),
}

#[derive(Serialize, Clone, ToSchema, Deserialize, Debug)]
#[serde(tag = "status", content = "result")]
pub enum ServerResultMessage {
    #[serde(rename = "success")]
    Success(Option<APIResponse>),
    #[serde(rename = "error")]
    Err(String),
}

/// This enum is used to send the result for a specific client request with
/// the same id. Id is only None when the client message is invalid.
#[derive(Serialize, ToSchema, Deserialize, Clone, Debug)]
pub struct ServerResultResponse {
    pub id:     Option<String>,
    #[serde(flatten)]
    pub result: ServerResultMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_request_wire_shape() {
        let request: ClientRequest = serde_json::from_str(
            r#"{"id":"1","method":"subscribe","params":{"auction_ids":["b2f0a6a8-58cc-4372-a567-0e02b2c3d479"]}}"#,
        )
        .expect("subscribe envelope should parse");
        assert_eq!(request.id, "1");
        assert!(matches!(
            request.msg,
            ClientMessage::Subscribe { ref auction_ids } if auction_ids.len() == 1
        ));

        let response = ServerResultResponse {
            id:     Some("1".to_string()),
            result: ServerResultMessage::Success(None),
        };
        let serialized = serde_json::to_value(&response).expect("response should serialize");
        assert_eq!(serialized["status"], "success");
        assert_eq!(serialized["id"], "1");
    }
}
