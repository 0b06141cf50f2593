use crate::{
    api::ws::WsState,
    auction::service::Service,
};

/// Shared server state handed to every request handler.
pub struct Store {
    pub service: Service,
    pub ws:      WsState,
}
