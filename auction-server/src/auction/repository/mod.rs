use {
    crate::{
        api::ws::UpdateEvent,
        auction::entities,
        store::DocumentStore,
    },
    futures::{
        Stream,
        StreamExt,
    },
    tokio::sync::broadcast,
};

mod add_auction;
mod get_auction;
mod update_auction;
mod update_viewer_count;
mod watch_auction;

/// Adapter between the domain `AuctionRecord` shape and the key-path store.
/// Scoped to `auctions/{auction_id}` paths; carries no business logic.
/// Websocket broadcasts are driven off the store's per-path watch rather
/// than sent by whichever committer finishes first, so subscribers observe
/// commits in commit order.
pub struct Repository {
    db:           DocumentStore,
    event_sender: broadcast::Sender<UpdateEvent>,
}

impl Repository {
    pub fn new(db: DocumentStore, event_sender: broadcast::Sender<UpdateEvent>) -> Self {
        Self { db, event_sender }
    }

    /// Forward every committed record for one auction onto the server-wide
    /// event channel, in the order the store committed them. Runs until the
    /// record is removed from the store.
    fn spawn_update_forwarder(
        &self,
        updates: impl Stream<Item = entities::AuctionRecord> + Send + 'static,
    ) {
        let event_sender = self.event_sender.clone();
        tokio::spawn(async move {
            futures::pin_mut!(updates);
            while let Some(record) = updates.next().await {
                // Nobody listening is fine, e.g. before the first websocket
                // connects.
                let _ = event_sender.send(UpdateEvent::AuctionUpdate(record.into()));
            }
        });
    }
}
