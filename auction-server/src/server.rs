use {
    crate::{
        api,
        api::ws::WsState,
        auction::service::Service,
        config::{
            Config,
            RunOptions,
        },
        state::Store,
        store::DocumentStore,
    },
    anyhow::anyhow,
    std::{
        sync::{
            atomic::{
                AtomicBool,
                Ordering,
            },
            Arc,
        },
        time::Duration,
    },
};

pub async fn start_server(run_options: RunOptions) -> anyhow::Result<()> {
    tokio::spawn(async move {
        tracing::info!("Registered shutdown signal handler...");
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to register shutdown signal handler");
            return;
        }
        tracing::info!("Shut down signal received, waiting for tasks...");
        SHOULD_EXIT.store(true, Ordering::Release);
    });

    let config = Config::load(&run_options.config.config).map_err(|err| {
        anyhow!(
            "Failed to load config from file({path}): {:?}",
            err,
            path = run_options.config.config
        )
    })?;

    let (broadcast_sender, broadcast_receiver) =
        tokio::sync::broadcast::channel(config.ws.broadcast_channel_size);
    let db = DocumentStore::new();
    let store = Arc::new(Store {
        service: Service::new(db, config.auction.clone(), broadcast_sender.clone()),
        ws:      WsState::new(
            config.ws.requester_ip_header_name.clone(),
            broadcast_sender,
            broadcast_receiver,
        ),
    });

    api::start_api(run_options, store).await
}

// A static exit flag to indicate to running threads that we're shutting down. This is used to
// gracefully shutdown the application.
//
// NOTE: A more idiomatic approach would be to use a tokio::sync::broadcast channel, and to send a
// shutdown signal to all running tasks. However, this is a bit more complicated to implement and
// we don't rely on global state for anything else.
pub(crate) static SHOULD_EXIT: AtomicBool = AtomicBool::new(false);
pub const EXIT_CHECK_INTERVAL: Duration = Duration::from_secs(1);
