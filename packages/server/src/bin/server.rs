//! Quill collaboration server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin quill-server -- --tokens-file tokens.json
//! cargo run --bin quill-server -- --host 0.0.0.0 --port 3000 --comment-store-url http://localhost:4000/api
//! ```

use std::{process, sync::Arc};

use clap::Parser;
use quill_server::{
    config::ServerConfig,
    domain::{CommentStore, IdentityProvider},
    infrastructure::{
        auth::{StaticAccessPolicy, StaticTokenIdentityProvider},
        comment_store::{HttpCommentStore, InMemoryCommentStore},
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryConnectionRepository, InMemoryRoomRepository},
    },
    ui::Server,
    usecase::{CollabService, Collaborators},
};
use quill_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    // Initialize dependencies in order:
    // 1. Collaborators (identity, comment store, access policy)
    // 2. Repositories and MessagePusher
    // 3. UseCases
    // 4. Server

    // 1. Collaborators
    let identity_provider: Arc<dyn IdentityProvider> = match &config.tokens_file {
        Some(path) => match StaticTokenIdentityProvider::from_file(path) {
            Ok(provider) => {
                tracing::info!(
                    "Loaded {} access token(s) from {}",
                    provider.len(),
                    path.display()
                );
                Arc::new(provider)
            }
            Err(e) => {
                tracing::error!("{}", e);
                process::exit(1);
            }
        },
        None => {
            tracing::warn!("No tokens file configured, every handshake will be rejected");
            Arc::new(StaticTokenIdentityProvider::default())
        }
    };

    let clock = Arc::new(SystemClock);
    let comment_store: Arc<dyn CommentStore> = match &config.comment_store_url {
        Some(url) => match HttpCommentStore::new(url, config.comment_store_timeout()) {
            Ok(store) => {
                tracing::info!("Using comment store at {}", url);
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!("{}", e);
                process::exit(1);
            }
        },
        None => {
            tracing::info!("Using in-memory comment store");
            Arc::new(InMemoryCommentStore::new(clock.clone()))
        }
    };
    let access_policy = Arc::new(StaticAccessPolicy::new(config.admins()));

    // 2. Repositories and MessagePusher
    let connections = Arc::new(InMemoryConnectionRepository::new());
    let rooms = Arc::new(InMemoryRoomRepository::new());
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. UseCases
    let service = CollabService::new(
        connections,
        rooms,
        message_pusher,
        Collaborators {
            identity_provider,
            comment_store,
            access_policy,
            clock,
            comment_store_timeout: config.comment_store_timeout(),
        },
    );

    // 4. Create and run the server
    let server = Server::new(service, config.transport());
    if let Err(e) = server.run(config.host.clone(), config.port).await {
        tracing::error!("Server error: {}", e);
        process::exit(1);
    }
}
