use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::auth::{OauthSession, PlatformSpec};
use crate::dispatch::ScoreDispatcher;
use crate::feed::connector::FeedConnector;
use crate::notify::twitch::ChatNotifier;
use crate::notify::twitter::SocialNotifier;
use crate::profile::{PROFILE_URI_BASE, ProfileClient};
use crate::store::{SqliteTokenStore, TokenStore};
use crate::util::config::Config;

mod auth;
mod dispatch;
mod feed;
mod notify;
mod profile;
mod store;
mod util;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Config(#[from] util::config::ConfigError),

    #[error(transparent)]
    Store(#[from] store::StoreError),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    util::tracing::init();

    // missing configuration is the only fatal startup error
    let config = Config::from_env()?;
    info!("starting score herald");

    let store: Arc<dyn TokenStore> =
        Arc::new(SqliteTokenStore::open(&config.database_path).await?);

    let twitch_session = Arc::new(OauthSession::new(
        PlatformSpec::twitch(&config),
        Arc::clone(&store),
    ));
    let twitter_session = Arc::new(OauthSession::new(
        PlatformSpec::twitter(&config),
        Arc::clone(&store),
    ));

    for session in [&twitch_session, &twitter_session] {
        if let Err(err) = session.bootstrap(None).await {
            error!(
                platform = session.platform(),
                error = %err,
                "session unauthenticated; its platform calls will fail until a credential lands in the store"
            );
        }
    }

    let chat = Arc::new(ChatNotifier::new(&config, Arc::clone(&twitch_session)));
    let social = Arc::new(SocialNotifier::new(Arc::clone(&twitter_session)));

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let dispatcher = Arc::new(ScoreDispatcher::new(
        ProfileClient::new(PROFILE_URI_BASE),
        chat,
        social,
    ));
    let connector = FeedConnector::new(&config.feed_url, events_tx);

    let cancel = CancellationToken::new();
    let handles = vec![
        tokio::spawn(connector.run(cancel.clone())),
        tokio::spawn(dispatcher.run(events_rx)),
    ];

    _ = join_all(handles).await;

    Ok(())
}
