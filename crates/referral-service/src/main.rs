//! Referral service entry point.

use anyhow::{Context, Result};
use identity_client::{HttpIdentityDirectory, HttpPhoneValidator};
use notify_client::{MessageTemplate, SignalNotifier};
use referral_service::{
    api::{create_router_with_rate_limit, AppState, RateLimitState},
    config::Config,
    ChangeFeed,
};
use referral_store::{FileReferralStore, MemoryReferralStore, ReferralStore};
use referral_workflow::{ReferralDispatcher, SignupFinalizer, SignupGate};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(config: Config) -> Result<()> {
    info!("Starting referral service");

    let store: Arc<dyn ReferralStore> = if config.store.persist {
        Arc::new(
            FileReferralStore::open(&config.store.table_name, config.store.path.clone())
                .await
                .context("Failed to open referral table")?,
        )
    } else {
        info!("Persistence disabled, using in-memory referral table");
        Arc::new(MemoryReferralStore::new())
    };

    let notifier = SignalNotifier::new(
        &config.notifier.api_url,
        &config.notifier.sender_number,
        config.notifier.timeout,
    )
    .context("Failed to create notifier")?;

    if !notifier.health_check().await {
        warn!(api_url = %config.notifier.api_url, "Messaging API is not healthy yet");
    }

    let directory = Arc::new(
        HttpIdentityDirectory::new(
            &config.directory.api_url,
            config.directory.api_token.expose_secret().as_str(),
            &config.directory.user_pool_id,
            config.directory.timeout,
        )
        .context("Failed to create identity directory client")?,
    );

    let validator = Arc::new(
        HttpPhoneValidator::new(&config.phone_validator.api_url, config.phone_validator.timeout)
            .context("Failed to create phone validator client")?,
    );

    let invitation = MessageTemplate::new(config.templates.invitation.clone())
        .context("Invalid invitation template")?;
    let welcome = MessageTemplate::new(config.templates.welcome.clone())
        .context("Invalid welcome template")?;

    let notifier = Arc::new(notifier);
    let referrer_attribute = config.directory.referrer_attribute.clone();
    let gate = SignupGate::new(store.clone(), validator, directory.clone())
        .with_referrer_attribute(referrer_attribute.clone());
    let finalizer = SignupFinalizer::new(notifier.clone(), store.clone(), directory, welcome)
        .with_referrer_attribute(referrer_attribute);
    let dispatcher = Arc::new(ReferralDispatcher::new(notifier, invitation));

    let (feed, _feed_worker) = ChangeFeed::spawn(dispatcher.clone(), &config.feed);

    let state = AppState {
        store,
        gate: Arc::new(gate),
        finalizer: Arc::new(finalizer),
        dispatcher,
        feed,
    };

    let rate_limit = RateLimitState::new(config.rate_limit.global_per_minute);
    let app = create_router_with_rate_limit(state, rate_limit);

    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")
}
