//! Qanda - Q&A backend for English learners

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qanda::{
    auth::JwtValidator,
    config::Args,
    db::MongoClient,
    server::{self, AppState},
    store::{ContentStore, MemoryStore, MongoStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let mut args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("qanda={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Qanda - questions & answers");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    if args.in_memory_store {
        info!("Store: in-memory");
    } else {
        info!("MongoDB: {} (db: {})", args.mongodb_uri, args.mongodb_db);
    }
    info!("======================================");

    let store: Arc<dyn ContentStore> = if args.in_memory_store {
        Arc::new(MemoryStore::new())
    } else {
        match connect_mongo(&args).await {
            Ok(store) => {
                info!("MongoDB connected successfully");
                Arc::new(store)
            }
            Err(e) if args.dev_mode => {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                args.in_memory_store = true;
                Arc::new(MemoryStore::new())
            }
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let jwt = JwtValidator::from_args(&args)?;
    let state = Arc::new(AppState::new(args, store, jwt));

    server::run(state).await?;
    Ok(())
}

async fn connect_mongo(args: &Args) -> qanda::Result<MongoStore> {
    let client = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
    MongoStore::new(&client).await
}
