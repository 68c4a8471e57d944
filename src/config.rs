//! Configuration for Qanda
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

/// Qanda - questions, answers, votes and reputation for English learners
#[derive(Parser, Debug, Clone)]
#[command(name = "qanda")]
#[command(about = "Q&A backend: voting, reputation and accepted answers")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (dev JWT secret, in-memory fallback store)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "qanda")]
    pub mongodb_db: String,

    /// Skip MongoDB entirely and keep all records in memory
    #[arg(long, env = "IN_MEMORY_STORE", default_value = "false")]
    pub in_memory_store: bool,

    /// JWT secret for bearer token verification (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Value of Access-Control-Allow-Origin on every response
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,
}

impl Args {
    /// Arguments for tests and embedded use: dev mode, in-memory store
    pub fn for_dev(listen: SocketAddr) -> Self {
        Self {
            listen,
            dev_mode: true,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "qanda".to_string(),
            in_memory_store: true,
            jwt_secret: None,
            jwt_expiry_seconds: 3600,
            log_level: "info".to_string(),
            cors_origin: "*".to_string(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(s) if s.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string())
                }
                Some(_) => {}
            }
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        Ok(())
    }
}
