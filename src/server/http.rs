//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection. The body is
//! collected here and the request is handed to `routes::dispatch`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::routes;
use crate::store::{ContentStore, MemoryStore};
use crate::types::{QandaError, Result};
use crate::voting::VotingService;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Questions, answers, users and the vote ledger
    pub store: Arc<dyn ContentStore>,
    /// Vote, accept and reconcile operations over `store`
    pub voting: Arc<VotingService>,
    /// Bearer token verification
    pub jwt: JwtValidator,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn ContentStore>, jwt: JwtValidator) -> Self {
        let voting = Arc::new(VotingService::new(Arc::clone(&store)));
        Self {
            args,
            store,
            voting,
            jwt,
        }
    }

    /// State backed by a fresh in-memory store
    pub fn in_memory(args: Args) -> Result<Self> {
        let jwt = JwtValidator::from_args(&args)?;
        Ok(Self::new(args, Arc::new(MemoryStore::new()), jwt))
    }
}

/// Bind `LISTEN` and serve until the process exits
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Qanda listening on {}", state.args.listen);
    if state.args.dev_mode {
        warn!("Development mode enabled - dev JWT secret accepted");
    }

    serve(listener, state).await
}

/// Accept loop over an already-bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let (parts, body) = req.into_parts();

    info!("[{}] {} {}", addr, parts.method, path);

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read body from {}: {}", addr, e);
            return Ok(routes::error_response(
                &state,
                QandaError::BadRequest("Failed to read request body".into()),
            ));
        }
    };

    Ok(routes::dispatch(&state, parts.method, &path, query.as_deref(), &parts.headers, body).await)
}
