//! Bearer tokens for the push/relay API, cached per identity.
//!
//! A single worker task owns the cache. Callers send requests over a
//! channel and wait for the reply, so a burst of requests during a miss
//! results in one fetch: the first request fetches and caches, the ones
//! queued behind it are served from the cache.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skuttle_shared::FeedId;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

const QUEUE_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token: String,
    pub expires: DateTime<Utc>,
    pub identity: FeedId,
}

impl Token {
    /// A token expiring exactly at `now` is already expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires
    }
}

pub trait TokenFetcher: Send + Sync + 'static {
    fn fetch(&self, identity: &FeedId) -> impl Future<Output = Result<Token>> + Send;
}

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Serialize)]
struct TokenRequestBody<'a> {
    identity: &'a FeedId,
}

/// Fetches tokens with `POST {"identity": ...}` to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpTokenFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl TokenFetcher for HttpTokenFetcher {
    async fn fetch(&self, identity: &FeedId) -> Result<Token> {
        let resp = self
            .client
            .post(&self.url)
            .json(&TokenRequestBody { identity })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::HttpStatus(resp.status().as_u16()));
        }

        Ok(resp.json::<Token>().await?)
    }
}

#[derive(Debug)]
struct TokenRequest {
    identity: FeedId,
    reply: oneshot::Sender<Result<Token>>,
}

/// Handle on the token worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TokenCache {
    tx: mpsc::Sender<TokenRequest>,
    reply_timeout: Duration,
}

impl TokenCache {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn<F: TokenFetcher>(fetcher: F, reply_timeout: Duration) -> Self {
        Self::spawn_with_clock(fetcher, SystemClock, reply_timeout)
    }

    pub fn spawn_with_clock<F: TokenFetcher, C: Clock>(fetcher: F, clock: C, reply_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(run_worker(fetcher, clock, rx));
        Self { tx, reply_timeout }
    }

    /// Valid token for `identity`, fetched only when the cached one expired.
    pub async fn token(&self, identity: &FeedId) -> Result<Token> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(TokenRequest {
                identity: identity.clone(),
                reply,
            })
            .await
            .map_err(|_| ClientError::WorkerStopped)?;

        match tokio::time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::WorkerStopped),
            Err(_) => {
                warn!(identity = %identity, "Timed out waiting for token");
                Err(ClientError::Timeout)
            }
        }
    }

    pub async fn token_string(&self, identity: &FeedId) -> Result<String> {
        Ok(self.token(identity).await?.token)
    }
}

async fn run_worker<F: TokenFetcher, C: Clock>(fetcher: F, clock: C, mut rx: mpsc::Receiver<TokenRequest>) {
    let mut cache: HashMap<FeedId, Token> = HashMap::new();

    while let Some(TokenRequest { identity, reply }) = rx.recv().await {
        let cached = cache
            .get(&identity)
            .filter(|token| token.is_valid_at(clock.now()))
            .cloned();

        let result = match cached {
            Some(token) => Ok(token),
            None => {
                debug!(identity = %identity, "Fetching token");
                match fetcher.fetch(&identity).await {
                    Ok(token) => {
                        info!(identity = %identity, expires = %token.expires, "Token refreshed");
                        cache.insert(identity, token.clone());
                        Ok(token)
                    }
                    Err(e) => {
                        warn!(identity = %identity, error = %e, "Token fetch failed");
                        Err(e)
                    }
                }
            }
        };
        // the caller may have timed out
        let _ = reply.send(result);
    }

    debug!("Token cache worker stopped");
}
