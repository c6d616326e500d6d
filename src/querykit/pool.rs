//! Bounded pool of gRPC channels to the query service.

use crate::error::QueryError;
use deadpool::managed::{self, Metrics, PoolError, RecycleError, RecycleResult, TimeoutType};
use deadpool::Runtime;
use std::time::Duration;
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};

pub type ChannelPool = managed::Pool<ChannelManager>;
pub type PooledChannel = managed::Object<ChannelManager>;

#[derive(Clone, Debug)]
pub struct PoolOptions {
    pub min_size: usize,
    pub max_size: usize,
    pub dial_timeout: Duration,
    pub idle_timeout: Duration,
    pub wait_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        PoolOptions {
            min_size: 8,
            max_size: 16,
            dial_timeout: Duration::from_secs(20),
            idle_timeout: Duration::from_secs(60),
            wait_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Error, Debug)]
pub enum DialError {
    #[error("transport: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("connection idle past timeout")]
    IdleExpired,
}

#[derive(Debug)]
pub struct ChannelManager {
    endpoint: Endpoint,
    idle_timeout: Duration,
}

impl ChannelManager {
    pub fn new(address: &str, options: &PoolOptions) -> Result<Self, QueryError> {
        let endpoint = Endpoint::from_shared(address.to_string())
            .map_err(|e| QueryError::Dial(format!("{address}: {e}")))?
            .connect_timeout(options.dial_timeout);
        Ok(ChannelManager {
            endpoint,
            idle_timeout: options.idle_timeout,
        })
    }
}

impl managed::Manager for ChannelManager {
    type Type = Channel;
    type Error = DialError;

    async fn create(&self) -> Result<Channel, DialError> {
        let channel = self.endpoint.connect().await?;
        tracing::debug!(uri = %self.endpoint.uri(), "query service channel dialed");
        Ok(channel)
    }

    async fn recycle(&self, _channel: &mut Channel, metrics: &Metrics) -> RecycleResult<DialError> {
        if metrics.last_used() > self.idle_timeout {
            return Err(RecycleError::Backend(DialError::IdleExpired));
        }
        Ok(())
    }
}

pub fn build_pool(
    manager: ChannelManager,
    options: &PoolOptions,
) -> Result<ChannelPool, QueryError> {
    managed::Pool::builder(manager)
        .max_size(options.max_size.max(1))
        .wait_timeout(Some(options.wait_timeout))
        .create_timeout(Some(options.dial_timeout))
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| QueryError::Pool(e.to_string()))
}

/// Dial up to `min_size` channels and return them to the pool.
pub async fn warm_up(pool: &ChannelPool, min_size: usize) -> Result<(), QueryError> {
    let mut held = Vec::with_capacity(min_size);
    for _ in 0..min_size.min(pool.status().max_size) {
        held.push(pool.get().await.map_err(map_pool_error)?);
    }
    tracing::info!(channels = held.len(), "query service pool warmed up");
    Ok(())
}

pub fn map_pool_error(err: PoolError<DialError>) -> QueryError {
    match err {
        PoolError::Timeout(TimeoutType::Wait) => QueryError::PoolExhausted,
        PoolError::Timeout(TimeoutType::Create) => QueryError::DialTimeout,
        PoolError::Backend(e) => QueryError::Dial(e.to_string()),
        other => QueryError::Pool(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_map_to_query_errors() {
        assert!(matches!(
            map_pool_error(PoolError::Timeout(TimeoutType::Wait)),
            QueryError::PoolExhausted
        ));
        assert!(matches!(
            map_pool_error(PoolError::Timeout(TimeoutType::Create)),
            QueryError::DialTimeout
        ));
        assert!(matches!(
            map_pool_error(PoolError::Backend(DialError::IdleExpired)),
            QueryError::Dial(_)
        ));
        assert!(matches!(map_pool_error(PoolError::Closed), QueryError::Pool(_)));
    }

    #[test]
    fn invalid_address_is_rejected() {
        let err = ChannelManager::new("not a uri", &PoolOptions::default()).unwrap_err();
        assert!(matches!(err, QueryError::Dial(_)));
    }

    #[tokio::test]
    async fn pool_is_lazy_until_first_checkout() {
        let manager = ChannelManager::new("http://127.0.0.1:1", &PoolOptions::default()).unwrap();
        let pool = build_pool(manager, &PoolOptions::default()).unwrap();
        let status = pool.status();
        assert_eq!(status.size, 0);
        assert_eq!(status.max_size, 16);
    }
}
