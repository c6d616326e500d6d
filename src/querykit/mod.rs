//! Query service transport.
//!
//! Handlers talk to the backend only through [`QueryClient`]; the gRPC
//! implementation checks a channel out of the pool for each call and holds it
//! until the reply (or the deadline) arrives.

pub mod client;
pub mod pool;
pub mod proto;

use crate::error::QueryError;
use crate::service::{Operator, ResolvedCondition};
use async_trait::async_trait;
use std::time::Duration;

pub use client::QueryKitClient;
pub use pool::{ChannelPool, PoolOptions};
pub use proto::Record;

/// Positional query options; zero values mean "not set".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub limit: i64,
    pub offset: i64,
    pub order_by: String,
    pub descending: bool,
}

/// One compiled query.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
    pub table: String,
    pub condition: Option<ResolvedCondition>,
    pub options: QueryOptions,
}

impl From<Operator> for proto::Operator {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Eq => proto::Operator::Eq,
            Operator::Gt => proto::Operator::Gt,
            Operator::Gte => proto::Operator::Gte,
            Operator::Lt => proto::Operator::Lt,
            Operator::Lte => proto::Operator::Lte,
        }
    }
}

impl From<&ResolvedCondition> for proto::Condition {
    fn from(node: &ResolvedCondition) -> Self {
        proto::Condition {
            name: node.name.clone(),
            operator: proto::Operator::from(node.operator) as i32,
            value: node.value.clone(),
            conditions: node.conditions.iter().map(proto::Condition::from).collect(),
        }
    }
}

impl From<&QueryRequest> for proto::QueryRequest {
    fn from(req: &QueryRequest) -> Self {
        proto::QueryRequest {
            table: req.table.clone(),
            conditions: req.condition.iter().map(proto::Condition::from).collect(),
            limit: req.options.limit,
            offset: req.options.offset,
            order_by: req.options.order_by.clone(),
            descending: req.options.descending,
        }
    }
}

#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, request: QueryRequest) -> Result<Vec<Record>, QueryError>;

    /// Cheap reachability check used by `/ready`.
    async fn ping(&self) -> Result<(), QueryError>;
}

#[derive(Clone, Debug)]
pub struct GrpcQueryClient {
    pool: ChannelPool,
    request_timeout: Duration,
}

impl GrpcQueryClient {
    pub fn new(pool: ChannelPool, request_timeout: Duration) -> Self {
        GrpcQueryClient { pool, request_timeout }
    }

    /// Build the pool for `address` (e.g. `http://127.0.0.1:44444`) and dial
    /// `min_size` channels up front. Warm-up failures are logged; channels are
    /// dialed again on demand.
    pub async fn connect(
        address: &str,
        options: &PoolOptions,
        request_timeout: Duration,
    ) -> Result<Self, QueryError> {
        let manager = pool::ChannelManager::new(address, options)?;
        let pool = pool::build_pool(manager, options)?;
        if let Err(e) = pool::warm_up(&pool, options.min_size).await {
            tracing::warn!(address, error = %e, "query service pool warm-up failed");
        }
        Ok(GrpcQueryClient::new(pool, request_timeout))
    }

    pub fn pool(&self) -> &ChannelPool {
        &self.pool
    }
}

/// A deadline enforced by either side of the call surfaces as a timeout.
fn map_status(status: tonic::Status) -> QueryError {
    match status.code() {
        tonic::Code::DeadlineExceeded | tonic::Code::Cancelled => QueryError::Timeout,
        _ => QueryError::Rpc(status),
    }
}

#[async_trait]
impl QueryClient for GrpcQueryClient {
    async fn query(&self, request: QueryRequest) -> Result<Vec<Record>, QueryError> {
        let call = async {
            let channel = self.pool.get().await.map_err(pool::map_pool_error)?;
            let mut client = QueryKitClient::new((*channel).clone());
            let mut rpc = tonic::Request::new(proto::QueryRequest::from(&request));
            rpc.set_timeout(self.request_timeout);
            let reply = client.query(rpc).await.map_err(map_status)?;
            drop(channel);
            Ok::<_, QueryError>(reply.into_inner().records)
        };
        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| QueryError::Timeout)?
    }

    async fn ping(&self) -> Result<(), QueryError> {
        let channel = tokio::time::timeout(self.request_timeout, self.pool.get())
            .await
            .map_err(|_| QueryError::Timeout)?
            .map_err(pool::map_pool_error)?;
        drop(channel);
        Ok(())
    }
}
