//! Unary client for `querykit.QueryKit`, shaped like tonic-generated stubs.

use super::proto::{QueryReply, QueryRequest};
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;

const QUERY_PATH: &str = "/querykit.QueryKit/Query";

#[derive(Debug, Clone)]
pub struct QueryKitClient {
    inner: tonic::client::Grpc<Channel>,
}

impl QueryKitClient {
    pub fn new(channel: Channel) -> Self {
        QueryKitClient {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn query(
        &mut self,
        request: impl tonic::IntoRequest<QueryRequest>,
    ) -> Result<tonic::Response<QueryReply>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unavailable(format!("service was not ready: {e}")))?;
        let codec: ProstCodec<QueryRequest, QueryReply> = ProstCodec::default();
        let path = PathAndQuery::from_static(QUERY_PATH);
        self.inner.unary(request.into_request(), path, codec).await
    }
}
