//! REST presenter: configuration-driven endpoints over a remote tabular query service.
//!
//! Each endpoint definition file declares an HTTP route, a query against the
//! backend (table, condition tree, pagination, ordering) and the response
//! states rendered from the result.

pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod expression;
pub mod handlers;
pub mod querykit;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod state;

pub use config::{EndpointDefinition, ValueSpec};
pub use endpoint::{Endpoint, RenderedResponse, Stage};
pub use error::{AppError, CodecError, ConfigError, ExpressionError, QueryError, RenderError};
pub use expression::{Environment, Evaluator, EvaluatorLimits, RhaiEvaluator};
pub use querykit::{GrpcQueryClient, PoolOptions, QueryClient, QueryOptions, QueryRequest};
pub use registry::EndpointRegistry;
pub use response::{Renderer, StateDefaults, TemplateStore};
pub use routes::{common_routes, endpoint_routes};
pub use settings::Settings;
pub use state::AppState;
