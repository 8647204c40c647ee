//! Endpoint and model resolution, performed once before the iteration loop

mod endpoint;
mod model;

pub use endpoint::EndpointResolver;
pub use model::{extract_model_id, ModelResolver, RetryPolicy};
