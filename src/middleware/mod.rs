//! Request middleware.
//!
//! A middleware is a composable transformation applied to a built request.
//! Middlewares run in service-declared order followed by client-declared
//! order, and always before signing so that their header changes are covered
//! by the signature. A middleware failure aborts the call.

use crate::error::AwsError;
use crate::request::AwsRequest;
use std::fmt;
use std::sync::Arc;

/// Context handed to each middleware invocation.
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    /// Name of the operation being executed.
    pub operation: String,
    /// Request id assigned by the executor.
    pub request_id: u64,
    /// Attempt number, starting at 1.
    pub attempt: u32,
}

/// A transformation applied to a built request before signing.
pub trait Middleware: Send + Sync + fmt::Debug {
    /// Transform the request in place. Returning an error aborts the call.
    fn handle(&self, request: &mut AwsRequest, context: &MiddlewareContext) -> Result<(), AwsError>;
}

/// Run a middleware chain over the request, in order.
pub fn run_chain(
    middlewares: &[Arc<dyn Middleware>],
    request: &mut AwsRequest,
    context: &MiddlewareContext,
) -> Result<(), AwsError> {
    for middleware in middlewares {
        middleware.handle(request, context)?;
    }
    Ok(())
}
