// crates/source-gate-proxy/src/chain.rs
// ============================================================================
// Module: Interceptor Chain
// Description: Ordered request interceptors around a terminal forwarder.
// Purpose: Compose audit, authorization, and forwarding per request.
// Dependencies: axum, async-trait
// ============================================================================

//! ## Overview
//! A request passes through an ordered list of [`RequestInterceptor`]s and
//! finally reaches a [`Forwarder`]. Each interceptor receives a [`Next`]
//! handle for the rest of the chain and either calls [`Next::run`] once or
//! answers the request itself. The list is fixed when the chain is built and
//! is shared read-only by every request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

// ============================================================================
// SECTION: Interfaces
// ============================================================================

/// One stage of the request pipeline.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Handles `request`, delegating to `next` to continue the chain.
    async fn handle(&self, request: Request<Body>, next: Next<'_>) -> Response;
}

/// Terminal stage that produces the response for an allowed request.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Produces the response for `request`.
    async fn forward(&self, request: Request<Body>) -> Response;
}

// ============================================================================
// SECTION: Next
// ============================================================================

/// Remainder of the chain after the current interceptor.
///
/// Consumed by [`Next::run`], so each stage continues the chain at most once.
pub struct Next<'a> {
    /// Interceptors not yet run.
    interceptors: &'a [Arc<dyn RequestInterceptor>],
    /// Terminal forwarder.
    forwarder: &'a dyn Forwarder,
}

impl<'a> Next<'a> {
    /// Creates a handle over `interceptors` ending at `forwarder`.
    #[must_use]
    pub const fn new(
        interceptors: &'a [Arc<dyn RequestInterceptor>],
        forwarder: &'a dyn Forwarder,
    ) -> Self {
        Self {
            interceptors,
            forwarder,
        }
    }

    /// Runs the remaining chain.
    pub async fn run(self, request: Request<Body>) -> Response {
        match self.interceptors.split_first() {
            Some((current, rest)) => current.handle(request, Next::new(rest, self.forwarder)).await,
            None => self.forwarder.forward(request).await,
        }
    }
}

// ============================================================================
// SECTION: Chain
// ============================================================================

/// Immutable interceptor list plus terminal forwarder.
#[derive(Clone)]
pub struct InterceptorChain {
    /// Interceptors, outermost first.
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    /// Terminal forwarder.
    forwarder: Arc<dyn Forwarder>,
}

impl InterceptorChain {
    /// Builds a chain running `interceptors` in order, outermost first.
    #[must_use]
    pub fn new(interceptors: Vec<Arc<dyn RequestInterceptor>>, forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            interceptors,
            forwarder,
        }
    }

    /// Number of interceptors ahead of the forwarder.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns true when requests go straight to the forwarder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Runs `request` through the whole chain.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        Next::new(&self.interceptors, self.forwarder.as_ref()).run(request).await
    }
}

#[cfg(test)]
mod tests;
