//! IO modules - external system interfaces
//!
//! - `route_service` - HTTP client for the routing service
//! - `mock_router` - Local stand-in for the routing service (hyper),
//!   built with the `mock` feature

#[cfg(any(test, feature = "mock"))]
pub mod mock_router;
pub mod route_service;

// Re-export commonly used types
pub use route_service::{HttpRouteService, RouteService};
