//! gridwatch-client: the control-plane boundary of gridwatch.
//!
//! Defines the domain types returned by the orchestration control plane,
//! the [`ReadOptions`] applied uniformly to read queries, and the
//! [`ControlPlane`] trait the collector is written against.
//!
//! # Architecture
//!
//! ```text
//! ControlPlane (trait, boxed Send futures)
//!   ├── HttpControlPlane → hyper client → /v1/... JSON
//!   └── MockControlPlane → in-memory MockState (tests; `mock` feature)
//! ```

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod options;
pub mod transport;
pub mod types;

pub use client::{ClientFuture, ControlPlane};
pub use error::{ClientError, ClientResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockControlPlane, MockState};
pub use options::ReadOptions;
pub use transport::HttpControlPlane;
pub use types::*;
