//! linecam Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the linecam camera
//! engine run both in **Production** (tokio + HTTP) and under a
//! **Simulation** harness with a virtual clock.
//!
//! # Core Concept
//!
//! Everything the engine needs from the outside world goes through a trait:
//! - Time (`now()`, `sleep()`) and tasks (`spawn()`) via [`SceneContext`]
//! - Remote line storage (`get()`, `post()`, `put()`) via [`LineTransport`]
//!
//! The convergence scheduler only ever waits on `SceneContext::sleep`, so a
//! virtual clock makes every tick sequence reproducible.
//!
//! # Example
//!
//! ```ignore
//! use linecam_env::{SceneContext, TokioContext};
//!
//! async fn tick_loop<Ctx: SceneContext>(ctx: &Ctx) {
//!     loop {
//!         ctx.sleep(Duration::from_millis(100)).await;
//!         tick();
//!     }
//! }
//! ```

mod context;
mod error;
mod http;
mod tokio_impl;
mod transport;

pub use context::SceneContext;
pub use error::TransportError;
pub use http::{HttpTransport, TransportConfig};
pub use tokio_impl::TokioContext;
pub use transport::{LineTransport, TransportExt};
