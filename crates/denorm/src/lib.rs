//! denorm — a request-routing front end for denormalized Q&A queries.
//!
//! One ROUTER socket accepts opaque multi-part requests from many clients;
//! a least-loaded dispatcher fans the parsed work out to a bounded pool of
//! workers, each with its own store session; a reply multiplexer routes
//! every correlated [`Product`] back to the client that asked. Shutdown is
//! a drain, never a mid-task cancellation.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod listener;
pub mod metrics;
pub mod model;
pub mod params;
pub mod registry;
pub mod server;
pub mod store;
pub mod transport;
pub mod worker;

pub use config::DenormConfig;
pub use error::DenormError;
pub use frame::{Product, RoutingId, Work};
pub use metrics::ServerMetrics;
pub use registry::{TaskError, TaskHandler, TaskOutcome, TaskRegistry};
pub use server::Server;
pub use store::{DataStore, Dataset, MemoryStore, Page, StoreError, StoreSession};
pub use transport::Transport;
pub use worker::QueryWorker;
