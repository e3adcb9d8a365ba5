pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod loader;
pub mod negotiation;
pub mod payload;
pub mod resolver;
pub mod retry;
pub mod session;
pub mod store;
pub mod utils;

pub use error::{ApiError, NegotiationError, ValidationError};
pub use session::NegotiationSession;
pub use store::{NegotiationState, NegotiationStore, StoreUpdate};
