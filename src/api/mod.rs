//! Remote conversational-service boundary.
//!
//! [`TurnExchange`] abstracts the two requests the client makes — session
//! creation and the per-turn exchange — so the pipeline can be tested
//! against mocks.  [`ApiExchange`] is the reqwest-backed production
//! implementation.

pub mod exchange;
pub mod types;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use exchange::{
    ApiExchange, ExchangeError, TurnExchange, FALLBACK_ERROR_TEXT, LOCAL_SESSION_ID,
};
pub use types::{Emotion, TurnReply};
