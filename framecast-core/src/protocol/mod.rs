//! Wire payloads exchanged with the inference server.
//!
//! Outbound frames are bare JPEG bytes and need no type here; replies are
//! JSON documents described in [`prediction`].

pub mod prediction;

pub use prediction::{NO_PREDICTIONS, Prediction, PredictionReply, parse_predictions, summarize};
