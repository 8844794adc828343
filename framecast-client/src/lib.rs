//! # framecast-client
//!
//! Command-line front end for `framecast-core`: streams frames from a
//! configured source to a UDP inference server, writes annotated frames,
//! and logs rolling metrics.
//!
//! ## Modes
//!
//! - **Client** (default): run the streaming pipeline until the source
//!   ends, the frame limit is hit, or Ctrl-C.
//! - **Stub server** (`--stub-server`): answer every datagram with a fixed
//!   predictions document, for local testing.

pub mod config;
pub mod stub;
