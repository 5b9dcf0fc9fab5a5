//! Flow-level traffic scoring.
//!
//! Packets are aggregated into directional flows, each flow is summarised
//! into a fixed feature vector, and a standardized logistic model turns the
//! vector into a probability of the flow being malicious.

pub mod analysis;
pub mod capture;
pub mod flow;
pub mod ml;
pub mod models;
pub mod output;
pub mod utils;
