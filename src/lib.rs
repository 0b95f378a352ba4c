// Differential-drive motor velocity controller
//
// Two independent pipelines over zenoh:
// - command: wheel velocity targets -> saturated motor commands
// - encoder: raw wheel positions -> unwrapped aggregate, published at a
//   fixed rate

pub mod command;
pub mod config;
pub mod encoder;
pub mod messages;
pub mod runtime;
