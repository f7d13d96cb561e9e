mod cache;
mod client;
pub mod models;
mod sanitize;
mod transport;

pub use cache::HttpCache;
pub use client::{Builds, CircleClient, ListBuilds, StepIds, Steps};
pub use transport::Transport;
