#[cfg(feature = "anthropic")]
pub mod anthropic;
pub mod stub;
mod types;

pub use types::{ChatChunk, ChatRequest, ChatStream, Provider};
