// LLM abstraction layer

pub mod provider;
pub mod google;

#[cfg(test)]
pub(crate) mod mock;

pub use provider::*;
