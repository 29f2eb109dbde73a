//! Step store implementations
//!
//! - `MemoryStepStore`: in-process, with failure/latency injection
//! - `HttpStepStore`: REST backend

mod http;
mod memory;

pub use http::HttpStepStore;
pub use memory::MemoryStepStore;
