//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod llm;
pub mod log_sink;
pub mod transcoder;
pub mod tts;

pub use llm::*;
pub use log_sink::*;
pub use transcoder::*;
pub use tts::*;
