//! Log Sink Adapter - 本地 JSONL 文件与远程 HTTP 两种实现

mod http_log_sink;
mod jsonl_file_sink;

pub use http_log_sink::{HttpLogSink, HttpLogSinkConfig};
pub use jsonl_file_sink::JsonlFileLogSink;
