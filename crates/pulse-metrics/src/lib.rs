pub mod dispatch;
pub mod http;
pub mod json;
pub mod prometheus;
pub mod sink;

pub use dispatch::{DispatchReport, Dispatcher};
pub use http::HttpSink;
pub use json::JsonLinesSink;
pub use prometheus::PrometheusSink;
pub use sink::{MemorySink, MetricsSink};
