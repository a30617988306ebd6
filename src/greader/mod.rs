pub mod item_id;
pub mod services;
pub mod stream_filter;
pub mod transport;

pub use services::GReaderService;
pub use stream_filter::StreamFilter;
