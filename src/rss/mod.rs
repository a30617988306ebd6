pub mod parser;

pub use parser::{FeedParser, ParsedEntry, ParsedFeed};
