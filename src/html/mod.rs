pub mod toolkit;
pub mod formatter;

pub use toolkit::HtmlDoc;
