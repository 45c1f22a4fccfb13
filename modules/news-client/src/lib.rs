pub mod error;
pub mod google_news;
pub mod newsapi;
pub mod types;

pub use error::{NewsError, Result};
pub use google_news::GoogleNewsClient;
pub use newsapi::NewsApiClient;
pub use types::{Article, SearchOptions};
