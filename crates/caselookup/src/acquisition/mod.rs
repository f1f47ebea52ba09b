//! Network acquisition: the retrying HTTP fetcher every source goes through.

pub mod http_client;

pub use http_client::{FetchRequest, FetchedPage, Fetcher, RetryPolicy};
