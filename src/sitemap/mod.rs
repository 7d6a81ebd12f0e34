mod fetcher;
mod parser;
mod resolver;
mod robots;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{FetchPolicy, HttpTransport, RetryFetcher, Transport};
pub use resolver::SitemapResolver;
