// In-memory memoization of search results per query key
pub mod cache;

pub use cache::QueryCache;
