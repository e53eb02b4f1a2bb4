//! Client-side data layer: offline cache, cache-backed fetching, the polling
//! news feed and the streaming chat session.

pub mod api;
pub mod cached_fetch;
pub mod chat;
pub mod connectivity;
pub mod decoder;
pub mod error;
pub mod news_feed;
pub mod offline_cache;
pub mod store;
