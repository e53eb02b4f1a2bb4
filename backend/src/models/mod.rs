pub mod cache;
pub mod chat;
pub mod error;
pub mod jwt;
pub mod news;
pub mod user;
pub mod weather;
