pub mod chat;
pub mod middleware;
pub mod news;
pub mod users;
pub mod weather;
