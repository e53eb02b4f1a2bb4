pub mod config;
pub mod i18n;
pub mod jwt_encode;
pub mod lines;
pub mod profile_store;
pub mod state;
