pub mod config;
pub mod feed;
pub mod localization;
pub mod logging;
pub mod profile;
pub mod session;
pub mod tracker;
pub mod weather;
