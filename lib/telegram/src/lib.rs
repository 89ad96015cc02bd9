pub mod bot;
pub mod bot_api;
