pub mod http_client;
pub mod json;
pub mod signal;
pub mod task;
