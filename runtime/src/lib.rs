pub mod config;
pub mod cors;
pub mod request;
pub mod response;

pub use config::{ConfigError, CorsConfig, FixtureConfig, LogConfig, ServerConfig};
pub use cors::set_no_cache_and_cors_headers;
pub use request::{Cookies, Headers, Params, Request};
pub use response::ResponseControl;
