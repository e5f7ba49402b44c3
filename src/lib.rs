pub mod cookie;
pub mod list;
pub mod server;

pub use cookie::{CookieResponder, CookieSpec, Outcome, ProcessingError};
pub use list::list_cookies;
pub use server::{build_response, router, serve, ServerError};
