//! Session tokens: issuing them at log in and verifying them on every
//! protected request.

mod log_in;
mod middleware;
mod token;

#[cfg(test)]
pub use log_in::LogInResponse;
pub use log_in::post_log_in;
pub use middleware::auth_guard;
pub use token::{Claims, DEFAULT_TOKEN_DURATION};
