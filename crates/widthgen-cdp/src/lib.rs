#![forbid(unsafe_code)]

//! A deliberately small Chrome DevTools Protocol client.
//!
//! Only two things are supported:
//! - discovering debuggable targets through the `/json` HTTP listing
//! - sending commands over a target's WebSocket and awaiting their replies
//!
//! A [`Connection`] may be shared between tasks (`Arc<Connection>`). Every command carries a
//! fresh message id and replies are routed back to the caller that issued it, so concurrent
//! evaluations never observe each other's results.

pub mod conn;
pub mod endpoint;
pub mod error;

pub use conn::Connection;
pub use endpoint::{Endpoint, endpoints, find_page};
pub use error::{Error, Result};
