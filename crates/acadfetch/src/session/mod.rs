//! Cookie-session client for the eCampus portal (Portal A).

mod client;

pub use client::{SessionClient, SessionConfig};
