//! Endpoint handlers that need more than a few lines of decoding.

pub mod skills;
