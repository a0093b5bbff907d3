//! HTTP plumbing for talking to upstream engines

mod client;
mod decode;

pub use client::{HttpClient, HttpResponse};
pub use decode::decode_body;
