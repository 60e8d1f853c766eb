// BaseOne backend - scheduled blog publishing.
//
// This crate provides the task queue that records "publish this content to
// this blog at this time" requests and the worker loop that executes them
// against the Blogger API.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::Config;
