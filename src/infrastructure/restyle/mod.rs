//! Voice transformation provider adapters

mod http;

pub use http::HttpRestyleProvider;
