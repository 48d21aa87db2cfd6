//! HTTP transport adapters. Implement HttpTransport.

pub mod reqwest_transport;
pub mod scripted;

pub use reqwest_transport::ReqwestTransport;
pub use scripted::{ScriptedTransport, Step};
