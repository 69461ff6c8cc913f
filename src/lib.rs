//! Client SDK for the Docmosis document generation web services.
//!
//! Render stored templates to documents, manage templates, images and files
//! held by the service, convert documents between formats and fetch render
//! statistics. Every operation is a plain request struct validated before
//! send, executed over HTTPS with retry on transient failures, and parsed
//! into a typed response.
//!
//! ```no_run
//! use dws_client::render::{RenderData, RenderRequest};
//! use dws_client::{DwsClient, Endpoint, Environment};
//!
//! # async fn run() -> dws_client::Result<()> {
//! let client = DwsClient::new(Environment::new(Endpoint::DwsVersion2Usa, "ACCESS-KEY"))?;
//!
//! let request = RenderRequest {
//!     data: Some(RenderData::Json(serde_json::json!({ "title": "Hi" }))),
//!     ..RenderRequest::new("welcome.docx", "welcome.pdf")
//! };
//! let response = client.render_to_path(&request, "welcome.pdf").await?;
//! if !response.succeeded() {
//!     eprintln!("render failed: {:?}", response.status.short_msg());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Business failures reported by the service (unknown template, bad data)
//! come back as responses with `succeeded() == false`; raised errors are
//! reserved for configuration, validation and persistent transport
//! problems.

pub mod client;
pub mod convert;
pub mod environment;
pub mod error;
pub mod file;
mod http;
pub mod image;
pub mod render;
pub mod rendertags;
pub mod response;
pub mod template;

pub use client::DwsClient;
pub use environment::{Endpoint, Environment, Proxy, default_environment, set_default_environment};
pub use error::{Error, Operation, Result};
pub use response::{DownloadResponse, ResponseStatus};
