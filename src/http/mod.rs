//! HTTP execution engine with retry logic for service calls.

mod client;
mod retry;

pub(crate) use client::{Download, HttpEngine};
