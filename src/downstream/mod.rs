//! Downstream layer: replaying queued requests against the calendar API.
//!
//! This module provides:
//! - HTTP request/response values ([`HttpRequest`], [`HttpResponse`])
//! - The client seam ([`HttpClient`]) and its reqwest implementation ([`ReqwestClient`])
//! - Request construction from queued messages ([`CalendarApi`])

mod calendar;
mod client;
mod error;
mod http;

#[cfg(test)]
mod calendar_tests;

pub use calendar::CalendarApi;
pub use client::ReqwestClient;
pub use error::{BuildError, HttpError};
pub use http::{HttpClient, HttpRequest, HttpResponse};
