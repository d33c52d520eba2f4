//! calendar-queue: rate-limit-aware request queue for a calendar API
//!
//! A library for capturing HTTP requests onto a queue and replaying them
//! against a calendar API one at a time, slowing down when the API
//! reports rate limiting.

pub mod broker;
pub mod config;
pub mod consumer;
pub mod downstream;
pub mod ingress;
pub mod message;
pub mod time;
