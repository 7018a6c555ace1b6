//! Omnipay-style gateway for WeChat Pay in-app web (JSAPI) payments.
//!
//! * [`config`] – named parameter storage with defaults-then-overrides
//!   initialisation.
//! * [`gateway`] – the [`Gateway`](gateway::Gateway) trait and
//!   [`InAppWebGateway`](gateway::InAppWebGateway), which prepares purchases
//!   and authenticates payment notifications.
//! * [`signature`] – the v2 API `sign` algorithm.
//! * [`objects`] – orders, requests, responses and the XML envelope.
//! * [`client`] – HTTP transport (feature `client`).

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod gateway;
pub mod objects;
pub mod signature;
