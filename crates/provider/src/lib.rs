//! HTTP access to the hotel data provider.
//!
//! [`HotelDataClient`] is the seam the agent tools depend on; the reqwest
//! implementation talks either to the provider directly or to the same-origin
//! proxy served by `staywise-server`. [`UpstreamProxy`] is that proxy's
//! forwarding half.

pub mod client;
pub mod proxy;

pub use client::{HotelDataClient, HttpHotelDataClient, API_KEY_HEADER};
pub use proxy::{ProxyResponse, UpstreamProxy};
