//! Client-side mirror of the service.

pub mod cache;
#[allow(clippy::module_inception)]
pub mod client;

pub use cache::{ClientCache, ClientCollection, ClientItem, ClientSession};
pub use client::SecretServiceClient;
