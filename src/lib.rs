//! A Secret Service control plane: DH-negotiated sessions, collections and
//! items holding session-encrypted secrets, and a password login that binds a
//! cookie to the session.

pub mod config;
pub mod error;
pub mod paths;
pub mod routes;
pub mod state;
pub mod wire;

pub mod crypto {
    pub mod aes;
    pub mod dh;
    pub mod hash;
    pub mod token;
}

pub mod models {
    pub mod collection;
    pub mod item;
    pub mod secret;
    pub mod session;
}

pub mod repositories {
    pub mod password;
}

pub mod services {
    pub mod auth;
    pub mod secret;
    pub mod session;
    pub mod store;
}

pub mod handlers {
    pub mod auth;
    pub mod item;
    pub mod service;
}

pub mod client;

pub use client::SecretServiceClient;
pub use config::Config;
pub use error::{Result, ServiceError};
pub use state::ServiceState;
