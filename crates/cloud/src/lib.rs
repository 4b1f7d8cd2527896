#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`CloudClientError`)
//! - [`api`]: Service traits (`NetworkClient`, `QosClient`, `ComputeClient`, `PlacementClient`)
//!   and request bodies
//! - [`auth`]: Keystone v3 token issue and catalog lookup
//! - [`http`]: HTTP implementation of every service trait (`OpenStackClient`)

pub mod api;
pub mod auth;
pub mod error;
pub mod http;

// --- Public API Re-exports ---

// Service traits
pub use api::{CloudClient, ComputeClient, NetworkClient, PlacementClient, QosClient};

// Request bodies
pub use api::{FlavorSpec, NetworkSpec, PortSpec, ServerNetwork, ServerSpec, SubnetSpec};

// Authentication
pub use auth::{Catalog, ServiceEndpoints, Token, authenticate};

// Error
pub use error::CloudClientError;

// HTTP client
pub use http::OpenStackClient;
