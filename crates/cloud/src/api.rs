//! OpenStack service API abstraction for testability.
//!
//! Each service the scenarios talk to is a trait, allowing production code to
//! use [`OpenStackClient`](crate::OpenStackClient) while tests use in-memory fakes.
//!
//! # Architecture
//!
//! ```text
//!        ┌────────────────┐
//!        │ ScenarioRunner │
//!        └───────┬────────┘
//!                │
//!                ▼
//!         ┌─────────────┐
//!         │ CloudClient │ (NetworkClient + QosClient
//!         └─────────────┘  + ComputeClient + PlacementClient)
//!            │       │
//!            ▼       ▼
//!   ┌─────────────┐ ┌──────┐
//!   │OpenStack    │ │ Fake │
//!   │Client (HTTP)│ └──────┘
//!   └──────┬──────┘
//!          ▼
//!   neutron / nova / placement
//! ```
//!
//! # Error Handling
//!
//! - **404 responses**: `CloudClientError::NotFound`, so cleanup can ignore them
//! - **Other non-2xx**: `CloudClientError::Api` with the status and body
//! - **Connection / timeout**: `CloudClientError::Transport`

use std::future::Future;

use serde::Serialize;

use qosverify_core::types::{
    AllocationCandidates, Allocations, CreatedServer, Direction, Flavor, MinimumBandwidthRule,
    Network, Port, QosPolicy, ResourceRequest, Router, Server, Subnet,
};

use crate::error::CloudClientError;

/// Request body for `POST /v2.0/networks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkSpec {
    pub name: String,
    pub shared: bool,
    #[serde(rename = "provider:network_type", skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(
        rename = "provider:physical_network",
        skip_serializing_if = "Option::is_none"
    )]
    pub physical_network: Option<String>,
    #[serde(
        rename = "provider:segmentation_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub segmentation_id: Option<u32>,
}

impl NetworkSpec {
    /// A shared VLAN provider network on `physnet`.
    pub fn vlan_provider(name: impl Into<String>, physnet: &str, segmentation_id: u32) -> Self {
        Self {
            name: name.into(),
            shared: true,
            network_type: Some("vlan".to_owned()),
            physical_network: Some(physnet.to_owned()),
            segmentation_id: Some(segmentation_id),
        }
    }
}

/// Request body for `POST /v2.0/subnets`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubnetSpec {
    pub name: String,
    pub network_id: String,
    pub cidr: String,
    pub ip_version: u8,
}

/// Request body for `POST /v2.0/ports`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortSpec {
    pub name: String,
    pub network_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qos_policy_id: Option<String>,
}

/// A `networks` entry of a server create request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerNetwork {
    pub port: String,
}

/// Request body for `POST /servers`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerSpec {
    pub name: String,
    #[serde(rename = "imageRef")]
    pub image_ref: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    pub networks: Vec<ServerNetwork>,
}

/// Request body for `POST /flavors`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlavorSpec {
    pub name: String,
    pub ram: u64,
    pub vcpus: u32,
    pub disk: u64,
}

impl FlavorSpec {
    /// Clone of `flavor` with one more GiB of disk, used as a resize target.
    pub fn bigger_disk_than(flavor: &Flavor) -> Self {
        Self {
            name: format!("{}extra", flavor.name),
            ram: flavor.ram,
            vcpus: flavor.vcpus,
            disk: flavor.disk + 1,
        }
    }
}

/// Network service operations (neutron core + router).
pub trait NetworkClient: Send + Sync + 'static {
    /// Lists the aliases of the enabled API extensions.
    fn list_extensions(&self)
    -> impl Future<Output = Result<Vec<String>, CloudClientError>> + Send;

    fn create_network(
        &self,
        spec: &NetworkSpec,
    ) -> impl Future<Output = Result<Network, CloudClientError>> + Send;

    fn delete_network(&self, id: &str)
    -> impl Future<Output = Result<(), CloudClientError>> + Send;

    fn create_subnet(
        &self,
        spec: &SubnetSpec,
    ) -> impl Future<Output = Result<Subnet, CloudClientError>> + Send;

    fn delete_subnet(&self, id: &str)
    -> impl Future<Output = Result<(), CloudClientError>> + Send;

    fn create_router(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Router, CloudClientError>> + Send;

    fn delete_router(&self, id: &str)
    -> impl Future<Output = Result<(), CloudClientError>> + Send;

    fn add_router_interface(
        &self,
        router_id: &str,
        subnet_id: &str,
    ) -> impl Future<Output = Result<(), CloudClientError>> + Send;

    fn remove_router_interface(
        &self,
        router_id: &str,
        subnet_id: &str,
    ) -> impl Future<Output = Result<(), CloudClientError>> + Send;

    fn create_port(
        &self,
        spec: &PortSpec,
    ) -> impl Future<Output = Result<Port, CloudClientError>> + Send;

    /// Shows a port, including its current `binding:profile`.
    fn show_port(&self, id: &str) -> impl Future<Output = Result<Port, CloudClientError>> + Send;

    fn delete_port(&self, id: &str) -> impl Future<Output = Result<(), CloudClientError>> + Send;
}

/// QoS extension operations.
pub trait QosClient: Send + Sync + 'static {
    fn create_qos_policy(
        &self,
        name: &str,
        shared: bool,
    ) -> impl Future<Output = Result<QosPolicy, CloudClientError>> + Send;

    fn delete_qos_policy(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), CloudClientError>> + Send;

    fn create_minimum_bandwidth_rule(
        &self,
        policy_id: &str,
        min_kbps: u64,
        direction: Direction,
    ) -> impl Future<Output = Result<MinimumBandwidthRule, CloudClientError>> + Send;

    fn delete_minimum_bandwidth_rule(
        &self,
        policy_id: &str,
        rule_id: &str,
    ) -> impl Future<Output = Result<(), CloudClientError>> + Send;
}

/// Compute service operations.
pub trait ComputeClient: Send + Sync + 'static {
    /// Boots a server. Only the ID of the response is meaningful.
    fn create_server(
        &self,
        spec: &ServerSpec,
    ) -> impl Future<Output = Result<CreatedServer, CloudClientError>> + Send;

    fn show_server(&self, id: &str)
    -> impl Future<Output = Result<Server, CloudClientError>> + Send;

    fn delete_server(&self, id: &str)
    -> impl Future<Output = Result<(), CloudClientError>> + Send;

    /// Cold-migrates a server; it ends in `VERIFY_RESIZE`.
    fn migrate_server(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), CloudClientError>> + Send;

    /// Resizes a server to `flavor_ref`; it ends in `VERIFY_RESIZE`.
    fn resize_server(
        &self,
        id: &str,
        flavor_ref: &str,
    ) -> impl Future<Output = Result<(), CloudClientError>> + Send;

    fn confirm_resize_server(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), CloudClientError>> + Send;

    fn show_flavor(&self, id: &str)
    -> impl Future<Output = Result<Flavor, CloudClientError>> + Send;

    fn create_flavor(
        &self,
        spec: &FlavorSpec,
    ) -> impl Future<Output = Result<Flavor, CloudClientError>> + Send;

    fn delete_flavor(&self, id: &str)
    -> impl Future<Output = Result<(), CloudClientError>> + Send;
}

/// Placement service operations.
pub trait PlacementClient: Send + Sync + 'static {
    fn list_allocation_candidates(
        &self,
        request: &ResourceRequest,
    ) -> impl Future<Output = Result<AllocationCandidates, CloudClientError>> + Send;

    /// Lists the allocations held by a consumer (server).
    fn list_allocations(
        &self,
        consumer_id: &str,
    ) -> impl Future<Output = Result<Allocations, CloudClientError>> + Send;
}

/// Everything a minimum-bandwidth scenario needs from the cloud.
pub trait CloudClient: NetworkClient + QosClient + ComputeClient + PlacementClient {}

impl<T> CloudClient for T where T: NetworkClient + QosClient + ComputeClient + PlacementClient {}
