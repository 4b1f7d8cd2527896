//! Production client implementation over the OpenStack REST APIs.
//!
//! [`OpenStackClient`] implements every service trait of [`crate::api`] with a
//! shared `reqwest::Client`. Requests carry the Keystone token and, for compute
//! and placement, the configured microversion.
//!
//! # Examples
//!
//! ```ignore
//! use qosverify_cloud::{OpenStackClient, PlacementClient};
//! use qosverify_core::types::ResourceRequest;
//!
//! let client = OpenStackClient::connect(&config).await?;
//! let candidates = client
//!     .list_allocation_candidates(&ResourceRequest::ingress_bandwidth(1))
//!     .await?;
//! # Ok::<(), qosverify_cloud::CloudClientError>(())
//! ```

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use qosverify_core::config::QosVerifyConfig;
use qosverify_core::types::{
    AllocationCandidates, Allocations, CreatedServer, Direction, Flavor, Microversion,
    MinimumBandwidthRule, Network, Port, QosPolicy, ResourceRequest, Router, Server, Subnet,
};

use crate::api::{
    ComputeClient, FlavorSpec, NetworkClient, NetworkSpec, PlacementClient, PortSpec, QosClient,
    ServerSpec, SubnetSpec,
};
use crate::auth::{ServiceEndpoints, authenticate};
use crate::error::CloudClientError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    Compute,
    Network,
    Placement,
}

impl Service {
    fn as_str(self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::Network => "network",
            Self::Placement => "placement",
        }
    }
}

/// HTTP client for the compute, network and placement services.
#[derive(Debug, Clone)]
pub struct OpenStackClient {
    http: reqwest::Client,
    token: String,
    endpoints: ServiceEndpoints,
    compute_microversion: Microversion,
    placement_microversion: Microversion,
}

impl OpenStackClient {
    /// Authenticates against Keystone and resolves service endpoints.
    ///
    /// # Errors
    ///
    /// - `CloudClientError::Config`: missing credentials or bad microversion
    /// - `CloudClientError::Auth`: Keystone rejected the credentials
    /// - `CloudClientError::EndpointNotFound`: a service is missing from the catalog
    pub async fn connect(config: &QosVerifyConfig) -> Result<Self, CloudClientError> {
        let http = reqwest::ClientBuilder::new()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.auth.request_timeout_secs))
            .build()
            .map_err(|e| CloudClientError::Transport(format!("failed to build http client: {e}")))?;

        let compute_microversion =
            config
                .compute
                .microversion()
                .map_err(|reason| CloudClientError::Config {
                    field: "compute.microversion".to_owned(),
                    reason,
                })?;
        let placement_microversion =
            config
                .placement
                .microversion()
                .map_err(|reason| CloudClientError::Config {
                    field: "placement.microversion".to_owned(),
                    reason,
                })?;

        let token = authenticate(&http, &config.auth).await?;
        let endpoints = ServiceEndpoints::resolve(
            &token.catalog,
            &config.endpoints,
            &config.auth.interface,
            &config.auth.region,
        )?;

        debug!(
            compute = endpoints.compute.as_str(),
            network = endpoints.network.as_str(),
            placement = endpoints.placement.as_str(),
            "resolved service endpoints"
        );

        Ok(Self::with_token(
            http,
            token.id,
            endpoints,
            compute_microversion,
            placement_microversion,
        ))
    }

    /// Builds a client from an already issued token and known endpoints.
    pub fn with_token(
        http: reqwest::Client,
        token: impl Into<String>,
        endpoints: ServiceEndpoints,
        compute_microversion: Microversion,
        placement_microversion: Microversion,
    ) -> Self {
        Self {
            http,
            token: token.into(),
            endpoints,
            compute_microversion,
            placement_microversion,
        }
    }

    fn url(&self, service: Service, path: &str) -> String {
        let base = match service {
            Service::Compute => self.endpoints.compute.trim_end_matches('/'),
            Service::Placement => self.endpoints.placement.trim_end_matches('/'),
            Service::Network => {
                let base = self.endpoints.network.trim_end_matches('/');
                if base.ends_with("/v2.0") {
                    return format!("{base}{path}");
                }
                return format!("{base}/v2.0{path}");
            }
        };
        format!("{base}{path}")
    }

    fn builder(&self, service: Service, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.url(service, path))
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json");

        match service {
            Service::Compute => {
                let version = self.compute_microversion.to_string();
                builder = builder
                    .header("OpenStack-API-Version", format!("compute {version}"))
                    .header("X-OpenStack-Nova-API-Version", version);
            }
            Service::Placement => {
                builder = builder.header(
                    "OpenStack-API-Version",
                    format!("placement {}", self.placement_microversion),
                );
            }
            Service::Network => {}
        }
        builder
    }

    /// Sends a request and maps non-2xx statuses to errors.
    ///
    /// `resource` and `id` name the target for `NotFound`.
    async fn send(
        &self,
        service: Service,
        builder: RequestBuilder,
        resource: &str,
        id: &str,
    ) -> Result<reqwest::Response, CloudClientError> {
        let response = builder.send().await.map_err(|e| {
            CloudClientError::Transport(format!("{} request failed: {e}", service.as_str()))
        })?;

        let status = response.status();
        debug!(
            service = service.as_str(),
            resource,
            id,
            status = status.as_u16(),
            "api call"
        );

        if status == StatusCode::NOT_FOUND {
            return Err(CloudClientError::NotFound {
                resource: resource.to_owned(),
                id: id.to_owned(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CloudClientError::Api {
                service: service.as_str().to_owned(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        service: Service,
        builder: RequestBuilder,
        resource: &str,
        id: &str,
        envelope: Option<&str>,
    ) -> Result<T, CloudClientError> {
        let response = self.send(service, builder, resource, id).await?;
        let mut value: Value = response.json().await.map_err(|e| CloudClientError::Decode {
            service: service.as_str().to_owned(),
            reason: e.to_string(),
        })?;
        let inner = match envelope {
            Some(key) => value
                .get_mut(key)
                .map(Value::take)
                .ok_or_else(|| CloudClientError::Decode {
                    service: service.as_str().to_owned(),
                    reason: format!("missing '{key}' in response body"),
                })?,
            None => value,
        };
        serde_json::from_value(inner).map_err(|e| CloudClientError::Decode {
            service: service.as_str().to_owned(),
            reason: e.to_string(),
        })
    }

    async fn call_empty(
        &self,
        service: Service,
        builder: RequestBuilder,
        resource: &str,
        id: &str,
    ) -> Result<(), CloudClientError> {
        self.send(service, builder, resource, id).await?;
        Ok(())
    }

    async fn server_action(&self, id: &str, action: Value) -> Result<(), CloudClientError> {
        let builder = self
            .builder(Service::Compute, Method::POST, &format!("/servers/{id}/action"))
            .json(&action);
        self.call_empty(Service::Compute, builder, "server", id).await
    }
}

#[derive(serde::Deserialize)]
struct Extension {
    alias: String,
}

impl NetworkClient for OpenStackClient {
    async fn list_extensions(&self) -> Result<Vec<String>, CloudClientError> {
        let builder = self.builder(Service::Network, Method::GET, "/extensions");
        let extensions: Vec<Extension> = self
            .call_json(Service::Network, builder, "extensions", "", Some("extensions"))
            .await?;
        Ok(extensions.into_iter().map(|e| e.alias).collect())
    }

    async fn create_network(&self, spec: &NetworkSpec) -> Result<Network, CloudClientError> {
        let builder = self
            .builder(Service::Network, Method::POST, "/networks")
            .json(&json!({ "network": spec }));
        self.call_json(Service::Network, builder, "network", &spec.name, Some("network"))
            .await
    }

    async fn delete_network(&self, id: &str) -> Result<(), CloudClientError> {
        let builder = self.builder(Service::Network, Method::DELETE, &format!("/networks/{id}"));
        self.call_empty(Service::Network, builder, "network", id).await
    }

    async fn create_subnet(&self, spec: &SubnetSpec) -> Result<Subnet, CloudClientError> {
        let builder = self
            .builder(Service::Network, Method::POST, "/subnets")
            .json(&json!({ "subnet": spec }));
        self.call_json(Service::Network, builder, "subnet", &spec.name, Some("subnet"))
            .await
    }

    async fn delete_subnet(&self, id: &str) -> Result<(), CloudClientError> {
        let builder = self.builder(Service::Network, Method::DELETE, &format!("/subnets/{id}"));
        self.call_empty(Service::Network, builder, "subnet", id).await
    }

    async fn create_router(&self, name: &str) -> Result<Router, CloudClientError> {
        let builder = self
            .builder(Service::Network, Method::POST, "/routers")
            .json(&json!({ "router": { "name": name } }));
        self.call_json(Service::Network, builder, "router", name, Some("router"))
            .await
    }

    async fn delete_router(&self, id: &str) -> Result<(), CloudClientError> {
        let builder = self.builder(Service::Network, Method::DELETE, &format!("/routers/{id}"));
        self.call_empty(Service::Network, builder, "router", id).await
    }

    async fn add_router_interface(
        &self,
        router_id: &str,
        subnet_id: &str,
    ) -> Result<(), CloudClientError> {
        let builder = self
            .builder(
                Service::Network,
                Method::PUT,
                &format!("/routers/{router_id}/add_router_interface"),
            )
            .json(&json!({ "subnet_id": subnet_id }));
        self.call_empty(Service::Network, builder, "router", router_id)
            .await
    }

    async fn remove_router_interface(
        &self,
        router_id: &str,
        subnet_id: &str,
    ) -> Result<(), CloudClientError> {
        let builder = self
            .builder(
                Service::Network,
                Method::PUT,
                &format!("/routers/{router_id}/remove_router_interface"),
            )
            .json(&json!({ "subnet_id": subnet_id }));
        self.call_empty(Service::Network, builder, "router interface", router_id)
            .await
    }

    async fn create_port(&self, spec: &PortSpec) -> Result<Port, CloudClientError> {
        let builder = self
            .builder(Service::Network, Method::POST, "/ports")
            .json(&json!({ "port": spec }));
        self.call_json(Service::Network, builder, "port", &spec.name, Some("port"))
            .await
    }

    async fn show_port(&self, id: &str) -> Result<Port, CloudClientError> {
        let builder = self.builder(Service::Network, Method::GET, &format!("/ports/{id}"));
        self.call_json(Service::Network, builder, "port", id, Some("port"))
            .await
    }

    async fn delete_port(&self, id: &str) -> Result<(), CloudClientError> {
        let builder = self.builder(Service::Network, Method::DELETE, &format!("/ports/{id}"));
        self.call_empty(Service::Network, builder, "port", id).await
    }
}

impl QosClient for OpenStackClient {
    async fn create_qos_policy(
        &self,
        name: &str,
        shared: bool,
    ) -> Result<QosPolicy, CloudClientError> {
        let builder = self
            .builder(Service::Network, Method::POST, "/qos/policies")
            .json(&json!({ "policy": { "name": name, "shared": shared } }));
        self.call_json(Service::Network, builder, "qos policy", name, Some("policy"))
            .await
    }

    async fn delete_qos_policy(&self, id: &str) -> Result<(), CloudClientError> {
        let builder = self.builder(
            Service::Network,
            Method::DELETE,
            &format!("/qos/policies/{id}"),
        );
        self.call_empty(Service::Network, builder, "qos policy", id)
            .await
    }

    async fn create_minimum_bandwidth_rule(
        &self,
        policy_id: &str,
        min_kbps: u64,
        direction: Direction,
    ) -> Result<MinimumBandwidthRule, CloudClientError> {
        let builder = self
            .builder(
                Service::Network,
                Method::POST,
                &format!("/qos/policies/{policy_id}/minimum_bandwidth_rules"),
            )
            .json(&json!({
                "minimum_bandwidth_rule": { "min_kbps": min_kbps, "direction": direction }
            }));
        self.call_json(
            Service::Network,
            builder,
            "qos policy",
            policy_id,
            Some("minimum_bandwidth_rule"),
        )
        .await
    }

    async fn delete_minimum_bandwidth_rule(
        &self,
        policy_id: &str,
        rule_id: &str,
    ) -> Result<(), CloudClientError> {
        let builder = self.builder(
            Service::Network,
            Method::DELETE,
            &format!("/qos/policies/{policy_id}/minimum_bandwidth_rules/{rule_id}"),
        );
        self.call_empty(Service::Network, builder, "minimum bandwidth rule", rule_id)
            .await
    }
}

impl ComputeClient for OpenStackClient {
    async fn create_server(&self, spec: &ServerSpec) -> Result<CreatedServer, CloudClientError> {
        let builder = self
            .builder(Service::Compute, Method::POST, "/servers")
            .json(&json!({ "server": spec }));
        self.call_json(Service::Compute, builder, "server", &spec.name, Some("server"))
            .await
    }

    async fn show_server(&self, id: &str) -> Result<Server, CloudClientError> {
        let builder = self.builder(Service::Compute, Method::GET, &format!("/servers/{id}"));
        self.call_json(Service::Compute, builder, "server", id, Some("server"))
            .await
    }

    async fn delete_server(&self, id: &str) -> Result<(), CloudClientError> {
        let builder = self.builder(Service::Compute, Method::DELETE, &format!("/servers/{id}"));
        self.call_empty(Service::Compute, builder, "server", id).await
    }

    async fn migrate_server(&self, id: &str) -> Result<(), CloudClientError> {
        self.server_action(id, json!({ "migrate": null })).await
    }

    async fn resize_server(&self, id: &str, flavor_ref: &str) -> Result<(), CloudClientError> {
        self.server_action(id, json!({ "resize": { "flavorRef": flavor_ref } }))
            .await
    }

    async fn confirm_resize_server(&self, id: &str) -> Result<(), CloudClientError> {
        self.server_action(id, json!({ "confirmResize": null })).await
    }

    async fn show_flavor(&self, id: &str) -> Result<Flavor, CloudClientError> {
        let builder = self.builder(Service::Compute, Method::GET, &format!("/flavors/{id}"));
        self.call_json(Service::Compute, builder, "flavor", id, Some("flavor"))
            .await
    }

    async fn create_flavor(&self, spec: &FlavorSpec) -> Result<Flavor, CloudClientError> {
        let builder = self
            .builder(Service::Compute, Method::POST, "/flavors")
            .json(&json!({ "flavor": spec }));
        self.call_json(Service::Compute, builder, "flavor", &spec.name, Some("flavor"))
            .await
    }

    async fn delete_flavor(&self, id: &str) -> Result<(), CloudClientError> {
        let builder = self.builder(Service::Compute, Method::DELETE, &format!("/flavors/{id}"));
        self.call_empty(Service::Compute, builder, "flavor", id).await
    }
}

impl PlacementClient for OpenStackClient {
    async fn list_allocation_candidates(
        &self,
        request: &ResourceRequest,
    ) -> Result<AllocationCandidates, CloudClientError> {
        let (key, value) = request.query_pair();
        let builder = self
            .builder(Service::Placement, Method::GET, "/allocation_candidates")
            .query(&[(key, value.as_str())]);
        self.call_json(
            Service::Placement,
            builder,
            "allocation candidates",
            &value,
            None,
        )
        .await
    }

    async fn list_allocations(&self, consumer_id: &str) -> Result<Allocations, CloudClientError> {
        let builder = self.builder(
            Service::Placement,
            Method::GET,
            &format!("/allocations/{consumer_id}"),
        );
        self.call_json(Service::Placement, builder, "allocations", consumer_id, None)
            .await
    }
}
