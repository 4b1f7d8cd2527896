//! Keystone v3 password authentication and service catalog lookup.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use qosverify_core::config::{AuthConfig, EndpointsConfig};

use crate::error::CloudClientError;

/// Header carrying the issued token in a Keystone response.
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Base URLs of the services the scenarios use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub compute: String,
    pub network: String,
    pub placement: String,
}

impl ServiceEndpoints {
    /// Resolves endpoints from the catalog, preferring configured overrides.
    pub fn resolve(
        catalog: &Catalog,
        overrides: &EndpointsConfig,
        interface: &str,
        region: &str,
    ) -> Result<Self, CloudClientError> {
        let pick = |service: &str, over: &str| -> Result<String, CloudClientError> {
            if !over.is_empty() {
                return Ok(over.to_owned());
            }
            catalog
                .endpoint(service, interface, region)
                .map(str::to_owned)
                .ok_or_else(|| CloudClientError::EndpointNotFound {
                    service: service.to_owned(),
                    interface: interface.to_owned(),
                })
        };

        Ok(Self {
            compute: pick("compute", &overrides.compute)?,
            network: pick("network", &overrides.network)?,
            placement: pick("placement", &overrides.placement)?,
        })
    }
}

/// Service catalog returned with a project-scoped token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub services: Vec<CatalogService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogService {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEndpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

impl Catalog {
    /// First endpoint of `service_type` on `interface`. An empty `region`
    /// matches any region.
    pub fn endpoint(&self, service_type: &str, interface: &str, region: &str) -> Option<&str> {
        self.services
            .iter()
            .filter(|s| s.service_type == service_type)
            .flat_map(|s| s.endpoints.iter())
            .find(|e| {
                e.interface == interface
                    && (region.is_empty()
                        || e.region.as_deref() == Some(region)
                        || e.region_id.as_deref() == Some(region))
            })
            .map(|e| e.url.as_str())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Deserialize)]
struct TokenBody {
    #[serde(default)]
    catalog: Vec<CatalogService>,
}

/// An issued token together with its catalog.
#[derive(Debug, Clone)]
pub struct Token {
    pub id: String,
    pub catalog: Catalog,
}

fn tokens_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{base}/auth/tokens")
    } else {
        format!("{base}/v3/auth/tokens")
    }
}

fn require(value: &str, field: &str) -> Result<(), CloudClientError> {
    if value.is_empty() {
        return Err(CloudClientError::Config {
            field: field.to_owned(),
            reason: "must not be empty".to_owned(),
        });
    }
    Ok(())
}

/// Requests a project-scoped token with the password method.
pub async fn authenticate(
    http: &reqwest::Client,
    auth: &AuthConfig,
) -> Result<Token, CloudClientError> {
    require(&auth.auth_url, "auth.auth_url")?;
    require(&auth.username, "auth.username")?;
    require(&auth.project_name, "auth.project_name")?;

    let body = json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": auth.username,
                        "domain": { "name": auth.user_domain_name },
                        "password": auth.password,
                    }
                }
            },
            "scope": {
                "project": {
                    "name": auth.project_name,
                    "domain": { "name": auth.project_domain_name },
                }
            }
        }
    });

    let url = tokens_url(&auth.auth_url);
    debug!(url = url.as_str(), user = auth.username.as_str(), "requesting keystone token");

    let response = http
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| CloudClientError::Transport(format!("keystone request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(CloudClientError::Auth(format!("keystone returned {status}: {text}")));
    }

    let token_id = response
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .ok_or_else(|| CloudClientError::Auth("missing X-Subject-Token header".to_owned()))?
        .to_str()
        .map_err(|e| CloudClientError::Auth(format!("invalid X-Subject-Token header: {e}")))?
        .to_owned();

    let parsed: TokenResponse = response.json().await.map_err(|e| CloudClientError::Decode {
        service: "identity".to_owned(),
        reason: e.to_string(),
    })?;

    info!(
        user = auth.username.as_str(),
        project = auth.project_name.as_str(),
        services = parsed.token.catalog.len(),
        "authenticated with keystone"
    );

    Ok(Token {
        id: token_id,
        catalog: Catalog {
            services: parsed.token.catalog,
        },
    })
}
