//! 도메인 타입 -- OpenStack 리소스 표현
//!
//! Network, Compute, Placement 서비스가 반환하는 JSON 구조를 serde 타입으로
//! 정의합니다. 필드명은 각 서비스의 API 표기(`binding:profile`,
//! `OS-EXT-STS:task_state` 등)를 그대로 따릅니다.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Placement에서 ingress 최소 대역폭을 표현하는 리소스 클래스
pub const INGRESS_RESOURCE_CLASS: &str = "NET_BW_IGR_KILOBIT_PER_SEC";

/// 항상 만족 가능한 것으로 간주하는 최소 대역폭 (kbps)
pub const SMALLEST_POSSIBLE_BW: u64 = 1;

/// Placement가 허용하는 최대 정수 값. 현실적인 인벤토리로는 만족할 수 없습니다.
pub const PLACEMENT_MAX_INT: u64 = 0x7FFF_FFFF;

/// 대역폭 할당 검증에 필요한 네트워크 확장 목록
pub const REQUIRED_NETWORK_EXTENSIONS: [&str; 3] =
    ["port-resource-request", "qos", "qos-bw-minimum-ingress"];

/// 중첩 리소스 프로바이더와 granular 요청을 지원하는 최소 placement 마이크로버전
pub const PLACEMENT_MIN_MICROVERSION: Microversion = Microversion::new(1, 29);

/// `resource_request`가 있는 포트로 부팅을 허용하는 최소 compute 마이크로버전
pub const COMPUTE_MIN_MICROVERSION: Microversion = Microversion::new(2, 72);

/// 스케줄링 실패 시 서버 fault 메시지에 포함되는 문자열
pub const NO_VALID_HOST: &str = "No valid host";

/// API 마이크로버전 (`X.Y`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Microversion {
    pub major: u32,
    pub minor: u32,
}

impl Microversion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Microversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Microversion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| format!("invalid microversion '{s}': expected X.Y"))?;
        let major = major
            .parse::<u32>()
            .map_err(|e| format!("invalid microversion '{s}': {e}"))?;
        let minor = minor
            .parse::<u32>()
            .map_err(|e| format!("invalid microversion '{s}': {e}"))?;
        Ok(Self { major, minor })
    }
}

/// 서버 상태
///
/// Compute API의 `status` 문자열을 표현합니다. 알 수 없는 값은
/// [`ServerStatus::Other`]로 보존됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServerStatus {
    Active,
    Build,
    Error,
    VerifyResize,
    Resize,
    Migrating,
    Shutoff,
    Deleted,
    Unknown,
    Other(String),
}

impl ServerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Build => "BUILD",
            Self::Error => "ERROR",
            Self::VerifyResize => "VERIFY_RESIZE",
            Self::Resize => "RESIZE",
            Self::Migrating => "MIGRATING",
            Self::Shutoff => "SHUTOFF",
            Self::Deleted => "DELETED",
            Self::Unknown => "UNKNOWN",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for ServerStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ACTIVE" => Self::Active,
            "BUILD" => Self::Build,
            "ERROR" => Self::Error,
            "VERIFY_RESIZE" => Self::VerifyResize,
            "RESIZE" => Self::Resize,
            "MIGRATING" => Self::Migrating,
            "SHUTOFF" => Self::Shutoff,
            "DELETED" => Self::Deleted,
            "UNKNOWN" => Self::Unknown,
            _ => Self::Other(s),
        }
    }
}

impl From<ServerStatus> for String {
    fn from(status: ServerStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 서버 fault 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFault {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
}

/// Compute 서버
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: ServerStatus,
    #[serde(
        rename = "OS-EXT-STS:task_state",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub task_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<ServerFault>,
}

/// 서버 생성 응답
///
/// 생성 직후 응답에는 상태가 없고 ID만 신뢰할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedServer {
    pub id: String,
}

/// Network 서비스의 네트워크
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub shared: bool,
    #[serde(rename = "provider:network_type", default)]
    pub network_type: Option<String>,
    #[serde(rename = "provider:physical_network", default)]
    pub physical_network: Option<String>,
    #[serde(rename = "provider:segmentation_id", default)]
    pub segmentation_id: Option<u32>,
}

/// 서브넷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub network_id: String,
    #[serde(default)]
    pub cidr: String,
}

/// 라우터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Router {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// 네트워크 포트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub network_id: String,
    #[serde(default)]
    pub qos_policy_id: Option<String>,
    /// `binding:profile`. Neutron은 비어 있을 때 `{}` 또는 `null`을 반환합니다.
    #[serde(
        rename = "binding:profile",
        default,
        deserialize_with = "null_as_default"
    )]
    pub binding_profile: serde_json::Map<String, serde_json::Value>,
}

impl Port {
    /// 바인딩 프로파일의 `allocation` 필드(리소스 프로바이더 UUID)를 반환합니다.
    pub fn binding_allocation(&self) -> Option<&str> {
        self.binding_profile
            .get("allocation")
            .and_then(serde_json::Value::as_str)
    }
}

/// QoS 정책
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QosPolicy {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub shared: bool,
}

/// 트래픽 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingress => f.write_str("ingress"),
            Self::Egress => f.write_str("egress"),
        }
    }
}

/// 최소 대역폭 QoS 규칙
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimumBandwidthRule {
    pub id: String,
    pub min_kbps: u64,
    pub direction: Direction,
}

/// Compute 플레이버
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    pub ram: u64,
    pub vcpus: u32,
    pub disk: u64,
}

/// 리소스 프로바이더 하나에 대한 할당 내역
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderAllocation {
    #[serde(default)]
    pub resources: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
}

/// 컨슈머(서버)의 할당 집합 (`GET /allocations/{consumer}` 응답)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Allocations {
    #[serde(default)]
    pub allocations: BTreeMap<String, ProviderAllocation>,
}

impl Allocations {
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    /// 주어진 리소스 클래스를 소비하는 리소스 프로바이더 ID 목록
    pub fn providers_with(&self, resource_class: &str) -> Vec<&str> {
        self.allocations
            .iter()
            .filter(|(_, alloc)| alloc.resources.contains_key(resource_class))
            .map(|(rp, _)| rp.as_str())
            .collect()
    }
}

/// 프로바이더의 리소스 클래스별 용량
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceCapacity {
    #[serde(default)]
    pub capacity: u64,
    #[serde(default)]
    pub used: u64,
}

/// 할당 후보 응답의 프로바이더 요약
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderSummary {
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceCapacity>,
}

/// `GET /allocation_candidates` 응답
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AllocationCandidates {
    #[serde(default)]
    pub allocation_requests: Vec<serde_json::Value>,
    #[serde(default)]
    pub provider_summaries: BTreeMap<String, ProviderSummary>,
}

impl AllocationCandidates {
    pub fn is_empty(&self) -> bool {
        self.provider_summaries.is_empty()
    }
}

/// 할당 후보 질의용 granular 리소스 요청 (`resources1=CLASS:AMOUNT`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub resource_class: String,
    pub amount: u64,
}

impl ResourceRequest {
    pub fn new(resource_class: impl Into<String>, amount: u64) -> Self {
        Self {
            resource_class: resource_class.into(),
            amount,
        }
    }

    /// ingress 대역폭 요청
    pub fn ingress_bandwidth(kbps: u64) -> Self {
        Self::new(INGRESS_RESOURCE_CLASS, kbps)
    }

    /// 쿼리 파라미터 (`resources1`, `CLASS:AMOUNT`)
    pub fn query_pair(&self) -> (&'static str, String) {
        ("resources1", self.to_string())
    }
}

impl fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_class, self.amount)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
