//! 설정 관리 -- qosverify.toml 파싱 및 런타임 설정
//!
//! [`QosVerifyConfig`]는 인증 정보, 서비스 엔드포인트, compute/network 기능
//! 플래그를 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`QOSVERIFY_AUTH_PASSWORD=secret` 형식)
//! 3. 설정 파일 (`qosverify.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), qosverify_core::error::QosVerifyError> {
//! use qosverify_core::config::QosVerifyConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = QosVerifyConfig::load("qosverify.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = QosVerifyConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, QosVerifyError};
use crate::types::Microversion;

/// qosverify 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QosVerifyConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Keystone 인증 설정
    #[serde(default)]
    pub auth: AuthConfig,
    /// 서비스 엔드포인트 오버라이드
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    /// Compute 설정
    #[serde(default)]
    pub compute: ComputeConfig,
    /// Compute 기능 플래그
    #[serde(default)]
    pub compute_feature_enabled: ComputeFeatureConfig,
    /// Network 설정
    #[serde(default)]
    pub network: NetworkConfig,
    /// Placement 설정
    #[serde(default)]
    pub placement: PlacementConfig,
}

impl QosVerifyConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, QosVerifyError> {
        let mut config = Self::read(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, QosVerifyError> {
        let config = Self::read(path).await?;
        config.validate()?;
        Ok(config)
    }

    async fn read(path: impl AsRef<Path>) -> Result<Self, QosVerifyError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QosVerifyError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                QosVerifyError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, QosVerifyError> {
        toml::from_str(toml_str).map_err(|e| {
            QosVerifyError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `QOSVERIFY_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "QOSVERIFY_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "QOSVERIFY_GENERAL_LOG_FORMAT");

        // Auth
        override_string(&mut self.auth.auth_url, "QOSVERIFY_AUTH_AUTH_URL");
        override_string(&mut self.auth.username, "QOSVERIFY_AUTH_USERNAME");
        override_string(&mut self.auth.password, "QOSVERIFY_AUTH_PASSWORD");
        override_string(&mut self.auth.project_name, "QOSVERIFY_AUTH_PROJECT_NAME");
        override_string(
            &mut self.auth.user_domain_name,
            "QOSVERIFY_AUTH_USER_DOMAIN_NAME",
        );
        override_string(
            &mut self.auth.project_domain_name,
            "QOSVERIFY_AUTH_PROJECT_DOMAIN_NAME",
        );
        override_string(&mut self.auth.region, "QOSVERIFY_AUTH_REGION");
        override_string(&mut self.auth.interface, "QOSVERIFY_AUTH_INTERFACE");
        override_u64(
            &mut self.auth.request_timeout_secs,
            "QOSVERIFY_AUTH_REQUEST_TIMEOUT_SECS",
        );

        // Endpoints
        override_string(&mut self.endpoints.compute, "QOSVERIFY_ENDPOINTS_COMPUTE");
        override_string(&mut self.endpoints.network, "QOSVERIFY_ENDPOINTS_NETWORK");
        override_string(
            &mut self.endpoints.placement,
            "QOSVERIFY_ENDPOINTS_PLACEMENT",
        );

        // Compute
        override_string(&mut self.compute.flavor_ref, "QOSVERIFY_COMPUTE_FLAVOR_REF");
        override_string(&mut self.compute.image_ref, "QOSVERIFY_COMPUTE_IMAGE_REF");
        override_u32(
            &mut self.compute.min_compute_nodes,
            "QOSVERIFY_COMPUTE_MIN_COMPUTE_NODES",
        );
        override_u64(
            &mut self.compute.build_interval_secs,
            "QOSVERIFY_COMPUTE_BUILD_INTERVAL_SECS",
        );
        override_u64(
            &mut self.compute.build_timeout_secs,
            "QOSVERIFY_COMPUTE_BUILD_TIMEOUT_SECS",
        );
        override_string(
            &mut self.compute.microversion,
            "QOSVERIFY_COMPUTE_MICROVERSION",
        );

        // Compute features
        override_bool(
            &mut self.compute_feature_enabled.cold_migration,
            "QOSVERIFY_COMPUTE_FEATURE_ENABLED_COLD_MIGRATION",
        );
        override_bool(
            &mut self.compute_feature_enabled.resize,
            "QOSVERIFY_COMPUTE_FEATURE_ENABLED_RESIZE",
        );

        // Network
        override_string(
            &mut self.network.qos_placement_physnet,
            "QOSVERIFY_NETWORK_QOS_PLACEMENT_PHYSNET",
        );
        override_u32(
            &mut self.network.provider_net_base_segmentation_id,
            "QOSVERIFY_NETWORK_PROVIDER_NET_BASE_SEGMENTATION_ID",
        );
        override_string(&mut self.network.subnet_cidr, "QOSVERIFY_NETWORK_SUBNET_CIDR");

        // Placement
        override_string(
            &mut self.placement.microversion,
            "QOSVERIFY_PLACEMENT_MICROVERSION",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), QosVerifyError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if !self.auth.auth_url.is_empty()
            && !(self.auth.auth_url.starts_with("http://")
                || self.auth.auth_url.starts_with("https://"))
        {
            return Err(invalid("auth.auth_url", "must be an http(s) URL"));
        }

        let valid_interfaces = ["public", "internal", "admin"];
        if !valid_interfaces.contains(&self.auth.interface.as_str()) {
            return Err(invalid(
                "auth.interface",
                format!("must be one of: {}", valid_interfaces.join(", ")),
            ));
        }

        if self.auth.request_timeout_secs == 0 {
            return Err(invalid("auth.request_timeout_secs", "must be greater than 0"));
        }

        if self.compute.build_interval_secs == 0 {
            return Err(invalid(
                "compute.build_interval_secs",
                "must be greater than 0",
            ));
        }

        if self.compute.build_timeout_secs < self.compute.build_interval_secs {
            return Err(invalid(
                "compute.build_timeout_secs",
                "must be >= compute.build_interval_secs",
            ));
        }

        self.compute
            .microversion()
            .map_err(|reason| invalid("compute.microversion", reason))?;
        self.placement
            .microversion()
            .map_err(|reason| invalid("placement.microversion", reason))?;

        // VLAN ID 범위
        let segmentation_id = self.network.provider_net_base_segmentation_id;
        if !(1..=4094).contains(&segmentation_id) {
            return Err(invalid(
                "network.provider_net_base_segmentation_id",
                "must be 1-4094",
            ));
        }

        if !is_ipv4_cidr(&self.network.subnet_cidr) {
            return Err(invalid(
                "network.subnet_cidr",
                "must be an IPv4 CIDR (a.b.c.d/n, n in 0..=32)",
            ));
        }

        Ok(())
    }
}

fn is_ipv4_cidr(value: &str) -> bool {
    let Some((addr, prefix)) = value.split_once('/') else {
        return false;
    };
    addr.parse::<Ipv4Addr>().is_ok() && prefix.parse::<u8>().is_ok_and(|n| n <= 32)
}

fn invalid(field: &str, reason: impl Into<String>) -> QosVerifyError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Keystone v3 비밀번호 인증 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Identity 엔드포인트 (예: `http://keystone:5000/v3`)
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project_name: String,
    pub user_domain_name: String,
    pub project_domain_name: String,
    /// 카탈로그 조회 시 사용할 리전 (빈 문자열이면 첫 번째 항목)
    pub region: String,
    /// 카탈로그 엔드포인트 인터페이스 (public, internal, admin)
    pub interface: String,
    /// HTTP 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_url: String::new(),
            username: String::new(),
            password: String::new(),
            project_name: String::new(),
            user_domain_name: "Default".to_owned(),
            project_domain_name: "Default".to_owned(),
            region: String::new(),
            interface: "public".to_owned(),
            request_timeout_secs: 60,
        }
    }
}

/// 서비스 엔드포인트 오버라이드 (빈 문자열이면 카탈로그 사용)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub compute: String,
    pub network: String,
    pub placement: String,
}

/// Compute 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    /// 서버 부팅에 사용할 플레이버 ID
    pub flavor_ref: String,
    /// 서버 부팅에 사용할 이미지 ID
    pub image_ref: String,
    /// 배포된 compute 노드 최소 수
    pub min_compute_nodes: u32,
    /// 상태 폴링 간격 (초)
    pub build_interval_secs: u64,
    /// 상태 폴링 타임아웃 (초)
    pub build_timeout_secs: u64,
    /// 요청에 사용할 compute API 마이크로버전
    pub microversion: String,
}

impl ComputeConfig {
    pub fn microversion(&self) -> Result<Microversion, String> {
        self.microversion.parse()
    }

    pub fn build_interval(&self) -> Duration {
        Duration::from_secs(self.build_interval_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            flavor_ref: String::new(),
            image_ref: String::new(),
            min_compute_nodes: 1,
            build_interval_secs: 1,
            build_timeout_secs: 300,
            microversion: "2.72".to_owned(),
        }
    }
}

/// Compute 기능 플래그
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeFeatureConfig {
    /// cold migration 지원 여부
    pub cold_migration: bool,
    /// resize 지원 여부
    pub resize: bool,
}

impl Default for ComputeFeatureConfig {
    fn default() -> Self {
        Self {
            cold_migration: true,
            resize: false,
        }
    }
}

/// Network 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// 대역폭 인벤토리가 보고되는 physnet 이름 (빈 문자열이면 시나리오 건너뜀)
    pub qos_placement_physnet: String,
    /// provider 네트워크 VLAN segmentation ID
    pub provider_net_base_segmentation_id: u32,
    /// 테스트 서브넷 CIDR
    pub subnet_cidr: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            qos_placement_physnet: String::new(),
            provider_net_base_segmentation_id: 3000,
            subnet_cidr: "10.100.0.0/28".to_owned(),
        }
    }
}

/// Placement 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// 요청에 사용할 placement API 마이크로버전
    pub microversion: String,
}

impl PlacementConfig {
    pub fn microversion(&self) -> Result<Microversion, String> {
        self.microversion.parse()
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            microversion: "1.29".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
