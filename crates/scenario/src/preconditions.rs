//! 사전 조건 검사 -- 환경이 최소 대역폭 할당을 지원하는지 확인합니다.
//!
//! 검사는 세 단계로 이루어집니다.
//! 1. 설정: physnet 지정 여부, 마이크로버전 하한 ([`config_skip_reason`])
//! 2. 네트워크 확장 활성화 여부 ([`check_extensions`])
//! 3. placement 할당 후보 ([`check_allocation_possible`])
//!
//! 1, 2단계와 3단계의 첫 질의 실패는 skip이고, 만족 불가능한 요청에
//! 후보가 반환되면 실패입니다.

use tracing::debug;

use qosverify_cloud::{NetworkClient, PlacementClient};
use qosverify_core::config::QosVerifyConfig;
use qosverify_core::types::{
    COMPUTE_MIN_MICROVERSION, PLACEMENT_MAX_INT, PLACEMENT_MIN_MICROVERSION,
    REQUIRED_NETWORK_EXTENSIONS, ResourceRequest, SMALLEST_POSSIBLE_BW,
};

use crate::error::ScenarioError;

/// 설정만으로 판단할 수 있는 공통 skip 사유를 반환합니다.
pub fn config_skip_reason(config: &QosVerifyConfig) -> Option<String> {
    if config.network.qos_placement_physnet.is_empty() {
        return Some(
            "no physnet is available in config for placement based QoS allocation".to_owned(),
        );
    }

    match config.placement.microversion() {
        Ok(v) if v < PLACEMENT_MIN_MICROVERSION => {
            return Some(format!(
                "placement microversion {v} is lower than the required {PLACEMENT_MIN_MICROVERSION}"
            ));
        }
        Err(e) => return Some(format!("placement microversion: {e}")),
        Ok(_) => {}
    }

    match config.compute.microversion() {
        Ok(v) if v < COMPUTE_MIN_MICROVERSION => Some(format!(
            "compute microversion {v} is lower than the required {COMPUTE_MIN_MICROVERSION}"
        )),
        Err(e) => Some(format!("compute microversion: {e}")),
        Ok(_) => None,
    }
}

/// 활성화된 확장 목록에서 빠진 필수 확장을 반환합니다.
pub fn missing_extensions(enabled: &[String]) -> Vec<&'static str> {
    REQUIRED_NETWORK_EXTENSIONS
        .iter()
        .copied()
        .filter(|required| !enabled.iter().any(|alias| alias == required))
        .collect()
}

/// 필수 네트워크 확장이 모두 활성화되어 있는지 확인합니다.
pub async fn check_extensions<N: NetworkClient>(network: &N) -> Result<(), ScenarioError> {
    let enabled = network.list_extensions().await?;
    let missing = missing_extensions(&enabled);
    if !missing.is_empty() {
        return Err(ScenarioError::Skip(format!(
            "required network extensions are not enabled: {}",
            missing.join(", ")
        )));
    }
    debug!(extensions = enabled.len(), "required network extensions enabled");
    Ok(())
}

/// placement가 대역폭 할당을 처리할 수 있는지 확인합니다.
///
/// 최소 대역폭(1 kbps) 요청에 후보가 없으면 skip, 최대 정수 요청에 후보가
/// 있으면 placement가 요청을 제대로 거부하지 않는 것이므로 실패입니다.
pub async fn check_allocation_possible<P: PlacementClient>(
    placement: &P,
) -> Result<(), ScenarioError> {
    let feasible = ResourceRequest::ingress_bandwidth(SMALLEST_POSSIBLE_BW);
    let candidates = placement.list_allocation_candidates(&feasible).await?;
    if candidates.is_empty() {
        return Err(ScenarioError::Skip(format!(
            "no allocation candidates are available for {feasible}"
        )));
    }
    debug!(
        request = %feasible,
        providers = candidates.provider_summaries.len(),
        "allocation candidates available"
    );

    let infeasible = ResourceRequest::ingress_bandwidth(PLACEMENT_MAX_INT);
    let candidates = placement.list_allocation_candidates(&infeasible).await?;
    if !candidates.is_empty() {
        return Err(ScenarioError::assertion(format!(
            "for {infeasible} there should be no available candidate, got {}",
            candidates.provider_summaries.len()
        )));
    }

    Ok(())
}
