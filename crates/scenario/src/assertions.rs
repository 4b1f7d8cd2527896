//! 할당 일관성 검증
//!
//! 판정 로직(`check_*`)은 조회 결과만 받는 순수 함수이고, `assert_*`는
//! 클라우드에서 최신 상태를 조회한 뒤 판정 함수를 호출합니다.

use tracing::debug;

use qosverify_cloud::CloudClient;
use qosverify_core::types::{Allocations, INGRESS_RESOURCE_CLASS, NO_VALID_HOST, Port, Server};

use crate::error::ScenarioError;

/// 성공한 부팅의 할당을 검증하고 대역폭을 제공하는 리소스 프로바이더 ID를 반환합니다.
///
/// - 할당 항목이 하나 이상 있어야 함
/// - 대역폭 리소스 클래스를 가진 프로바이더는 정확히 하나
/// - 포트의 `binding:profile.allocation`이 그 프로바이더와 같아야 함
pub fn check_allocation(allocations: &Allocations, port: &Port) -> Result<String, ScenarioError> {
    if allocations.is_empty() {
        return Err(ScenarioError::assertion(
            "expected at least one allocation, got none",
        ));
    }

    let providers = allocations.providers_with(INGRESS_RESOURCE_CLASS);
    let provider = match providers.as_slice() {
        [single] => *single,
        [] => {
            return Err(ScenarioError::assertion(format!(
                "no allocation contains {INGRESS_RESOURCE_CLASS}"
            )));
        }
        many => {
            return Err(ScenarioError::assertion(format!(
                "expected exactly one provider with {INGRESS_RESOURCE_CLASS}, got {}: {}",
                many.len(),
                many.join(", ")
            )));
        }
    };

    match port.binding_allocation() {
        Some(bound) if bound == provider => Ok(provider.to_owned()),
        Some(bound) => Err(ScenarioError::assertion(format!(
            "port {} binding:profile allocation is {bound}, expected {provider}",
            port.id
        ))),
        None => Err(ScenarioError::assertion(format!(
            "port {} binding:profile has no allocation, expected {provider}",
            port.id
        ))),
    }
}

/// 할당이 없어야 합니다.
pub fn check_no_allocation(allocations: &Allocations) -> Result<(), ScenarioError> {
    if allocations.is_empty() {
        Ok(())
    } else {
        Err(ScenarioError::assertion(format!(
            "expected no allocations, got {}",
            allocations.len()
        )))
    }
}

/// 서버 fault 메시지에 "No valid host"가 있어야 합니다.
pub fn check_no_valid_host(server: &Server) -> Result<(), ScenarioError> {
    let fault = server.fault.as_ref().ok_or_else(|| {
        ScenarioError::assertion(format!("server {} has no fault", server.id))
    })?;
    if fault.message.contains(NO_VALID_HOST) {
        Ok(())
    } else {
        Err(ScenarioError::assertion(format!(
            "server {} fault does not mention '{NO_VALID_HOST}': {}",
            server.id, fault.message
        )))
    }
}

/// 포트의 `binding:profile`이 비어 있어야 합니다.
pub fn check_empty_binding(port: &Port) -> Result<(), ScenarioError> {
    if port.binding_profile.is_empty() {
        Ok(())
    } else {
        Err(ScenarioError::assertion(format!(
            "port {} binding:profile should be empty, got {} key(s)",
            port.id,
            port.binding_profile.len()
        )))
    }
}

/// 서버 할당과 포트 바인딩을 조회하여 [`check_allocation`]으로 검증합니다.
pub async fn assert_allocation_is_as_expected<C: CloudClient>(
    cloud: &C,
    server_id: &str,
    port_id: &str,
) -> Result<String, ScenarioError> {
    let allocations = cloud.list_allocations(server_id).await?;
    let port = cloud.show_port(port_id).await?;
    let provider = check_allocation(&allocations, &port)?;
    debug!(server_id, port_id, provider = provider.as_str(), "allocation is as expected");
    Ok(provider)
}

/// 만족 불가능한 정책으로 부팅한 서버가 거부되었는지 검증합니다.
pub async fn assert_boot_rejected<C: CloudClient>(
    cloud: &C,
    server_id: &str,
    port_id: &str,
) -> Result<(), ScenarioError> {
    let allocations = cloud.list_allocations(server_id).await?;
    check_no_allocation(&allocations)?;

    let server = cloud.show_server(server_id).await?;
    check_no_valid_host(&server)?;

    let port = cloud.show_port(port_id).await?;
    check_empty_binding(&port)?;

    debug!(server_id, port_id, "boot was rejected as expected");
    Ok(())
}
