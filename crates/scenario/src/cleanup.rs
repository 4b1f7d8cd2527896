//! 리소스 정리 -- 시나리오가 생성한 리소스를 역순으로 삭제합니다.
//!
//! 리소스를 만들 때마다 [`CleanupAction`]을 [`CleanupStack`]에 등록하고,
//! 시나리오가 끝나면 결과와 관계없이 LIFO 순서로 실행합니다.
//! 이미 없는 리소스(NotFound)는 무시하고, 그 외 실패는 경고 로그를 남긴 뒤
//! [`CleanupFailure`]로 수집합니다.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use qosverify_cloud::{CloudClient, CloudClientError};

use crate::error::ScenarioError;
use crate::waiter::ServerWaiter;

/// 정리 액션
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CleanupAction {
    /// 서버 삭제 후 종료 대기
    DeleteServer { id: String },
    DeletePort { id: String },
    DeleteFlavor { id: String },
    DeleteMinimumBandwidthRule { policy_id: String, rule_id: String },
    DeleteQosPolicy { id: String },
    RemoveRouterInterface { router_id: String, subnet_id: String },
    DeleteRouter { id: String },
    DeleteSubnet { id: String },
    DeleteNetwork { id: String },
}

impl CleanupAction {
    /// 로그 필드용 고정 이름
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeleteServer { .. } => "delete_server",
            Self::DeletePort { .. } => "delete_port",
            Self::DeleteFlavor { .. } => "delete_flavor",
            Self::DeleteMinimumBandwidthRule { .. } => "delete_minimum_bandwidth_rule",
            Self::DeleteQosPolicy { .. } => "delete_qos_policy",
            Self::RemoveRouterInterface { .. } => "remove_router_interface",
            Self::DeleteRouter { .. } => "delete_router",
            Self::DeleteSubnet { .. } => "delete_subnet",
            Self::DeleteNetwork { .. } => "delete_network",
        }
    }
}

impl fmt::Display for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteServer { id }
            | Self::DeletePort { id }
            | Self::DeleteFlavor { id }
            | Self::DeleteQosPolicy { id }
            | Self::DeleteRouter { id }
            | Self::DeleteSubnet { id }
            | Self::DeleteNetwork { id } => write!(f, "{}({id})", self.kind()),
            Self::DeleteMinimumBandwidthRule { policy_id, rule_id } => {
                write!(f, "{}({policy_id}/{rule_id})", self.kind())
            }
            Self::RemoveRouterInterface {
                router_id,
                subnet_id,
            } => write!(f, "{}({router_id}/{subnet_id})", self.kind()),
        }
    }
}

/// NotFound 이외의 정리 실패
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupFailure {
    /// 실패한 액션 (`delete_port(<id>)` 형식)
    pub action: String,
    /// 에러 메시지
    pub error: String,
}

/// LIFO 정리 스택
#[derive(Debug, Default)]
pub struct CleanupStack {
    actions: Vec<CleanupAction>,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// 정리 액션을 등록합니다. 마지막에 등록한 액션이 가장 먼저 실행됩니다.
    pub fn push(&mut self, action: CleanupAction) {
        debug!(action = %action, "registered cleanup");
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// 실행 순서대로 등록된 액션을 반환합니다.
    pub fn pending(&self) -> impl Iterator<Item = &CleanupAction> {
        self.actions.iter().rev()
    }

    /// 등록된 모든 액션을 역순으로 실행하고 스택을 비웁니다.
    ///
    /// 한 액션이 실패해도 나머지 액션은 계속 실행합니다.
    pub async fn run<C: CloudClient>(
        &mut self,
        cloud: &C,
        waiter: &ServerWaiter,
    ) -> Vec<CleanupFailure> {
        let mut failures = Vec::new();
        if !self.is_empty() {
            let order: Vec<_> = self.pending().map(CleanupAction::kind).collect();
            debug!(actions = ?order, "running cleanup");
        }

        while let Some(action) = self.actions.pop() {
            match execute(cloud, waiter, &action).await {
                Ok(()) => debug!(action = %action, "cleanup done"),
                Err(ScenarioError::Cloud(e)) if e.is_not_found() => {
                    debug!(action = %action, "cleanup target already gone");
                }
                Err(e) => {
                    warn!(action = %action, error = %e, "cleanup failed");
                    failures.push(CleanupFailure {
                        action: action.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        failures
    }
}

async fn execute<C: CloudClient>(
    cloud: &C,
    waiter: &ServerWaiter,
    action: &CleanupAction,
) -> Result<(), ScenarioError> {
    match action {
        CleanupAction::DeleteServer { id } => {
            ignore_not_found(cloud.delete_server(id).await)?;
            // 포트와 네트워크는 서버가 완전히 사라진 뒤에 삭제할 수 있음
            waiter.wait_for_server_termination(cloud, id, false).await
        }
        CleanupAction::DeletePort { id } => Ok(cloud.delete_port(id).await?),
        CleanupAction::DeleteFlavor { id } => Ok(cloud.delete_flavor(id).await?),
        CleanupAction::DeleteMinimumBandwidthRule { policy_id, rule_id } => Ok(cloud
            .delete_minimum_bandwidth_rule(policy_id, rule_id)
            .await?),
        CleanupAction::DeleteQosPolicy { id } => Ok(cloud.delete_qos_policy(id).await?),
        CleanupAction::RemoveRouterInterface {
            router_id,
            subnet_id,
        } => Ok(cloud.remove_router_interface(router_id, subnet_id).await?),
        CleanupAction::DeleteRouter { id } => Ok(cloud.delete_router(id).await?),
        CleanupAction::DeleteSubnet { id } => Ok(cloud.delete_subnet(id).await?),
        CleanupAction::DeleteNetwork { id } => Ok(cloud.delete_network(id).await?),
    }
}

/// NotFound를 성공으로 취급합니다.
fn ignore_not_found(result: Result<(), CloudClientError>) -> Result<(), CloudClientError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}
