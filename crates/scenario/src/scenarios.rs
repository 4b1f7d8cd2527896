//! 최소 대역폭 할당 시나리오
//!
//! 세 시나리오 모두 만족 가능한 정책으로 서버를 부팅하고 할당을 검증하는
//! 것으로 시작합니다.
//!
//! ```text
//! basic   : boot(valid) -> assert -> boot(invalid) -> rejected
//! migrate : boot(valid) -> assert -> migrate -> VERIFY_RESIZE -> assert
//!                                 -> confirm -> ACTIVE -> assert
//! resize  : boot(valid) -> assert -> resize(flavor+1GiB disk) -> VERIFY_RESIZE
//!                                 -> assert -> confirm -> ACTIVE -> assert
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use qosverify_cloud::{CloudClient, FlavorSpec, PortSpec, ServerNetwork, ServerSpec};
use qosverify_core::config::QosVerifyConfig;
use qosverify_core::types::{CreatedServer, Port, ServerStatus};

use crate::assertions::{assert_allocation_is_as_expected, assert_boot_rejected};
use crate::cleanup::{CleanupAction, CleanupStack};
use crate::error::ScenarioError;
use crate::fixture::{Fixture, rand_name};
use crate::preconditions::config_skip_reason;
use crate::waiter::ServerWaiter;

/// 시나리오 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Basic,
    Migrate,
    Resize,
}

impl ScenarioKind {
    /// 실행 순서대로 모든 시나리오
    pub const ALL: [ScenarioKind; 3] = [Self::Basic, Self::Migrate, Self::Resize];

    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "qos_min_bw_allocation_basic",
            Self::Migrate => "migrate_with_qos_min_bw_allocation",
            Self::Resize => "resize_with_qos_min_bw_allocation",
        }
    }

    /// CLI에서 쓰는 짧은 이름
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Migrate => "migrate",
            Self::Resize => "resize",
        }
    }

    /// 이름이 바뀌어도 유지되는 시나리오 ID
    pub fn idempotent_id(self) -> &'static str {
        match self {
            Self::Basic => "78625d92-212c-400e-8695-dd51706858b8",
            Self::Migrate => "8a98150c-a506-49a5-96c6-73a5e7b04ada",
            Self::Resize => "c29e7fd3-035d-4993-880f-70819847683f",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Basic => "boot with satisfiable and unsatisfiable minimum bandwidth policies",
            Self::Migrate => "cold-migrate a server with a minimum bandwidth allocation",
            Self::Resize => "resize a server with a minimum bandwidth allocation",
        }
    }

    /// 설정상 이 시나리오를 건너뛰어야 하는 사유
    pub fn skip_reason(self, config: &QosVerifyConfig) -> Option<String> {
        if let Some(reason) = config_skip_reason(config) {
            return Some(reason);
        }
        match self {
            Self::Basic => None,
            Self::Migrate => {
                if !config.compute_feature_enabled.cold_migration {
                    Some("cold migration is not available".to_owned())
                } else if config.compute.min_compute_nodes <= 1 {
                    Some("less than 2 compute nodes, skipping multinode tests".to_owned())
                } else {
                    None
                }
            }
            Self::Resize => {
                if config.compute_feature_enabled.resize {
                    None
                } else {
                    Some("resize not available".to_owned())
                }
            }
        }
    }

    /// 시나리오 본문을 실행합니다. 픽스처는 미리 준비되어 있어야 합니다.
    pub async fn execute<C: CloudClient>(
        self,
        ctx: &mut ScenarioContext<'_, C>,
    ) -> Result<(), ScenarioError> {
        match self {
            Self::Basic => run_basic(ctx).await,
            Self::Migrate => run_migrate(ctx).await,
            Self::Resize => run_resize(ctx).await,
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    /// 짧은 이름(`basic`)과 전체 이름(`qos_min_bw_allocation_basic`) 모두 허용합니다.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| {
                s.eq_ignore_ascii_case(kind.name())
                    || s.eq_ignore_ascii_case(kind.short_name())
                    || s == kind.idempotent_id()
            })
            .ok_or_else(|| format!("unknown scenario '{s}' (expected basic, migrate or resize)"))
    }
}

/// 시나리오 실행에 필요한 공유 상태
pub struct ScenarioContext<'a, C: CloudClient> {
    pub cloud: &'a C,
    pub config: &'a QosVerifyConfig,
    pub waiter: &'a ServerWaiter,
    pub fixture: &'a Fixture,
    pub cleanup: &'a mut CleanupStack,
}

impl<C: CloudClient> ScenarioContext<'_, C> {
    /// 정책을 연결한 포트로 서버를 부팅하고 `status`가 될 때까지 기다립니다.
    ///
    /// 대기는 `ready_wait = false`, `raise_on_error = false`로 수행하므로
    /// `status`가 ERROR여도 정상적으로 반환됩니다.
    pub async fn boot_vm_with_min_bw(
        &mut self,
        qos_policy_id: &str,
        status: ServerStatus,
    ) -> Result<(CreatedServer, Port), ScenarioError> {
        let port = self
            .cloud
            .create_port(&PortSpec {
                name: rand_name("port"),
                network_id: self.fixture.network.id.clone(),
                qos_policy_id: Some(qos_policy_id.to_owned()),
            })
            .await?;
        self.cleanup.push(CleanupAction::DeletePort {
            id: port.id.clone(),
        });

        let server = self
            .cloud
            .create_server(&ServerSpec {
                name: rand_name("server"),
                image_ref: self.config.compute.image_ref.clone(),
                flavor_ref: self.config.compute.flavor_ref.clone(),
                networks: vec![ServerNetwork {
                    port: port.id.clone(),
                }],
            })
            .await?;
        self.cleanup.push(CleanupAction::DeleteServer {
            id: server.id.clone(),
        });

        info!(
            server_id = server.id.as_str(),
            port_id = port.id.as_str(),
            qos_policy_id,
            expected = %status,
            "booting server with minimum bandwidth port"
        );

        // ERROR을 기다리는 경우가 아니면 ERROR에서 바로 실패합니다
        let raise_on_error = status != ServerStatus::Error;
        self.waiter
            .wait_for_server_status(self.cloud, &server.id, status, false, raise_on_error)
            .await?;

        Ok((server, port))
    }

    async fn assert_allocation(
        &self,
        server_id: &str,
        port_id: &str,
    ) -> Result<String, ScenarioError> {
        assert_allocation_is_as_expected(self.cloud, server_id, port_id).await
    }

    /// VERIFY_RESIZE 대기, 검증, confirm, ACTIVE 대기, 검증
    async fn verify_and_confirm(
        &self,
        server_id: &str,
        port_id: &str,
    ) -> Result<(), ScenarioError> {
        self.waiter
            .wait_for_server_status(
                self.cloud,
                server_id,
                ServerStatus::VerifyResize,
                false,
                false,
            )
            .await?;
        let provider = self.assert_allocation(server_id, port_id).await?;
        info!(server_id, provider = provider.as_str(), "allocation consistent in VERIFY_RESIZE");

        self.cloud.confirm_resize_server(server_id).await?;
        self.waiter
            .wait_for_server_status(self.cloud, server_id, ServerStatus::Active, false, true)
            .await?;
        let provider = self.assert_allocation(server_id, port_id).await?;
        info!(server_id, provider = provider.as_str(), "allocation consistent after confirm");
        Ok(())
    }
}

async fn run_basic<C: CloudClient>(ctx: &mut ScenarioContext<'_, C>) -> Result<(), ScenarioError> {
    let valid_policy_id = ctx.fixture.valid_policy.policy.id.clone();
    let invalid_policy_id = ctx.fixture.invalid_policy.policy.id.clone();

    let (server, port) = ctx
        .boot_vm_with_min_bw(&valid_policy_id, ServerStatus::Active)
        .await?;
    ctx.assert_allocation(&server.id, &port.id).await?;

    let (server, port) = ctx
        .boot_vm_with_min_bw(&invalid_policy_id, ServerStatus::Error)
        .await?;
    assert_boot_rejected(ctx.cloud, &server.id, &port.id).await
}

async fn run_migrate<C: CloudClient>(
    ctx: &mut ScenarioContext<'_, C>,
) -> Result<(), ScenarioError> {
    let valid_policy_id = ctx.fixture.valid_policy.policy.id.clone();
    let (server, port) = ctx
        .boot_vm_with_min_bw(&valid_policy_id, ServerStatus::Active)
        .await?;
    ctx.assert_allocation(&server.id, &port.id).await?;

    ctx.cloud.migrate_server(&server.id).await?;
    ctx.verify_and_confirm(&server.id, &port.id).await
}

async fn run_resize<C: CloudClient>(
    ctx: &mut ScenarioContext<'_, C>,
) -> Result<(), ScenarioError> {
    let valid_policy_id = ctx.fixture.valid_policy.policy.id.clone();
    let (server, port) = ctx
        .boot_vm_with_min_bw(&valid_policy_id, ServerStatus::Active)
        .await?;
    ctx.assert_allocation(&server.id, &port.id).await?;

    let old_flavor = ctx.cloud.show_flavor(&ctx.config.compute.flavor_ref).await?;
    let new_flavor = ctx
        .cloud
        .create_flavor(&FlavorSpec::bigger_disk_than(&old_flavor))
        .await?;
    ctx.cleanup.push(CleanupAction::DeleteFlavor {
        id: new_flavor.id.clone(),
    });

    ctx.cloud.resize_server(&server.id, &new_flavor.id).await?;
    ctx.verify_and_confirm(&server.id, &port.id).await
}
