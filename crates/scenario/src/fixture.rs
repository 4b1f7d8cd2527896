//! 시나리오 픽스처 -- 프로바이더 네트워크와 QoS 정책 준비
//!
//! 시나리오 하나마다 새 [`Fixture`]를 만듭니다. 생성한 리소스는 즉시
//! [`CleanupStack`]에 등록되므로, 생성 도중 실패해도 이미 만든 리소스는
//! 정리됩니다.

use tracing::info;
use uuid::Uuid;

use qosverify_cloud::{CloudClient, NetworkSpec, SubnetSpec};
use qosverify_core::config::NetworkConfig;
use qosverify_core::types::{
    Direction, MinimumBandwidthRule, Network, PLACEMENT_MAX_INT, QosPolicy, Router,
    SMALLEST_POSSIBLE_BW, Subnet,
};

use crate::cleanup::{CleanupAction, CleanupStack};
use crate::error::ScenarioError;

/// 랜덤 접미사가 붙은 리소스 이름을 만듭니다 (`qosverify-<prefix>-<8 hex>`).
pub fn rand_name(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("qosverify-{prefix}-{}", &suffix[..8])
}

/// 최소 대역폭 규칙이 하나 붙은 QoS 정책
#[derive(Debug, Clone)]
pub struct PolicyWithRule {
    pub policy: QosPolicy,
    pub rule: MinimumBandwidthRule,
}

/// 시나리오가 공유하는 리소스
#[derive(Debug, Clone)]
pub struct Fixture {
    pub network: Network,
    pub subnet: Subnet,
    pub router: Router,
    /// min_kbps = 1, 항상 만족 가능
    pub valid_policy: PolicyWithRule,
    /// min_kbps = 2147483647, placement가 거부
    pub invalid_policy: PolicyWithRule,
}

impl Fixture {
    /// 네트워크, 서브넷, 라우터와 두 QoS 정책을 생성합니다.
    pub async fn create<C: CloudClient>(
        cloud: &C,
        config: &NetworkConfig,
        cleanup: &mut CleanupStack,
    ) -> Result<Self, ScenarioError> {
        let (network, subnet, router) = create_networks(cloud, config, cleanup).await?;

        let valid_policy =
            create_policy_and_min_bw_rule(cloud, "test_policy_valid", SMALLEST_POSSIBLE_BW, cleanup)
                .await?;
        let invalid_policy = create_policy_and_min_bw_rule(
            cloud,
            "test_policy_not_valid",
            PLACEMENT_MAX_INT,
            cleanup,
        )
        .await?;

        info!(
            network_id = network.id.as_str(),
            valid_policy_id = valid_policy.policy.id.as_str(),
            invalid_policy_id = invalid_policy.policy.id.as_str(),
            "fixture ready"
        );

        Ok(Self {
            network,
            subnet,
            router,
            valid_policy,
            invalid_policy,
        })
    }
}

async fn create_networks<C: CloudClient>(
    cloud: &C,
    config: &NetworkConfig,
    cleanup: &mut CleanupStack,
) -> Result<(Network, Subnet, Router), ScenarioError> {
    let spec = NetworkSpec::vlan_provider(
        rand_name("network"),
        &config.qos_placement_physnet,
        config.provider_net_base_segmentation_id,
    );
    let network = cloud.create_network(&spec).await?;
    cleanup.push(CleanupAction::DeleteNetwork {
        id: network.id.clone(),
    });

    let subnet = cloud
        .create_subnet(&SubnetSpec {
            name: rand_name("subnet"),
            network_id: network.id.clone(),
            cidr: config.subnet_cidr.clone(),
            ip_version: 4,
        })
        .await?;
    cleanup.push(CleanupAction::DeleteSubnet {
        id: subnet.id.clone(),
    });

    let router = cloud.create_router(&rand_name("router")).await?;
    cleanup.push(CleanupAction::DeleteRouter {
        id: router.id.clone(),
    });

    cloud.add_router_interface(&router.id, &subnet.id).await?;
    cleanup.push(CleanupAction::RemoveRouterInterface {
        router_id: router.id.clone(),
        subnet_id: subnet.id.clone(),
    });

    Ok((network, subnet, router))
}

async fn create_policy_and_min_bw_rule<C: CloudClient>(
    cloud: &C,
    name_prefix: &str,
    min_kbps: u64,
    cleanup: &mut CleanupStack,
) -> Result<PolicyWithRule, ScenarioError> {
    let policy = cloud.create_qos_policy(&rand_name(name_prefix), true).await?;
    cleanup.push(CleanupAction::DeleteQosPolicy {
        id: policy.id.clone(),
    });

    let rule = cloud
        .create_minimum_bandwidth_rule(&policy.id, min_kbps, Direction::Ingress)
        .await?;
    cleanup.push(CleanupAction::DeleteMinimumBandwidthRule {
        policy_id: policy.id.clone(),
        rule_id: rule.id.clone(),
    });

    Ok(PolicyWithRule { policy, rule })
}
