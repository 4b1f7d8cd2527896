//! 통합 테스트 -- 시나리오 전체 흐름 검증
//!
//! placement 인벤토리, 포트 바인딩, 서버 상태 전이를 흉내 내는 인메모리
//! 클라우드로 skip / pass / fail 판정과 정리 순서를 확인합니다.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use qosverify_core::config::QosVerifyConfig;
use qosverify_core::types::ServerStatus;
use qosverify_scenario::{
    ScenarioKind, ScenarioOutcome, ScenarioRunner, ScenarioRunnerBuilder, ServerWaiter,
    check_allocation_possible, check_extensions, config_skip_reason,
};

use fake::FakeCloud;

// In-memory cloud for integration tests
mod fake {
    use std::collections::{BTreeMap, HashMap, VecDeque};

    use serde_json::json;
    use tokio::sync::{Mutex, MutexGuard};

    use qosverify_cloud::{
        CloudClientError, ComputeClient, FlavorSpec, NetworkClient, NetworkSpec, PlacementClient,
        PortSpec, QosClient, ServerSpec, SubnetSpec,
    };
    use qosverify_core::types::{
        AllocationCandidates, Allocations, CreatedServer, Direction, Flavor,
        INGRESS_RESOURCE_CLASS, MinimumBandwidthRule, Network, PLACEMENT_MAX_INT, Port,
        ProviderAllocation, ProviderSummary, QosPolicy, REQUIRED_NETWORK_EXTENSIONS,
        ResourceCapacity, ResourceRequest, Router, Server, ServerFault, ServerStatus, Subnet,
    };

    pub const COMPUTE_RP: &str = "rp-compute-1";
    pub const BASE_FLAVOR: &str = "flavor-1";

    struct FakeServer {
        port_id: String,
        kbps: u64,
        statuses: VecDeque<(ServerStatus, Option<&'static str>)>,
        fault: Option<ServerFault>,
        provider: Option<String>,
        deleting: bool,
    }

    impl FakeServer {
        fn current(&self) -> Option<&ServerStatus> {
            self.statuses.front().map(|(s, _)| s)
        }
    }

    #[derive(Default)]
    pub struct State {
        next_id: u64,
        pub calls: usize,
        pub networks: HashMap<String, Network>,
        pub subnets: HashMap<String, Subnet>,
        pub routers: HashMap<String, Router>,
        pub interfaces: Vec<(String, String)>,
        pub policies: HashMap<String, QosPolicy>,
        pub rules: HashMap<String, (String, MinimumBandwidthRule)>,
        pub ports: HashMap<String, Port>,
        servers: HashMap<String, FakeServer>,
        pub flavors: HashMap<String, Flavor>,
        /// (kind, id) in deletion order
        pub deleted: Vec<(&'static str, String)>,
        /// (action, server id)
        pub actions: Vec<(&'static str, String)>,
    }

    impl State {
        fn id(&mut self, prefix: &str) -> String {
            self.next_id += 1;
            format!("{prefix}-{}", self.next_id)
        }

        pub fn live_servers(&self) -> usize {
            self.servers.len()
        }

        pub fn provider_of(&self, server_id: &str) -> Option<String> {
            self.servers.get(server_id).and_then(|s| s.provider.clone())
        }
    }

    fn not_found(resource: &str, id: &str) -> CloudClientError {
        CloudClientError::NotFound {
            resource: resource.to_owned(),
            id: id.to_owned(),
        }
    }

    fn conflict(service: &str, message: impl Into<String>) -> CloudClientError {
        CloudClientError::Api {
            service: service.to_owned(),
            status: 409,
            message: message.into(),
        }
    }

    pub struct FakeCloud {
        extensions: Vec<String>,
        providers: Vec<(String, u64)>,
        infeasible_has_candidates: bool,
        corrupt_binding: bool,
        stuck_in_build: bool,
        failing_spawn: bool,
        fail_port_delete: bool,
        state: Mutex<State>,
    }

    impl FakeCloud {
        /// All extensions enabled and two bandwidth providers with 10 Gbps each.
        pub fn healthy() -> Self {
            let mut state = State::default();
            state.flavors.insert(
                BASE_FLAVOR.to_owned(),
                Flavor {
                    id: BASE_FLAVOR.to_owned(),
                    name: "m1.nano".to_owned(),
                    ram: 128,
                    vcpus: 1,
                    disk: 1,
                },
            );
            Self {
                extensions: REQUIRED_NETWORK_EXTENSIONS
                    .iter()
                    .map(|s| (*s).to_owned())
                    .chain(["router".to_owned()])
                    .collect(),
                providers: vec![
                    ("rp-bw-1".to_owned(), 10_000_000),
                    ("rp-bw-2".to_owned(), 10_000_000),
                ],
                infeasible_has_candidates: false,
                corrupt_binding: false,
                stuck_in_build: false,
                failing_spawn: false,
                fail_port_delete: false,
                state: Mutex::new(state),
            }
        }

        pub fn without_extension(mut self, alias: &str) -> Self {
            self.extensions.retain(|e| e != alias);
            self
        }

        pub fn without_bandwidth_inventory(mut self) -> Self {
            self.providers.clear();
            self
        }

        pub fn with_infeasible_candidates(mut self) -> Self {
            self.infeasible_has_candidates = true;
            self
        }

        pub fn with_corrupt_binding(mut self) -> Self {
            self.corrupt_binding = true;
            self
        }

        pub fn with_servers_stuck_in_build(mut self) -> Self {
            self.stuck_in_build = true;
            self
        }

        /// Scheduling succeeds but the compute host fails to spawn the server.
        pub fn with_failing_spawn(mut self) -> Self {
            self.failing_spawn = true;
            self
        }

        pub fn with_failing_port_delete(mut self) -> Self {
            self.fail_port_delete = true;
            self
        }

        pub async fn state(&self) -> MutexGuard<'_, State> {
            self.state.lock().await
        }

        async fn lock(&self) -> MutexGuard<'_, State> {
            let mut state = self.state.lock().await;
            state.calls += 1;
            state
        }

        fn pick_provider(&self, kbps: u64, exclude: Option<&str>) -> Option<String> {
            let fits = |(_, cap): &&(String, u64)| *cap >= kbps;
            self.providers
                .iter()
                .filter(fits)
                .find(|(rp, _)| Some(rp.as_str()) != exclude)
                .or_else(|| self.providers.iter().find(fits))
                .map(|(rp, _)| rp.clone())
        }

        fn bind(&self, port: &mut Port, provider: &str) {
            let bound = if self.corrupt_binding {
                "rp-unexpected"
            } else {
                provider
            };
            port.binding_profile
                .insert("allocation".to_owned(), json!(bound));
        }

        async fn move_server(&self, id: &str, exclude_current: bool) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            let (kbps, current, port_id) = {
                let server = st.servers.get(id).ok_or_else(|| not_found("server", id))?;
                if server.current() != Some(&ServerStatus::Active) {
                    return Err(conflict("compute", "instance is not ACTIVE"));
                }
                (server.kbps, server.provider.clone(), server.port_id.clone())
            };
            let exclude = if exclude_current { current.as_deref() } else { None };
            let target = self
                .pick_provider(kbps, exclude)
                .or(current)
                .ok_or_else(|| conflict("compute", "No valid host was found."))?;

            if let Some(port) = st.ports.get_mut(&port_id) {
                self.bind(port, &target);
            }
            if let Some(server) = st.servers.get_mut(id) {
                server.provider = Some(target);
                server.statuses = VecDeque::from([
                    (ServerStatus::Resize, Some("resize_prep")),
                    (ServerStatus::Resize, Some("resize_migrating")),
                    (ServerStatus::VerifyResize, None),
                ]);
            }
            Ok(())
        }
    }

    impl NetworkClient for FakeCloud {
        async fn list_extensions(&self) -> Result<Vec<String>, CloudClientError> {
            let _st = self.lock().await;
            Ok(self.extensions.clone())
        }

        async fn create_network(&self, spec: &NetworkSpec) -> Result<Network, CloudClientError> {
            let mut st = self.lock().await;
            let network = Network {
                id: st.id("net"),
                name: spec.name.clone(),
                shared: spec.shared,
                network_type: spec.network_type.clone(),
                physical_network: spec.physical_network.clone(),
                segmentation_id: spec.segmentation_id,
            };
            st.networks.insert(network.id.clone(), network.clone());
            Ok(network)
        }

        async fn delete_network(&self, id: &str) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            if !st.networks.contains_key(id) {
                return Err(not_found("network", id));
            }
            if st.subnets.values().any(|s| s.network_id == id)
                || st.ports.values().any(|p| p.network_id == id)
            {
                return Err(conflict("network", format!("network {id} is in use")));
            }
            st.networks.remove(id);
            st.deleted.push(("network", id.to_owned()));
            Ok(())
        }

        async fn create_subnet(&self, spec: &SubnetSpec) -> Result<Subnet, CloudClientError> {
            let mut st = self.lock().await;
            if !st.networks.contains_key(&spec.network_id) {
                return Err(not_found("network", &spec.network_id));
            }
            let subnet = Subnet {
                id: st.id("subnet"),
                network_id: spec.network_id.clone(),
                cidr: spec.cidr.clone(),
            };
            st.subnets.insert(subnet.id.clone(), subnet.clone());
            Ok(subnet)
        }

        async fn delete_subnet(&self, id: &str) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            if !st.subnets.contains_key(id) {
                return Err(not_found("subnet", id));
            }
            if st.interfaces.iter().any(|(_, s)| s == id) {
                return Err(conflict("network", format!("subnet {id} has a router interface")));
            }
            st.subnets.remove(id);
            st.deleted.push(("subnet", id.to_owned()));
            Ok(())
        }

        async fn create_router(&self, name: &str) -> Result<Router, CloudClientError> {
            let mut st = self.lock().await;
            let router = Router {
                id: st.id("router"),
                name: name.to_owned(),
            };
            st.routers.insert(router.id.clone(), router.clone());
            Ok(router)
        }

        async fn delete_router(&self, id: &str) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            if !st.routers.contains_key(id) {
                return Err(not_found("router", id));
            }
            if st.interfaces.iter().any(|(r, _)| r == id) {
                return Err(conflict("network", format!("router {id} still has ports")));
            }
            st.routers.remove(id);
            st.deleted.push(("router", id.to_owned()));
            Ok(())
        }

        async fn add_router_interface(
            &self,
            router_id: &str,
            subnet_id: &str,
        ) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            if !st.routers.contains_key(router_id) {
                return Err(not_found("router", router_id));
            }
            st.interfaces
                .push((router_id.to_owned(), subnet_id.to_owned()));
            Ok(())
        }

        async fn remove_router_interface(
            &self,
            router_id: &str,
            subnet_id: &str,
        ) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            let before = st.interfaces.len();
            st.interfaces
                .retain(|(r, s)| !(r == router_id && s == subnet_id));
            if st.interfaces.len() == before {
                return Err(not_found("router interface", router_id));
            }
            st.deleted.push(("router_interface", router_id.to_owned()));
            Ok(())
        }

        async fn create_port(&self, spec: &PortSpec) -> Result<Port, CloudClientError> {
            let mut st = self.lock().await;
            if !st.networks.contains_key(&spec.network_id) {
                return Err(not_found("network", &spec.network_id));
            }
            let port = Port {
                id: st.id("port"),
                network_id: spec.network_id.clone(),
                qos_policy_id: spec.qos_policy_id.clone(),
                binding_profile: serde_json::Map::new(),
            };
            st.ports.insert(port.id.clone(), port.clone());
            Ok(port)
        }

        async fn show_port(&self, id: &str) -> Result<Port, CloudClientError> {
            let st = self.lock().await;
            st.ports.get(id).cloned().ok_or_else(|| not_found("port", id))
        }

        async fn delete_port(&self, id: &str) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            if !st.ports.contains_key(id) {
                return Err(not_found("port", id));
            }
            if self.fail_port_delete {
                return Err(conflict("network", "port delete rejected"));
            }
            if st.servers.values().any(|s| s.port_id == id) {
                return Err(conflict("network", format!("port {id} is bound to a server")));
            }
            st.ports.remove(id);
            st.deleted.push(("port", id.to_owned()));
            Ok(())
        }
    }

    impl QosClient for FakeCloud {
        async fn create_qos_policy(
            &self,
            name: &str,
            shared: bool,
        ) -> Result<QosPolicy, CloudClientError> {
            let mut st = self.lock().await;
            let policy = QosPolicy {
                id: st.id("policy"),
                name: name.to_owned(),
                shared,
            };
            st.policies.insert(policy.id.clone(), policy.clone());
            Ok(policy)
        }

        async fn delete_qos_policy(&self, id: &str) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            if !st.policies.contains_key(id) {
                return Err(not_found("qos policy", id));
            }
            st.rules.retain(|_, (policy_id, _)| policy_id != id);
            st.policies.remove(id);
            st.deleted.push(("qos_policy", id.to_owned()));
            Ok(())
        }

        async fn create_minimum_bandwidth_rule(
            &self,
            policy_id: &str,
            min_kbps: u64,
            direction: Direction,
        ) -> Result<MinimumBandwidthRule, CloudClientError> {
            let mut st = self.lock().await;
            if !st.policies.contains_key(policy_id) {
                return Err(not_found("qos policy", policy_id));
            }
            let rule = MinimumBandwidthRule {
                id: st.id("rule"),
                min_kbps,
                direction,
            };
            st.rules
                .insert(rule.id.clone(), (policy_id.to_owned(), rule.clone()));
            Ok(rule)
        }

        async fn delete_minimum_bandwidth_rule(
            &self,
            policy_id: &str,
            rule_id: &str,
        ) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            match st.rules.get(rule_id) {
                Some((owner, _)) if owner == policy_id => {
                    st.rules.remove(rule_id);
                    st.deleted.push(("rule", rule_id.to_owned()));
                    Ok(())
                }
                _ => Err(not_found("minimum bandwidth rule", rule_id)),
            }
        }
    }

    impl ComputeClient for FakeCloud {
        async fn create_server(&self, spec: &ServerSpec) -> Result<CreatedServer, CloudClientError> {
            let mut st = self.lock().await;
            if !st.flavors.contains_key(&spec.flavor_ref) {
                return Err(not_found("flavor", &spec.flavor_ref));
            }
            let port_id = spec
                .networks
                .first()
                .map(|n| n.port.clone())
                .ok_or_else(|| CloudClientError::Api {
                    service: "compute".to_owned(),
                    status: 400,
                    message: "networks must not be empty".to_owned(),
                })?;
            let policy_id = st
                .ports
                .get(&port_id)
                .ok_or_else(|| not_found("port", &port_id))?
                .qos_policy_id
                .clone();
            let kbps = st
                .rules
                .values()
                .filter(|(owner, _)| Some(owner) == policy_id.as_ref())
                .map(|(_, rule)| rule.min_kbps)
                .max()
                .unwrap_or(0);

            let id = st.id("srv");
            let mut server = FakeServer {
                port_id: port_id.clone(),
                kbps,
                statuses: VecDeque::new(),
                fault: None,
                provider: None,
                deleting: false,
            };

            if self.stuck_in_build {
                server.statuses.push_back((ServerStatus::Build, Some("spawning")));
            } else if self.failing_spawn && self.pick_provider(kbps, None).is_some() {
                server.statuses = VecDeque::from([
                    (ServerStatus::Build, Some("spawning")),
                    (ServerStatus::Error, None),
                ]);
                server.fault = Some(ServerFault {
                    code: Some(500),
                    message: "Build of instance aborted: Failed to allocate the network(s)"
                        .to_owned(),
                });
            } else if let Some(rp) = self.pick_provider(kbps, None) {
                server.statuses = VecDeque::from([
                    (ServerStatus::Build, Some("scheduling")),
                    (ServerStatus::Build, Some("spawning")),
                    (ServerStatus::Active, None),
                ]);
                if let Some(port) = st.ports.get_mut(&port_id) {
                    self.bind(port, &rp);
                }
                server.provider = Some(rp);
            } else {
                server.statuses = VecDeque::from([
                    (ServerStatus::Build, Some("scheduling")),
                    (ServerStatus::Error, None),
                ]);
                server.fault = Some(ServerFault {
                    code: Some(500),
                    message: "No valid host was found. There are not enough hosts available."
                        .to_owned(),
                });
            }

            st.servers.insert(id.clone(), server);
            Ok(CreatedServer { id })
        }

        async fn show_server(&self, id: &str) -> Result<Server, CloudClientError> {
            let mut st = self.lock().await;
            let deleting = st
                .servers
                .get(id)
                .map(|s| s.deleting)
                .ok_or_else(|| not_found("server", id))?;
            if deleting {
                st.servers.remove(id);
                return Err(not_found("server", id));
            }

            let server = st
                .servers
                .get_mut(id)
                .ok_or_else(|| not_found("server", id))?;
            if server.statuses.len() > 1 {
                server.statuses.pop_front();
            }
            let (status, task_state) = server
                .statuses
                .front()
                .cloned()
                .unwrap_or((ServerStatus::Unknown, None));
            let fault = if status == ServerStatus::Error {
                server.fault.clone()
            } else {
                None
            };
            Ok(Server {
                id: id.to_owned(),
                name: id.to_owned(),
                status,
                task_state: task_state.map(str::to_owned),
                fault,
            })
        }

        async fn delete_server(&self, id: &str) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            let server = st
                .servers
                .get_mut(id)
                .ok_or_else(|| not_found("server", id))?;
            server.deleting = true;
            server.provider = None;
            let port_id = server.port_id.clone();
            // 포트는 서버 삭제와 함께 unbind 됨
            server.port_id = String::new();
            if let Some(port) = st.ports.get_mut(&port_id) {
                port.binding_profile.clear();
            }
            st.deleted.push(("server", id.to_owned()));
            Ok(())
        }

        async fn migrate_server(&self, id: &str) -> Result<(), CloudClientError> {
            self.move_server(id, true).await?;
            self.state().await.actions.push(("migrate", id.to_owned()));
            Ok(())
        }

        async fn resize_server(&self, id: &str, flavor_ref: &str) -> Result<(), CloudClientError> {
            if !self.state().await.flavors.contains_key(flavor_ref) {
                return Err(not_found("flavor", flavor_ref));
            }
            self.move_server(id, false).await?;
            self.state().await.actions.push(("resize", id.to_owned()));
            Ok(())
        }

        async fn confirm_resize_server(&self, id: &str) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            let server = st
                .servers
                .get_mut(id)
                .ok_or_else(|| not_found("server", id))?;
            if server.current() != Some(&ServerStatus::VerifyResize) {
                return Err(conflict(
                    "compute",
                    "Cannot 'confirmResize' instance while it is not in VERIFY_RESIZE",
                ));
            }
            server.statuses = VecDeque::from([
                (ServerStatus::VerifyResize, Some("resize_confirming")),
                (ServerStatus::Active, None),
            ]);
            st.actions.push(("confirm_resize", id.to_owned()));
            Ok(())
        }

        async fn show_flavor(&self, id: &str) -> Result<Flavor, CloudClientError> {
            let st = self.lock().await;
            st.flavors.get(id).cloned().ok_or_else(|| not_found("flavor", id))
        }

        async fn create_flavor(&self, spec: &FlavorSpec) -> Result<Flavor, CloudClientError> {
            let mut st = self.lock().await;
            if st.flavors.values().any(|f| f.name == spec.name) {
                return Err(conflict("compute", format!("flavor {} already exists", spec.name)));
            }
            let flavor = Flavor {
                id: st.id("flavor"),
                name: spec.name.clone(),
                ram: spec.ram,
                vcpus: spec.vcpus,
                disk: spec.disk,
            };
            st.flavors.insert(flavor.id.clone(), flavor.clone());
            Ok(flavor)
        }

        async fn delete_flavor(&self, id: &str) -> Result<(), CloudClientError> {
            let mut st = self.lock().await;
            st.flavors.remove(id).ok_or_else(|| not_found("flavor", id))?;
            st.deleted.push(("flavor", id.to_owned()));
            Ok(())
        }
    }

    impl PlacementClient for FakeCloud {
        async fn list_allocation_candidates(
            &self,
            request: &ResourceRequest,
        ) -> Result<AllocationCandidates, CloudClientError> {
            let _st = self.lock().await;
            let mut candidates = AllocationCandidates::default();
            for (rp, capacity) in &self.providers {
                let fits = *capacity >= request.amount;
                let forced = self.infeasible_has_candidates && request.amount == PLACEMENT_MAX_INT;
                if !(fits || forced) {
                    continue;
                }
                candidates.allocation_requests.push(json!({
                    "allocations": { rp: { "resources": { &request.resource_class: request.amount } } }
                }));
                candidates.provider_summaries.insert(
                    rp.clone(),
                    ProviderSummary {
                        resources: BTreeMap::from([(
                            request.resource_class.clone(),
                            ResourceCapacity {
                                capacity: *capacity,
                                used: 0,
                            },
                        )]),
                    },
                );
            }
            Ok(candidates)
        }

        async fn list_allocations(&self, consumer_id: &str) -> Result<Allocations, CloudClientError> {
            let st = self.lock().await;
            let mut allocations = Allocations::default();
            let Some(server) = st.servers.get(consumer_id) else {
                return Ok(allocations);
            };
            if let Some(rp) = &server.provider {
                allocations.allocations.insert(
                    COMPUTE_RP.to_owned(),
                    ProviderAllocation {
                        resources: BTreeMap::from([
                            ("VCPU".to_owned(), 1),
                            ("MEMORY_MB".to_owned(), 128),
                            ("DISK_GB".to_owned(), 1),
                        ]),
                        generation: Some(1),
                    },
                );
                allocations.allocations.insert(
                    rp.clone(),
                    ProviderAllocation {
                        resources: BTreeMap::from([(
                            INGRESS_RESOURCE_CLASS.to_owned(),
                            server.kbps,
                        )]),
                        generation: Some(1),
                    },
                );
            }
            Ok(allocations)
        }
    }
}

fn test_config() -> QosVerifyConfig {
    let mut config = QosVerifyConfig::default();
    config.network.qos_placement_physnet = "physnet1".to_owned();
    config.compute.flavor_ref = fake::BASE_FLAVOR.to_owned();
    config.compute.image_ref = "image-1".to_owned();
    config.compute.build_interval_secs = 1;
    config.compute.build_timeout_secs = 10;
    config
}

fn make_runner(cloud: &Arc<FakeCloud>, config: QosVerifyConfig) -> ScenarioRunner<FakeCloud> {
    ScenarioRunnerBuilder::new()
        .config(config)
        .cloud(Arc::clone(cloud))
        .build()
        .expect("runner should build")
}

fn failure_reason(outcome: &ScenarioOutcome) -> &str {
    match outcome {
        ScenarioOutcome::Failed { reason } => reason,
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn basic_scenario_passes_and_cleans_up_in_reverse_order() {
    let cloud = Arc::new(FakeCloud::healthy());
    let runner = make_runner(&cloud, test_config());

    let result = runner.run_one(ScenarioKind::Basic).await;
    assert_eq!(result.outcome, ScenarioOutcome::Passed, "{result:?}");
    assert_eq!(result.idempotent_id, "78625d92-212c-400e-8695-dd51706858b8");
    assert!(result.cleanup_errors.is_empty(), "{:?}", result.cleanup_errors);

    let st = cloud.state().await;
    assert!(st.networks.is_empty());
    assert!(st.subnets.is_empty());
    assert!(st.routers.is_empty());
    assert!(st.policies.is_empty());
    assert!(st.rules.is_empty());
    assert!(st.ports.is_empty());
    assert_eq!(st.live_servers(), 0);

    let kinds: Vec<&str> = st.deleted.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(
        kinds,
        vec![
            "server",
            "port",
            "server",
            "port",
            "rule",
            "qos_policy",
            "rule",
            "qos_policy",
            "router_interface",
            "router",
            "subnet",
            "network",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn missing_physnet_skips_without_api_calls() {
    let cloud = Arc::new(FakeCloud::healthy());
    let mut config = test_config();
    config.network.qos_placement_physnet.clear();
    let runner = make_runner(&cloud, config);

    let report = runner.run(&ScenarioKind::ALL).await;
    assert_eq!(report.skipped(), 3);
    assert!(report.is_success());
    assert_eq!(cloud.state().await.calls, 0);
}

#[tokio::test(start_paused = true)]
async fn missing_extension_skips_scenario() {
    let cloud = Arc::new(FakeCloud::healthy().without_extension("qos-bw-minimum-ingress"));
    let runner = make_runner(&cloud, test_config());

    let result = runner.run_one(ScenarioKind::Basic).await;
    match result.outcome {
        ScenarioOutcome::Skipped { reason } => assert!(reason.contains("qos-bw-minimum-ingress")),
        other => panic!("expected skip, got {other:?}"),
    }
    assert!(cloud.state().await.networks.is_empty());
}

#[tokio::test(start_paused = true)]
async fn no_bandwidth_inventory_skips_scenario() {
    let cloud = Arc::new(FakeCloud::healthy().without_bandwidth_inventory());
    let runner = make_runner(&cloud, test_config());

    let result = runner.run_one(ScenarioKind::Basic).await;
    match result.outcome {
        ScenarioOutcome::Skipped { reason } => {
            assert!(reason.contains("NET_BW_IGR_KILOBIT_PER_SEC:1"));
        }
        other => panic!("expected skip, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn candidates_for_max_int_fail_scenario() {
    let cloud = Arc::new(FakeCloud::healthy().with_infeasible_candidates());
    let runner = make_runner(&cloud, test_config());

    let result = runner.run_one(ScenarioKind::Basic).await;
    let reason = failure_reason(&result.outcome);
    assert!(reason.contains("2147483647"), "{reason}");
    // 픽스처 생성 전에 실패하므로 만든 리소스가 없음
    assert!(cloud.state().await.deleted.is_empty());
}

#[tokio::test(start_paused = true)]
async fn migrate_scenario_passes_and_moves_allocation() {
    let cloud = Arc::new(FakeCloud::healthy());
    let mut config = test_config();
    config.compute.min_compute_nodes = 2;
    let runner = make_runner(&cloud, config);

    let result = runner.run_one(ScenarioKind::Migrate).await;
    assert_eq!(result.outcome, ScenarioOutcome::Passed, "{result:?}");

    let st = cloud.state().await;
    let actions: Vec<&str> = st.actions.iter().map(|(a, _)| *a).collect();
    assert_eq!(actions, vec!["migrate", "confirm_resize"]);
    assert_eq!(st.live_servers(), 0);
}

#[tokio::test(start_paused = true)]
async fn migrate_skipped_on_single_node() {
    let cloud = Arc::new(FakeCloud::healthy());
    let runner = make_runner(&cloud, test_config());

    let result = runner.run_one(ScenarioKind::Migrate).await;
    assert!(matches!(result.outcome, ScenarioOutcome::Skipped { .. }));
    assert_eq!(cloud.state().await.calls, 0);
}

#[tokio::test(start_paused = true)]
async fn resize_scenario_creates_bigger_flavor_and_removes_it() {
    let cloud = Arc::new(FakeCloud::healthy());
    let mut config = test_config();
    config.compute_feature_enabled.resize = true;
    let runner = make_runner(&cloud, config);

    let result = runner.run_one(ScenarioKind::Resize).await;
    assert_eq!(result.outcome, ScenarioOutcome::Passed, "{result:?}");

    let st = cloud.state().await;
    let actions: Vec<&str> = st.actions.iter().map(|(a, _)| *a).collect();
    assert_eq!(actions, vec!["resize", "confirm_resize"]);
    assert!(st.deleted.iter().any(|(kind, _)| *kind == "flavor"));
    // 기본 플레이버만 남음
    assert_eq!(st.flavors.len(), 1);
    assert!(st.flavors.contains_key(fake::BASE_FLAVOR));
}

#[tokio::test(start_paused = true)]
async fn resize_skipped_when_disabled() {
    let cloud = Arc::new(FakeCloud::healthy());
    let runner = make_runner(&cloud, test_config());

    let result = runner.run_one(ScenarioKind::Resize).await;
    assert_eq!(
        result.outcome,
        ScenarioOutcome::Skipped {
            reason: "resize not available".to_owned()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn binding_mismatch_fails_but_still_cleans_up() {
    let cloud = Arc::new(FakeCloud::healthy().with_corrupt_binding());
    let runner = make_runner(&cloud, test_config());

    let result = runner.run_one(ScenarioKind::Basic).await;
    let reason = failure_reason(&result.outcome);
    assert!(reason.contains("binding:profile"), "{reason}");
    assert!(result.cleanup_errors.is_empty());

    let st = cloud.state().await;
    assert!(st.networks.is_empty());
    assert_eq!(st.live_servers(), 0);
}

#[tokio::test(start_paused = true)]
async fn cleanup_errors_are_reported_without_changing_outcome() {
    let cloud = Arc::new(FakeCloud::healthy().with_failing_port_delete());
    let runner = make_runner(&cloud, test_config());

    let result = runner.run_one(ScenarioKind::Basic).await;
    assert_eq!(result.outcome, ScenarioOutcome::Passed);
    // 포트 2개 삭제 실패, 그 때문에 네트워크 삭제도 실패
    assert_eq!(result.cleanup_errors.len(), 3, "{:?}", result.cleanup_errors);
    assert!(result.cleanup_errors[0].action.starts_with("delete_port("));
    assert!(
        result
            .cleanup_errors
            .last()
            .is_some_and(|f| f.action.starts_with("delete_network("))
    );
}

#[tokio::test(start_paused = true)]
async fn server_stuck_in_build_times_out() {
    let cloud = Arc::new(FakeCloud::healthy().with_servers_stuck_in_build());
    let runner = make_runner(&cloud, test_config());

    let result = runner.run_one(ScenarioKind::Basic).await;
    let reason = failure_reason(&result.outcome);
    assert!(reason.contains("ACTIVE"), "{reason}");
    assert!(reason.contains("BUILD"), "{reason}");
    assert_eq!(cloud.state().await.live_servers(), 0);
}

#[tokio::test(start_paused = true)]
async fn valid_boot_in_error_fails_fast_with_fault() {
    let cloud = Arc::new(FakeCloud::healthy().with_failing_spawn());
    let config = test_config();
    let timeout = Duration::from_secs(config.compute.build_timeout_secs);
    let runner = make_runner(&cloud, config);

    let start = Instant::now();
    let result = runner.run_one(ScenarioKind::Basic).await;
    let elapsed = start.elapsed();

    let reason = failure_reason(&result.outcome);
    assert!(reason.contains("Failed to allocate the network(s)"), "{reason}");
    assert!(!reason.contains("within"), "{reason}");
    assert!(elapsed < timeout, "waited {elapsed:?}");
    assert_eq!(cloud.state().await.live_servers(), 0);
}

#[tokio::test(start_paused = true)]
async fn run_all_reports_each_scenario() {
    let cloud = Arc::new(FakeCloud::healthy());
    let mut config = test_config();
    config.compute.min_compute_nodes = 2;
    let runner = make_runner(&cloud, config);

    let report = runner.run(&ScenarioKind::ALL).await;
    let names: Vec<&str> = report.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "qos_min_bw_allocation_basic",
            "migrate_with_qos_min_bw_allocation",
            "resize_with_qos_min_bw_allocation",
        ]
    );
    assert_eq!(report.passed(), 2);
    assert_eq!(report.skipped(), 1);
    assert!(report.is_success());
}

#[tokio::test(start_paused = true)]
async fn precondition_checks_against_cloud() {
    let cloud = FakeCloud::healthy();
    assert!(config_skip_reason(&test_config()).is_none());
    assert!(config_skip_reason(&QosVerifyConfig::default()).is_some());
    check_extensions(&cloud).await.expect("all extensions enabled");
    check_allocation_possible(&cloud)
        .await
        .expect("bandwidth inventory is available");

    let cloud = FakeCloud::healthy().without_extension("port-resource-request");
    let err = check_extensions(&cloud).await.expect_err("missing extension");
    assert!(err.is_skip());

    let cloud = FakeCloud::healthy().without_bandwidth_inventory();
    let err = check_allocation_possible(&cloud)
        .await
        .expect_err("no inventory");
    assert!(err.is_skip());
}

#[tokio::test(start_paused = true)]
async fn boot_with_invalid_policy_ends_in_error_with_no_allocation() {
    use qosverify_cloud::{ComputeClient, PlacementClient};
    use qosverify_scenario::{CleanupStack, Fixture, ScenarioContext};

    let cloud = FakeCloud::healthy();
    let config = test_config();
    let waiter = ServerWaiter::from_config(&config.compute);
    let mut cleanup = CleanupStack::new();
    let fixture = Fixture::create(&cloud, &config.network, &mut cleanup)
        .await
        .expect("fixture");
    assert_eq!(fixture.invalid_policy.rule.min_kbps, 2_147_483_647);
    assert_eq!(fixture.network.physical_network.as_deref(), Some("physnet1"));

    let mut ctx = ScenarioContext {
        cloud: &cloud,
        config: &config,
        waiter: &waiter,
        fixture: &fixture,
        cleanup: &mut cleanup,
    };
    let invalid = fixture.invalid_policy.policy.id.clone();
    let (server, port) = ctx
        .boot_vm_with_min_bw(&invalid, ServerStatus::Error)
        .await
        .expect("boot reaches ERROR");
    assert_eq!(port.qos_policy_id.as_deref(), Some(invalid.as_str()));

    assert!(cloud.list_allocations(&server.id).await.unwrap().is_empty());
    let shown = cloud.show_server(&server.id).await.unwrap();
    assert!(shown.fault.unwrap().message.contains("No valid host"));

    let failures = cleanup.run(&cloud, &waiter).await;
    assert!(failures.is_empty(), "{failures:?}");
    assert!(cleanup.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cleanup_ignores_already_deleted_resources() {
    use qosverify_cloud::QosClient;
    use qosverify_scenario::{CleanupAction, CleanupStack};

    let cloud = FakeCloud::healthy();
    let waiter = ServerWaiter::from_config(&test_config().compute);
    let policy = cloud.create_qos_policy("p", true).await.unwrap();

    let mut cleanup = CleanupStack::new();
    cleanup.push(CleanupAction::DeleteQosPolicy {
        id: policy.id.clone(),
    });
    cleanup.push(CleanupAction::DeleteServer {
        id: "srv-missing".to_owned(),
    });
    cloud.delete_qos_policy(&policy.id).await.unwrap();

    let failures = cleanup.run(&cloud, &waiter).await;
    assert!(failures.is_empty(), "{failures:?}");
}

#[tokio::test(start_paused = true)]
async fn migrate_moves_bandwidth_to_other_provider() {
    use qosverify_scenario::{CleanupStack, Fixture, ScenarioContext, assertions};
    use qosverify_cloud::ComputeClient;

    let cloud = FakeCloud::healthy();
    let config = test_config();
    let waiter = ServerWaiter::from_config(&config.compute);
    let mut cleanup = CleanupStack::new();
    let fixture = Fixture::create(&cloud, &config.network, &mut cleanup)
        .await
        .unwrap();
    let mut ctx = ScenarioContext {
        cloud: &cloud,
        config: &config,
        waiter: &waiter,
        fixture: &fixture,
        cleanup: &mut cleanup,
    };
    let valid = fixture.valid_policy.policy.id.clone();
    let (server, port) = ctx
        .boot_vm_with_min_bw(&valid, ServerStatus::Active)
        .await
        .unwrap();

    let before = assertions::assert_allocation_is_as_expected(&cloud, &server.id, &port.id)
        .await
        .unwrap();
    cloud.migrate_server(&server.id).await.unwrap();
    waiter
        .wait_for_server_status(&cloud, &server.id, ServerStatus::VerifyResize, false, false)
        .await
        .unwrap();
    let after = assertions::assert_allocation_is_as_expected(&cloud, &server.id, &port.id)
        .await
        .unwrap();
    assert_ne!(before, after);
    assert_eq!(cloud.state().await.provider_of(&server.id), Some(after));

    cleanup.run(&cloud, &waiter).await;
}
