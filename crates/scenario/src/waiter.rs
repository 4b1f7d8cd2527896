//! 서버 상태 대기 -- 주기적 폴링으로 상태 수렴을 기다립니다.
//!
//! [`ServerWaiter`]는 `build_interval` 간격으로 서버를 조회하며 목표 상태,
//! ERROR 상태, 타임아웃 중 하나에 도달할 때까지 반복합니다. 폴링 루프는
//! 조회 함수를 인자로 받아 시나리오 절차와 분리되어 있습니다.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use qosverify_cloud::{CloudClientError, ComputeClient};
use qosverify_core::config::ComputeConfig;
use qosverify_core::types::{Server, ServerStatus};

use crate::error::ScenarioError;

/// 서버 상태 폴링 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerWaiter {
    interval: Duration,
    timeout: Duration,
}

impl ServerWaiter {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// `compute.build_interval_secs` / `compute.build_timeout_secs`로 생성합니다.
    pub fn from_config(config: &ComputeConfig) -> Self {
        Self::new(config.build_interval(), config.build_timeout())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 서버가 `target` 상태가 될 때까지 기다립니다.
    ///
    /// - `ready_wait`: true이면 상태 일치 후 task state가 비워질 때까지 기다립니다
    /// - `raise_on_error`: true이면 ERROR 상태에서 즉시 [`ScenarioError::BuildFailed`]
    ///
    /// # Errors
    /// - `ScenarioError::BuildFailed`: `raise_on_error`이고 ERROR 상태가 됨
    /// - `ScenarioError::Timeout`: `build_timeout` 내에 목표 상태가 되지 않음
    /// - `ScenarioError::Cloud`: 서버 조회 실패
    pub async fn wait_for_server_status<C: ComputeClient>(
        &self,
        compute: &C,
        server_id: &str,
        target: ServerStatus,
        ready_wait: bool,
        raise_on_error: bool,
    ) -> Result<Server, ScenarioError> {
        self.poll_status(
            server_id,
            || compute.show_server(server_id),
            target,
            ready_wait,
            raise_on_error,
        )
        .await
    }

    /// 서버가 삭제되어 조회 시 NotFound가 될 때까지 기다립니다.
    ///
    /// `DELETED` 상태도 삭제 완료로 간주합니다.
    pub async fn wait_for_server_termination<C: ComputeClient>(
        &self,
        compute: &C,
        server_id: &str,
        raise_on_error: bool,
    ) -> Result<(), ScenarioError> {
        self.poll_termination(server_id, || compute.show_server(server_id), raise_on_error)
            .await
    }

    pub(crate) async fn poll_status<F, Fut>(
        &self,
        server_id: &str,
        mut fetch: F,
        target: ServerStatus,
        ready_wait: bool,
        raise_on_error: bool,
    ) -> Result<Server, ScenarioError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Server, CloudClientError>>,
    {
        let start = Instant::now();
        let mut server = fetch().await?;
        let mut old_status = server.status.clone();
        let mut old_task_state = server.task_state.clone();

        loop {
            if server.status == target {
                if !ready_wait || target == ServerStatus::Build {
                    return Ok(server);
                }
                if server.task_state.as_deref().is_none_or(str::is_empty) {
                    return Ok(server);
                }
            }

            tokio::time::sleep(self.interval).await;
            server = fetch().await?;

            if server.status != old_status || server.task_state != old_task_state {
                info!(
                    server_id,
                    from_status = %old_status,
                    to_status = %server.status,
                    from_task_state = old_task_state.as_deref().unwrap_or("None"),
                    to_task_state = server.task_state.as_deref().unwrap_or("None"),
                    elapsed_secs = start.elapsed().as_secs(),
                    "server state transition"
                );
                old_status = server.status.clone();
                old_task_state = server.task_state.clone();
            }

            if server.status == ServerStatus::Error && raise_on_error {
                return Err(ScenarioError::BuildFailed {
                    server_id: server_id.to_owned(),
                    fault: server
                        .fault
                        .as_ref()
                        .map(|f| f.message.clone())
                        .unwrap_or_default(),
                });
            }

            if start.elapsed() >= self.timeout {
                return Err(ScenarioError::Timeout {
                    server_id: server_id.to_owned(),
                    expected: target.to_string(),
                    status: server.status.to_string(),
                    task_state: server.task_state.unwrap_or_else(|| "None".to_owned()),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        }
    }

    pub(crate) async fn poll_termination<F, Fut>(
        &self,
        server_id: &str,
        mut fetch: F,
        raise_on_error: bool,
    ) -> Result<(), ScenarioError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Server, CloudClientError>>,
    {
        let start = Instant::now();
        let mut old_status: Option<ServerStatus> = None;

        loop {
            let server = match fetch().await {
                Ok(server) => server,
                Err(e) if e.is_not_found() => {
                    debug!(server_id, "server terminated");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if server.status == ServerStatus::Deleted {
                return Ok(());
            }
            if old_status.as_ref() != Some(&server.status) {
                debug!(server_id, status = %server.status, "waiting for server termination");
                old_status = Some(server.status.clone());
            }
            if server.status == ServerStatus::Error && raise_on_error {
                return Err(ScenarioError::BuildFailed {
                    server_id: server_id.to_owned(),
                    fault: "server went to ERROR status while deleting".to_owned(),
                });
            }
            if start.elapsed() >= self.timeout {
                return Err(ScenarioError::Timeout {
                    server_id: server_id.to_owned(),
                    expected: "terminated".to_owned(),
                    status: server.status.to_string(),
                    task_state: server.task_state.unwrap_or_else(|| "None".to_owned()),
                    timeout_secs: self.timeout.as_secs(),
                });
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
