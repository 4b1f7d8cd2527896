//! 시나리오 러너 -- 시나리오별 픽스처 준비, 실행, 정리, 결과 집계
//!
//! # 실행 흐름
//! ```text
//! ScenarioKind
//!     |
//!     +-- skip_reason(config) --------------------------> skipped
//!     |
//!     +-- check_extensions / check_allocation_possible
//!     +-- Fixture::create      (CleanupStack에 등록)
//!     +-- ScenarioKind::execute
//!     |
//!     +-- CleanupStack::run    (결과와 무관하게 항상)
//!     |
//!     v
//! ScenarioResult { passed | skipped | failed, cleanup_errors }
//! ```
//!
//! 시나리오는 순차적으로 실행되며 동시에 두 개 이상 실행하지 않습니다.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use qosverify_cloud::CloudClient;
use qosverify_core::config::QosVerifyConfig;

use crate::cleanup::{CleanupFailure, CleanupStack};
use crate::error::ScenarioError;
use crate::fixture::Fixture;
use crate::preconditions::{check_allocation_possible, check_extensions};
use crate::scenarios::{ScenarioContext, ScenarioKind};
use crate::waiter::ServerWaiter;

/// 시나리오 결과 판정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ScenarioOutcome {
    Passed,
    Skipped { reason: String },
    Failed { reason: String },
}

impl ScenarioOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    fn from_result(result: Result<(), ScenarioError>) -> Self {
        match result {
            Ok(()) => Self::Passed,
            Err(ScenarioError::Skip(reason)) => Self::Skipped { reason },
            Err(e) => Self::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// 시나리오 하나의 실행 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub idempotent_id: String,
    #[serde(flatten)]
    pub outcome: ScenarioOutcome,
    pub elapsed_ms: u64,
    /// NotFound 이외의 정리 실패. 결과 판정에는 영향을 주지 않습니다.
    #[serde(default)]
    pub cleanup_errors: Vec<CleanupFailure>,
}

/// 전체 실행 보고서
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub results: Vec<ScenarioResult>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, ScenarioOutcome::Passed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ScenarioOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(ScenarioOutcome::is_failed)
    }

    /// 실패한 시나리오가 없으면 성공입니다.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&ScenarioOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// 시나리오 러너
///
/// # 사용 예시
/// ```ignore
/// use qosverify_scenario::{ScenarioKind, ScenarioRunnerBuilder};
///
/// let runner = ScenarioRunnerBuilder::new()
///     .config(config)
///     .cloud(Arc::new(client))
///     .build()?;
///
/// let report = runner.run(&ScenarioKind::ALL).await;
/// assert!(report.is_success());
/// ```
pub struct ScenarioRunner<C: CloudClient> {
    cloud: Arc<C>,
    config: QosVerifyConfig,
    waiter: ServerWaiter,
}

impl<C: CloudClient> ScenarioRunner<C> {
    pub fn config(&self) -> &QosVerifyConfig {
        &self.config
    }

    pub fn waiter(&self) -> &ServerWaiter {
        &self.waiter
    }

    /// 시나리오들을 순서대로 실행합니다.
    pub async fn run(&self, kinds: &[ScenarioKind]) -> RunReport {
        let mut report = RunReport::default();
        for kind in kinds {
            report.results.push(self.run_one(*kind).await);
        }
        info!(
            passed = report.passed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "scenario run finished"
        );
        report
    }

    /// 시나리오 하나를 실행합니다. 픽스처와 정리 스택은 시나리오마다 새로 만듭니다.
    pub async fn run_one(&self, kind: ScenarioKind) -> ScenarioResult {
        let started = Instant::now();
        info!(scenario = kind.name(), id = kind.idempotent_id(), "scenario started");

        let mut cleanup = CleanupStack::new();
        let (outcome, cleanup_errors) = match kind.skip_reason(&self.config) {
            Some(reason) => (ScenarioOutcome::Skipped { reason }, Vec::new()),
            None => {
                let result = self.execute(kind, &mut cleanup).await;
                let cleanup_errors = cleanup.run(self.cloud.as_ref(), &self.waiter).await;
                (ScenarioOutcome::from_result(result), cleanup_errors)
            }
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &outcome {
            ScenarioOutcome::Passed => {
                info!(scenario = kind.name(), elapsed_ms, "scenario passed");
            }
            ScenarioOutcome::Skipped { reason } => {
                info!(scenario = kind.name(), reason = reason.as_str(), "scenario skipped");
            }
            ScenarioOutcome::Failed { reason } => {
                error!(scenario = kind.name(), reason = reason.as_str(), elapsed_ms, "scenario failed");
            }
        }
        if !cleanup_errors.is_empty() {
            warn!(
                scenario = kind.name(),
                count = cleanup_errors.len(),
                "cleanup finished with errors"
            );
        }

        ScenarioResult {
            name: kind.name().to_owned(),
            idempotent_id: kind.idempotent_id().to_owned(),
            outcome,
            elapsed_ms,
            cleanup_errors,
        }
    }

    async fn execute(
        &self,
        kind: ScenarioKind,
        cleanup: &mut CleanupStack,
    ) -> Result<(), ScenarioError> {
        let cloud = self.cloud.as_ref();

        check_extensions(cloud).await?;
        check_allocation_possible(cloud).await?;
        let fixture = Fixture::create(cloud, &self.config.network, cleanup).await?;

        let mut ctx = ScenarioContext {
            cloud,
            config: &self.config,
            waiter: &self.waiter,
            fixture: &fixture,
            cleanup,
        };
        kind.execute(&mut ctx).await
    }
}

/// 시나리오 러너 빌더
pub struct ScenarioRunnerBuilder<C: CloudClient> {
    config: QosVerifyConfig,
    cloud: Option<Arc<C>>,
    waiter: Option<ServerWaiter>,
}

impl<C: CloudClient> ScenarioRunnerBuilder<C> {
    pub fn new() -> Self {
        Self {
            config: QosVerifyConfig::default(),
            cloud: None,
            waiter: None,
        }
    }

    pub fn config(mut self, config: QosVerifyConfig) -> Self {
        self.config = config;
        self
    }

    /// 클라우드 클라이언트를 설정합니다.
    pub fn cloud(mut self, cloud: Arc<C>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    /// 폴링 설정을 직접 지정합니다. 지정하지 않으면 `compute` 설정에서 만듭니다.
    pub fn waiter(mut self, waiter: ServerWaiter) -> Self {
        self.waiter = Some(waiter);
        self
    }

    /// 러너를 빌드합니다.
    ///
    /// # Errors
    /// - `ScenarioError::Config`: 클라우드 클라이언트 누락 또는 설정 검증 실패
    pub fn build(self) -> Result<ScenarioRunner<C>, ScenarioError> {
        self.config
            .validate()
            .map_err(|e| ScenarioError::Config {
                field: "config".to_owned(),
                reason: e.to_string(),
            })?;

        let cloud = self.cloud.ok_or_else(|| ScenarioError::Config {
            field: "cloud".to_owned(),
            reason: "cloud client must be provided".to_owned(),
        })?;

        let waiter = self
            .waiter
            .unwrap_or_else(|| ServerWaiter::from_config(&self.config.compute));

        Ok(ScenarioRunner {
            cloud,
            config: self.config,
            waiter,
        })
    }
}

impl<C: CloudClient> Default for ScenarioRunnerBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
