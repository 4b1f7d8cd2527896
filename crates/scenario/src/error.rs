//! 시나리오 에러 타입
//!
//! [`ScenarioError`]는 시나리오 실행 중 발생하는 모든 에러를 표현합니다.
//! [`ScenarioError::Skip`]은 실패가 아니라 환경이 기능을 지원하지 않는다는
//! 의미이며, 러너는 이를 skipped 결과로 기록합니다.

use qosverify_cloud::CloudClientError;
use qosverify_core::error::{ConfigError, QosVerifyError, ScenarioError as CoreScenarioError};

/// 시나리오 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// 환경이 기능을 지원하지 않음
    #[error("skipped: {0}")]
    Skip(String),

    /// 검증 실패
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// 서버가 ERROR 상태가 됨
    #[error("server {server_id} failed to build and is in ERROR status: {fault}")]
    BuildFailed {
        /// 서버 ID
        server_id: String,
        /// fault 메시지 (없으면 빈 문자열)
        fault: String,
    },

    /// 상태 대기 타임아웃
    #[error(
        "server {server_id} failed to reach {expected} status within {timeout_secs}s \
         (current status: {status}, task state: {task_state})"
    )]
    Timeout {
        /// 서버 ID
        server_id: String,
        /// 기대한 상태
        expected: String,
        /// 마지막으로 관찰한 상태
        status: String,
        /// 마지막으로 관찰한 task state
        task_state: String,
        /// 타임아웃 (초)
        timeout_secs: u64,
    },

    /// 클라우드 API 호출 실패
    #[error(transparent)]
    Cloud(#[from] CloudClientError),

    /// 러너 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl ScenarioError {
    /// skipped 결과로 기록해야 하는 에러인지 확인합니다.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }

    pub(crate) fn assertion(msg: impl Into<String>) -> Self {
        Self::Assertion(msg.into())
    }
}

impl From<ScenarioError> for QosVerifyError {
    fn from(err: ScenarioError) -> Self {
        match err {
            ScenarioError::Skip(reason) => {
                QosVerifyError::Scenario(CoreScenarioError::Skipped(reason))
            }
            ScenarioError::Assertion(msg) => {
                QosVerifyError::Scenario(CoreScenarioError::AssertionFailed(msg))
            }
            ScenarioError::BuildFailed { ref server_id, .. }
            | ScenarioError::Timeout { ref server_id, .. } => {
                QosVerifyError::Scenario(CoreScenarioError::WaitFailed {
                    server_id: server_id.clone(),
                    reason: err.to_string(),
                })
            }
            ScenarioError::Cloud(e) => e.into(),
            ScenarioError::Config { field, reason } => {
                QosVerifyError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
