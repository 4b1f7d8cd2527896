//! 클라우드 클라이언트 에러 타입
//!
//! [`CloudClientError`]는 OpenStack 서비스 호출 중 발생하는 모든 에러를 표현합니다.
//! `From<CloudClientError> for QosVerifyError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use qosverify_core::error::{CloudError, ConfigError, QosVerifyError};

/// 클라우드 클라이언트 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CloudClientError {
    /// 리소스를 찾을 수 없음 (HTTP 404)
    #[error("{resource} not found: {id}")]
    NotFound {
        /// 리소스 종류 (port, server, flavor ...)
        resource: String,
        /// 요청한 리소스 ID
        id: String,
    },

    /// 서비스가 2xx 이외의 상태 코드를 반환함
    #[error("{service} api error ({status}): {message}")]
    Api {
        /// 서비스 타입 (compute, network, placement)
        service: String,
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문 또는 에러 메시지
        message: String,
    },

    /// Keystone 인증 실패
    #[error("authentication failed: {0}")]
    Auth(String),

    /// 서비스 카탈로그에 엔드포인트가 없음
    #[error("no '{service}' endpoint in service catalog (interface '{interface}')")]
    EndpointNotFound {
        /// 서비스 타입
        service: String,
        /// 요청한 인터페이스
        interface: String,
    },

    /// HTTP 전송 실패 (연결, 타임아웃)
    #[error("transport error: {0}")]
    Transport(String),

    /// 응답 본문 디코딩 실패
    #[error("failed to decode {service} response: {reason}")]
    Decode {
        /// 서비스 타입
        service: String,
        /// 실패 사유
        reason: String,
    },

    /// 클라이언트 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl CloudClientError {
    /// 리소스가 이미 없는 경우인지 확인합니다 (정리 단계에서 무시 대상).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<CloudClientError> for QosVerifyError {
    fn from(err: CloudClientError) -> Self {
        match err {
            CloudClientError::NotFound { resource, id } => {
                QosVerifyError::Cloud(CloudError::NotFound { resource, id })
            }
            CloudClientError::Api {
                service,
                status,
                message,
            } => QosVerifyError::Cloud(CloudError::Api {
                service,
                status,
                message,
            }),
            CloudClientError::Auth(msg) => QosVerifyError::Cloud(CloudError::Auth(msg)),
            CloudClientError::Config { field, reason } => {
                QosVerifyError::Config(ConfigError::InvalidValue { field, reason })
            }
            CloudClientError::EndpointNotFound { .. }
            | CloudClientError::Transport(_)
            | CloudClientError::Decode { .. } => {
                QosVerifyError::Cloud(CloudError::Transport(err.to_string()))
            }
        }
    }
}
