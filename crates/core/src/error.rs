//! 에러 타입 -- 도메인별 에러 정의

/// qosverify 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum QosVerifyError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 클라우드 API 호출 에러
    #[error("cloud error: {0}")]
    Cloud(#[from] CloudError),

    /// 시나리오 실행 에러
    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 클라우드 API 에러
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// 리소스를 찾을 수 없음 (HTTP 404)
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// 서비스가 에러 응답을 반환함
    #[error("{service} returned {status}: {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    /// 인증 실패
    #[error("authentication failed: {0}")]
    Auth(String),

    /// 전송 계층 실패 (연결, 타임아웃, 디코딩)
    #[error("transport error: {0}")]
    Transport(String),
}

/// 시나리오 실행 에러
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// 환경이 기능을 지원하지 않아 건너뜀
    #[error("skipped: {0}")]
    Skipped(String),

    /// 검증 실패
    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    /// 서버 상태 대기 실패
    #[error("wait failed for server '{server_id}': {reason}")]
    WaitFailed { server_id: String, reason: String },
}
