//! 에러 타입 — 도메인별 에러 정의

/// qnet 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum QnetError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 컨테이너 오케스트레이션 에러
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestrationError),

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

/// 오케스트레이션 에러 분류
///
/// 오케스트레이터 크레이트의 상세 에러를 상위 레이어에서 다루기 쉬운
/// 범주로 축약한 것입니다.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    /// 컨테이너 런타임 API 호출 실패
    #[error("runtime api error: {0}")]
    Runtime(String),

    /// 컨테이너를 찾을 수 없음
    #[error("container not found: {0}")]
    NotFound(String),

    /// 사전 조건 위반 (템플릿 상태, 파일 대상 등)
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// 네트워크가 제한 시간 내에 준비되지 않음
    #[error("network not ready: {0}")]
    NotReady(String),
}
