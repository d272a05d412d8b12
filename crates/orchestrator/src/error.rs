//! 오케스트레이터 에러 타입
//!
//! [`OrchestratorError`]는 오케스트레이터 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<OrchestratorError> for QnetError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 일시적인 미가용 상태(아직 healthy가 아님, 로그에 패턴이 아직 없음)는
//! 에러가 아니라 `Ok(false)`로 표현됩니다.

use qnet_core::error::{OrchestrationError, QnetError};

/// 오케스트레이터 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 데몬 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// 컨테이너를 찾을 수 없음
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// 상태 변경 없음 (이미 정지된 컨테이너 정지 등)
    #[error("container '{0}' not modified")]
    NotModified(String),

    /// 템플릿 컨테이너가 복제 조건을 만족하지 않음
    #[error("invalid template '{container}': {reason}")]
    InvalidTemplate {
        /// 템플릿 컨테이너 이름 또는 ID
        container: String,
        /// 위반 사유
        reason: String,
    },

    /// 파일 트랜잭션 대상이 일반 파일이 아님
    #[error("expected a file but '{path}' in container '{container_id}' is not one")]
    NotAFile {
        /// 대상 컨테이너 ID
        container_id: String,
        /// 컨테이너 내부 경로
        path: String,
    },

    /// tar 아카이브 생성/해석 실패
    #[error("archive error: {0}")]
    Archive(String),

    /// 파일 내용 변환 실패
    #[error("content error: {0}")]
    Content(String),

    /// 로그 패턴 정규식 오류
    #[error("invalid log pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// 요청된 패턴
        pattern: String,
        /// 컴파일 실패 사유
        reason: String,
    },

    /// 설정에 없는 노드
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// 템플릿 네트워크가 준비되지 않음
    #[error("network not ready: {0}")]
    NetworkNotReady(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 로컬 입출력 실패 (로그 출력 대상 쓰기 등)
    #[error("local io error: {0}")]
    Io(#[from] std::io::Error),

    /// 백그라운드 태스크 실패 (panic 또는 취소)
    #[error("task error: {0}")]
    Task(String),
}

impl OrchestratorError {
    /// 사전 조건 위반 여부를 반환합니다.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::InvalidTemplate { .. } | Self::NotAFile { .. })
    }
}

impl From<tokio::task::JoinError> for OrchestratorError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

impl From<OrchestratorError> for QnetError {
    fn from(err: OrchestratorError) -> Self {
        if let OrchestratorError::Io(e) = err {
            return QnetError::Io(e);
        }
        let mapped = match &err {
            OrchestratorError::ContainerNotFound(id) => OrchestrationError::NotFound(id.clone()),
            OrchestratorError::InvalidTemplate { .. } | OrchestratorError::NotAFile { .. } => {
                OrchestrationError::Precondition(err.to_string())
            }
            OrchestratorError::NetworkNotReady(reason) => {
                OrchestrationError::NotReady(reason.clone())
            }
            _ => OrchestrationError::Runtime(err.to_string()),
        };
        QnetError::Orchestrator(mapped)
    }
}
