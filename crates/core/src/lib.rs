//! qnet 공통 타입 — 설정, 에러, 메트릭 이름
//!
//! - [`config`]: `qnet.toml` 파싱, 환경변수 오버라이드, 검증
//! - [`error`]: 최상위 에러 (`QnetError`) 및 도메인별 에러
//! - [`metrics`]: 메트릭 이름 상수와 설명 등록

pub mod config;
pub mod error;
pub mod metrics;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, OrchestrationError, QnetError};

// 설정
pub use config::{DockerConfig, GeneralConfig, NetworkConfig, NodeContainers, QnetConfig};
