//! 설정 관리 — qnet.toml 파싱 및 런타임 설정
//!
//! [`QnetConfig`]는 테스트 네트워크 오케스트레이션에 필요한 모든 설정을 담는
//! 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`QNET_DOCKER_HOST=tcp://127.0.0.1:2375` 형식)
//! 3. 설정 파일 (`qnet.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), qnet_core::error::QnetError> {
//! use qnet_core::config::QnetConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = QnetConfig::load("qnet.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = QnetConfig::parse("[network]\nconsensus_grace_period_secs = 10")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, QnetError};

/// 설정 상한값 상수
const MAX_WAIT_ATTEMPTS: u32 = 1000;
const MAX_WAIT_INTERVAL_SECS: u64 = 60;
const MAX_GRACE_PERIOD_SECS: u64 = 600;

/// qnet 통합 설정
///
/// `qnet.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QnetConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Docker 인프라 설정
    #[serde(default)]
    pub docker: DockerConfig,
    /// 네트워크 대기/유예 설정
    #[serde(default)]
    pub network: NetworkConfig,
}

impl QnetConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, QnetError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, QnetError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QnetError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                QnetError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, QnetError> {
        toml::from_str(toml_str).map_err(|e| {
            QnetError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `QNET_{SECTION}_{FIELD}`
    /// 예: `QNET_NETWORK_WAIT_INTERVAL_SECS=5`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "QNET_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "QNET_GENERAL_LOG_FORMAT");

        // Docker
        override_string(&mut self.docker.host, "QNET_DOCKER_HOST");
        override_opt_string(
            &mut self.docker.target_quorum_image,
            "QNET_DOCKER_TARGET_QUORUM_IMAGE",
        );
        override_opt_string(
            &mut self.docker.target_tessera_image,
            "QNET_DOCKER_TARGET_TESSERA_IMAGE",
        );

        // Network
        override_u64(
            &mut self.network.consensus_grace_period_secs,
            "QNET_NETWORK_CONSENSUS_GRACE_PERIOD_SECS",
        );
        override_u32(
            &mut self.network.wait_max_attempts,
            "QNET_NETWORK_WAIT_MAX_ATTEMPTS",
        );
        override_u64(
            &mut self.network.wait_interval_secs,
            "QNET_NETWORK_WAIT_INTERVAL_SECS",
        );
        override_u32(
            &mut self.network.network_wait_max_attempts,
            "QNET_NETWORK_NETWORK_WAIT_MAX_ATTEMPTS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), QnetError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.network.wait_max_attempts == 0 || self.network.wait_max_attempts > MAX_WAIT_ATTEMPTS
        {
            return Err(invalid(
                "network.wait_max_attempts",
                format!("must be 1-{MAX_WAIT_ATTEMPTS}"),
            ));
        }

        if self.network.network_wait_max_attempts == 0
            || self.network.network_wait_max_attempts > MAX_WAIT_ATTEMPTS
        {
            return Err(invalid(
                "network.network_wait_max_attempts",
                format!("must be 1-{MAX_WAIT_ATTEMPTS}"),
            ));
        }

        if self.network.wait_interval_secs == 0
            || self.network.wait_interval_secs > MAX_WAIT_INTERVAL_SECS
        {
            return Err(invalid(
                "network.wait_interval_secs",
                format!("must be 1-{MAX_WAIT_INTERVAL_SECS}"),
            ));
        }

        if self.network.consensus_grace_period_secs > MAX_GRACE_PERIOD_SECS {
            return Err(invalid(
                "network.consensus_grace_period_secs",
                format!("must be 0-{MAX_GRACE_PERIOD_SECS}"),
            ));
        }

        for (node, containers) in &self.docker.nodes {
            if containers.quorum_container_id.trim().is_empty() {
                return Err(invalid(
                    &format!("docker.nodes.{node}.quorum_container_id"),
                    "must not be empty".to_owned(),
                ));
            }
            if containers.tessera_container_id.trim().is_empty() {
                return Err(invalid(
                    &format!("docker.nodes.{node}.tessera_container_id"),
                    "must not be empty".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> QnetError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Docker 인프라 설정
///
/// `nodes`는 노드 이름별로 복제 원본(template) 컨테이너 ID 쌍을 가집니다.
/// 템플릿은 `created` 상태(미기동)여야 합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker 데몬 주소 (비어 있으면 `DOCKER_HOST` 또는 로컬 소켓)
    pub host: String,
    /// `develop` 버전 키에 사용할 quorum 이미지
    pub target_quorum_image: Option<String>,
    /// `develop` 버전 키에 사용할 tessera 이미지
    pub target_tessera_image: Option<String>,
    /// 추가/재정의할 quorum 버전 → 이미지 매핑
    pub quorum_images: BTreeMap<String, String>,
    /// 추가/재정의할 tessera 버전 → 이미지 매핑
    pub tessera_images: BTreeMap<String, String>,
    /// 노드 이름 → 템플릿 컨테이너
    pub nodes: BTreeMap<String, NodeContainers>,
}

/// 노드 하나를 구성하는 템플릿 컨테이너 쌍
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeContainers {
    /// quorum(합의 피어) 템플릿 컨테이너 ID
    pub quorum_container_id: String,
    /// tessera(프라이버시 매니저) 템플릿 컨테이너 ID
    pub tessera_container_id: String,
}

/// 네트워크 대기 및 유예 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// 노드 기동 후 합의 안정화를 위한 유예 시간 (초)
    pub consensus_grace_period_secs: u64,
    /// 단일 컨테이너 헬스 대기 최대 시도 횟수
    pub wait_max_attempts: u32,
    /// 헬스 폴링 간격 (초)
    pub wait_interval_secs: u64,
    /// 템플릿 네트워크 전체 대기 최대 시도 횟수
    pub network_wait_max_attempts: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            consensus_grace_period_secs: 30,
            wait_max_attempts: 30,
            wait_interval_secs: 3,
            network_wait_max_attempts: 20,
        }
    }
}

impl NetworkConfig {
    /// 유예 시간을 `Duration`으로 반환합니다.
    pub fn consensus_grace_period(&self) -> Duration {
        Duration::from_secs(self.consensus_grace_period_secs)
    }

    /// 폴링 간격을 `Duration`으로 반환합니다.
    pub fn wait_interval(&self) -> Duration {
        Duration::from_secs(self.wait_interval_secs)
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.trim().is_empty() {
            None
        } else {
            Some(val)
        };
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = QnetConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.network.wait_max_attempts, 30);
        assert_eq!(config.network.wait_interval_secs, 3);
        assert_eq!(config.network.consensus_grace_period_secs, 30);
        assert!(config.docker.host.is_empty());
        assert!(config.docker.nodes.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        QnetConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = QnetConfig::parse("").unwrap();
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.network.network_wait_max_attempts, 20);
    }

    #[test]
    fn parse_nodes_and_image_overrides() {
        let toml = r#"
[docker]
host = "unix:///var/run/docker.sock"
target_quorum_image = "quorumengineering/quorum:pr-123"

[docker.quorum_images]
"22.4.0" = "quorumengineering/quorum:22.4.0"

[docker.nodes.Node1]
quorum_container_id = "aaa111"
tessera_container_id = "bbb222"

[docker.nodes.Node2]
quorum_container_id = "ccc333"
tessera_container_id = "ddd444"
"#;
        let config = QnetConfig::parse(toml).unwrap();
        assert_eq!(config.docker.nodes.len(), 2);
        assert_eq!(config.docker.nodes["Node1"].quorum_container_id, "aaa111");
        assert_eq!(
            config.docker.target_quorum_image.as_deref(),
            Some("quorumengineering/quorum:pr-123")
        );
        assert_eq!(config.docker.quorum_images["22.4.0"], "quorumengineering/quorum:22.4.0");
        config.validate().unwrap();
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = QnetConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(err, QnetError::Config(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = QnetConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_wait_interval() {
        let mut config = QnetConfig::default();
        config.network.wait_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("wait_interval_secs"));
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = QnetConfig::default();
        config.network.wait_max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_grace_period() {
        let mut config = QnetConfig::default();
        config.network.consensus_grace_period_secs = MAX_GRACE_PERIOD_SECS + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("consensus_grace_period_secs"));
    }

    #[test]
    fn validate_rejects_blank_template_id() {
        let mut config = QnetConfig::default();
        config.docker.nodes.insert(
            "Node1".to_owned(),
            NodeContainers {
                quorum_container_id: "abc".to_owned(),
                tessera_container_id: "  ".to_owned(),
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Node1.tessera_container_id"));
    }

    #[test]
    fn durations_follow_seconds_fields() {
        let network = NetworkConfig {
            consensus_grace_period_secs: 7,
            wait_interval_secs: 2,
            ..NetworkConfig::default()
        };
        assert_eq!(network.consensus_grace_period(), Duration::from_secs(7));
        assert_eq!(network.wait_interval(), Duration::from_secs(2));
    }

    #[test]
    #[serial]
    fn env_override_u64_and_invalid_value() {
        let mut val = 3_u64;
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_QNET_U64", "9") };
        override_u64(&mut val, "TEST_QNET_U64");
        assert_eq!(val, 9);

        unsafe { std::env::set_var("TEST_QNET_U64", "nine") };
        override_u64(&mut val, "TEST_QNET_U64");
        assert_eq!(val, 9);
        unsafe { std::env::remove_var("TEST_QNET_U64") };
    }

    #[test]
    #[serial]
    fn env_override_optional_string() {
        let mut val = None;
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_QNET_OPT", "quorumengineering/quorum:edge") };
        override_opt_string(&mut val, "TEST_QNET_OPT");
        assert_eq!(val.as_deref(), Some("quorumengineering/quorum:edge"));

        unsafe { std::env::set_var("TEST_QNET_OPT", "") };
        override_opt_string(&mut val, "TEST_QNET_OPT");
        assert!(val.is_none());
        unsafe { std::env::remove_var("TEST_QNET_OPT") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_QNET_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let mut config = QnetConfig::default();
        config.docker.nodes.insert(
            "Node1".to_owned(),
            NodeContainers {
                quorum_container_id: "q1".to_owned(),
                tessera_container_id: "t1".to_owned(),
            },
        );
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = QnetConfig::parse(&toml_str).unwrap();
        assert_eq!(parsed.docker.nodes, config.docker.nodes);
        assert_eq!(
            parsed.network.wait_max_attempts,
            config.network.wait_max_attempts
        );
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = QnetConfig::from_file("/nonexistent/path/qnet.toml")
            .await
            .unwrap_err();
        assert!(matches!(err, QnetError::Config(ConfigError::FileNotFound { .. })));
    }
}
