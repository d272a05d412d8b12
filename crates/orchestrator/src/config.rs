//! 오케스트레이터 설정
//!
//! [`OrchestratorConfig`]는 core의 [`DockerConfig`]와 [`NetworkConfig`]에서
//! 오케스트레이터가 런타임에 사용하는 값만 추려 냅니다.
//!
//! # 사용 예시
//! ```ignore
//! use qnet_core::config::QnetConfig;
//! use qnet_orchestrator::config::OrchestratorConfig;
//!
//! let core_config = QnetConfig::default();
//! let config = OrchestratorConfig::from_core(&core_config.docker, &core_config.network);
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use qnet_core::config::{DockerConfig, NetworkConfig, NodeContainers};
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;
use crate::health::WaitPolicy;

/// 오케스트레이터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Docker 데몬 주소
    pub docker_host: String,
    /// 노드 이름 → 템플릿 컨테이너
    pub nodes: BTreeMap<String, NodeContainers>,
    /// 노드 기동 후 유예 시간 (초)
    pub consensus_grace_period_secs: u64,
    /// 단일 컨테이너 헬스 대기 최대 시도 횟수
    pub wait_max_attempts: u32,
    /// 헬스 폴링 간격 (초)
    pub wait_interval_secs: u64,
    /// 템플릿 네트워크 대기 최대 시도 횟수
    pub network_wait_max_attempts: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from_core(&DockerConfig::default(), &NetworkConfig::default())
    }
}

/// 설정 상한값 상수
const MAX_WAIT_ATTEMPTS: u32 = 1000;
const MAX_WAIT_INTERVAL_SECS: u64 = 60;
const MAX_GRACE_PERIOD_SECS: u64 = 600;

impl OrchestratorConfig {
    /// core 설정에서 오케스트레이터 설정을 생성합니다.
    pub fn from_core(docker: &DockerConfig, network: &NetworkConfig) -> Self {
        Self {
            docker_host: docker.host.clone(),
            nodes: docker.nodes.clone(),
            consensus_grace_period_secs: network.consensus_grace_period_secs,
            wait_max_attempts: network.wait_max_attempts,
            wait_interval_secs: network.wait_interval_secs,
            network_wait_max_attempts: network.network_wait_max_attempts,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.wait_max_attempts == 0 || self.wait_max_attempts > MAX_WAIT_ATTEMPTS {
            return Err(OrchestratorError::Config {
                field: "wait_max_attempts".to_owned(),
                reason: format!("must be 1-{MAX_WAIT_ATTEMPTS}"),
            });
        }

        if self.network_wait_max_attempts == 0
            || self.network_wait_max_attempts > MAX_WAIT_ATTEMPTS
        {
            return Err(OrchestratorError::Config {
                field: "network_wait_max_attempts".to_owned(),
                reason: format!("must be 1-{MAX_WAIT_ATTEMPTS}"),
            });
        }

        if self.wait_interval_secs == 0 || self.wait_interval_secs > MAX_WAIT_INTERVAL_SECS {
            return Err(OrchestratorError::Config {
                field: "wait_interval_secs".to_owned(),
                reason: format!("must be 1-{MAX_WAIT_INTERVAL_SECS}"),
            });
        }

        if self.consensus_grace_period_secs > MAX_GRACE_PERIOD_SECS {
            return Err(OrchestratorError::Config {
                field: "consensus_grace_period_secs".to_owned(),
                reason: format!("must be 0-{MAX_GRACE_PERIOD_SECS}"),
            });
        }

        for (node, containers) in &self.nodes {
            if containers.quorum_container_id.trim().is_empty()
                || containers.tessera_container_id.trim().is_empty()
            {
                return Err(OrchestratorError::Config {
                    field: format!("nodes.{node}"),
                    reason: "template container ids must not be empty".to_owned(),
                });
            }
        }

        Ok(())
    }

    /// 노드 기동 후 유예 시간
    pub fn consensus_grace_period(&self) -> Duration {
        Duration::from_secs(self.consensus_grace_period_secs)
    }

    /// 단일 컨테이너 대기 정책
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(
            self.wait_max_attempts,
            Duration::from_secs(self.wait_interval_secs),
        )
    }

    /// 템플릿 네트워크 대기 정책
    pub fn network_wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(
            self.network_wait_max_attempts,
            Duration::from_secs(self.wait_interval_secs),
        )
    }
}

/// 오케스트레이터 설정 빌더
#[derive(Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// Docker 데몬 주소를 설정합니다.
    pub fn docker_host(mut self, host: impl Into<String>) -> Self {
        self.config.docker_host = host.into();
        self
    }

    /// 노드 템플릿을 추가합니다.
    pub fn node(
        mut self,
        name: impl Into<String>,
        quorum_container_id: impl Into<String>,
        tessera_container_id: impl Into<String>,
    ) -> Self {
        self.config.nodes.insert(
            name.into(),
            NodeContainers {
                quorum_container_id: quorum_container_id.into(),
                tessera_container_id: tessera_container_id.into(),
            },
        );
        self
    }

    /// 유예 시간(초)을 설정합니다.
    pub fn consensus_grace_period_secs(mut self, secs: u64) -> Self {
        self.config.consensus_grace_period_secs = secs;
        self
    }

    /// 헬스 대기 최대 시도 횟수를 설정합니다.
    pub fn wait_max_attempts(mut self, attempts: u32) -> Self {
        self.config.wait_max_attempts = attempts;
        self
    }

    /// 폴링 간격(초)을 설정합니다.
    pub fn wait_interval_secs(mut self, secs: u64) -> Self {
        self.config.wait_interval_secs = secs;
        self
    }

    /// 템플릿 네트워크 대기 최대 시도 횟수를 설정합니다.
    pub fn network_wait_max_attempts(mut self, attempts: u32) -> Self {
        self.config.network_wait_max_attempts = attempts;
        self
    }

    /// 설정을 검증하고 `OrchestratorConfig`를 생성합니다.
    pub fn build(self) -> Result<OrchestratorConfig, OrchestratorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
