//! qnet 오케스트레이터 -- 일회용 quorum/tessera 테스트 네트워크 관리
//!
//! 미기동(`created`) 템플릿 컨테이너를 복제해 노드를 띄우고, 헬스 상태를
//! 폴링하고, 컨테이너 내부 파일과 로그를 다루며, 끝나면 전부 정리합니다.
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`OrchestratorError`)
//! - [`config`]: Orchestrator configuration (`OrchestratorConfig`, builder)
//! - [`types`]: Container descriptions and label constants
//! - [`docker`]: Docker API abstraction (`DockerClient` trait, `BollardDockerClient`)
//! - [`ledger`]: Per-node resource record (`NetworkResources`)
//! - [`attributes`]: Provisioning intent (`NodeAttributes`, `GethArgs`)
//! - [`catalog`]: Version key → image (`ImageCatalog`)
//! - [`state`]: Container state snapshot (`BasicContainerState`)
//! - [`health`]: Health polling (`WaitPolicy`, `WaitOutcome`)
//! - [`cloner`]: Template cloning (`TemplateCloner`)
//! - [`archive`]: Single-entry tar archives
//! - [`file`]: In-container file transactions (`ContentModifier`, `JsonListAppend`)
//! - [`logs`]: Log scanning and dumping
//! - [`network`]: Network-level operations (`NetworkOrchestrator`)
//!
//! # Architecture
//!
//! ```text
//! start_network ──spawn per node──▶ start_node ──spawn×2──▶ TemplateCloner
//!                                                              │ create
//!                 NetworkResources ◀──── OnCreate ─────────────┤
//!                                                              │ start
//!                                                              ▼
//!                                                     wait_until_usable
//! ```

pub mod archive;
pub mod attributes;
pub mod catalog;
pub mod cloner;
pub mod config;
pub mod docker;
pub mod error;
pub mod file;
pub mod health;
pub mod ledger;
pub mod logs;
pub mod network;
pub mod state;
pub mod types;

// --- Public API Re-exports ---

// Orchestrator
pub use network::{NetworkOrchestrator, NetworkStatus};

// Configuration
pub use config::{OrchestratorConfig, OrchestratorConfigBuilder};

// Error
pub use error::OrchestratorError;

// Docker API
pub use docker::{BollardDockerClient, DockerClient};

// Provisioning
pub use attributes::{GethArgs, NodeAttributes};
pub use catalog::{ImageCatalog, QuorumImage};
pub use cloner::{OnCreate, TemplateCloner};
pub use ledger::NetworkResources;

// Health
pub use health::{WaitOutcome, WaitPolicy};
pub use state::BasicContainerState;

// Files
pub use file::{ContentModifier, JsonListAppend};

// Types
pub use types::{ContainerDetails, ContainerSpec, DaemonInfo, NetworkAttachment};
