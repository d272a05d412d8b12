//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 오케스트레이터는 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않은 경우 모든 호출은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `qnet_`
//! - 모듈명: `orchestrator_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(qnet_core::metrics::ORCHESTRATOR_CONTAINERS_STARTED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 노드 이름 레이블 키
pub const LABEL_NODE: &str = "node";

/// 결과 레이블 키 (healthy, dead, exhausted)
pub const LABEL_OUTCOME: &str = "outcome";

/// 파일 트랜잭션 종류 레이블 키 (modify, write)
pub const LABEL_OPERATION: &str = "operation";

// ─── Orchestrator 메트릭 ───────────────────────────────────────────

/// Orchestrator: 템플릿에서 복제되어 기동된 컨테이너 수 (counter)
pub const ORCHESTRATOR_CONTAINERS_STARTED_TOTAL: &str =
    "qnet_orchestrator_containers_started_total";

/// Orchestrator: 정지 후 삭제된 컨테이너 수 (counter)
pub const ORCHESTRATOR_CONTAINERS_REMOVED_TOTAL: &str =
    "qnet_orchestrator_containers_removed_total";

/// Orchestrator: healthy에 도달하지 못한 대기 수 (counter, label: outcome)
pub const ORCHESTRATOR_WAIT_FAILURES_TOTAL: &str = "qnet_orchestrator_wait_failures_total";

/// Orchestrator: 컨테이너 내부 파일 트랜잭션 수 (counter, label: operation)
pub const ORCHESTRATOR_FILE_TRANSACTIONS_TOTAL: &str =
    "qnet_orchestrator_file_transactions_total";

/// Orchestrator: 로그 패턴 매칭 성공 수 (counter)
pub const ORCHESTRATOR_LOG_MATCHES_TOTAL: &str = "qnet_orchestrator_log_matches_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::describe_counter;

    describe_counter!(
        ORCHESTRATOR_CONTAINERS_STARTED_TOTAL,
        "Containers cloned from a template and started"
    );
    describe_counter!(
        ORCHESTRATOR_CONTAINERS_REMOVED_TOTAL,
        "Containers stopped and removed during teardown"
    );
    describe_counter!(
        ORCHESTRATOR_WAIT_FAILURES_TOTAL,
        "Health waits that ended dead or exhausted"
    );
    describe_counter!(
        ORCHESTRATOR_FILE_TRANSACTIONS_TOTAL,
        "Single-file archive transactions inside containers"
    );
    describe_counter!(
        ORCHESTRATOR_LOG_MATCHES_TOTAL,
        "Log streams in which the requested pattern was found"
    );
}
