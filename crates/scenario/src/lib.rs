#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: 시나리오 에러 (`ScenarioError`)
//! - [`waiter`]: 서버 상태 폴링 (`ServerWaiter`)
//! - [`cleanup`]: LIFO 리소스 정리 (`CleanupStack`, `CleanupAction`)
//! - [`preconditions`]: skip 조건과 할당 후보 검사
//! - [`fixture`]: 프로바이더 네트워크와 QoS 정책 (`Fixture`)
//! - [`assertions`]: 할당 일관성 검증
//! - [`scenarios`]: basic / migrate / resize 시나리오 (`ScenarioKind`)
//! - [`runner`]: 실행과 결과 집계 (`ScenarioRunner`, `RunReport`)

pub mod assertions;
pub mod cleanup;
pub mod error;
pub mod fixture;
pub mod preconditions;
pub mod runner;
pub mod scenarios;
pub mod waiter;

// --- Public API Re-exports ---

// Runner
pub use runner::{RunReport, ScenarioOutcome, ScenarioResult, ScenarioRunner, ScenarioRunnerBuilder};

// Scenarios
pub use scenarios::{ScenarioContext, ScenarioKind};

// Building blocks
pub use cleanup::{CleanupAction, CleanupFailure, CleanupStack};
pub use fixture::{Fixture, PolicyWithRule};
pub use preconditions::{
    check_allocation_possible, check_extensions, config_skip_reason, missing_extensions,
};
pub use waiter::ServerWaiter;

// Error
pub use error::ScenarioError;
