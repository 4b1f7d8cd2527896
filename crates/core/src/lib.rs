#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{CloudError, ConfigError, QosVerifyError, ScenarioError};

// 설정
pub use config::QosVerifyConfig;

// 도메인 타입
pub use types::{
    AllocationCandidates, Allocations, CreatedServer, Direction, Flavor, Microversion,
    MinimumBandwidthRule, Network, Port, QosPolicy, ResourceRequest, Router, Server,
    ServerFault, ServerStatus, Subnet,
};
