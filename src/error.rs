//! Error types for the watchface simulation

use thiserror::Error;

/// Simulation errors
///
/// `PoolExhausted` and `LayoutRegeneration` are recoverable: the simulator
/// handles them internally (skip-and-retry, fallback layout) and reports them
/// as events. The rest surface at API boundaries.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("pool {pool} exhausted: no free particle")]
    PoolExhausted { pool: usize },

    #[error("invalid time override {hour}:{minute}:{second} (expected 0-23:0-59:0-59)")]
    InvalidTimeOverride { hour: u32, minute: u32, second: u32 },

    #[error("malformed time string: {0:?}")]
    MalformedTime(String),

    #[error("layout regeneration failed: {reason}")]
    LayoutRegeneration { reason: String },

    #[error("cannot {action} a particle in state {from}")]
    InvalidTransition {
        action: &'static str,
        from: &'static str,
    },

    #[error("particle handle does not belong to pool {pool}")]
    UnknownHandle { pool: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Recoverable errors never stop the frame loop
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SimError::PoolExhausted { .. } | SimError::LayoutRegeneration { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
