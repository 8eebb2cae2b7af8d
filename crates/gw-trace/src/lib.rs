//! `gw-trace` — CSV trajectory recording.
//!
//! A [`TraceRecorder`] implements the simulator's step-observer trait and
//! appends two CSV files as the world runs:
//!
//! - `agent_steps.csv` — one row per agent per committed turn
//!   (`time, agent_id, x, y, direction, active, collected counts`)
//! - `step_summaries.csv` — one row per committed turn
//!   (`time, agent_count`)
//!
//! Recording happens on the thread that committed the step; the writers sit
//! behind a mutex so concurrent turn-closers serialize cleanly.

pub mod recorder;

#[cfg(test)]
mod tests;

pub use recorder::TraceRecorder;

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type TraceResult<T> = Result<T, TraceError>;
