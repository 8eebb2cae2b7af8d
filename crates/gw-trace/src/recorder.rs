//! The recorder.

use std::fs::File;
use std::path::Path;

use csv::Writer;
use parking_lot::Mutex;

use gw_sim::{StepEvent, StepObserver};

use crate::TraceResult;

struct Writers {
    agent_steps: Writer<File>,
    summaries:   Writer<File>,
}

/// Writes one row per agent per step plus a per-step summary.
///
/// Register with [`gw_sim::Simulator::add_observer`]; CSV errors after
/// construction are swallowed (a dead disk must not stall the world), but
/// the first failure is remembered and reported by [`TraceRecorder::finish`].
pub struct TraceRecorder {
    writers: Mutex<Writers>,
    failed:  Mutex<Option<csv::Error>>,
}

impl TraceRecorder {
    /// Create (or truncate) `agent_steps.csv` and `step_summaries.csv` in
    /// `dir` and write the header rows.
    pub fn create(dir: &Path) -> TraceResult<TraceRecorder> {
        let mut agent_steps = Writer::from_path(dir.join("agent_steps.csv"))?;
        agent_steps.write_record([
            "time",
            "agent_id",
            "x",
            "y",
            "direction",
            "active",
            "collected",
        ])?;

        let mut summaries = Writer::from_path(dir.join("step_summaries.csv"))?;
        summaries.write_record(["time", "agent_count"])?;

        Ok(TraceRecorder {
            writers: Mutex::new(Writers { agent_steps, summaries }),
            failed:  Mutex::new(None),
        })
    }

    /// Flush both files and surface the first recording error, if any.
    pub fn finish(&self) -> TraceResult<()> {
        if let Some(error) = self.failed.lock().take() {
            return Err(error.into());
        }
        let mut writers = self.writers.lock();
        writers.agent_steps.flush()?;
        writers.summaries.flush()?;
        Ok(())
    }

    fn record(&self, event: &StepEvent) -> Result<(), csv::Error> {
        let mut writers = self.writers.lock();
        for agent in &event.agents {
            let collected = agent
                .collected_counts
                .iter()
                .map(|count| count.to_string())
                .collect::<Vec<_>>()
                .join(";");
            writers.agent_steps.write_record(&[
                event.time.0.to_string(),
                agent.id.0.to_string(),
                agent.position.x.to_string(),
                agent.position.y.to_string(),
                agent.direction.to_string(),
                (agent.active as u8).to_string(),
                collected,
            ])?;
        }
        writers.summaries.write_record(&[
            event.time.0.to_string(),
            event.agents.len().to_string(),
        ])?;
        Ok(())
    }
}

impl StepObserver for TraceRecorder {
    fn on_step(&self, event: &StepEvent) {
        if let Err(error) = self.record(event) {
            let mut failed = self.failed.lock();
            if failed.is_none() {
                *failed = Some(error);
            }
        }
    }
}
