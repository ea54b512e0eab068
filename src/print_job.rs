// src/print_job.rs
use crate::config::MoveRequest;
use crate::motion::coordinates::WorldCoordinates;
use crate::motion::planner::MotionPlanner;
use crate::motion::MotionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub requested: usize,
    pub enqueued: usize,
    /// Moves too small to produce a block.
    pub rejected: usize,
}

/// Feeds decoded moves through the planner in order.
#[derive(Debug, Clone)]
pub struct PrintJob {
    moves: Vec<MoveRequest>,
    feedrate: f64,
}

impl PrintJob {
    pub fn new(moves: Vec<MoveRequest>, default_feedrate: f64) -> Self {
        Self {
            moves,
            feedrate: default_feedrate,
        }
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Runs every move, blocking on a full motion buffer. Stops at the first error.
    pub fn run<const N: usize>(&mut self, planner: &mut MotionPlanner<N>) -> Result<JobSummary, MotionError> {
        let mut summary = JobSummary::default();
        for request in &self.moves {
            let current = planner.world_position();
            let target = WorldCoordinates::new(
                request.x.unwrap_or(current.x),
                request.y.unwrap_or(current.y),
                request.z.unwrap_or(current.z),
                request.e,
            );
            if let Some(feedrate) = request.feedrate {
                self.feedrate = feedrate;
            }

            summary.requested += 1;
            if planner.add_world_move(&target, self.feedrate)? {
                summary.enqueued += 1;
            } else {
                summary.rejected += 1;
            }
        }
        tracing::info!(
            "Print job finished: {} moves, {} enqueued, {} rejected",
            summary.requested,
            summary.enqueued,
            summary.rejected
        );
        Ok(summary)
    }
}
