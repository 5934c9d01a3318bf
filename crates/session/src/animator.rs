use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::events::{SessionEvent, ThinkingTick};
use crate::ids::TurnId;

pub const DEFAULT_THINKING_CADENCE: Duration = Duration::from_millis(240);
const MAX_DOTS: usize = 3;

/// `base` followed by `dots` trailing dots.
pub fn thinking_frame(base: &str, dots: usize) -> String {
    format!("{base}{}", ".".repeat(dots.min(MAX_DOTS)))
}

/// Owned handle of one running cycle. Dropping it cancels the cycle.
#[derive(Debug)]
pub struct AnimatorHandle {
    turn_id: TurnId,
    generation: u64,
    task: JoinHandle<()>,
}

impl AnimatorHandle {
    pub fn turn_id(&self) -> TurnId {
        self.turn_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for AnimatorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Rewrites one pending turn's text on a fixed cadence until stopped.
///
/// Ticks are posted to the session event channel; the session applies them only
/// while `accepts` holds, so a tick queued before `stop` is dropped.
pub struct ThinkingAnimator {
    cadence: Duration,
    events: mpsc::UnboundedSender<SessionEvent>,
    handle: Option<AnimatorHandle>,
    next_generation: u64,
}

impl ThinkingAnimator {
    pub fn new(cadence: Duration, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            cadence,
            events,
            handle: None,
            next_generation: 1,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn active_turn(&self) -> Option<TurnId> {
        self.handle.as_ref().map(AnimatorHandle::turn_id)
    }

    /// Starts a new cycle on `turn_id`, stopping any previous one.
    pub fn start(&mut self, turn_id: TurnId, base_text: impl Into<String>) {
        self.stop();

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let task = tokio::spawn(run_cycle(
            turn_id,
            generation,
            base_text.into(),
            self.cadence,
            self.events.clone(),
        ));

        tracing::debug!(turn_id = %turn_id, generation, "thinking animation started");
        self.handle = Some(AnimatorHandle {
            turn_id,
            generation,
            task,
        });
    }

    /// Cancels the running cycle; a no-op when idle.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!(
                turn_id = %handle.turn_id,
                generation = handle.generation,
                "thinking animation stopped"
            );
        }
    }

    pub fn accepts(&self, tick: &ThinkingTick) -> bool {
        matches!(
            &self.handle,
            Some(handle) if handle.turn_id == tick.turn_id && handle.generation == tick.generation
        )
    }
}

impl Drop for ThinkingAnimator {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_cycle(
    turn_id: TurnId,
    generation: u64,
    base_text: String,
    cadence: Duration,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + cadence, cadence);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut dots = 0;

    loop {
        interval.tick().await;
        dots = (dots + 1) % (MAX_DOTS + 1);

        let tick = ThinkingTick {
            turn_id,
            generation,
            text: thinking_frame(&base_text, dots),
        };
        if events.send(SessionEvent::Thinking(tick)).is_err() {
            return;
        }
    }
}
