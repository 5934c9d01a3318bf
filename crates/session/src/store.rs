use crate::ids::TurnId;
use crate::turn::{Turn, TurnPatch};

/// Ordered timeline of turns; the single source of truth for rendering.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    turns: Vec<Turn>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.id == id)
    }

    pub fn contains(&self, id: TurnId) -> bool {
        self.get(id).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.turns.iter().filter(|turn| turn.pending).count()
    }

    pub fn pending_turn(&self) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.pending)
    }

    /// Appends turns in order.
    ///
    /// A second pending turn is demoted to settled, and a turn whose id is already
    /// present is dropped; both keep the store invariants intact.
    pub fn append(&mut self, turns: impl IntoIterator<Item = Turn>) {
        for mut turn in turns {
            if self.contains(turn.id) {
                tracing::warn!(turn_id = %turn.id, "dropping turn with duplicate id");
                continue;
            }

            if turn.pending && self.pending_count() > 0 {
                tracing::warn!(turn_id = %turn.id, "store already holds a pending turn");
                turn.pending = false;
            }

            self.turns.push(turn);
        }
    }

    /// Replaces the whole timeline.
    pub fn replace(&mut self, turns: Vec<Turn>) {
        self.turns.clear();
        self.append(turns);
    }

    /// Applies `patch` to the turn with `id`. Missing ids are a no-op and return `false`.
    pub fn update_by_id(&mut self, id: TurnId, patch: TurnPatch) -> bool {
        let Some(turn) = self.turns.iter_mut().find(|turn| turn.id == id) else {
            tracing::debug!(turn_id = %id, "ignoring update for a turn no longer in the store");
            return false;
        };

        turn.apply(patch);
        true
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
