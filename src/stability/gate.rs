//! Consecutive-match gate.

use crate::decode::DecodeCandidate;

/// Result of observing one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Not (yet) confirmed.
    Pending,
    /// The value has been read the required number of times in a row.
    Confirmed(String),
}

impl Verdict {
    /// Returns true for [`Verdict::Confirmed`].
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// Gate state: the last valid value and how many times in a row it was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StabilityState {
    /// Last valid value observed.
    pub last_value: String,
    /// Consecutive observations of `last_value`.
    pub consecutive_hits: u32,
}

/// Confirms a value after it is read on consecutive attempts.
///
/// Invalid candidates leave the state untouched. A valid candidate equal
/// to the last value increments the hit count; any other valid candidate
/// replaces the last value and restarts the count at one. Once confirmed
/// the gate is latched and ignores further input until [`reset`].
///
/// [`reset`]: StabilityGate::reset
#[derive(Debug, Clone)]
pub struct StabilityGate {
    state: StabilityState,
    required_hits: u32,
    confirmed: bool,
}

impl StabilityGate {
    /// Two consecutive identical reads.
    pub const DEFAULT_REQUIRED_HITS: u32 = 2;

    /// Creates a gate requiring `required_hits` consecutive reads.
    pub fn new(required_hits: u32) -> Self {
        Self {
            state: StabilityState::default(),
            required_hits: required_hits.max(1),
            confirmed: false,
        }
    }

    /// Feeds one candidate into the gate.
    pub fn observe(&mut self, candidate: &DecodeCandidate) -> Verdict {
        if self.confirmed {
            return Verdict::Confirmed(self.state.last_value.clone());
        }
        if !candidate.is_valid() {
            tracing::trace!(value = candidate.value(), "Ignoring invalid candidate");
            return Verdict::Pending;
        }

        if candidate.value() == self.state.last_value {
            self.state.consecutive_hits += 1;
        } else {
            if self.state.consecutive_hits > 0 {
                tracing::debug!(
                    previous = %self.state.last_value,
                    current = candidate.value(),
                    "Candidate changed, restarting count"
                );
            }
            self.state.last_value = candidate.value().to_owned();
            self.state.consecutive_hits = 1;
        }

        tracing::debug!(
            value = %self.state.last_value,
            hits = self.state.consecutive_hits,
            required = self.required_hits,
            "Candidate observed"
        );

        if self.state.consecutive_hits >= self.required_hits {
            self.confirmed = true;
            tracing::info!(value = %self.state.last_value, "Read confirmed");
            Verdict::Confirmed(self.state.last_value.clone())
        } else {
            Verdict::Pending
        }
    }

    /// Current state.
    pub fn state(&self) -> &StabilityState {
        &self.state
    }

    /// Returns true once a value has been confirmed.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Returns the gate to its initial state.
    pub fn reset(&mut self) {
        self.state = StabilityState::default();
        self.confirmed = false;
    }
}

impl Default for StabilityGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REQUIRED_HITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(gate: &mut StabilityGate, values: &[&str]) -> Vec<Verdict> {
        values
            .iter()
            .map(|v| gate.observe(&DecodeCandidate::from_raw(v)))
            .collect()
    }

    #[test]
    fn test_confirms_on_second_identical_read() {
        let mut gate = StabilityGate::default();
        let verdicts = feed(&mut gate, &["9780131103627", "9780131103627"]);
        assert_eq!(
            verdicts,
            vec![
                Verdict::Pending,
                Verdict::Confirmed("9780131103627".to_owned())
            ]
        );
    }

    #[test]
    fn test_mismatch_restarts_count() {
        let mut gate = StabilityGate::default();
        let verdicts = feed(&mut gate, &["9780131103627", "9780000000000"]);
        assert!(verdicts.iter().all(|v| !v.is_confirmed()));
        assert_eq!(
            gate.state(),
            &StabilityState {
                last_value: "9780000000000".to_owned(),
                consecutive_hits: 1
            }
        );

        assert_eq!(
            feed(&mut gate, &["9780000000000"]),
            vec![Verdict::Confirmed("9780000000000".to_owned())]
        );
    }

    #[test]
    fn test_invalid_inputs_never_confirm() {
        let mut gate = StabilityGate::default();
        assert!(feed(&mut gate, &["", "", ""]).iter().all(|v| !v.is_confirmed()));
        assert!(feed(&mut gate, &["12345"; 10]).iter().all(|v| !v.is_confirmed()));
        assert_eq!(gate.state(), &StabilityState::default());
    }

    #[test]
    fn test_invalid_between_matches_keeps_state() {
        let mut gate = StabilityGate::default();
        let verdicts = feed(&mut gate, &["0131103628", "123", "0131103628"]);
        assert_eq!(verdicts[2], Verdict::Confirmed("0131103628".to_owned()));
    }

    #[test]
    fn test_latched_after_confirmation() {
        let mut gate = StabilityGate::default();
        feed(&mut gate, &["9780131103627", "9780131103627"]);
        assert!(gate.is_confirmed());

        let after = feed(&mut gate, &["9780306406157"]);
        assert_eq!(after, vec![Verdict::Confirmed("9780131103627".to_owned())]);
        assert_eq!(gate.state().consecutive_hits, 2);

        gate.reset();
        assert!(!gate.is_confirmed());
        assert_eq!(gate.state(), &StabilityState::default());
    }

    #[test]
    fn test_custom_requirement() {
        let mut gate = StabilityGate::new(3);
        let verdicts = feed(&mut gate, &["9780131103627"; 3]);
        assert!(!verdicts[1].is_confirmed());
        assert!(verdicts[2].is_confirmed());
    }
}
