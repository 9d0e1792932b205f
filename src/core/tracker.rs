use crate::core::types::BlockRange;

/// Hole-detection state machine.
///
/// Consumes discrete `(position, is_complete)` observations in ascending
/// position order and condenses them into closed, inclusive range events.
/// Two notions of valid are tracked independently:
///
/// - *present*: the position was observed at all (positional holes), and
/// - *complete*: the position was observed with every required column
///   populated (missing-column holes).
///
/// Convention: `expected_next` always means "the next position we have not
/// yet confirmed", so a positional hole spans
/// `[expected_next, position - step]`. The tracker performs no I/O and never
/// blocks.
pub struct SequenceTracker {
    step: u64,
    /// Force a `Valid` checkpoint event every this many observations so
    /// multi-minute scans produce incremental feedback.
    checkpoint_every: u64,

    started: bool,
    expected_next: u64,
    current_range_start: u64,
    last_seen: u64,
    /// Next position not yet confirmed complete.
    complete_next: u64,
    observations: u64,
    skipped_out_of_order: u64,
}

impl SequenceTracker {
    pub fn new(step: u64, checkpoint_every: u64) -> Self {
        Self {
            step: step.max(1),
            checkpoint_every: checkpoint_every.max(1),
            started: false,
            expected_next: 0,
            current_range_start: 0,
            last_seen: 0,
            complete_next: 0,
            observations: 0,
            skipped_out_of_order: 0,
        }
    }

    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn skipped_out_of_order(&self) -> u64 {
        self.skipped_out_of_order
    }

    /// Feed one observation. Returns zero or more range events closed out by
    /// this position.
    pub fn observe(&mut self, position: u64, is_complete: bool) -> Vec<BlockRange> {
        let mut events = Vec::new();

        if !self.started {
            self.started = true;
            self.observations = 1;
            self.current_range_start = position;
            self.expected_next = position + self.step;
            self.last_seen = position;
            self.complete_next = if is_complete {
                position + self.step
            } else {
                position
            };
            return events;
        }

        // Duplicate or out-of-order input; never emit a reversed range.
        if position < self.expected_next {
            self.skipped_out_of_order += 1;
            return events;
        }

        self.observations += 1;

        if position > self.expected_next {
            // Close the open valid run, then report the gap. The valid run is
            // empty right after a checkpoint; skip it rather than underflow.
            if let Some(valid_end) = self.expected_next.checked_sub(self.step)
                && self.current_range_start <= valid_end
            {
                events.push(BlockRange::valid(
                    clamp_u32(self.current_range_start),
                    clamp_u32(valid_end),
                    "valid range",
                ));
            }
            let hole_end = position.saturating_sub(self.step).max(self.expected_next);
            events.push(BlockRange::hole(
                clamp_u32(self.expected_next),
                clamp_u32(hole_end),
                "hole found",
            ));
            self.current_range_start = position;
        }

        // Completeness lags presence: a complete row after unconfirmed ones
        // means those rows exist but miss required columns.
        if is_complete {
            if position > self.complete_next {
                let hole_end = position.saturating_sub(self.step).max(self.complete_next);
                events.push(BlockRange::hole(
                    clamp_u32(self.complete_next),
                    clamp_u32(hole_end),
                    "missing column(s)",
                ));
            }
            self.complete_next = position + self.step;
        }

        self.expected_next = position + self.step;
        self.last_seen = position;

        if self.observations % self.checkpoint_every == 0 {
            events.push(BlockRange::valid(
                clamp_u32(self.current_range_start),
                clamp_u32(position),
                "valid range",
            ));
            self.current_range_start = position + self.step;
        }

        events
    }

    /// Close out the trailing open range once the observation source is
    /// exhausted. Call exactly once.
    pub fn finalize(&mut self) -> Vec<BlockRange> {
        let mut events = Vec::new();
        if !self.started {
            return events;
        }

        if self.current_range_start <= self.last_seen {
            events.push(BlockRange::valid(
                clamp_u32(self.current_range_start),
                clamp_u32(self.last_seen),
                "valid range",
            ));
        }

        // End-of-stream completeness lag: rows past complete_next were seen
        // but never confirmed complete.
        if self.complete_next <= self.last_seen {
            events.push(BlockRange::hole(
                clamp_u32(self.complete_next),
                clamp_u32(self.last_seen),
                "missing column(s)",
            ));
        }

        events
    }
}

fn clamp_u32(value: u64) -> u32 {
    value.min(u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RangeStatus;

    fn feed(tracker: &mut SequenceTracker, positions: &[u64]) -> Vec<BlockRange> {
        let mut events = Vec::new();
        for &position in positions {
            events.extend(tracker.observe(position, true));
        }
        events.extend(tracker.finalize());
        events
    }

    #[test]
    fn contiguous_sequence_emits_single_valid_range() {
        let mut tracker = SequenceTracker::new(100, 1_000_000);
        let events = feed(&mut tracker, &[0, 100, 200, 300, 400]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0], BlockRange::valid(0, 400, "valid range"));
    }

    #[test]
    fn single_gap_reports_hole_between_valid_ranges() {
        let mut tracker = SequenceTracker::new(100, 1_000_000);
        let events = feed(&mut tracker, &[0, 100, 200, 400, 500]);

        assert_eq!(
            events,
            vec![
                BlockRange::valid(0, 200, "valid range"),
                BlockRange::hole(300, 300, "hole found"),
                BlockRange::valid(400, 500, "valid range"),
            ]
        );
    }

    #[test]
    fn wide_gap_spans_all_missing_positions() {
        let mut tracker = SequenceTracker::new(100, 1_000_000);
        let events = feed(&mut tracker, &[0, 100, 500]);

        assert_eq!(
            events,
            vec![
                BlockRange::valid(0, 100, "valid range"),
                BlockRange::hole(200, 400, "hole found"),
                BlockRange::valid(500, 500, "valid range"),
            ]
        );
    }

    #[test]
    fn checkpoints_fire_on_cadence_without_overlap() {
        let mut tracker = SequenceTracker::new(1, 3);
        let events = feed(&mut tracker, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

        let checkpoints: Vec<&BlockRange> = events
            .iter()
            .filter(|e| e.status == RangeStatus::Valid)
            .collect();
        // 3 forced checkpoints plus the finalize event.
        assert_eq!(checkpoints.len(), 4);
        assert_eq!(*checkpoints[0], BlockRange::valid(0, 2, "valid range"));
        assert_eq!(*checkpoints[1], BlockRange::valid(3, 5, "valid range"));
        assert_eq!(*checkpoints[2], BlockRange::valid(6, 8, "valid range"));
        assert_eq!(*checkpoints[3], BlockRange::valid(9, 9, "valid range"));
        assert!(events.iter().all(|e| e.status == RangeStatus::Valid));
    }

    #[test]
    fn incomplete_position_reports_missing_columns_not_positional_hole() {
        let mut tracker = SequenceTracker::new(1, 1_000_000);
        let mut events = Vec::new();
        events.extend(tracker.observe(0, true));
        events.extend(tracker.observe(1, false));
        events.extend(tracker.observe(2, true));
        events.extend(tracker.finalize());

        assert_eq!(
            events,
            vec![
                BlockRange::hole(1, 1, "missing column(s)"),
                BlockRange::valid(0, 2, "valid range"),
            ]
        );
    }

    #[test]
    fn trailing_incomplete_rows_reported_at_finalize() {
        let mut tracker = SequenceTracker::new(1, 1_000_000);
        let mut events = Vec::new();
        events.extend(tracker.observe(0, true));
        events.extend(tracker.observe(1, false));
        events.extend(tracker.observe(2, false));
        events.extend(tracker.finalize());

        assert_eq!(
            events,
            vec![
                BlockRange::valid(0, 2, "valid range"),
                BlockRange::hole(1, 2, "missing column(s)"),
            ]
        );
    }

    #[test]
    fn first_observation_incomplete_is_covered_by_completeness_hole() {
        let mut tracker = SequenceTracker::new(1, 1_000_000);
        let mut events = Vec::new();
        events.extend(tracker.observe(5, false));
        events.extend(tracker.observe(6, true));
        events.extend(tracker.finalize());

        assert_eq!(
            events,
            vec![
                BlockRange::hole(5, 5, "missing column(s)"),
                BlockRange::valid(5, 6, "valid range"),
            ]
        );
    }

    #[test]
    fn out_of_order_positions_are_skipped_silently() {
        let mut tracker = SequenceTracker::new(1, 1_000_000);
        let mut events = Vec::new();
        events.extend(tracker.observe(10, true));
        events.extend(tracker.observe(11, true));
        events.extend(tracker.observe(11, true));
        events.extend(tracker.observe(9, true));
        events.extend(tracker.observe(12, true));
        events.extend(tracker.finalize());

        assert_eq!(events, vec![BlockRange::valid(10, 12, "valid range")]);
        assert_eq!(tracker.skipped_out_of_order(), 2);
        assert_eq!(tracker.observations(), 3);
    }

    #[test]
    fn hole_right_after_checkpoint_skips_empty_valid_range() {
        let mut tracker = SequenceTracker::new(1, 2);
        let mut events = Vec::new();
        events.extend(tracker.observe(0, true));
        events.extend(tracker.observe(1, true)); // checkpoint [0, 1]
        events.extend(tracker.observe(5, true)); // gap with no open valid run
        events.extend(tracker.finalize());

        assert_eq!(
            events,
            vec![
                BlockRange::valid(0, 1, "valid range"),
                BlockRange::hole(2, 4, "hole found"),
                BlockRange::valid(5, 5, "valid range"),
            ]
        );
    }

    #[test]
    fn sequence_starting_at_zero_never_underflows() {
        let mut tracker = SequenceTracker::new(100, 1_000_000);
        let events = feed(&mut tracker, &[0]);
        assert_eq!(events, vec![BlockRange::valid(0, 0, "valid range")]);
    }

    #[test]
    fn empty_stream_finalizes_to_nothing() {
        let mut tracker = SequenceTracker::new(100, 10);
        assert!(tracker.finalize().is_empty());
    }
}
