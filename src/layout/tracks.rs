/// Greedy first-fit packing of half-open intervals into tracks.
///
/// Intervals are placed in arrival order on the lowest-index track whose
/// next free position is at or before the interval start. The result is not
/// an optimal colouring: out-of-order input can use more tracks than needed.
#[derive(Debug, Clone, Default)]
pub struct TrackAssigner {
    /// Next free position per track
    next_free: Vec<u64>,
}

impl TrackAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `[start, end)` and return its track index
    pub fn assign(&mut self, start: u64, end: u64) -> usize {
        if let Some(track) = self.next_free.iter().position(|&free| free <= start) {
            self.next_free[track] = end;
            return track;
        }
        self.next_free.push(end);
        self.next_free.len() - 1
    }

    /// Number of tracks used so far
    pub fn track_count(&self) -> usize {
        self.next_free.len()
    }

    pub fn clear(&mut self) {
        self.next_free.clear();
    }
}

/// Assign tracks to a batch of intervals in the given order
pub fn assign_tracks(intervals: &[(u64, u64)]) -> (Vec<usize>, usize) {
    let mut assigner = TrackAssigner::new();
    let tracks = intervals
        .iter()
        .map(|&(start, end)| assigner.assign(start, end))
        .collect();
    (tracks, assigner.track_count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuses_track_when_free() {
        let (tracks, count) = assign_tracks(&[(0, 10), (5, 15), (12, 20)]);
        assert_eq!(tracks, vec![0, 1, 0]);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_first_fit_is_not_optimal() {
        let (tracks, count) = assign_tracks(&[(0, 100), (1, 2), (3, 4)]);
        assert_eq!(tracks, vec![0, 1, 2]);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_adjacent_intervals_share_track() {
        let (tracks, count) = assign_tracks(&[(0, 10), (10, 20), (20, 30)]);
        assert_eq!(tracks, vec![0, 0, 0]);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_first_fit_prefers_lowest_index() {
        // Both tracks 0 and 1 are free for the last interval; track 0 wins
        let (tracks, _) = assign_tracks(&[(0, 5), (0, 3), (6, 8)]);
        assert_eq!(tracks, vec![0, 1, 0]);
    }

    #[test]
    fn test_zero_length_intervals() {
        let (tracks, count) = assign_tracks(&[(5, 5), (5, 5), (0, 10)]);
        assert_eq!(tracks, vec![0, 0, 1]);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_empty_batch() {
        let (tracks, count) = assign_tracks(&[]);
        assert!(tracks.is_empty());
        assert_eq!(count, 0);
    }

    #[test]
    fn test_clear_resets() {
        let mut assigner = TrackAssigner::new();
        assigner.assign(0, 10);
        assigner.assign(0, 10);
        assert_eq!(assigner.track_count(), 2);
        assigner.clear();
        assert_eq!(assigner.assign(0, 10), 0);
    }

    mod properties {
        use super::super::*;
        use proptest::prelude::*;

        /// Up to 200 intervals with starts in 0..500 and lengths in 0..60
        fn intervals_strategy() -> impl Strategy<Value = Vec<(u64, u64)>> {
            prop::collection::vec((0u64..500, 0u64..60), 0..200)
                .prop_map(|v| v.into_iter().map(|(start, len)| (start, start + len)).collect())
        }

        proptest! {
            /// Property: intervals sharing a track never overlap
            #[test]
            fn prop_no_overlap_within_track(intervals in intervals_strategy()) {
                let (tracks, count) = assign_tracks(&intervals);
                prop_assert_eq!(tracks.len(), intervals.len());

                for track in 0..count {
                    let mut members: Vec<_> = intervals
                        .iter()
                        .zip(&tracks)
                        .filter(|(_, &t)| t == track)
                        .map(|(&iv, _)| iv)
                        .collect();
                    members.sort_unstable();
                    for pair in members.windows(2) {
                        prop_assert!(pair[0].1 <= pair[1].0, "overlap on track {}: {:?}", track, pair);
                    }
                }
            }

            /// Property: every track index below the count is used
            #[test]
            fn prop_track_count_is_tight(intervals in intervals_strategy()) {
                let (tracks, count) = assign_tracks(&intervals);
                prop_assert_eq!(tracks.iter().max().map_or(0, |&t| t + 1), count);
            }
        }
    }
}
