//! Adaptive per-user landmark baseline and tic suppression.
//!
//! Every (user, hand side, hand ordinal, landmark index) channel keeps an
//! exponentially weighted moving average of where that point usually sits.
//! The ordinal counts hands of the same side within one frame, so two hands
//! both reported as right never share channels. A sample that jumps further
//! than [`defaults::TIC_THRESHOLD`] from the freshly updated average in x or y
//! is treated as an involuntary tic and snapped back to the average. The average itself always moves toward the observation, so slow
//! genuine drift is followed rather than frozen.

use crate::defaults;
use crate::error::{Result, SignlensError};
use crate::landmarks::{Hand, HandSide, LandmarkPoint};
use crate::user::UserKey;
use std::collections::HashMap;
use tracing::warn;

/// Per-user moving averages, one per landmark channel.
///
/// Channels are grouped per side, then per hand ordinal within that side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    left: Vec<Vec<LandmarkPoint>>,
    right: Vec<Vec<LandmarkPoint>>,
    count: u64,
}

impl Baseline {
    /// Current average for a channel of the first hand on `side`, if it has
    /// been observed.
    pub fn channel(&self, side: HandSide, index: usize) -> Option<LandmarkPoint> {
        self.channel_at(side, 0, index)
    }

    /// Current average for a channel of the `ordinal`-th hand on `side`.
    pub fn channel_at(&self, side: HandSide, ordinal: usize, index: usize) -> Option<LandmarkPoint> {
        self.side(side)
            .get(ordinal)
            .and_then(|channels| channels.get(index))
            .copied()
    }

    /// Number of filter calls that contributed samples.
    pub fn sample_count(&self) -> u64 {
        self.count
    }

    /// Distinct channels observed so far.
    pub fn channel_count(&self) -> usize {
        self.left.iter().chain(&self.right).map(Vec::len).sum()
    }

    fn side(&self, side: HandSide) -> &Vec<Vec<LandmarkPoint>> {
        match side {
            HandSide::Left => &self.left,
            HandSide::Right => &self.right,
        }
    }

    fn hand_mut(&mut self, side: HandSide, ordinal: usize) -> &mut Vec<LandmarkPoint> {
        let hands = match side {
            HandSide::Left => &mut self.left,
            HandSide::Right => &mut self.right,
        };
        if ordinal >= hands.len() {
            hands.resize_with(ordinal + 1, Vec::new);
        }
        &mut hands[ordinal]
    }
}

/// Result of filtering one frame's hands.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub hands: Vec<Hand>,
    /// True if any landmark in the frame was snapped to its baseline.
    pub filtered: bool,
}

/// Owns every user's baseline for the lifetime of a pipeline.
///
/// Not synchronized: exactly one inference slot calls [`BaselineFilter::filter`].
#[derive(Debug, Default)]
pub struct BaselineFilter {
    users: HashMap<UserKey, Baseline>,
}

impl BaselineFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one frame's hands against `user`'s baseline.
    ///
    /// An empty hand list is a no-op. A hand containing non-finite coordinates
    /// is passed through untouched and does not update the baseline.
    pub fn filter(&mut self, user: &UserKey, hands: Vec<Hand>) -> FilterOutcome {
        if hands.is_empty() {
            return FilterOutcome {
                hands,
                filtered: false,
            };
        }

        let baseline = self.users.entry(user.clone()).or_default();
        let mut filtered = false;
        let mut cleaned = Vec::with_capacity(hands.len());
        let (mut lefts, mut rights) = (0usize, 0usize);

        for hand in hands {
            let seen = match hand.side {
                HandSide::Left => &mut lefts,
                HandSide::Right => &mut rights,
            };
            let ordinal = *seen;
            *seen += 1;

            if let Err(e) = validate_hand(&hand) {
                warn!(user = %user, side = %hand.side, error = %e, "passing hand through unfiltered");
                cleaned.push(hand);
                continue;
            }

            let channels = baseline.hand_mut(hand.side, ordinal);
            let mut landmarks = Vec::with_capacity(hand.landmarks.len());
            for (index, observed) in hand.landmarks.into_iter().enumerate() {
                let updated = update_channel(channels, index, observed);
                if deviates(observed, updated) {
                    filtered = true;
                    landmarks.push(updated);
                } else {
                    landmarks.push(observed);
                }
            }
            cleaned.push(Hand::new(hand.side, landmarks));
        }

        baseline.count += 1;

        FilterOutcome {
            hands: cleaned,
            filtered,
        }
    }

    /// Baseline for `user`, if one has been created.
    pub fn baseline(&self, user: &UserKey) -> Option<&Baseline> {
        self.users.get(user)
    }

    /// Drop one user's baseline (e.g. on profile reset).
    pub fn evict(&mut self, user: &UserKey) -> Option<Baseline> {
        self.users.remove(user)
    }

    /// Drop every baseline.
    pub fn reset(&mut self) {
        self.users.clear();
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

/// Move the channel average toward `observed` and return the new average.
/// A channel seen for the first time starts at the observation.
fn update_channel(channels: &mut Vec<LandmarkPoint>, index: usize, observed: LandmarkPoint) -> LandmarkPoint {
    const ALPHA: f32 = defaults::BASELINE_ALPHA;

    if index >= channels.len() {
        // Landmarks arrive in index order, so this only ever appends.
        channels.resize(index + 1, observed);
        return observed;
    }

    let prev = channels[index];
    let updated = LandmarkPoint::new(
        prev.x * (1.0 - ALPHA) + observed.x * ALPHA,
        prev.y * (1.0 - ALPHA) + observed.y * ALPHA,
        prev.z * (1.0 - ALPHA) + observed.z * ALPHA,
    );
    channels[index] = updated;
    updated
}

/// z is tracked but never tested.
fn deviates(observed: LandmarkPoint, baseline: LandmarkPoint) -> bool {
    (observed.x - baseline.x).abs() > defaults::TIC_THRESHOLD
        || (observed.y - baseline.y).abs() > defaults::TIC_THRESHOLD
}

fn validate_hand(hand: &Hand) -> Result<()> {
    match hand.landmarks.iter().position(|p| !p.is_finite()) {
        Some(index) => Err(SignlensError::MalformedLandmarks {
            message: format!("landmark {index} has a non-finite coordinate"),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn point(x: f32, y: f32) -> LandmarkPoint {
        LandmarkPoint::new(x, y, 0.0)
    }

    fn right_hand(points: &[LandmarkPoint]) -> Hand {
        Hand::new(HandSide::Right, points.to_vec())
    }

    #[test]
    fn empty_hands_is_noop() {
        let mut filter = BaselineFilter::new();
        let alice = UserKey::new("alice");

        let outcome = filter.filter(&alice, Vec::new());

        assert!(outcome.hands.is_empty());
        assert!(!outcome.filtered);
        assert!(filter.baseline(&alice).is_none());
    }

    #[test]
    fn first_observation_seeds_baseline() {
        let mut filter = BaselineFilter::new();
        let alice = UserKey::new("alice");

        let outcome = filter.filter(&alice, vec![right_hand(&[point(0.3, 0.7)])]);

        assert!(!outcome.filtered);
        assert_eq!(outcome.hands[0].landmarks[0], point(0.3, 0.7));
        let baseline = filter.baseline(&alice).unwrap();
        assert_eq!(baseline.channel(HandSide::Right, 0), Some(point(0.3, 0.7)));
        assert_eq!(baseline.sample_count(), 1);
    }

    #[test]
    fn baseline_update_follows_ewma() {
        let mut filter = BaselineFilter::new();
        let user = UserKey::new("u");

        filter.filter(&user, vec![right_hand(&[point(0.5, 0.5)])]);
        filter.filter(&user, vec![right_hand(&[point(0.6, 0.4)])]);

        let b = filter
            .baseline(&user)
            .unwrap()
            .channel(HandSide::Right, 0)
            .unwrap();
        assert!((b.x - (0.5 * 0.92 + 0.6 * 0.08)).abs() < EPS);
        assert!((b.y - (0.5 * 0.92 + 0.4 * 0.08)).abs() < EPS);
    }

    #[test]
    fn constant_input_converges_and_stops_filtering() {
        let mut filter = BaselineFilter::new();
        let user = UserKey::new("drift");

        // Seed far from the steady value so the first frames deviate.
        filter.filter(&user, vec![right_hand(&[point(0.1, 0.1)])]);
        let mut last = None;
        for _ in 0..200 {
            last = Some(filter.filter(&user, vec![right_hand(&[point(0.5, 0.5)])]));
        }

        let b = filter
            .baseline(&user)
            .unwrap()
            .channel(HandSide::Right, 0)
            .unwrap();
        assert!((b.x - 0.5).abs() < 1e-3);
        assert!((b.y - 0.5).abs() < 1e-3);
        let last = last.unwrap();
        assert!(!last.filtered);
        assert_eq!(last.hands[0].landmarks[0], point(0.5, 0.5));
    }

    #[test]
    fn spike_snaps_to_updated_baseline() {
        let mut filter = BaselineFilter::new();
        let user = UserKey::new("spike");
        for _ in 0..50 {
            let outcome = filter.filter(&user, vec![right_hand(&[point(0.5, 0.5)])]);
            assert!(!outcome.filtered);
        }

        let outcome = filter.filter(&user, vec![right_hand(&[point(0.9, 0.9)])]);

        assert!(outcome.filtered);
        let emitted = outcome.hands[0].landmarks[0];
        let expected = 0.5 * 0.92 + 0.9 * 0.08;
        assert!((emitted.x - expected).abs() < EPS);
        assert!((emitted.y - expected).abs() < EPS);
        assert_eq!(
            filter
                .baseline(&user)
                .unwrap()
                .channel(HandSide::Right, 0)
                .unwrap(),
            emitted
        );
    }

    #[test]
    fn deviation_on_single_axis_is_enough() {
        let mut filter = BaselineFilter::new();
        let user = UserKey::new("axis");
        filter.filter(&user, vec![right_hand(&[point(0.5, 0.5)])]);

        let outcome = filter.filter(&user, vec![right_hand(&[point(0.5, 0.8)])]);

        assert!(outcome.filtered);
        assert!((outcome.hands[0].landmarks[0].x - 0.5).abs() < EPS);
    }

    #[test]
    fn z_is_tracked_but_not_tested() {
        let mut filter = BaselineFilter::new();
        let user = UserKey::new("depth");
        filter.filter(&user, vec![right_hand(&[LandmarkPoint::new(0.5, 0.5, 0.0)])]);

        let outcome = filter.filter(&user, vec![right_hand(&[LandmarkPoint::new(0.5, 0.5, 5.0)])]);

        assert!(!outcome.filtered);
        assert_eq!(outcome.hands[0].landmarks[0].z, 5.0);
        let b = filter
            .baseline(&user)
            .unwrap()
            .channel(HandSide::Right, 0)
            .unwrap();
        assert!((b.z - 0.4).abs() < EPS);
    }

    #[test]
    fn only_deviating_landmarks_are_snapped() {
        let mut filter = BaselineFilter::new();
        let user = UserKey::new("mixed");
        let steady = [point(0.5, 0.5), point(0.2, 0.2)];
        filter.filter(&user, vec![right_hand(&steady)]);

        let outcome = filter.filter(&user, vec![right_hand(&[point(0.9, 0.5), point(0.21, 0.2)])]);

        assert!(outcome.filtered);
        assert!((outcome.hands[0].landmarks[0].x - 0.532).abs() < EPS);
        assert_eq!(outcome.hands[0].landmarks[1], point(0.21, 0.2));
    }

    #[test]
    fn hand_sides_have_independent_channels() {
        let mut filter = BaselineFilter::new();
        let user = UserKey::new("two-hands");
        let hands = vec![
            Hand::new(HandSide::Left, vec![point(0.2, 0.5)]),
            Hand::new(HandSide::Right, vec![point(0.8, 0.5)]),
        ];

        for _ in 0..10 {
            let outcome = filter.filter(&user, hands.clone());
            assert!(!outcome.filtered);
        }

        let baseline = filter.baseline(&user).unwrap();
        assert_eq!(baseline.channel(HandSide::Left, 0), Some(point(0.2, 0.5)));
        assert_eq!(baseline.channel(HandSide::Right, 0), Some(point(0.8, 0.5)));
        assert_eq!(baseline.channel_count(), 2);
    }

    #[test]
    fn same_side_hands_have_independent_channels() {
        let mut filter = BaselineFilter::new();
        let user = UserKey::new("both-right");
        let hands = vec![
            Hand::new(HandSide::Right, vec![point(0.2, 0.5)]),
            Hand::new(HandSide::Right, vec![point(0.8, 0.5)]),
        ];

        let mut last = None;
        for _ in 0..50 {
            let outcome = filter.filter(&user, hands.clone());
            assert!(!outcome.filtered);
            last = Some(outcome);
        }

        let last = last.unwrap();
        assert_eq!(last.hands[0].landmarks[0], point(0.2, 0.5));
        assert_eq!(last.hands[1].landmarks[0], point(0.8, 0.5));
        let baseline = filter.baseline(&user).unwrap();
        assert_eq!(baseline.channel_at(HandSide::Right, 0, 0), Some(point(0.2, 0.5)));
        assert_eq!(baseline.channel_at(HandSide::Right, 1, 0), Some(point(0.8, 0.5)));
        assert_eq!(baseline.channel_count(), 2);
    }

    #[test]
    fn malformed_hand_keeps_its_ordinal() {
        let mut filter = BaselineFilter::new();
        let user = UserKey::new("ordinal");
        filter.filter(
            &user,
            vec![
                Hand::new(HandSide::Right, vec![point(0.2, 0.5)]),
                Hand::new(HandSide::Right, vec![point(0.8, 0.5)]),
            ],
        );

        let outcome = filter.filter(
            &user,
            vec![
                Hand::new(HandSide::Right, vec![LandmarkPoint::new(f32::NAN, 0.5, 0.0)]),
                Hand::new(HandSide::Right, vec![point(0.8, 0.5)]),
            ],
        );

        assert!(!outcome.filtered);
        assert_eq!(outcome.hands[1].landmarks[0], point(0.8, 0.5));
    }

    #[test]
    fn users_are_isolated() {
        let mut filter = BaselineFilter::new();
        let a = UserKey::new("A");
        let b = UserKey::new("B");

        filter.filter(&b, vec![right_hand(&[point(0.1, 0.1)])]);
        let b_before = filter.baseline(&b).cloned();

        for _ in 0..20 {
            filter.filter(&a, vec![right_hand(&[point(0.9, 0.9)])]);
        }

        assert_eq!(filter.baseline(&b).cloned(), b_before);
        let outcome = filter.filter(&a, vec![right_hand(&[point(0.9, 0.9)])]);
        assert!(!outcome.filtered);
        assert_eq!(filter.user_count(), 2);
    }

    #[test]
    fn malformed_hand_passes_through_without_touching_baseline() {
        let mut filter = BaselineFilter::new();
        let user = UserKey::new("nan");
        filter.filter(&user, vec![right_hand(&[point(0.5, 0.5)])]);

        let bad = right_hand(&[LandmarkPoint::new(f32::NAN, 0.5, 0.0)]);
        let outcome = filter.filter(&user, vec![bad]);

        assert!(!outcome.filtered);
        assert!(outcome.hands[0].landmarks[0].x.is_nan());
        assert_eq!(
            filter
                .baseline(&user)
                .unwrap()
                .channel(HandSide::Right, 0),
            Some(point(0.5, 0.5))
        );
    }

    #[test]
    fn evict_and_reset() {
        let mut filter = BaselineFilter::new();
        let a = UserKey::new("A");
        let b = UserKey::new("B");
        filter.filter(&a, vec![right_hand(&[point(0.5, 0.5)])]);
        filter.filter(&b, vec![right_hand(&[point(0.5, 0.5)])]);

        assert!(filter.evict(&a).is_some());
        assert!(filter.baseline(&a).is_none());
        assert!(filter.baseline(&b).is_some());

        filter.reset();
        assert_eq!(filter.user_count(), 0);
    }
}
