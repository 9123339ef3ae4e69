use std::cmp::Reverse;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::team::TeamIdx;
use crate::trial::TrialState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    /// Points only; equal points keep insertion order.
    #[default]
    PointsOnly,
    /// Within each points group: head-to-head points, head-to-head goal difference, then
    /// overall goal difference. Anything still level keeps insertion order.
    HeadToHead,
    /// Points, then a random draw among teams still level.
    DrawingOfLots,
}

impl TieBreakPolicy {
    pub fn needs_head_to_head(self) -> bool {
        matches!(self, TieBreakPolicy::HeadToHead)
    }

    /// Orders `members` (a whole league or one band of it) into a strict rank order. The
    /// order of `members` is the insertion order ties fall back on. Only `DrawingOfLots`
    /// touches `rng`.
    pub fn resolve<R: Rng + ?Sized>(
        self,
        state: &TrialState,
        members: &[TeamIdx],
        rng: &mut R,
    ) -> Vec<TeamIdx> {
        let mut order = members.to_vec();
        // Stable, so equal points keep the incoming order.
        order.sort_by_key(|&t| Reverse(state.points[t]));

        match self {
            TieBreakPolicy::PointsOnly => {}
            TieBreakPolicy::HeadToHead => {
                for group in tied_groups_mut(&mut order, state) {
                    break_by_head_to_head(group, state);
                }
            }
            TieBreakPolicy::DrawingOfLots => {
                for group in tied_groups_mut(&mut order, state) {
                    group.shuffle(rng);
                }
            }
        }
        order
    }
}

/// Mutable slices of `order` (already sorted by points) holding two or more teams on the
/// same points.
fn tied_groups_mut<'a>(
    order: &'a mut [TeamIdx],
    state: &TrialState,
) -> impl Iterator<Item = &'a mut [TeamIdx]> {
    order
        .chunk_by_mut(move |&a, &b| state.points[a] == state.points[b])
        .filter(|group| group.len() > 1)
}

fn break_by_head_to_head(group: &mut [TeamIdx], state: &TrialState) {
    let members = group.to_vec();
    let key = |t: TeamIdx| {
        let (h2h_pts, h2h_gd) = state
            .head_to_head
            .as_ref()
            .map(|h| h.within(t, &members))
            .unwrap_or((0, 0));
        Reverse((h2h_pts, h2h_gd, state.goal_diff[t]))
    };
    group.sort_by_key(|&t| key(t));
}
