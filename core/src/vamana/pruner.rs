// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! α-pruned occlusion: picks which of a vertex's visited candidates survive
//! as its final neighbor list.
//!
//! Not present in the retrieved teacher pack (`search_for_point_and_prune`'s
//! body is referenced but not included there) — implemented from the
//! algorithm-level description: candidates are considered closest-first;
//! a candidate survives if, for every neighbor already accepted, scaling
//! that neighbor's distance to the candidate by `alpha` still does not
//! undercut the candidate's distance to the query point. This is the
//! standard "accept `v` unless some accepted `p` already occludes it"
//! Vamana rule, independent of metric polarity: both L2 (smaller-is-closer,
//! alpha > 1 relaxes acceptance) and inner product (larger-is-closer,
//! alpha < 1 relaxes acceptance in the same relative sense) pass their
//! candidates through the same comparison, the per-metric default `alpha`
//! value is what adapts the rule to the metric's polarity.

use crate::search::buffer::Candidate;

/// Greedily selects up to `prune_to` candidates from `candidates` (assumed
/// already sorted closest-to-query-first) such that no kept candidate is
/// "occluded" by an earlier one under `alpha`.
///
/// `pairwise_distance(a, b)` must return the distance between candidates
/// `a.id` and `b.id` (not to the query) — callers typically adapt this to
/// the storage backend directly rather than through an `AdaptedDistance`
/// fixed to the query, since the pruner needs distances between arbitrary
/// pairs of candidates.
pub fn alpha_prune<F>(
    candidates: &[Candidate],
    prune_to: usize,
    alpha: f32,
    less_is_closer: bool,
    pairwise_distance: F,
) -> Vec<u32>
where
    F: Fn(u32, u32) -> f32,
{
    let mut kept: Vec<Candidate> = Vec::with_capacity(prune_to);
    let mut occluded = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if kept.len() >= prune_to {
            break;
        }
        if occluded[i] {
            continue;
        }
        let candidate = candidates[i];
        kept.push(candidate);

        for (j, other) in candidates.iter().enumerate().skip(i + 1) {
            if occluded[j] {
                continue;
            }
            let pair = pairwise_distance(candidate.id, other.id);
            if is_occluded(alpha, less_is_closer, pair, other.distance) {
                occluded[j] = true;
            }
        }
    }

    kept.into_iter().map(|c| c.id).collect()
}

/// `true` if accepting `kept` already occludes `candidate`: scaling the
/// kept-to-candidate distance down by `alpha` still reaches at least as
/// close as the candidate's own distance to the query.
fn is_occluded(alpha: f32, less_is_closer: bool, kept_to_candidate: f32, candidate_to_query: f32) -> bool {
    if less_is_closer {
        alpha * kept_to_candidate <= candidate_to_query
    } else {
        kept_to_candidate >= alpha * candidate_to_query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_every_candidate_when_well_separated() {
        // three candidates, pairwise distances all large relative to
        // their distance to the query: nothing occludes anything.
        let candidates = vec![
            Candidate { id: 0, distance: 1.0 },
            Candidate { id: 1, distance: 2.0 },
            Candidate { id: 2, distance: 3.0 },
        ];
        let kept = alpha_prune(&candidates, 3, 1.2, true, |_, _| 100.0);
        assert_eq!(kept, vec![0, 1, 2]);
    }

    #[test]
    fn drops_candidate_occluded_by_a_closer_one() {
        // candidate 1 sits essentially right next to candidate 0 (pairwise
        // distance ~0), so alpha * 0 <= 2.0 occludes it.
        let candidates = vec![
            Candidate { id: 0, distance: 1.0 },
            Candidate { id: 1, distance: 2.0 },
        ];
        let kept = alpha_prune(&candidates, 2, 1.2, true, |a, b| if (a, b) == (0, 1) { 0.01 } else { 100.0 });
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn respects_prune_to_cap() {
        let candidates = vec![
            Candidate { id: 0, distance: 1.0 },
            Candidate { id: 1, distance: 2.0 },
            Candidate { id: 2, distance: 3.0 },
        ];
        let kept = alpha_prune(&candidates, 1, 1.2, true, |_, _| 100.0);
        assert_eq!(kept, vec![0]);
    }
}
