// SPDX-License-Identifier: GPL-3.0-or-later

//! Picking the right entry out of a provider's search results.

use sleeve_domain::normalize_key;

const EXACT_MATCH: u32 = 10;
const PARTIAL_MATCH: u32 = 5;

/// Score one field of a candidate against the wanted value: exact match after
/// normalization scores 10, containment in either direction scores 5.
pub fn match_score(candidate: &str, wanted: &str) -> u32 {
    let candidate = normalize_key(candidate);
    let wanted = normalize_key(wanted);
    if candidate.is_empty() || wanted.is_empty() {
        return 0;
    }

    if candidate == wanted {
        EXACT_MATCH
    } else if candidate.contains(&wanted) || wanted.contains(&candidate) {
        PARTIAL_MATCH
    } else {
        0
    }
}

/// Highest-scoring candidate. Ties keep the earlier entry, so when nothing
/// scores the first result wins.
pub fn best_match<T>(candidates: Vec<T>, score: impl Fn(&T) -> u32) -> Option<T> {
    let mut best: Option<(u32, T)> = None;
    for candidate in candidates {
        let candidate_score = score(&candidate);
        match &best {
            Some((best_score, _)) if *best_score >= candidate_score => {}
            _ => best = Some((candidate_score, candidate)),
        }
    }
    best.map(|(_, candidate)| candidate)
}
