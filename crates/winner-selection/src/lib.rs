//! Deterministic bid scoring and ranking (§4.6), kept free of any storage or
//! network concern so the auction controller can call it synchronously on
//! every bid submission and again at window close.

use {
    chrono::{DateTime, Utc},
    model::bid::BidId,
};

/// Weights for the four scoring factors. Defaults match §4.6; a deployment
/// may retune them via configuration without touching this crate.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub quote_out: f64,
    pub fee: f64,
    pub speed: f64,
    pub reputation: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            quote_out: 0.3,
            fee: 0.3,
            speed: 0.2,
            reputation: 0.2,
        }
    }
}

/// Everything [`score`] needs about one bid, already reduced to plain
/// numbers so this crate never touches `U256`.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    /// `quoteOut` as an `f64`; the caller is responsible for a
    /// precision-preserving reduction (see `normalize` below for why only
    /// the ratio to the auction max ever matters).
    pub quote_out: f64,
    pub solver_fee_bps: u16,
    pub fee_cap_bps: u16,
    pub arrived_ms_into_window: u64,
    pub window_ms: u64,
    /// `[0, 1]`; unknown solvers default to 0.5 as a cold-start neutral
    /// value rather than being penalized to 0.
    pub solver_reputation: f64,
}

/// Normalizes `quote_out` against the best `quoteOut` seen so far in the
/// auction. A bid matching the max scores 1.0 on this factor.
fn normalize(quote_out: f64, auction_max_quote_out: f64) -> f64 {
    if auction_max_quote_out <= 0.0 {
        return 0.0;
    }
    (quote_out / auction_max_quote_out).clamp(0.0, 1.0)
}

/// Computes a bid's score against the current auction's best `quoteOut`.
/// Deterministic and side-effect free: the same inputs always produce the
/// same `f64` bit pattern (P5).
pub fn score(inputs: &ScoreInputs, auction_max_quote_out: f64, weights: &ScoreWeights) -> f64 {
    let quote_term = weights.quote_out * normalize(inputs.quote_out, auction_max_quote_out);

    let fee_cap = inputs.fee_cap_bps.max(1) as f64;
    let fee_ratio = (inputs.solver_fee_bps as f64 / fee_cap).clamp(0.0, 1.0);
    let fee_term = weights.fee * (1.0 - fee_ratio);

    let window = inputs.window_ms.max(1) as f64;
    let speed_ratio = inputs.arrived_ms_into_window as f64 / window;
    let speed_term = weights.speed * (1.0 - speed_ratio).max(0.0);

    let reputation_term = weights.reputation * inputs.solver_reputation.clamp(0.0, 1.0);

    quote_term + fee_term + speed_term + reputation_term
}

/// A scored bid, ready to be ordered within its auction.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub bid_id: BidId,
    pub arrived_at: DateTime<Utc>,
    pub score: f64,
}

/// A candidate after ranking: `rank` 1 is the winner.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub bid_id: BidId,
    pub score: f64,
    pub rank: u32,
}

/// Orders candidates by score descending; ties break by earlier `arrivedAt`,
/// then by `bidId` so the ordering is total even if two bids land in the
/// same millisecond (P4, P5).
pub fn rank(mut candidates: Vec<Candidate>) -> Vec<RankedCandidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.arrived_at.cmp(&b.arrived_at))
            .then_with(|| a.bid_id.cmp(&b.bid_id))
    });
    candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| RankedCandidate {
            bid_id: candidate.bid_id,
            score: candidate.score,
            rank: index as u32 + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(quote_out: f64, fee_bps: u16) -> ScoreInputs {
        ScoreInputs {
            quote_out,
            solver_fee_bps: fee_bps,
            fee_cap_bps: 30,
            arrived_ms_into_window: 500,
            window_ms: 3_000,
            solver_reputation: 0.5,
        }
    }

    #[test]
    fn higher_quote_out_scores_higher_all_else_equal() {
        let weights = ScoreWeights::default();
        let low = score(&inputs(950.0, 15), 960.0, &weights);
        let high = score(&inputs(960.0, 10), 960.0, &weights);
        assert!(high > low);
    }

    #[test]
    fn ranking_is_deterministic_and_breaks_ties_by_arrival_then_id() {
        let now = Utc::now();
        let a = Candidate {
            bid_id: BidId::new(),
            arrived_at: now,
            score: 0.8,
        };
        let b = Candidate {
            bid_id: BidId::new(),
            arrived_at: now + chrono::Duration::milliseconds(10),
            score: 0.8,
        };
        let ranked = rank(vec![b.clone(), a.clone()]);
        assert_eq!(ranked[0].bid_id, a.bid_id);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn fee_above_cap_still_scores_but_caller_enforces_the_hard_cap() {
        // The cap itself is enforced in admission (P8); this crate only scores.
        let weights = ScoreWeights::default();
        let over_cap = score(&inputs(950.0, 45), 950.0, &weights);
        assert!(over_cap.is_finite());
    }
}
