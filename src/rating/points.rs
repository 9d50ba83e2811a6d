use super::types::PlacementCounts;

const PLACEMENT_WEIGHTS: [f64; 4] = [-1.0, -0.5, -0.5, 2.0];

/// Points from placement counts: `2*c4 - c1 - 0.5*c2 - 0.5*c3`.
///
/// Placement 4 is the best outcome in this scheme. Halves are rounded to the
/// nearest even integer.
pub fn calculate_points(counts: &PlacementCounts) -> i64 {
    let raw: f64 = PLACEMENT_WEIGHTS
        .iter()
        .zip(1u8..)
        .map(|(weight, placement)| weight * counts.count(placement) as f64)
        .sum();

    raw.round_ties_even() as i64
}
