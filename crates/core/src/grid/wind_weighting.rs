//! Wind-biased spread weights
//!
//! Cardinal neighbours share heat with weight 1.0 and diagonal ones with 0.7.
//! Wind scales each weight by `1 + dot * speed * factor`, where `dot` is the
//! cosine between the neighbour direction and the direction the wind blows
//! towards.

use serde::{Deserialize, Serialize};

use super::neighbours::{neighbours, Neighbour};
use crate::core_types::{FireVertex, WindSample};
use crate::world::WorldQuery;

/// Base weight of a cardinal neighbour.
pub const CARDINAL_WEIGHT: f32 = 1.0;

/// Base weight of a diagonal neighbour.
pub const DIAGONAL_WEIGHT: f32 = 0.7;

/// Neighbour with its share of diffused heat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedNeighbour {
    pub vertex: FireVertex,
    pub weight: f32,
}

/// Weight of a neighbour before wind is applied.
#[inline]
pub fn base_weight(offset: (i32, i32)) -> f32 {
    if offset.0 != 0 && offset.1 != 0 {
        DIAGONAL_WEIGHT
    } else {
        CARDINAL_WEIGHT
    }
}

/// Apply wind to already resolved neighbours.
///
/// The result is sorted by descending weight, ties keeping input order, so
/// the most wind-favoured neighbour receives heat first.
#[must_use]
pub fn weigh(neighbours: &[Neighbour], wind: WindSample, wind_factor: f32) -> Vec<WeightedNeighbour> {
    let (wind_x, wind_y) = wind.unit_vector();
    let speed = wind.speed_normalized();

    let mut result: Vec<WeightedNeighbour> = neighbours
        .iter()
        .map(|n| {
            let (dx, dy) = (n.offset.0 as f32, n.offset.1 as f32);
            let len = dx.hypot(dy);
            let dot = (wind_x * dx + wind_y * dy) / len;
            WeightedNeighbour {
                vertex: n.vertex,
                weight: base_weight(n.offset) * (1.0 + dot * speed * wind_factor),
            }
        })
        .collect();

    // Stable: equal weights keep scan order
    result.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    result
}

/// Neighbours of `vertex` with wind-biased weights, strongest first.
pub fn weighted_neighbours(
    world: &dyn WorldQuery,
    vertex: &FireVertex,
    wind: WindSample,
    wind_factor: f32,
) -> Vec<WeightedNeighbour> {
    weigh(&neighbours(world, vertex), wind, wind_factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::FlatWorld;
    use approx::assert_relative_eq;

    fn centre() -> (FlatWorld, FireVertex) {
        let world = FlatWorld::single_cell();
        let v = FireVertex::from_grid(FlatWorld::cell_id(0, 0), 0, 0, 8, 8);
        (world, v)
    }

    fn weight_of(result: &[WeightedNeighbour], target: FireVertex) -> f32 {
        result
            .iter()
            .find(|n| n.vertex == target)
            .map(|n| n.weight)
            .expect("neighbour present")
    }

    #[test]
    fn test_calm_weights_are_exact_for_any_direction() {
        let (world, v) = centre();
        for direction in [0_u8, 17, 64, 200, 255] {
            let result = weighted_neighbours(&world, &v, WindSample::new(0, direction), 0.8);
            let weights: Vec<f32> = result.iter().map(|n| n.weight).collect();
            assert_eq!(weights, vec![1.0, 1.0, 1.0, 1.0, 0.7, 0.7, 0.7, 0.7]);
        }
    }

    #[test]
    fn test_calm_ties_keep_scan_order() {
        let (world, v) = centre();
        let result = weighted_neighbours(&world, &v, WindSample::CALM, 0.5);
        let cell = v.cell;
        // Cardinals in scan order N, W, E, S then diagonals NW, NE, SW, SE
        let expected = [(8, 7), (7, 8), (9, 8), (8, 9), (7, 7), (9, 7), (7, 9), (9, 9)];
        for (n, (x, y)) in result.iter().zip(expected) {
            assert_eq!(n.vertex, FireVertex::from_grid(cell, 0, 0, x, y));
        }
    }

    #[test]
    fn test_aligned_full_speed_wind() {
        let (world, v) = centre();
        let factor = 0.5;
        // Direction 0 blows towards +x (east)
        let result = weighted_neighbours(&world, &v, WindSample::new(255, 0), factor);
        let east = FireVertex::from_grid(v.cell, 0, 0, 9, 8);
        let west = FireVertex::from_grid(v.cell, 0, 0, 7, 8);
        assert_relative_eq!(weight_of(&result, east), 1.0 + factor, epsilon = 1e-6);
        assert_relative_eq!(weight_of(&result, west), 1.0 - factor, epsilon = 1e-6);
        assert_eq!(result[0].vertex, east, "most favoured neighbour comes first");

        // Perpendicular neighbours are unaffected
        let north = FireVertex::from_grid(v.cell, 0, 0, 8, 7);
        assert_relative_eq!(weight_of(&result, north), 1.0, epsilon = 1e-6);

        // Diagonals get the 45 degree share
        let south_east = FireVertex::from_grid(v.cell, 0, 0, 9, 9);
        let expected = 0.7 * (1.0 + std::f32::consts::FRAC_1_SQRT_2 * factor);
        assert_relative_eq!(weight_of(&result, south_east), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_weights_sorted_descending() {
        let (world, v) = centre();
        let result = weighted_neighbours(&world, &v, WindSample::new(180, 37), 1.0);
        assert!(result.windows(2).all(|w| w[0].weight >= w[1].weight));
    }

    #[test]
    fn test_partial_neighbourhood_keeps_directional_weights() {
        let world = FlatWorld::single_cell();
        let v = FireVertex::from_grid(FlatWorld::cell_id(0, 0), 0, 0, 0, 0);
        let result = weighted_neighbours(&world, &v, WindSample::CALM, 0.5);
        let weights: Vec<f32> = result.iter().map(|n| n.weight).collect();
        assert_eq!(weights, vec![1.0, 1.0, 0.7]);
    }
}
