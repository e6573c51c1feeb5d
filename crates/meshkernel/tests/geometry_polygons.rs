//! Property tests for polygon flattening and splitting.

use meshkernel::{GeometryList, Polygon, Ring, Separators};
use proptest::prelude::*;

const SEPS: Separators = Separators {
    geometry: -999.0,
    inner_outer: -998.0,
};

fn ring_strategy() -> impl Strategy<Value = Ring> {
    prop::collection::vec((-1e6f64..1e6, -1e6f64..1e6), 3..8)
        .prop_map(|points| Ring::from_points(&points))
}

fn polygon_strategy() -> impl Strategy<Value = Polygon> {
    (ring_strategy(), prop::collection::vec(ring_strategy(), 0..3))
        .prop_map(|(outer, inner)| Polygon { outer, inner })
}

proptest! {
    #[test]
    fn flatten_and_split_round_trips(polygons in prop::collection::vec(polygon_strategy(), 1..4)) {
        let list = GeometryList::from_polygons(&polygons, SEPS);
        prop_assert_eq!(list.polygons(), polygons);
    }

    #[test]
    fn flattened_length_accounts_for_every_ring_and_separator(
        polygons in prop::collection::vec(polygon_strategy(), 1..4)
    ) {
        let list = GeometryList::from_polygons(&polygons, SEPS);

        let vertex_count: usize = polygons
            .iter()
            .map(|p| p.outer.len() + p.inner.iter().map(Ring::len).sum::<usize>())
            .sum();
        let inner_separators: usize = polygons.iter().map(|p| p.inner.len()).sum();
        let outer_separators = polygons.len() - 1;

        prop_assert_eq!(list.len(), vertex_count + inner_separators + outer_separators);
        prop_assert_eq!(list.x_coordinates().len(), list.len());
        prop_assert_eq!(list.y_coordinates().len(), list.len());
        prop_assert_eq!(list.values().len(), list.len());
    }

    #[test]
    fn channel_length_mismatch_is_rejected(extra in 1usize..4) {
        let x = vec![0.0; 4 + extra];
        let y = vec![0.0; 4];
        let values = vec![0.0; 4];
        let result = GeometryList::with_values(x, y, values, SEPS);
        prop_assert!(result.is_err());
    }
}
