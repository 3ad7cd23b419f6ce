//! Spatial index over projected facility points.

use geo::Point;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::debug;

/// Relative widening of the candidate search radius
const CANDIDATE_SLACK: f64 = 1e-9;

/// Wrapper for R-tree indexing of a projected facility position
#[derive(Debug, Clone, Copy)]
pub struct IndexedFacility {
    /// Position of the facility in the input slice
    pub index: usize,
    position: [f64; 2],
}

impl RTreeObject for IndexedFacility {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedFacility {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// R-tree of facility positions in the metric frame
pub struct FacilityIndex {
    tree: RTree<IndexedFacility>,
}

impl FacilityIndex {
    /// Build the index from projected points, keeping their input positions
    pub fn build(points: &[Point<f64>]) -> Self {
        let indexed: Vec<IndexedFacility> = points
            .iter()
            .enumerate()
            .map(|(index, p)| IndexedFacility {
                index,
                position: [p.x(), p.y()],
            })
            .collect();

        let tree = RTree::bulk_load(indexed);
        debug!("Facility index built with {} entries", tree.size());

        Self { tree }
    }

    /// Input positions of all facilities within `radius_m` of `center`, in
    /// ascending input order.
    ///
    /// The search radius is widened by a relative 1e-9, so the result is a
    /// superset of an exact `distance <= radius_m` test on the same points.
    pub fn candidates_within(&self, center: Point<f64>, radius_m: f64) -> Vec<usize> {
        let search_m = radius_m * (1.0 + CANDIDATE_SLACK);
        let mut hits: Vec<usize> = self
            .tree
            .locate_within_distance([center.x(), center.y()], search_m * search_m)
            .map(|f| f.index)
            .collect();
        hits.sort_unstable();
        hits
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_index() {
        let index = FacilityIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index
            .candidates_within(Point::new(0.0, 0.0), 1000.0)
            .is_empty());
    }

    #[test]
    fn test_candidates_in_input_order() {
        let points = vec![
            Point::new(300.0, 0.0),
            Point::new(5000.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(1000.0, 0.0),
        ];
        let index = FacilityIndex::build(&points);
        assert_eq!(index.len(), 4);
        assert_eq!(
            index.candidates_within(Point::new(0.0, 0.0), 1000.0),
            vec![0, 2, 3]
        );
    }

    #[test]
    fn test_points_on_the_circle_are_candidates() {
        // 3-4-5 triangles put every point exactly 3000 m from the origin
        let points = vec![
            Point::new(1800.0, 2400.0),
            Point::new(-2400.0, -1800.0),
            Point::new(3000.0, 0.0),
            Point::new(0.0, 3000.000_01),
        ];
        let index = FacilityIndex::build(&points);
        assert_eq!(
            index.candidates_within(Point::new(0.0, 0.0), 3000.0),
            vec![0, 1, 2]
        );
    }
}
