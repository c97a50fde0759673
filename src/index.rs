use crate::types::BusinessCenter;
use crate::zone::Zone;
use rstar::{RTree, RTreeObject, AABB};

// Wrapper for RTree indexing
struct CenterPosition {
    index: usize,
    position: [f64; 2], // [lng, lat]
}

impl RTreeObject for CenterPosition {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Spatial index over business center positions. Narrows a zone query to
/// its envelope before the exact membership test.
pub struct CenterIndex {
    tree: RTree<CenterPosition>,
}

impl CenterIndex {
    pub fn build(centers: &[BusinessCenter]) -> Self {
        let items = centers
            .iter()
            .enumerate()
            .map(|(index, bc)| CenterPosition {
                index,
                position: [bc.longitude, bc.latitude],
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Centers inside `zone`, in dataset order. `centers` must be the slice
    /// the index was built from.
    pub fn centers_in_zone<'a>(
        &self,
        zone: &Zone,
        centers: &'a [BusinessCenter],
    ) -> Vec<&'a BusinessCenter> {
        let Some(rect) = zone.bounding_rect() else {
            return Vec::new();
        };
        let envelope = AABB::from_corners(
            [rect.min().x, rect.min().y],
            [rect.max().x, rect.max().y],
        );

        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|c| c.index)
            .filter(|&i| {
                centers
                    .get(i)
                    .map(|bc| zone.contains(bc.latitude, bc.longitude))
                    .unwrap_or(false)
            })
            .collect();
        hits.sort_unstable();
        hits.into_iter().filter_map(|i| centers.get(i)).collect()
    }
}
