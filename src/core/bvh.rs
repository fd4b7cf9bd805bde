// Copyright @yucwang 2026

use crate::math::aabb::AABB;
use crate::math::constants::{Float, Vector3f};
use crate::math::ray::Ray3f;

const SAH_BUCKETS: usize = 12;

#[derive(Clone)]
struct BVHNode {
    bounds: AABB,
    left: Option<usize>,
    right: Option<usize>,
    start: usize,
    count: usize,
}

impl BVHNode {
    fn leaf(bounds: AABB, start: usize, count: usize) -> Self {
        Self { bounds, left: None, right: None, start, count }
    }

    fn interior(bounds: AABB, left: usize, right: usize) -> Self {
        Self { bounds, left: Some(left), right: Some(right), start: 0, count: 0 }
    }

    fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// Bounding volume hierarchy over primitive boxes. Primitive tests are
/// delegated to the caller through a closure.
pub struct BVH {
    nodes: Vec<BVHNode>,
    indices: Vec<usize>,
    prim_bounds: Vec<AABB>,
    prim_centroids: Vec<Vector3f>,
    max_leaf_size: usize,
}

impl BVH {
    pub fn new(prim_bounds: Vec<AABB>) -> Self {
        Self::with_max_leaf_size(prim_bounds, 4)
    }

    pub fn with_max_leaf_size(prim_bounds: Vec<AABB>, max_leaf_size: usize) -> Self {
        let prim_centroids = prim_bounds.iter().map(|b| b.center()).collect();
        let mut bvh = Self {
            indices: (0..prim_bounds.len()).collect(),
            nodes: Vec::new(),
            prim_bounds,
            prim_centroids,
            max_leaf_size: max_leaf_size.max(1),
        };

        if !bvh.indices.is_empty() {
            let (bounds, centroid_bounds) = bvh.compute_bounds(0, bvh.indices.len());
            bvh.build(0, bvh.indices.len(), bounds, centroid_bounds);
        }

        bvh
    }

    pub fn len(&self) -> usize {
        self.prim_bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prim_bounds.is_empty()
    }

    /// Early-out traversal: true as soon as `hit_fn` reports a hit.
    pub fn any_hit<F>(&self, ray: &Ray3f, mut hit_fn: F) -> bool
    where
        F: FnMut(usize, &Ray3f) -> bool,
    {
        if self.nodes.is_empty() {
            return false;
        }

        let mut stack = vec![0usize];
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if !node.bounds.ray_intersect(ray) {
                continue;
            }
            if node.is_leaf() {
                for i in 0..node.count {
                    let prim_idx = self.indices[node.start + i];
                    if hit_fn(prim_idx, ray) {
                        return true;
                    }
                }
            } else {
                if let Some(left) = node.left {
                    stack.push(left);
                }
                if let Some(right) = node.right {
                    stack.push(right);
                }
            }
        }

        false
    }

    fn bucket_of(&self, prim: usize, axis: usize, axis_min: Float, axis_max: Float) -> usize {
        let c = self.prim_centroids[prim][axis];
        let b = ((c - axis_min) / (axis_max - axis_min) * SAH_BUCKETS as Float) as usize;
        b.min(SAH_BUCKETS - 1)
    }

    fn push_leaf(&mut self, bounds: AABB, start: usize, count: usize) -> usize {
        let node_idx = self.nodes.len();
        self.nodes.push(BVHNode::leaf(bounds, start, count));
        node_idx
    }

    fn build(&mut self, start: usize, end: usize, bounds: AABB, centroid_bounds: AABB) -> usize {
        let count = end - start;
        if count <= self.max_leaf_size {
            return self.push_leaf(bounds, start, count);
        }

        let axis = centroid_bounds.max_extent() as usize;
        let axis_min = centroid_bounds.p_min[axis];
        let axis_max = centroid_bounds.p_max[axis];
        if (axis_max - axis_min).abs() < 1e-12 {
            return self.push_leaf(bounds, start, count);
        }

        // SAH with fixed buckets along the split axis.
        let mut buckets = vec![(0usize, AABB::default()); SAH_BUCKETS];
        for i in start..end {
            let idx = self.indices[i];
            let b = self.bucket_of(idx, axis, axis_min, axis_max);
            buckets[b].0 += 1;
            buckets[b].1.expand_by_aabb(&self.prim_bounds[idx]);
        }

        let area = bounds.surface_area().max(1e-12);
        let mut min_cost = Float::MAX;
        let mut min_split = 0usize;
        for split in 0..(SAH_BUCKETS - 1) {
            let mut b0 = AABB::default();
            let mut b1 = AABB::default();
            let mut count0 = 0usize;
            let mut count1 = 0usize;
            for (b, bucket) in buckets.iter().enumerate() {
                if b <= split {
                    count0 += bucket.0;
                    b0.expand_by_aabb(&bucket.1);
                } else {
                    count1 += bucket.0;
                    b1.expand_by_aabb(&bucket.1);
                }
            }
            let cost0 = if count0 > 0 { count0 as Float * b0.surface_area() } else { 0.0 };
            let cost1 = if count1 > 0 { count1 as Float * b1.surface_area() } else { 0.0 };
            let cost = 1.0 + (cost0 + cost1) / area;
            if cost < min_cost {
                min_cost = cost;
                min_split = split;
            }
        }

        // If SAH says leaf is cheaper, stop splitting.
        if min_cost >= count as Float {
            return self.push_leaf(bounds, start, count);
        }

        // Partition indices in-place by bucket.
        let mut mid = start;
        for i in start..end {
            let idx = self.indices[i];
            if self.bucket_of(idx, axis, axis_min, axis_max) <= min_split {
                self.indices.swap(i, mid);
                mid += 1;
            }
        }

        if mid == start || mid == end {
            return self.push_leaf(bounds, start, count);
        }

        let (left_bounds, left_centroids) = self.compute_bounds(start, mid);
        let (right_bounds, right_centroids) = self.compute_bounds(mid, end);
        let node_idx = self.push_leaf(bounds, 0, 0);
        let left = self.build(start, mid, left_bounds, left_centroids);
        let right = self.build(mid, end, right_bounds, right_centroids);
        self.nodes[node_idx] = BVHNode::interior(bounds, left, right);
        node_idx
    }

    fn compute_bounds(&self, start: usize, end: usize) -> (AABB, AABB) {
        let mut bounds = AABB::default();
        let mut centroid_bounds = AABB::default();
        for i in start..end {
            let idx = self.indices[i];
            bounds.expand_by_aabb(&self.prim_bounds[idx]);
            centroid_bounds.expand_by_point(&self.prim_centroids[idx]);
        }
        (bounds, centroid_bounds)
    }
}
