//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! A binary tree of bounding boxes stored in a flat arena and addressed by
//! index, so the tree can be moved or rebuilt without fixing up pointers.
//! Construction minimizes the surface area heuristic (SAH) cost; traversal
//! returns every item id whose leaf box the ray passes through, leaving
//! nearest-hit resolution to the caller.

use lumen_math::{Aabb, DVec3, Ray};
use serde::{Deserialize, Serialize};

/// Cost constants of the surface area heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhConfig {
    /// Cost of intersecting one item in a leaf (T_tri)
    pub leaf_cost: f64,
    /// Cost of visiting one internal node (T_aabb)
    pub traversal_cost: f64,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            leaf_cost: 1.0,
            traversal_cost: 1.0,
        }
    }
}

/// BVH node - either an internal node with two children or a leaf with item ids.
#[derive(Debug, Clone, PartialEq)]
pub enum BvhNode {
    /// Internal node; `left` and `right` are arena indices.
    Internal { bbox: Aabb, left: usize, right: usize },
    /// Leaf node holding item ids in build order.
    Leaf { bbox: Aabb, targets: Vec<usize> },
}

impl BvhNode {
    fn empty_leaf() -> Self {
        BvhNode::Leaf {
            bbox: Aabb::EMPTY,
            targets: Vec::new(),
        }
    }

    #[inline]
    pub fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Internal { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }

    fn bbox_mut(&mut self) -> &mut Aabb {
        match self {
            BvhNode::Internal { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    /// Child indices of an internal node.
    pub fn children(&self) -> Option<(usize, usize)> {
        match self {
            BvhNode::Internal { left, right, .. } => Some((*left, *right)),
            BvhNode::Leaf { .. } => None,
        }
    }

    /// Item ids of a leaf node (empty for internal nodes).
    pub fn targets(&self) -> &[usize] {
        match self {
            BvhNode::Leaf { targets, .. } => targets,
            BvhNode::Internal { .. } => &[],
        }
    }
}

/// Best split found for one subtree.
#[derive(Debug, Clone, Copy)]
struct Split {
    axis: usize,
    /// Items `[..index]` go left, `[index..]` go right.
    index: usize,
}

/// Arena-backed bounding volume hierarchy rooted at node 0.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    config: BvhConfig,
}

impl Default for Bvh {
    fn default() -> Self {
        Self::new()
    }
}

impl Bvh {
    /// An empty hierarchy: a single root leaf with no items.
    pub fn new() -> Self {
        Self::with_config(BvhConfig::default())
    }

    pub fn with_config(config: BvhConfig) -> Self {
        Self {
            nodes: vec![BvhNode::empty_leaf()],
            config,
        }
    }

    /// Shorthand for [`Bvh::with_config`] with explicit cost constants.
    pub fn with_costs(leaf_cost: f64, traversal_cost: f64) -> Self {
        Self::with_config(BvhConfig {
            leaf_cost,
            traversal_cost,
        })
    }

    pub fn config(&self) -> &BvhConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn root(&self) -> &BvhNode {
        &self.nodes[0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Item ids of every leaf, in arena order.
    pub fn leaf_partition(&self) -> Vec<Vec<usize>> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.targets().to_vec())
            .collect()
    }

    /// Build the tree over `(id, bbox)` pairs, replacing any previous tree.
    pub fn construct(&mut self, items: &[(usize, Aabb)]) {
        self.nodes.clear();
        self.nodes.push(BvhNode::empty_leaf());
        self.build_into(0, items.to_vec());

        log::debug!(
            "BVH built: {} items, {} nodes, {} leaves",
            items.len(),
            self.node_count(),
            self.leaf_count()
        );
    }

    /// Recursive SAH construction of the subtree stored at `index`.
    fn build_into(&mut self, index: usize, mut items: Vec<(usize, Aabb)>) {
        let bbox = items
            .iter()
            .fold(Aabb::EMPTY, |acc, (_, b)| Aabb::surrounding(&acc, b));

        let Some(split) = self.find_split(&items, bbox.area()) else {
            self.nodes[index] = BvhNode::Leaf {
                bbox,
                targets: items.iter().map(|(id, _)| *id).collect(),
            };
            return;
        };

        sort_descending(&mut items, split.axis);
        let right_items = items.split_off(split.index);

        let left = self.nodes.len();
        self.nodes.push(BvhNode::empty_leaf());
        let right = self.nodes.len();
        self.nodes.push(BvhNode::empty_leaf());
        self.nodes[index] = BvhNode::Internal { bbox, left, right };

        self.build_into(left, items);
        self.build_into(right, right_items);
    }

    /// Find the cheapest split across all three axes, if any beats a leaf.
    ///
    /// Areas of every prefix are cached in a forward pass; the suffix box
    /// grows in the backward pass, so each axis costs one sort plus O(n).
    fn find_split(&self, items: &[(usize, Aabb)], root_area: f64) -> Option<Split> {
        let n = items.len();
        // A flat or empty enclosing box leaves nothing to divide by.
        if n < 2 || !(root_area > 0.0) {
            return None;
        }

        let BvhConfig {
            leaf_cost,
            traversal_cost,
        } = self.config;

        let mut best_cost = leaf_cost * n as f64;
        let mut best = None;

        let mut sorted = items.to_vec();
        let mut prefix_areas = vec![0.0; n];

        for axis in 0..3 {
            sorted.copy_from_slice(items);
            sort_descending(&mut sorted, axis);

            // prefix_areas[i] = area of sorted[..i]
            let mut prefix = Aabb::EMPTY;
            for (i, (_, b)) in sorted.iter().enumerate() {
                prefix_areas[i] = prefix.area();
                prefix.grow(b);
            }

            let mut suffix = Aabb::EMPTY;
            for i in (1..n).rev() {
                suffix.grow(&sorted[i].1);

                let left_cost = prefix_areas[i] * i as f64;
                let right_cost = suffix.area() * (n - i) as f64;
                let cost =
                    2.0 * traversal_cost + leaf_cost * (left_cost + right_cost) / root_area;

                if cost < best_cost {
                    best_cost = cost;
                    best = Some(Split { axis, index: i });
                }
            }
        }

        best
    }

    /// All item ids in leaves whose boxes the ray hits, left subtree first.
    pub fn traverse(&self, ray: &Ray) -> Vec<usize> {
        let mut targets = Vec::new();
        self.for_each_candidate(ray, |id| targets.push(id));
        targets
    }

    /// Visit the ids [`Bvh::traverse`] would return, in the same order,
    /// without collecting them.
    pub fn for_each_candidate(&self, ray: &Ray, mut on_id: impl FnMut(usize)) {
        self.visit(0, ray, &mut on_id);
    }

    fn visit<F: FnMut(usize)>(&self, index: usize, ray: &Ray, on_id: &mut F) {
        let node = &self.nodes[index];
        if !node.bbox().hit(ray) {
            return;
        }
        match node {
            BvhNode::Internal { left, right, .. } => {
                self.visit(*left, ray, on_id);
                self.visit(*right, ray, on_id);
            }
            BvhNode::Leaf { targets, .. } => targets.iter().copied().for_each(&mut *on_id),
        }
    }

    /// Move every node box by `offset`.
    pub fn translate(&mut self, offset: DVec3) {
        for node in &mut self.nodes {
            let bbox = node.bbox_mut();
            *bbox = bbox.translate(offset);
        }
    }

    /// Scale every node box about the origin.
    pub fn scale(&mut self, factor: f64) {
        for node in &mut self.nodes {
            let bbox = node.bbox_mut();
            *bbox = bbox.scale(factor);
        }
    }
}

/// Stable sort by box center along `axis`, largest first.
fn sort_descending(items: &mut [(usize, Aabb)], axis: usize) {
    items.sort_by(|a, b| b.1.center()[axis].total_cmp(&a.1.center()[axis]));
}
