//! A surface-area-heuristic bounding volume hierarchy.
//!
//! The tree is built top-down over the refined primitives, then linearized
//! into a flat array where each interior node's first child immediately
//! follows it, so traversal walks indices instead of pointers with an
//! explicit fixed-size stack.

use std::sync::Arc;

use crate::geometry::{BBox, DifferentialGeometry, Geometry};
use crate::linalg::{Axis, Point, Ray, Vector};

/// How interior nodes partition their primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMethod {
    /// Partition about the spatial midpoint of the centroid bounds.
    Middle,
    /// Median split: equal primitive counts on both sides.
    Equal,
    /// Minimize the surface area heuristic cost over bucketed candidates.
    Sah,
}

const SAH_BUCKETS: usize = 12;
/// Relative cost of a traversal step vs. a primitive intersection.
const TRAVERSAL_COST: f32 = 0.125;
/// Traversal stack depth; enough for any tree this builder produces.
const MAX_TODO: usize = 64;

// ─── Build structures ───────────────────────────────────────────────────────

struct GeomInfo {
    geom_idx: usize,
    center: Point,
    bounds: BBox,
}

impl GeomInfo {
    fn new(geom_idx: usize, bounds: BBox) -> Self {
        Self {
            geom_idx,
            center: bounds.lerp(0.5, 0.5, 0.5),
            bounds,
        }
    }
}

enum BuildNode {
    Leaf {
        geom_offset: usize,
        n_geom: usize,
        bounds: BBox,
    },
    Interior {
        children: [Box<BuildNode>; 2],
        bounds: BBox,
        split: Axis,
    },
}

#[derive(Clone, Copy)]
struct SahBucket {
    count: usize,
    bounds: BBox,
}

// ─── Flat nodes ─────────────────────────────────────────────────────────────

/// A linearized node. Leaves store the offset and count of their primitives
/// in the ordered array; interiors store the index of their second child
/// (the first child is the next node) and the split axis for front-to-back
/// ordering.
#[derive(Debug, Clone, Copy)]
struct FlatNode {
    bounds: BBox,
    /// Leaf: offset into the ordered geometry. Interior: second child index.
    offset: u32,
    /// Primitive count; zero marks an interior node.
    n_geom: u16,
    axis: u8,
}

// ─── BVH ────────────────────────────────────────────────────────────────────

pub struct Bvh {
    split: SplitMethod,
    max_geom: usize,
    /// The refined primitives in traversal order.
    geometry: Vec<Arc<dyn Geometry>>,
    flat_nodes: Vec<FlatNode>,
}

impl Bvh {
    /// Builds a BVH over the refined leaves of `geom`. `max_geom` caps the
    /// primitives per leaf and is clamped to 256.
    pub fn new(geom: Vec<Arc<dyn Geometry>>, split: SplitMethod, max_geom: usize) -> Self {
        let mut refined = Vec::with_capacity(geom.len());
        for g in geom {
            g.refine(&mut refined);
        }
        let mut bvh = Self {
            split,
            max_geom: max_geom.min(256),
            geometry: refined,
            flat_nodes: Vec::new(),
        };
        if bvh.geometry.is_empty() {
            return bvh;
        }

        let mut build_geom: Vec<GeomInfo> = bvh
            .geometry
            .iter()
            .enumerate()
            .map(|(i, g)| GeomInfo::new(i, g.object_bound()))
            .collect();

        let mut ordered = Vec::with_capacity(bvh.geometry.len());
        let mut total_nodes = 0;
        let n = build_geom.len();
        let root = bvh.build(&mut build_geom, &mut ordered, 0, n, &mut total_nodes);
        // The tree indexes into the ordered list, so swap it in
        let ordered_geom: Vec<Arc<dyn Geometry>> = ordered
            .into_iter()
            .map(|i| Arc::clone(&bvh.geometry[i]))
            .collect();
        bvh.geometry = ordered_geom;

        bvh.flat_nodes.reserve(total_nodes);
        bvh.flatten(&root);
        bvh
    }

    pub fn bounds(&self) -> BBox {
        self.flat_nodes
            .first()
            .map(|n| n.bounds)
            .unwrap_or_else(BBox::empty)
    }

    pub fn is_empty(&self) -> bool {
        self.flat_nodes.is_empty()
    }

    /// Number of primitives stored across all leaves.
    pub fn primitive_count(&self) -> usize {
        self.geometry.len()
    }

    /// Finds the closest intersection along the ray, shrinking `ray.t_max`
    /// and filling `dg` as hits are found. Stackless traversal with an
    /// explicit index stack; children are visited near-first based on the
    /// ray direction's sign along the node's split axis.
    pub fn intersect(&self, ray: &mut Ray, dg: &mut DifferentialGeometry<'_>) -> bool {
        if self.flat_nodes.is_empty() {
            return false;
        }
        let inv_dir = Vector::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        let neg_dir = [
            (inv_dir.x < 0.0) as usize,
            (inv_dir.y < 0.0) as usize,
            (inv_dir.z < 0.0) as usize,
        ];
        let mut hit = false;
        let mut todo = [0usize; MAX_TODO];
        let mut todo_offset = 0;
        let mut current = 0usize;
        loop {
            let fnode = &self.flat_nodes[current];
            if fnode.bounds.fast_intersect(ray, inv_dir, neg_dir) {
                if fnode.n_geom > 0 {
                    for i in 0..fnode.n_geom as usize {
                        if self.geometry[fnode.offset as usize + i].intersect(ray, dg) {
                            hit = true;
                        }
                    }
                    if todo_offset == 0 {
                        break;
                    }
                    todo_offset -= 1;
                    current = todo[todo_offset];
                } else if neg_dir[fnode.axis as usize] != 0 {
                    // Negative along the split axis: the second child is
                    // nearer, push the first
                    todo[todo_offset] = current + 1;
                    todo_offset += 1;
                    current = fnode.offset as usize;
                } else {
                    todo[todo_offset] = fnode.offset as usize;
                    todo_offset += 1;
                    current += 1;
                }
            } else {
                if todo_offset == 0 {
                    break;
                }
                todo_offset -= 1;
                current = todo[todo_offset];
            }
        }
        hit
    }

    fn build(
        &self,
        build_geom: &mut [GeomInfo],
        ordered: &mut Vec<usize>,
        start: usize,
        end: usize,
        total_nodes: &mut usize,
    ) -> BuildNode {
        *total_nodes += 1;
        let mut box_all = BBox::empty();
        for info in &build_geom[start..end] {
            box_all = box_all.union(&info.bounds);
        }
        let n_geom = end - start;
        if n_geom == 1 {
            return Self::build_leaf(build_geom, ordered, start, end, box_all);
        }

        // Split along the axis where the centroids spread the most
        let mut centroids = BBox::empty();
        for info in &build_geom[start..end] {
            centroids = centroids.union_point(info.center);
        }
        let axis = centroids.max_extent();
        let ax = axis.index();
        let mut mid = (start + end) / 2;

        // All centroids coincident: either one leaf, or a forced equal split
        // when too many primitives would land in it
        if centroids.max[ax] == centroids.min[ax] {
            if n_geom < self.max_geom {
                return Self::build_leaf(build_geom, ordered, start, end, box_all);
            }
            return BuildNode::Interior {
                children: [
                    Box::new(self.build(build_geom, ordered, start, mid, total_nodes)),
                    Box::new(self.build(build_geom, ordered, mid, end, total_nodes)),
                ],
                bounds: box_all,
                split: axis,
            };
        }

        let mut split_done = false;
        if self.split == SplitMethod::Middle {
            let mid_pt = 0.5 * (centroids.min[ax] + centroids.max[ax]);
            mid = start + partition(&mut build_geom[start..end], |g| g.center[ax] < mid_pt);
            // Heavily overlapping bounds can defeat the midpoint split;
            // fall through to an equal-count split
            split_done = mid != start && mid != end;
        }
        if !split_done && (self.split != SplitMethod::Sah || n_geom < 5) {
            mid = (start + end) / 2;
            build_geom[start..end].select_nth_unstable_by(mid - start, |a, b| {
                a.center[ax].partial_cmp(&b.center[ax]).unwrap()
            });
            split_done = true;
        }
        if !split_done {
            // SAH: bucket the centroids, cost each of the candidate splits,
            // and take the cheapest unless a leaf is cheaper still
            let mut buckets = [SahBucket {
                count: 0,
                bounds: BBox::empty(),
            }; SAH_BUCKETS];
            let bucket_of = |center: Point| -> usize {
                let b = ((center[ax] - centroids.min[ax])
                    / (centroids.max[ax] - centroids.min[ax])
                    * SAH_BUCKETS as f32) as usize;
                b.min(SAH_BUCKETS - 1)
            };
            for info in &build_geom[start..end] {
                let b = bucket_of(info.center);
                buckets[b].count += 1;
                buckets[b].bounds = buckets[b].bounds.union(&info.bounds);
            }
            // An empty side contributes nothing (not 0 · ∞ from the empty
            // box's infinite extent)
            let side_cost = |b: &SahBucket| {
                if b.count > 0 {
                    b.count as f32 * b.bounds.surface_area()
                } else {
                    0.0
                }
            };
            let mut cost = [0.0f32; SAH_BUCKETS - 1];
            for (i, c) in cost.iter_mut().enumerate() {
                let mut left = SahBucket { count: 0, bounds: BBox::empty() };
                let mut right = SahBucket { count: 0, bounds: BBox::empty() };
                for b in &buckets[..=i] {
                    left.bounds = left.bounds.union(&b.bounds);
                    left.count += b.count;
                }
                for b in &buckets[i + 1..] {
                    right.bounds = right.bounds.union(&b.bounds);
                    right.count += b.count;
                }
                *c = TRAVERSAL_COST
                    + (side_cost(&left) + side_cost(&right)) / box_all.surface_area();
            }
            let (min_idx, &min_cost) = cost
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .unwrap();
            if n_geom > self.max_geom || min_cost < n_geom as f32 {
                mid = start
                    + partition(&mut build_geom[start..end], |g| bucket_of(g.center) <= min_idx);
                // A one-sided bucket split degenerates; median-split instead
                if mid == start || mid == end {
                    mid = (start + end) / 2;
                    build_geom[start..end].select_nth_unstable_by(mid - start, |a, b| {
                        a.center[ax].partial_cmp(&b.center[ax]).unwrap()
                    });
                }
            } else {
                return Self::build_leaf(build_geom, ordered, start, end, box_all);
            }
        }

        debug_assert!(start != mid && mid != end);
        BuildNode::Interior {
            children: [
                Box::new(self.build(build_geom, ordered, start, mid, total_nodes)),
                Box::new(self.build(build_geom, ordered, mid, end, total_nodes)),
            ],
            bounds: box_all,
            split: axis,
        }
    }

    fn build_leaf(
        build_geom: &[GeomInfo],
        ordered: &mut Vec<usize>,
        start: usize,
        end: usize,
        bounds: BBox,
    ) -> BuildNode {
        let geom_offset = ordered.len();
        for info in &build_geom[start..end] {
            ordered.push(info.geom_idx);
        }
        BuildNode::Leaf {
            geom_offset,
            n_geom: end - start,
            bounds,
        }
    }

    /// DFS-linearizes the build tree: a parent emits itself, recurses into
    /// its first child (landing immediately after), then records where the
    /// second child began.
    fn flatten(&mut self, node: &BuildNode) -> usize {
        let node_offset = self.flat_nodes.len();
        match node {
            BuildNode::Leaf {
                geom_offset,
                n_geom,
                bounds,
            } => {
                self.flat_nodes.push(FlatNode {
                    bounds: *bounds,
                    offset: *geom_offset as u32,
                    n_geom: *n_geom as u16,
                    axis: 0,
                });
            }
            BuildNode::Interior {
                children,
                bounds,
                split,
            } => {
                self.flat_nodes.push(FlatNode {
                    bounds: *bounds,
                    offset: 0,
                    n_geom: 0,
                    axis: split.index() as u8,
                });
                self.flatten(&children[0]);
                let second = self.flatten(&children[1]);
                self.flat_nodes[node_offset].offset = second as u32;
            }
        }
        node_offset
    }
}

/// In-place partition: moves elements satisfying `pred` to the front and
/// returns the count that did.
fn partition<T>(slice: &mut [T], pred: impl Fn(&T) -> bool) -> usize {
    let mut split = 0;
    for i in 0..slice.len() {
        if pred(&slice[i]) {
            slice.swap(i, split);
            split += 1;
        }
    }
    split
}
