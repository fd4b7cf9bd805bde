// Copyright @yucwang 2026

//! Adaptive resolution of one pair of top-level patches.
//!
//! The pair is refined on an explicit work list. Each task compares the two
//! midpoint estimates of the exchange; clearly negligible tasks are dropped,
//! inconclusive ones are settled by Monte Carlo visibility, and everything
//! else is split on the side with the larger estimated exchange.

use crate::core::config::ViewFactorConfig;
use crate::core::error::{ Result, ViewFactorError };
use crate::core::occluder::RayOccluder;
use crate::core::rng::PairRng;
use crate::core::tree::{ Link, NodeId, PatchTree, ROOT };
use crate::integrators::form_factor::{ estimate_from_centroid, integrate_area_to_area };
use crate::integrators::visibility::{ count_unblocked, visible_fraction };
use crate::math::constants::Float;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// The subdivision trees touched by one pair. A self-pair works on a single
/// tree for both sides.
pub enum PairTrees<'a> {
    Same(&'a mut PatchTree),
    Distinct(&'a mut PatchTree, &'a mut PatchTree),
}

impl<'a> PairTrees<'a> {
    pub fn is_same(&self) -> bool {
        matches!(self, PairTrees::Same(_))
    }

    pub fn tree(&self, side: Side) -> &PatchTree {
        match (self, side) {
            (PairTrees::Same(t), _) => &**t,
            (PairTrees::Distinct(a, _), Side::A) => &**a,
            (PairTrees::Distinct(_, b), Side::B) => &**b,
        }
    }

    pub fn tree_mut(&mut self, side: Side) -> &mut PatchTree {
        match (self, side) {
            (PairTrees::Same(t), _) => &mut **t,
            (PairTrees::Distinct(a, _), Side::A) => &mut **a,
            (PairTrees::Distinct(_, b), Side::B) => &mut **b,
        }
    }
}

/// Thresholds of the resolution, with the area threshold in absolute units.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSettings {
    pub nrays: usize,
    pub factor_eps: Float,
    pub area_eps: Float,
    pub negligible_factor: Float,
    pub max_depth: u32,
    pub min_refinement: u32,
}

impl PairSettings {
    pub fn from_config(config: &ViewFactorConfig, mean_area: Float) -> Self {
        Self {
            nrays: config.nrays,
            factor_eps: config.factor_eps,
            area_eps: config.area_eps * mean_area,
            negligible_factor: config.negligible_factor,
            max_depth: config.max_depth,
            min_refinement: config.min_refinement,
        }
    }
}

/// A finalised leaf pair: node `a` on side A, node `b` on side B.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LeafExchange {
    pub a: NodeId,
    pub b: NodeId,
    /// `A_a F_ab`, already scaled by the visible fraction.
    pub flux: Float,
    pub fa: Float,
    pub fb: Float,
}

/// Everything one pair produced, held back until the pair completes.
#[derive(Debug, Clone, PartialEq)]
pub struct PairResolution {
    pub pair: (usize, usize),
    pub exchanges: Vec<LeafExchange>,
    pub rays_cast: usize,
    pub tasks: usize,
}

impl PairResolution {
    fn new(pair: (usize, usize)) -> Self {
        Self { pair, exchanges: Vec::new(), rays_cast: 0, tasks: 0 }
    }

    pub fn is_self_pair(&self) -> bool {
        self.pair.0 == self.pair.1
    }

    /// Total exchange `A_i F_ij` between the two top-level patches. Inside a
    /// self-pair a leaf pair of distinct nodes exchanges in both directions.
    pub fn total_flux(&self) -> Float {
        self.exchanges.iter()
            .map(|e| if self.is_self_pair() && e.a != e.b { 2.0 * e.flux } else { e.flux })
            .sum()
    }

    /// Appends node-level links for every finalised leaf pair.
    pub fn commit(&self, trees: &mut PairTrees<'_>) {
        let same = trees.is_same();
        for e in &self.exchanges {
            let target_b = trees.tree(Side::B).patch_ref(e.b);
            let target_a = trees.tree(Side::A).patch_ref(e.a);
            trees.tree_mut(Side::A).record(e.a, Link { target: target_b, factor: e.fa });
            if !(same && e.a == e.b) {
                trees.tree_mut(Side::B).record(e.b, Link { target: target_a, factor: e.fb });
            }
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Task {
    a: NodeId,
    b: NodeId,
    level_a: u32,
    level_b: u32,
    depth: u32,
}

enum Split {
    SelfPair,
    A,
    B,
}

enum Step {
    Done,
    Refine { fa: Float, fb: Float },
}

struct PairResolver<'r, 't> {
    trees: &'r mut PairTrees<'t>,
    settings: &'r PairSettings,
    occluder: &'r dyn RayOccluder,
    rng: &'r mut PairRng,
    out: PairResolution,
}

fn ratio(flux: Float, area: Float) -> Float {
    if area > 0.0 {
        (flux / area).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl<'r, 't> PairResolver<'r, 't> {
    fn run(mut self) -> Result<PairResolution> {
        let mut stack = vec![Task { a: ROOT, b: ROOT, level_a: 0, level_b: 0, depth: 0 }];
        while let Some(task) = stack.pop() {
            self.out.tasks += 1;
            if task.depth > self.settings.max_depth {
                return Err(ViewFactorError::ResourceExhaustion { pair: self.out.pair,
                                                                 depth: task.depth });
            }

            let self_pair = self.trees.is_same() && task.a == task.b;
            let min = self.settings.min_refinement;
            let split = if self_pair && task.level_a < min {
                Split::SelfPair
            } else if !self_pair && task.level_a < min {
                Split::A
            } else if !self_pair && task.level_b < min {
                Split::B
            } else {
                match self.evaluate(&task, self_pair) {
                    Step::Done => continue,
                    Step::Refine { .. } if self_pair => Split::SelfPair,
                    Step::Refine { fa, fb } if fa > fb => Split::B,
                    Step::Refine { .. } => Split::A,
                }
            };

            self.split(&task, split, &mut stack);
        }
        Ok(self.out)
    }

    fn evaluate(&mut self, task: &Task, self_pair: bool) -> Step {
        let area_a = self.trees.tree_mut(Side::A).area(task.a);
        let area_b = self.trees.tree_mut(Side::B).area(task.b);
        let ga = self.trees.tree(Side::A).geometry(task.a);
        let gb = self.trees.tree(Side::B).geometry(task.b);
        let s = self.settings;

        let fa = estimate_from_centroid(ga, gb);
        let fb = if self_pair { fa } else { estimate_from_centroid(gb, ga) };
        if fa < s.negligible_factor && fb < s.negligible_factor {
            return Step::Done;
        }

        let within = |band: Float| {
            (fa < band * s.factor_eps || area_b < band * s.area_eps)
                && (fb < band * s.factor_eps || area_a < band * s.area_eps)
        };
        if within(1.0) {
            let hit = count_unblocked(ga, gb, s.nrays, self.occluder, self.rng);
            self.out.rays_cast += s.nrays;
            if hit == 0 {
                return Step::Done;
            }
            if hit == s.nrays || within(0.5) {
                let flux = visible_fraction(hit, s.nrays) * integrate_area_to_area(ga, gb);
                self.out.exchanges.push(LeafExchange { a: task.a, b: task.b, flux,
                                                       fa: ratio(flux, area_a),
                                                       fb: ratio(flux, area_b) });
                return Step::Done;
            }
        }

        Step::Refine { fa, fb }
    }

    fn split(&mut self, task: &Task, split: Split, stack: &mut Vec<Task>) {
        let depth = task.depth + 1;
        match split {
            Split::SelfPair => {
                let (l, r) = self.trees.tree_mut(Side::B).refine(task.b);
                let child = |a, b| Task { a, b, level_a: task.level_a + 1,
                                          level_b: task.level_b + 1, depth };
                stack.push(child(l, r));
                stack.push(child(r, r));
                stack.push(child(l, l));
            }
            Split::B => {
                let (l, r) = self.trees.tree_mut(Side::B).refine(task.b);
                let child = |b| Task { b, level_b: task.level_b + 1, depth, ..*task };
                stack.push(child(r));
                stack.push(child(l));
            }
            Split::A => {
                let (l, r) = self.trees.tree_mut(Side::A).refine(task.a);
                let child = |a| Task { a, level_a: task.level_a + 1, depth, ..*task };
                stack.push(child(r));
                stack.push(child(l));
            }
        }
    }
}

/// Resolves the pair of top-level patches behind `trees`. Node links are
/// committed only when the whole pair succeeds; a pair that exceeds
/// `max_depth` leaves no links behind.
pub fn resolve_pair(pair: (usize, usize),
                    trees: &mut PairTrees<'_>,
                    settings: &PairSettings,
                    occluder: &dyn RayOccluder,
                    rng: &mut PairRng) -> Result<PairResolution> {
    let resolver = PairResolver { trees: &mut *trees, settings, occluder, rng,
                                  out: PairResolution::new(pair) };
    let resolution = resolver.run()?;
    resolution.commit(trees);
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::occluder::{ NoOcclusion, OccluderScene };
    use crate::core::patch::{ patch_area, Patch };
    use crate::math::constants::Vector3f;
    use crate::shapes::bilinear::BiLinear;

    fn square(z: Float, half: Float, up: bool) -> Patch {
        let mut quad = BiLinear::from_corners([Vector3f::new(0.5 - half, 0.5 - half, z),
                                               Vector3f::new(0.5 + half, 0.5 - half, z),
                                               Vector3f::new(0.5 + half, 0.5 + half, z),
                                               Vector3f::new(0.5 - half, 0.5 + half, z)]);
        if !up {
            quad.flip_normals();
        }
        quad.into()
    }

    fn settings(factor_eps: Float, area_eps: Float) -> PairSettings {
        PairSettings { nrays: 16, factor_eps, area_eps, negligible_factor: 1e-10,
                       max_depth: 64, min_refinement: 1 }
    }

    fn leaf_flux(tree: &mut PatchTree) -> Float {
        let leaves: Vec<NodeId> = (0..tree.node_count()).collect();
        leaves.into_iter()
            .map(|id| {
                let f: Float = tree.node(id).links().iter().map(|l| l.factor).sum();
                f * tree.area(id)
            })
            .sum()
    }

    #[test]
    fn test_parallel_squares_unoccluded() {
        let mut ta = PatchTree::new(0, square(0.0, 0.5, true));
        let mut tb = PatchTree::new(1, square(1.0, 0.5, false));
        let mut rng = PairRng::for_pair(0, 0, 1);
        let resolution = resolve_pair((0, 1),
                                      &mut PairTrees::Distinct(&mut ta, &mut tb),
                                      &settings(0.1, 0.1), &NoOcclusion, &mut rng)
            .unwrap();

        assert!(!resolution.exchanges.is_empty());
        assert!((resolution.total_flux() - 0.19982).abs() < 2e-3);
        assert!((leaf_flux(&mut ta) - resolution.total_flux()).abs() < 1e-12);
        assert!((leaf_flux(&mut tb) - resolution.total_flux()).abs() < 1e-12);
        assert!(ta.node(ROOT).links().is_empty());
        assert!(!ta.node(ROOT).is_leaf());
    }

    #[test]
    fn test_blocked_pair_records_nothing() {
        let a = square(0.0, 0.5, true);
        let b = square(2.0, 0.5, false);
        let scene = OccluderScene::new(&[a.clone(), b.clone(), square(1.0, 1.5, true)], 4, 1e-4);

        let mut ta = PatchTree::new(0, a);
        let mut tb = PatchTree::new(1, b);
        let mut rng = PairRng::for_pair(0, 0, 1);
        let resolution = resolve_pair((0, 1),
                                      &mut PairTrees::Distinct(&mut ta, &mut tb),
                                      &settings(0.5, 0.1), &scene, &mut rng)
            .unwrap();

        assert!(resolution.rays_cast > 0);
        assert!(resolution.exchanges.is_empty());
        assert_eq!(resolution.total_flux(), 0.0);
        assert_eq!(ta.link_count() + tb.link_count(), 0);
    }

    #[test]
    fn test_flat_self_pair_is_zero() {
        let mut tree = PatchTree::new(0, square(0.0, 0.5, true));
        let mut rng = PairRng::for_pair(0, 0, 0);
        let resolution = resolve_pair((0, 0), &mut PairTrees::Same(&mut tree),
                                      &settings(0.1, 0.1), &NoOcclusion, &mut rng)
            .unwrap();
        assert_eq!(resolution.total_flux(), 0.0);
        assert_eq!(resolution.rays_cast, 0);
        assert_eq!(tree.link_count(), 0);
    }

    #[test]
    fn test_curved_self_pair_sees_itself() {
        let saddle: Patch = BiLinear::from_corners([Vector3f::new(0.0, 0.0, 0.0),
                                                    Vector3f::new(1.0, 0.0, 0.0),
                                                    Vector3f::new(1.0, 1.0, 1.0),
                                                    Vector3f::new(0.0, 1.0, 0.0)]).into();
        let area = patch_area(&saddle);
        let mut tree = PatchTree::new(0, saddle);
        let mut rng = PairRng::for_pair(0, 0, 0);
        let resolution = resolve_pair((0, 0), &mut PairTrees::Same(&mut tree),
                                      &settings(0.05, 0.05), &NoOcclusion, &mut rng)
            .unwrap();

        let f = resolution.total_flux() / area;
        assert!(f > 0.0 && f < 1.0);
        assert!(tree.link_count() > 0);
    }

    #[test]
    fn test_depth_guard_aborts_without_links() {
        let mut ta = PatchTree::new(0, square(0.0, 0.5, true));
        let mut tb = PatchTree::new(1, square(1.0, 0.5, false));
        let mut rng = PairRng::for_pair(0, 0, 1);
        let mut tight = settings(1e-12, 1e-12);
        tight.max_depth = 3;

        let result = resolve_pair((0, 1), &mut PairTrees::Distinct(&mut ta, &mut tb),
                                  &tight, &NoOcclusion, &mut rng);
        match result {
            Err(ViewFactorError::ResourceExhaustion { pair, depth }) => {
                assert_eq!(pair, (0, 1));
                assert_eq!(depth, 4);
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.tasks)),
        }
        assert_eq!(ta.link_count() + tb.link_count(), 0);
    }

    #[test]
    fn test_same_seed_same_result() {
        let run = || {
            let a = square(0.0, 0.5, true);
            let b = square(2.0, 0.5, false);
            let blocker = BiLinear::from_corners([Vector3f::new(-1.0, -1.0, 1.0),
                                                  Vector3f::new(0.5, -1.0, 1.0),
                                                  Vector3f::new(0.5, 2.0, 1.0),
                                                  Vector3f::new(-1.0, 2.0, 1.0)]);
            let scene = OccluderScene::new(&[a.clone(), b.clone(), blocker.into()], 4, 1e-4);
            let mut ta = PatchTree::new(0, a);
            let mut tb = PatchTree::new(1, b);
            let mut rng = PairRng::for_pair(9, 0, 1);
            resolve_pair((0, 1), &mut PairTrees::Distinct(&mut ta, &mut tb),
                         &settings(0.1, 0.1), &scene, &mut rng).unwrap()
        };
        let first = run();
        assert_eq!(first, run());
        assert!(first.total_flux() > 0.0);
    }
}
