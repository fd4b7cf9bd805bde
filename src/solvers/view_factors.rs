// Copyright @yucwang 2026

use crate::core::config::ViewFactorConfig;
use crate::core::error::{ Result, ViewFactorError };
use crate::core::link_table::LinkTable;
use crate::core::occluder::{ OccluderScene, RayOccluder };
use crate::core::patch::{ patch_area, Patch };
use crate::core::rng::PairRng;
use crate::core::shape::ParametricSurface;
use crate::core::tree::PatchTree;
use crate::integrators::pairwise::{ resolve_pair, PairResolution, PairSettings, PairTrees };
use crate::math::constants::Float;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

// Top-level patches below this fraction of the mean area are skipped.
const DEGENERATE_AREA_FRACTION: Float = 1e-14;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub pairs_scheduled: usize,
    pub pairs_resolved: usize,
    pub pairs_aborted: usize,
    pub patches_skipped: usize,
    pub leaf_exchanges: usize,
    pub rays_cast: usize,
    pub tree_nodes: usize,
    pub truncated: bool,
    pub elapsed: Duration,
}

pub struct ViewFactorResult {
    pub table: LinkTable,
    pub stats: RunStats,
    /// Refined subdivision trees with their node-level links.
    pub trees: Vec<PatchTree>,
}

/// Computes the view factors of `patches` against the tessellated patches
/// themselves as occluders.
pub fn compute_view_factors(patches: &[Patch], config: &ViewFactorConfig) -> Result<ViewFactorResult> {
    config.validate()?;
    let occluder = OccluderScene::new(patches, config.curved_tessellation, config.ray_trim);
    compute_view_factors_with(patches, config, &occluder)
}

/// Self-pairs of curved patches first, then every distinct pair in
/// round-robin rounds of disjoint pairs.
pub fn pair_schedule(active: &[usize], curved: &[bool]) -> Vec<(usize, usize)> {
    let mut schedule: Vec<(usize, usize)> = active.iter()
        .filter(|&&i| curved[i])
        .map(|&i| (i, i))
        .collect();

    let mut slots: Vec<Option<usize>> = active.iter().map(|&i| Some(i)).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }
    let m = slots.len();
    for _round in 0..m.saturating_sub(1) {
        for k in 0..m / 2 {
            if let (Some(a), Some(b)) = (slots[k], slots[m - 1 - k]) {
                schedule.push((a.min(b), a.max(b)));
            }
        }
        // Circle method: slot 0 stays, the rest rotate by one.
        slots[1..].rotate_right(1);
    }
    schedule
}

fn lock(tree: &Mutex<PatchTree>) -> Result<MutexGuard<'_, PatchTree>> {
    tree.lock().map_err(|_| ViewFactorError::WorkerFailure("patch tree lock poisoned".to_string()))
}

fn resolve_scheduled(pair: (usize, usize),
                     trees: &[Mutex<PatchTree>],
                     settings: &PairSettings,
                     occluder: &dyn RayOccluder,
                     seed: u64) -> Result<PairResolution> {
    let (i, j) = pair;
    let mut rng = PairRng::for_pair(seed, i, j);
    if i == j {
        let mut tree = lock(&trees[i])?;
        return resolve_pair(pair, &mut PairTrees::Same(&mut *tree), settings, occluder, &mut rng);
    }

    // Ascending lock order.
    let (lo, hi) = (i.min(j), i.max(j));
    let mut first = lock(&trees[lo])?;
    let mut second = lock(&trees[hi])?;
    let mut pair_trees = if i == lo {
        PairTrees::Distinct(&mut *first, &mut *second)
    } else {
        PairTrees::Distinct(&mut *second, &mut *first)
    };
    resolve_pair(pair, &mut pair_trees, settings, occluder, &mut rng)
}

/// Same as `compute_view_factors` with a caller-supplied occluder.
pub fn compute_view_factors_with(patches: &[Patch],
                                 config: &ViewFactorConfig,
                                 occluder: &dyn RayOccluder) -> Result<ViewFactorResult> {
    config.validate()?;
    let start = Instant::now();
    let mut stats = RunStats::default();

    let areas: Vec<Float> = patches.iter().map(patch_area).collect();
    let n = patches.len();
    let mean_all = if n > 0 { areas.iter().sum::<Float>() / n as Float } else { 0.0 };

    let mut active = Vec::with_capacity(n);
    for (idx, patch) in patches.iter().enumerate() {
        let area = areas[idx];
        let degenerate = !(area.is_finite() && area > DEGENERATE_AREA_FRACTION * mean_all)
            || patch.centroid_normal().is_none();
        if degenerate {
            log::warn!("{}; skipped", ViewFactorError::DegenerateGeometry { patch: idx });
            stats.patches_skipped += 1;
        } else {
            active.push(idx);
        }
    }

    let mean_area = if active.is_empty() {
        0.0
    } else {
        active.iter().map(|&i| areas[i]).sum::<Float>() / active.len() as Float
    };
    let settings = PairSettings::from_config(config, mean_area);
    let curved: Vec<bool> = patches.iter().map(|p| !p.is_planar()).collect();
    let schedule = pair_schedule(&active, &curved);
    let total_pairs = schedule.len();
    stats.pairs_scheduled = total_pairs;

    let trees: Vec<Mutex<PatchTree>> = patches.iter().enumerate()
        .map(|(idx, p)| Mutex::new(PatchTree::new(idx, p.clone())))
        .collect();
    let mut table = LinkTable::new(areas.clone());

    let progress = if config.progress {
        ProgressBar::new(total_pairs as u64)
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} pairs")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let next_pair = Arc::new(AtomicUsize::new(0));
    let truncated = AtomicBool::new(false);
    let thread_count = config.worker_count().min(total_pairs.max(1));
    let (tx, rx) = mpsc::channel::<Result<PairResolution>>();
    let mut fatal: Option<ViewFactorError> = None;

    thread::scope(|scope| {
        for _ in 0..thread_count {
            let next_pair = Arc::clone(&next_pair);
            let tx = tx.clone();
            let schedule = &schedule;
            let trees = &trees;
            let settings = &settings;
            let truncated = &truncated;
            scope.spawn(move || {
                loop {
                    let pair_index = next_pair.fetch_add(1, Ordering::Relaxed);
                    if pair_index >= total_pairs {
                        break;
                    }
                    if let Some(budget) = config.time_budget {
                        if start.elapsed() >= budget {
                            truncated.store(true, Ordering::Relaxed);
                            break;
                        }
                    }

                    let result = resolve_scheduled(schedule[pair_index], trees, settings,
                                                   occluder, config.seed);
                    if tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }

        drop(tx);
        for result in rx.iter() {
            match result {
                Ok(resolution) => {
                    let (i, j) = resolution.pair;
                    let flux = resolution.total_flux();
                    if flux > 0.0 {
                        table.record(i, j, flux / areas[i]);
                        if i != j {
                            table.record(j, i, flux / areas[j]);
                        }
                    }
                    stats.pairs_resolved += 1;
                    stats.leaf_exchanges += resolution.exchanges.len();
                    stats.rays_cast += resolution.rays_cast;
                }
                Err(err @ ViewFactorError::ResourceExhaustion { .. }) => {
                    log::warn!("{}; pair aborted", err);
                    stats.pairs_aborted += 1;
                }
                Err(err) => {
                    if fatal.is_none() {
                        fatal = Some(err);
                    }
                }
            }
            progress.inc(1);
        }
    });
    progress.finish_and_clear();

    if let Some(err) = fatal {
        return Err(err);
    }

    let trees = trees.into_iter()
        .map(|t| t.into_inner()
            .map_err(|_| ViewFactorError::WorkerFailure("patch tree lock poisoned".to_string())))
        .collect::<Result<Vec<PatchTree>>>()?;
    stats.tree_nodes = trees.iter().map(|t| t.node_count()).sum();
    stats.truncated = truncated.load(Ordering::Relaxed);
    stats.elapsed = start.elapsed();

    if stats.truncated {
        log::warn!("time budget exhausted: {} of {} pairs resolved",
                   stats.pairs_resolved, stats.pairs_scheduled);
    }
    log::info!("view factors: {} patches, {} pairs, {} links, {} rays, {} nodes in {:.2?}",
               n, stats.pairs_resolved, table.link_count(), stats.rays_cast,
               stats.tree_nodes, stats.elapsed);

    Ok(ViewFactorResult { table, stats, trees })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::occluder::NoOcclusion;
    use crate::math::constants::Vector3f;
    use crate::shapes::bilinear::BiLinear;
    use crate::shapes::triangle::Triangle;
    use std::collections::HashSet;

    fn quad(c: [[Float; 3]; 4]) -> Patch {
        BiLinear::from_corners(c.map(|p| Vector3f::new(p[0], p[1], p[2]))).into()
    }

    fn square(z: Float, half: Float, up: bool) -> Patch {
        let (lo, hi) = (0.5 - half, 0.5 + half);
        if up {
            quad([[lo, lo, z], [hi, lo, z], [hi, hi, z], [lo, hi, z]])
        } else {
            quad([[lo, lo, z], [lo, hi, z], [hi, hi, z], [hi, lo, z]])
        }
    }

    /// Unit cube with all six faces pointing inwards.
    fn closed_box() -> Vec<Patch> {
        vec![
            quad([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
            quad([[0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 0.0, 1.0]]),
            quad([[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 0.0, 0.0]]),
            quad([[0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]]),
            quad([[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 1.0], [0.0, 0.0, 1.0]]),
            quad([[1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]]),
        ]
    }

    fn config(factor_eps: Float, area_eps: Float) -> ViewFactorConfig {
        ViewFactorConfig { factor_eps, area_eps, threads: 2, ..Default::default() }
    }

    #[test]
    fn test_schedule_covers_every_pair_once() {
        let active = vec![0, 2, 3, 5, 6];
        let mut curved = vec![false; 7];
        curved[3] = true;
        let schedule = pair_schedule(&active, &curved);

        assert_eq!(schedule[0], (3, 3));
        assert_eq!(schedule.len(), 1 + 10);
        let unique: HashSet<_> = schedule.iter().copied().collect();
        assert_eq!(unique.len(), schedule.len());
        for (x, &i) in active.iter().enumerate() {
            for &j in &active[x + 1..] {
                assert!(unique.contains(&(i, j)));
            }
        }

        // Pairs inside one round share no patch.
        let round: Vec<_> = schedule[1..3].to_vec();
        assert!(round[0].0 != round[1].0 && round[0].0 != round[1].1);
        assert!(round[0].1 != round[1].0 && round[0].1 != round[1].1);
    }

    #[test]
    fn test_parallel_squares_match_closed_form() {
        let patches = vec![square(0.0, 0.5, true), square(1.0, 0.5, false)];
        let result = compute_view_factors(&patches, &config(0.1, 0.1)).unwrap();
        let table = &result.table;

        assert!((table.factor(0, 1) - 0.19982).abs() < 5e-3);
        assert_eq!(table.factor(0, 1), table.factor(1, 0));
        assert_eq!(table.factor(0, 0), 0.0);
        assert_eq!(result.stats.pairs_scheduled, 1);
        assert_eq!(result.stats.pairs_resolved, 1);
        assert!(!result.stats.truncated);
    }

    #[test]
    fn test_closed_box_rows_sum_to_one() {
        let patches = closed_box();
        let result = compute_view_factors(&patches, &config(0.05, 0.02)).unwrap();
        let table = &result.table;

        for i in 0..patches.len() {
            assert!((table.row_sum(i) - 1.0).abs() < 0.05, "row {} sums to {}", i, table.row_sum(i));
            for (j, f) in table.row(i) {
                assert!((0.0..=1.0).contains(&f));
                assert!(table.reciprocity_error(i, j) < 1e-12);
            }
        }
        // Opposite faces, closed form for unit squares at unit distance.
        assert!((table.factor(0, 1) - 0.19982).abs() < 0.01);
    }

    #[test]
    fn test_tighter_thresholds_do_not_diverge() {
        let floor = quad([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        let wall = quad([[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 1.0], [0.0, 0.0, 1.0]]);
        let perpendicular = vec![floor, wall];
        let parallel = vec![square(0.0, 0.5, true), square(1.0, 0.5, false)];

        let deviation = |patches: &[Patch], eps: Float, exact: Float| {
            let result = compute_view_factors_with(patches, &config(eps, eps), &NoOcclusion).unwrap();
            assert_eq!(result.stats.pairs_resolved, 1);
            (result.table.factor(0, 1) - exact).abs()
        };

        let perpendicular_exact = 0.200_043_776_075_403;
        let coarse = deviation(&perpendicular, 1e-2, perpendicular_exact);
        let fine = deviation(&perpendicular, 1e-3, perpendicular_exact);
        assert!(coarse < 1e-4, "coarse deviation {}", coarse);
        assert!(fine <= coarse + 1e-5, "deviation grew from {} to {}", coarse, fine);

        let parallel_exact = 0.199_824_895_698_387;
        let coarse = deviation(&parallel, 1e-2, parallel_exact);
        let fine = deviation(&parallel, 1e-3, parallel_exact);
        assert!(coarse < 1e-4, "coarse deviation {}", coarse);
        assert!(fine <= coarse + 1e-6, "deviation grew from {} to {}", coarse, fine);
    }

    #[test]
    fn test_blocker_hides_facing_squares() {
        let patches = vec![square(0.0, 0.5, true), square(2.0, 0.5, false), square(1.0, 1.5, true)];
        let result = compute_view_factors(&patches, &config(0.5, 0.1)).unwrap();
        let table = &result.table;

        assert_eq!(table.factor(0, 1), 0.0);
        assert_eq!(table.factor(1, 0), 0.0);
        // Patch 1 looks down onto the blocker's front; patch 0 only sees its back.
        assert!(table.factor(1, 2) > 0.0);
        assert_eq!(table.factor(0, 2), 0.0);
        assert!(result.stats.rays_cast > 0);
    }

    #[test]
    fn test_curved_patch_gets_self_factor() {
        let saddle = quad([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 1.0], [0.0, 1.0, 0.0]]);
        let flat = square(0.0, 0.5, true);
        let result = compute_view_factors(&[saddle, flat], &config(0.05, 0.05)).unwrap();

        assert!(result.table.factor(0, 0) > 0.0);
        assert_eq!(result.table.factor(1, 1), 0.0);
        assert_eq!(result.stats.pairs_scheduled, 2);
    }

    #[test]
    fn test_degenerate_patch_is_skipped() {
        let point = Vector3f::new(0.3, 0.3, 0.3);
        let degenerate: Patch = Triangle::new(point, point, point).into();
        let patches = vec![square(0.0, 0.5, true), degenerate, square(1.0, 0.5, false)];
        let result = compute_view_factors(&patches, &config(0.1, 0.1)).unwrap();

        assert_eq!(result.stats.patches_skipped, 1);
        assert_eq!(result.stats.pairs_scheduled, 1);
        assert_eq!(result.table.row_sum(1), 0.0);
        assert!(result.table.factor(0, 2) > 0.19);
    }

    #[test]
    fn test_result_independent_of_thread_count() {
        let patches = closed_box();
        let run = |threads: usize| {
            let config = ViewFactorConfig { factor_eps: 0.1, area_eps: 0.1, threads,
                                            seed: 42, ..Default::default() };
            let result = compute_view_factors(&patches, &config).unwrap();
            result.table.links().collect::<Vec<_>>()
        };
        assert_eq!(run(1), run(4));
    }

    #[test]
    fn test_depth_guard_aborts_pairs() {
        let patches = vec![square(0.0, 0.5, true), square(1.0, 0.5, false)];
        let config = ViewFactorConfig { factor_eps: 1e-9, area_eps: 1e-9, max_depth: 4,
                                        ..Default::default() };
        let result = compute_view_factors(&patches, &config).unwrap();

        assert_eq!(result.stats.pairs_aborted, 1);
        assert_eq!(result.stats.pairs_resolved, 0);
        assert_eq!(result.table.link_count(), 0);
        assert!(result.trees.iter().all(|t| t.link_count() == 0));
    }

    #[test]
    fn test_zero_time_budget_truncates() {
        let patches = closed_box();
        let config = ViewFactorConfig { time_budget: Some(Duration::ZERO), ..Default::default() };
        let result = compute_view_factors(&patches, &config).unwrap();

        assert!(result.stats.truncated);
        assert_eq!(result.stats.pairs_resolved, 0);
        assert_eq!(result.table.link_count(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let patches = vec![square(0.0, 0.5, true)];
        let config = ViewFactorConfig { nrays: 0, ..Default::default() };
        assert!(matches!(compute_view_factors(&patches, &config),
                         Err(ViewFactorError::InvalidConfig(_))));
    }
}
