// Copyright @yucwang 2026

use std::collections::BTreeMap;

use crate::math::constants::Float;

/// Sparse view-factor matrix between top-level patches. Row `i` holds the
/// factors from patch `i` to every patch it sees.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    areas: Vec<Float>,
    rows: Vec<BTreeMap<usize, Float>>,
}

impl LinkTable {
    pub fn new(areas: Vec<Float>) -> Self {
        let rows = vec![BTreeMap::new(); areas.len()];
        Self { areas, rows }
    }

    /// Adds `factor` to the `from -> to` entry. Entries stay in [0, 1].
    pub fn record(&mut self, from: usize, to: usize, factor: Float) {
        let entry = self.rows[from].entry(to).or_insert(0.0);
        *entry = (*entry + factor).clamp(0.0, 1.0);
    }

    pub fn factor(&self, from: usize, to: usize) -> Float {
        self.rows.get(from).and_then(|r| r.get(&to)).copied().unwrap_or(0.0)
    }

    pub fn row(&self, from: usize) -> impl Iterator<Item = (usize, Float)> + '_ {
        self.rows[from].iter().map(|(&to, &f)| (to, f))
    }

    pub fn row_sum(&self, from: usize) -> Float {
        self.rows[from].values().sum()
    }

    pub fn area(&self, patch: usize) -> Float {
        self.areas[patch]
    }

    /// `|A_i F_ij - A_j F_ji|`
    pub fn reciprocity_error(&self, i: usize, j: usize) -> Float {
        (self.areas[i] * self.factor(i, j) - self.areas[j] * self.factor(j, i)).abs()
    }

    /// Number of source patches.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn link_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }

    /// All links as `(from, to, factor)`, ascending by source then target.
    pub fn links(&self) -> impl Iterator<Item = (usize, usize, Float)> + '_ {
        self.rows.iter().enumerate()
            .flat_map(|(i, r)| r.iter().map(move |(&j, &f)| (i, j, f)))
    }
}
