//! Random part lists resembling cabinet jobs.
//!
//! Mixes tall side panels, thin strips (plinths, rails) and general shelves or
//! doors. Generation is deterministic for a given seed.

use crate::geometry::Mm;
use crate::part::PartRequest;
use crate::Result;
use rand::prelude::*;
use std::ops::RangeInclusive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters of the random part generator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RandomPartsConfig {
    pub seed: u64,
    /// Number of distinct part types.
    pub n_unique: usize,
    pub qty_range: RangeInclusive<usize>,
    pub w_range: RangeInclusive<Mm>,
    pub h_range: RangeInclusive<Mm>,
    /// Probability a part may not be rotated.
    pub p_no_rotate: f64,
    /// Probability of a tall panel.
    pub p_tall: f64,
    pub tall_w_range: RangeInclusive<Mm>,
    pub tall_h_range: RangeInclusive<Mm>,
    /// Probability of a thin strip.
    pub p_strip: f64,
    pub strip_w_range: RangeInclusive<Mm>,
    pub strip_h_range: RangeInclusive<Mm>,
    /// Upper bound on generated `(w, h)`, usually the usable board size.
    pub max_size: Option<(Mm, Mm)>,
}

impl Default for RandomPartsConfig {
    fn default() -> Self {
        Self {
            seed: 123,
            n_unique: 25,
            qty_range: 1..=4,
            w_range: 80..=900,
            h_range: 80..=2400,
            p_no_rotate: 0.35,
            p_tall: 0.20,
            tall_w_range: 300..=650,
            tall_h_range: 1800..=2600,
            p_strip: 0.15,
            strip_w_range: 400..=1200,
            strip_h_range: 60..=180,
            max_size: None,
        }
    }
}

impl RandomPartsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_unique(mut self, n_unique: usize) -> Self {
        self.n_unique = n_unique;
        self
    }

    pub fn with_max_size(mut self, w: Mm, h: Mm) -> Self {
        self.max_size = Some((w, h));
        self
    }
}

/// Generates part requests named `P01`, `P02`, ...
pub fn generate_random_parts(config: &RandomPartsConfig) -> Result<Vec<PartRequest>> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut parts = Vec::with_capacity(config.n_unique);

    for i in 0..config.n_unique {
        let r: f64 = rng.gen();
        let (mut w, mut h) = if r < config.p_tall {
            (
                rng.gen_range(config.tall_w_range.clone()),
                rng.gen_range(config.tall_h_range.clone()),
            )
        } else if r < config.p_tall + config.p_strip {
            (
                rng.gen_range(config.strip_w_range.clone()),
                rng.gen_range(config.strip_h_range.clone()),
            )
        } else {
            (
                rng.gen_range(config.w_range.clone()),
                rng.gen_range(config.h_range.clone()),
            )
        };

        if let Some((max_w, max_h)) = config.max_size {
            w = w.min(max_w);
            h = h.min(max_h);
        }

        let qty = rng.gen_range(config.qty_range.clone());
        let can_rotate = !rng.gen_bool(config.p_no_rotate.clamp(0.0, 1.0));

        parts.push(PartRequest::new(format!("P{:02}", i + 1), w, h, qty)?.with_rotation(can_rotate));
    }

    Ok(parts)
}

/// Scales every dimension by `factor`, keeping at least 1 mm.
pub fn scale_parts(parts: &[PartRequest], factor: f64) -> Result<Vec<PartRequest>> {
    parts
        .iter()
        .map(|p| rebuild(p, p.name().to_string(), scale(p.w(), factor), scale(p.h(), factor)))
        .collect()
}

/// Renames every part to `"{prefix}_{name}"`, useful when merging jobs.
pub fn add_job_prefix(parts: &[PartRequest], prefix: &str) -> Result<Vec<PartRequest>> {
    parts
        .iter()
        .map(|p| rebuild(p, format!("{}_{}", prefix, p.name()), p.w(), p.h()))
        .collect()
}

fn scale(value: Mm, factor: f64) -> Mm {
    ((value as f64 * factor).round() as Mm).max(1)
}

fn rebuild(p: &PartRequest, name: String, w: Mm, h: Mm) -> Result<PartRequest> {
    let mut out = PartRequest::new(name, w, h, p.qty())?.with_rotation(p.can_rotate());
    for (k, v) in p.meta() {
        out = out.with_meta(k.clone(), v.clone());
    }
    Ok(out)
}
