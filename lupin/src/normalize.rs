//! Dispersion normalization of feature blocks

use crate::common::*;
use crate::feature_block::{BlockKind, FeatureBlock};

/// Per-block trust weights (connectivity, depth, spread)
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrustWeights {
    pub connectivity: f64,
    pub depth: f64,
    pub spread: f64,
}

impl Default for TrustWeights {
    fn default() -> Self {
        let [connectivity, depth, spread] = DEFAULT_TRUST_WEIGHTS;
        Self {
            connectivity,
            depth,
            spread,
        }
    }
}

impl TrustWeights {
    pub fn of(&self, kind: BlockKind) -> f64 {
        match kind {
            BlockKind::Connectivity => self.connectivity,
            BlockKind::Depth => self.depth,
            BlockKind::Spread => self.spread,
        }
    }
}

impl std::str::FromStr for TrustWeights {
    type Err = anyhow::Error;

    /// Parse `con,dep,spr`
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let w = s
            .split(',')
            .map(|x| x.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if w.len() != 3 {
            anyhow::bail!("expected 3 comma-separated weights, found {}", w.len());
        }
        if w.iter().any(|x| !x.is_finite() || *x < 0.0) {
            anyhow::bail!("weights must be finite and non-negative: {}", s);
        }
        Ok(Self {
            connectivity: w[0],
            depth: w[1],
            spread: w[2],
        })
    }
}

/// Sum of per-column variances over all rows
pub fn dispersion(block: &FeatureBlock) -> Result<f64> {
    if block.ncols() == 0 {
        return Err(LupinError::EmptyBlock { block: block.kind() });
    }
    if block.nrows() < 2 {
        return Err(LupinError::TooFewRows {
            block: block.kind(),
            nrows: block.nrows(),
        });
    }
    Ok(block.mat().total_dispersion())
}

/// `block / dispersion(block) * weight`
///
/// The dispersion is handed to the observer before anything is
/// divided, so a degenerate block is still visible in the log.
pub fn normalize_block(
    block: &FeatureBlock,
    weight: f64,
    observer: &mut dyn StageObserver,
) -> Result<FeatureBlock> {
    let disp = dispersion(block)?;
    observer.dispersion(block.kind(), disp);

    if disp <= 0.0 || !disp.is_finite() {
        return Err(LupinError::ZeroDispersion { block: block.kind() });
    }

    block.with_mat(block.mat() * (weight / disp))
}
