//! Parent selection over a population sorted best-first.

use rand::{Rng, RngCore};

use crate::domain::models::{SearchConfig, SelectionKind};

/// Picks the index of a parent from a population sorted best-first.
pub trait SelectionFunction: Send + Sync {
    fn select_index(&self, population_size: usize, rng: &mut dyn RngCore) -> usize;
}

/// Rank selection with a linear bias toward the front of the population.
#[derive(Debug, Clone, Copy)]
pub struct RankSelection {
    bias: f64,
}

impl RankSelection {
    pub fn new(bias: f64) -> Self {
        Self {
            bias: bias.clamp(1.0, 2.0),
        }
    }
}

impl SelectionFunction for RankSelection {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn select_index(&self, population_size: usize, rng: &mut dyn RngCore) -> usize {
        if population_size == 0 {
            return 0;
        }
        let r: f64 = rng.gen();
        let bias = self.bias;
        let fraction = if (bias - 1.0).abs() < f64::EPSILON {
            r
        } else {
            (bias - (bias * bias - 4.0 * (bias - 1.0) * r).sqrt()) / 2.0 / (bias - 1.0)
        };
        ((population_size as f64 * fraction) as usize).min(population_size - 1)
    }
}

/// Tournament selection: the best of `size` uniformly drawn individuals.
#[derive(Debug, Clone, Copy)]
pub struct TournamentSelection {
    size: usize,
}

impl TournamentSelection {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }
}

impl SelectionFunction for TournamentSelection {
    fn select_index(&self, population_size: usize, rng: &mut dyn RngCore) -> usize {
        if population_size == 0 {
            return 0;
        }
        // Sorted best-first, so the smallest drawn index wins.
        (0..self.size)
            .map(|_| rng.gen_range(0..population_size))
            .min()
            .unwrap_or(0)
    }
}

/// Selection function configured for the search.
pub fn selection_from_config(config: &SearchConfig) -> Box<dyn SelectionFunction> {
    match config.selection {
        SelectionKind::Rank => Box::new(RankSelection::new(config.rank_bias)),
        SelectionKind::Tournament => Box::new(TournamentSelection::new(config.tournament_size)),
    }
}
