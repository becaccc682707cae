//! Shared helpers for the integration tests.

use phylofactor::{TipData, Tree};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// ((A,B),(C,D)): tips 0..4, internal nodes 4 (AB), 5 (CD), 6 (root).
pub fn four_tip_tree() -> Tree {
    Tree::from_newick("((A:1,B:1):1,(C:1,D:1):1);").unwrap()
}

/// A balanced eight-tip tree with tips A..H.
pub fn eight_tip_tree() -> Tree {
    Tree::from_newick("(((A:1,B:1):1,(C:1,D:1):1):1,((E:1,F:1):1,(G:1,H:1):1):1);").unwrap()
}

/// Data where tips A and B grow exponentially with the covariate while C and
/// D stay flat, so the covariate signal is strongest across the {A,B}|{C,D}
/// bipartition.
pub fn covariate_driven_data(n_samples: usize) -> TipData {
    let covariate = (0..n_samples).map(|s| s as f64).collect::<Vec<_>>();
    let samples = covariate
        .iter()
        .map(|&z| vec![z.exp(), z.exp(), 1.0, 1.0])
        .collect();
    TipData::new(["A", "B", "C", "D"].map(String::from).to_vec(), samples)
        .unwrap()
        .with_covariate(covariate)
        .unwrap()
}

/// Strictly positive pseudo-count data for the given tree, generated from a
/// seeded rng.
pub fn seeded_counts(tree: &Tree, n_samples: usize, seed: u64) -> TipData {
    let mut rng = StdRng::seed_from_u64(seed);
    let samples = (0..n_samples)
        .map(|_| (0..tree.n_tips()).map(|_| rng.gen_range(1..100) as f64).collect())
        .collect();
    TipData::new(tree.tip_labels().to_vec(), samples).unwrap()
}
