// phylogeny.rs - Distance-based trees for the three aligned core genomes

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::distance::DistanceMetric;
use crate::data::{NamedSequences, GAP, GENOME_COUNT};
use crate::error::{Result, TrioError};

/// Pairs in selection order; the first minimal pair wins ties
const PAIR_ORDER: [(usize, usize); 3] = [(0, 1), (0, 2), (1, 2)];

/// Differences below this are treated as ties when picking a pair
const TIE_TOLERANCE: f64 = 1e-12;

/// Symmetric distance matrix with a zero diagonal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceMatrix {
    names: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl DistanceMatrix {
    /// Pairwise distances between every pair of sequences
    pub fn from_sequences(sequences: &NamedSequences, metric: &DistanceMetric) -> Result<Self> {
        let rows: Vec<(&str, &[u8])> = sequences.rows().collect();
        let n = rows.len();
        let mut values = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let d = metric.compute(rows[i].1, rows[j].1)?;
                values[i][j] = d;
                values[j][i] = d;
            }
        }

        Ok(Self {
            names: rows.iter().map(|(name, _)| name.to_string()).collect(),
            values,
        })
    }

    pub fn from_values(names: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        let n = names.len();
        if values.len() != n || values.iter().any(|row| row.len() != n) {
            return Err(TrioError::InvalidInput(format!(
                "distance matrix for {} names must be {}x{}",
                n, n, n
            )));
        }
        for i in 0..n {
            if values[i][i] != 0.0 {
                return Err(TrioError::InvalidInput(format!(
                    "non-zero diagonal for '{}'",
                    names[i]
                )));
            }
            for j in (i + 1)..n {
                let d = values[i][j];
                if d < 0.0 || !d.is_finite() || (d - values[j][i]).abs() > TIE_TOLERANCE {
                    return Err(TrioError::InvalidInput(format!(
                        "distance between '{}' and '{}' must be finite, non-negative and symmetric",
                        names[i], names[j]
                    )));
                }
            }
        }
        Ok(Self { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    fn require_three_taxa(&self) -> Result<()> {
        if self.len() != GENOME_COUNT {
            return Err(TrioError::InvalidInput(format!(
                "tree construction needs exactly {} taxa, got {}",
                GENOME_COUNT,
                self.len()
            )));
        }
        Ok(())
    }

    /// Index pair in `PAIR_ORDER` minimizing `score`
    fn select_pair(&self, score: impl Fn(usize, usize) -> f64) -> (usize, usize) {
        let mut best = PAIR_ORDER[0];
        let mut best_score = score(best.0, best.1);
        for &(i, j) in &PAIR_ORDER[1..] {
            let s = score(i, j);
            if s < best_score - TIE_TOLERANCE {
                best = (i, j);
                best_score = s;
            }
        }
        best
    }
}

/// Tree node: a genome name or a set of child branches
#[derive(Debug, Clone, PartialEq)]
pub enum PhyloNode {
    Leaf(String),
    Internal(Vec<Branch>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub node: PhyloNode,
    pub length: f64,
}

impl Branch {
    fn new(node: PhyloNode, length: f64) -> Self {
        Self { node, length }
    }
}

/// Three-leaf tree `(C:x, (A:a, B:b):x)` where A and B are the joined pair
#[derive(Debug, Clone, PartialEq)]
pub struct PhyloTree {
    pub root: PhyloNode,
}

impl PhyloTree {
    fn three_taxa(names: &[String], pair: (usize, usize), lengths: (f64, f64), outer: f64) -> Self {
        let (a, b) = pair;
        let c = third_taxon(pair);
        let cherry = PhyloNode::Internal(vec![
            Branch::new(PhyloNode::Leaf(names[a].clone()), lengths.0),
            Branch::new(PhyloNode::Leaf(names[b].clone()), lengths.1),
        ]);
        PhyloTree {
            root: PhyloNode::Internal(vec![
                Branch::new(PhyloNode::Leaf(names[c].clone()), outer),
                Branch::new(cherry, outer),
            ]),
        }
    }

    pub fn newick(&self) -> String {
        let mut out = String::new();
        write_node(&self.root, &mut out);
        out
    }
}

impl fmt::Display for PhyloTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.newick())
    }
}

fn write_node(node: &PhyloNode, out: &mut String) {
    match node {
        PhyloNode::Leaf(name) => out.push_str(name),
        PhyloNode::Internal(branches) => {
            out.push('(');
            for (idx, branch) in branches.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                write_node(&branch.node, out);
                out.push(':');
                out.push_str(&format_length(branch.length));
            }
            out.push(')');
        }
    }
}

/// Round to 4 decimals and print without trailing zeros
pub fn format_length(length: f64) -> String {
    let rounded = (length * 10_000.0).round() / 10_000.0;
    // -0.0 prints as "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}", rounded)
}

/// Result of joining the closest pair of three taxa
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Join {
    pub pair: (usize, usize),
    /// Branch lengths from the new node to each member of `pair`
    pub lengths: (f64, f64),
}

/// UPGMA join: the smallest distance, split evenly
pub fn upgma_join(matrix: &DistanceMatrix) -> Result<Join> {
    matrix.require_three_taxa()?;
    let (a, b) = matrix.select_pair(|i, j| matrix.get(i, j));
    let half = matrix.get(a, b) / 2.0;
    Ok(Join {
        pair: (a, b),
        lengths: (half, half),
    })
}

/// Neighbor-Joining step for three taxa (net divergence divisor n - 2 = 1)
pub fn nj_join(matrix: &DistanceMatrix) -> Result<Join> {
    matrix.require_three_taxa()?;
    let divergence: Vec<f64> = (0..GENOME_COUNT)
        .map(|x| (0..GENOME_COUNT).map(|y| matrix.get(x, y)).sum())
        .collect();

    let (a, b) = matrix.select_pair(|i, j| matrix.get(i, j) - divergence[i] - divergence[j]);
    let d = matrix.get(a, b);
    Ok(Join {
        pair: (a, b),
        lengths: (
            (d + divergence[a] - divergence[b]) / 2.0,
            (d + divergence[b] - divergence[a]) / 2.0,
        ),
    })
}

/// Column-wise consensus of two aligned sequences: agreeing symbols are kept,
/// a symbol beats a gap, and two different symbols are picked at random
pub fn consensus<R: Rng>(seq1: &[u8], seq2: &[u8], rng: &mut R) -> Result<Vec<u8>> {
    if seq1.len() != seq2.len() {
        return Err(TrioError::LengthMismatch {
            left: seq1.len(),
            right: seq2.len(),
        });
    }

    Ok(seq1
        .iter()
        .zip(seq2)
        .map(|(&a, &b)| match (a, b) {
            _ if a == b => a,
            (GAP, _) => b,
            (_, GAP) => a,
            _ => {
                if rng.random_bool(0.5) {
                    a
                } else {
                    b
                }
            }
        })
        .collect())
}

/// Keep the alignment columns where the rows do not all agree
pub fn select_variable_sites(aligned: &NamedSequences, exclude_gaps: bool) -> Result<NamedSequences> {
    let rows: Vec<(&str, &[u8])> = aligned.rows().collect();
    let Some(&(first_name, first)) = rows.first() else {
        return Err(TrioError::EmptyInput("no aligned sequences".to_string()));
    };
    for &(name, row) in &rows[1..] {
        if row.len() != first.len() {
            return Err(TrioError::RaggedAlignment {
                context: format!("'{}' (against '{}')", name, first_name),
                expected: first.len(),
                found: row.len(),
            });
        }
    }

    let columns: Vec<usize> = (0..first.len())
        .filter(|&col| {
            let symbol = first[col];
            let variable = rows.iter().any(|(_, row)| row[col] != symbol);
            let gapped = rows.iter().any(|(_, row)| row[col] == GAP);
            variable && !(exclude_gaps && gapped)
        })
        .collect();

    Ok(rows
        .iter()
        .map(|(name, row)| {
            (
                name.to_string(),
                columns.iter().map(|&col| row[col]).collect::<Vec<u8>>(),
            )
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TreeMethod {
    NeighborJoining,
    Upgma,
    Both,
}

impl TreeMethod {
    /// Concrete methods to run, NJ first
    pub fn methods(&self) -> Vec<TreeMethod> {
        match self {
            TreeMethod::Both => vec![TreeMethod::NeighborJoining, TreeMethod::Upgma],
            other => vec![*other],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TreeMethod::NeighborJoining => "nj",
            TreeMethod::Upgma => "upgma",
            TreeMethod::Both => "both",
        }
    }
}

impl FromStr for TreeMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nj" | "neighbor-joining" => Ok(TreeMethod::NeighborJoining),
            "upgma" => Ok(TreeMethod::Upgma),
            "both" => Ok(TreeMethod::Both),
            _ => Err(format!(
                "Invalid tree method: {}. Valid options: nj, upgma, both",
                s
            )),
        }
    }
}

impl fmt::Display for TreeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Builds three-leaf trees from aligned core genomes
#[derive(Debug, Clone, Default)]
pub struct PhylogenyBuilder {
    pub metric: DistanceMetric,
    /// Seed for consensus tie-breaks; `None` draws from the OS
    pub seed: Option<u64>,
}

impl PhylogenyBuilder {
    pub fn new(metric: DistanceMetric, seed: Option<u64>) -> Self {
        Self { metric, seed }
    }

    pub fn distance_matrix(&self, aligned: &NamedSequences) -> Result<DistanceMatrix> {
        let matrix = DistanceMatrix::from_sequences(aligned, &self.metric)?;
        matrix.require_three_taxa()?;
        Ok(matrix)
    }

    pub fn upgma(&self, aligned: &NamedSequences) -> Result<PhyloTree> {
        let matrix = self.distance_matrix(aligned)?;
        let join = upgma_join(&matrix)?;
        let (a, b) = join.pair;
        let c = third_taxon(join.pair);
        let outer = (matrix.get(c, a) + matrix.get(c, b)) / 2.0;
        Ok(PhyloTree::three_taxa(matrix.names(), join.pair, join.lengths, outer))
    }

    pub fn neighbor_joining(&self, aligned: &NamedSequences) -> Result<PhyloTree> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.neighbor_joining_with_rng(aligned, &mut rng)
    }

    pub fn neighbor_joining_with_rng<R: Rng>(
        &self,
        aligned: &NamedSequences,
        rng: &mut R,
    ) -> Result<PhyloTree> {
        let matrix = self.distance_matrix(aligned)?;
        let join = nj_join(&matrix)?;
        let rows: Vec<&[u8]> = aligned.rows().map(|(_, seq)| seq).collect();
        let (a, b) = join.pair;
        let c = third_taxon(join.pair);

        let merged = consensus(rows[a], rows[b], rng)?;
        let outer = self.metric.compute(&merged, rows[c])? / 2.0;
        Ok(PhyloTree::three_taxa(matrix.names(), join.pair, join.lengths, outer))
    }

    /// One tree per concrete method
    pub fn build(
        &self,
        method: TreeMethod,
        aligned: &NamedSequences,
    ) -> Result<Vec<(TreeMethod, PhyloTree)>> {
        method
            .methods()
            .into_iter()
            .map(|m| {
                let tree = match m {
                    TreeMethod::Upgma => self.upgma(aligned)?,
                    _ => self.neighbor_joining(aligned)?,
                };
                Ok((m, tree))
            })
            .collect()
    }
}

fn third_taxon(pair: (usize, usize)) -> usize {
    GENOME_COUNT * (GENOME_COUNT - 1) / 2 - pair.0 - pair.1
}
