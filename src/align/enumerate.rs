use std::collections::BTreeSet;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::format::ALIGNMENT_GAP_CHARACTER;
use crate::error::{OffTargetError, Result};
use crate::util::dna;

/// 四个互相独立的上限，比对必须同时满足
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentBudget {
    pub mismatches: usize,
    pub total_bulges: usize,
    pub rna_bulges: usize,
    pub dna_bulges: usize,
}

impl AlignmentBudget {
    pub fn new(mismatches: usize, total_bulges: usize, rna_bulges: usize, dna_bulges: usize) -> Self {
        Self { mismatches, total_bulges, rna_bulges, dna_bulges }
    }

    pub fn admits(&self, mismatches: usize, rna_bulges: usize, dna_bulges: usize) -> bool {
        mismatches <= self.mismatches
            && rna_bulges <= self.rna_bulges
            && dna_bulges <= self.dna_bulges
            && rna_bulges + dna_bulges <= self.total_bulges
    }
}

impl Default for AlignmentBudget {
    fn default() -> Self {
        Self::new(3, 1, 1, 1)
    }
}

/// 一对带空位的序列行（query 在前）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlignedPair {
    pub query: String,
    pub genome: String,
}

/// 带窗口内起点的比对
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Placement {
    /// 比对第一列所在的窗口偏移（0-based）
    pub genome_start: usize,
    /// 比对覆盖的基因组碱基数
    pub genome_len: usize,
    pub mismatches: usize,
    pub rna_bulges: usize,
    pub dna_bulges: usize,
    pub pair: AlignedPair,
}

/// 搜索树上的一个节点；每次分支都复制出新快照，分支之间互不影响
#[derive(Clone)]
struct Partial {
    qi: usize,
    gi: usize,
    start: usize,
    mismatches: usize,
    rna: usize,
    dna: usize,
    last_aligned: bool,
    query: String,
    genome: String,
}

impl Partial {
    fn aligned(&self, q: u8, g: u8) -> Self {
        let mut next = self.clone();
        if !dna::bases_match(q, g) {
            next.mismatches += 1;
        }
        next.query.push(q as char);
        next.genome.push(g as char);
        next.qi += 1;
        next.gi += 1;
        next.last_aligned = true;
        next
    }

    /// guide 碱基无配对
    fn rna_bulge(&self, q: u8) -> Self {
        let mut next = self.clone();
        next.query.push(q as char);
        next.genome.push(ALIGNMENT_GAP_CHARACTER);
        next.qi += 1;
        next.rna += 1;
        next.last_aligned = false;
        next
    }

    /// 基因组多出一个碱基
    fn dna_bulge(&self, g: u8) -> Self {
        let mut next = self.clone();
        next.query.push(ALIGNMENT_GAP_CHARACTER);
        next.genome.push(g as char);
        next.gi += 1;
        next.dna += 1;
        next.last_aligned = false;
        next
    }
}

/// 枚举窗口内所有满足预算的比对（含起点），按 (起点, 序列对) 去重
///
/// 比对的首列与末列必须是碱基对（匹配或错配），bulge 只出现在内部；
/// 得分等价但 bulge 位置不同的比对不合并。
pub fn enumerate_placements(query: &[u8], window: &[u8], budget: &AlignmentBudget) -> Result<Vec<Placement>> {
    if query.is_empty() {
        return Err(OffTargetError::EmptySequence("query"));
    }
    if window.is_empty() {
        return Err(OffTargetError::EmptySequence("genomic"));
    }

    let m = query.len();
    let n = window.len();
    let mut found: BTreeSet<Placement> = BTreeSet::new();
    let mut stack: Vec<Partial> = Vec::new();
    let mut visited = 0usize;

    for start in 0..n {
        stack.push(Partial {
            qi: 0,
            gi: start,
            start,
            mismatches: 0,
            rna: 0,
            dna: 0,
            last_aligned: false,
            query: String::with_capacity(m + budget.dna_bulges),
            genome: String::with_capacity(m + budget.dna_bulges),
        });

        while let Some(node) = stack.pop() {
            visited += 1;
            if node.qi == m {
                if node.last_aligned {
                    found.insert(Placement {
                        genome_start: node.start,
                        genome_len: node.gi - node.start,
                        mismatches: node.mismatches,
                        rna_bulges: node.rna,
                        dna_bulges: node.dna,
                        pair: AlignedPair { query: node.query, genome: node.genome },
                    });
                }
                continue;
            }

            let q = query[node.qi];
            let first = node.qi == 0 && node.gi == node.start;

            if node.gi < n {
                let next = node.aligned(q, window[node.gi]);
                if next.mismatches <= budget.mismatches {
                    stack.push(next);
                }
            }
            if first {
                continue;
            }
            let bulges = node.rna + node.dna;
            if bulges < budget.total_bulges {
                if node.rna < budget.rna_bulges {
                    stack.push(node.rna_bulge(q));
                }
                if node.dna < budget.dna_bulges && node.gi < n {
                    stack.push(node.dna_bulge(window[node.gi]));
                }
            }
        }
    }

    trace!("visited {} search states for a {} bp window", visited, n);
    debug!(
        "enumerated {} placements (budget mm={} bulges={} rna={} dna={})",
        found.len(),
        budget.mismatches,
        budget.total_bulges,
        budget.rna_bulges,
        budget.dna_bulges
    );
    Ok(found.into_iter().collect())
}

/// 所有满足预算的不同比对，按序列对去重
///
/// 没有满足预算的比对时返回空集合，这不是错误。
pub fn enumerate_alignments(query: &[u8], window: &[u8], budget: &AlignmentBudget) -> Result<BTreeSet<AlignedPair>> {
    Ok(enumerate_placements(query, window, budget)?
        .into_iter()
        .map(|p| p.pair)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(query: &str, window: &str, budget: AlignmentBudget) -> BTreeSet<AlignedPair> {
        enumerate_alignments(query.as_bytes(), window.as_bytes(), &budget).unwrap()
    }

    fn pair(q: &str, g: &str) -> AlignedPair {
        AlignedPair { query: q.to_string(), genome: g.to_string() }
    }

    #[test]
    fn exact_match_only_with_zero_budget() {
        let got = pairs("ACGTTGCA", "ACGTTGCA", AlignmentBudget::new(0, 0, 0, 0));
        assert_eq!(got, BTreeSet::from([pair("ACGTTGCA", "ACGTTGCA")]));
        let got = pairs("ACGTTGCA", "ACGTTGCA", AlignmentBudget::new(0, 1, 1, 0));
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn dna_bulge_needed() {
        assert!(pairs("ACGTTGCA", "ACGTATGCA", AlignmentBudget::new(0, 0, 0, 0)).is_empty());
        let got = pairs("ACGTTGCA", "ACGTATGCA", AlignmentBudget::new(0, 1, 0, 1));
        assert_eq!(got, BTreeSet::from([pair("ACGT-TGCA", "ACGTATGCA")]));
    }

    #[test]
    fn dna_bulge_with_one_mismatch() {
        let got = pairs("ACGTTGCA", "ACGTATGCA", AlignmentBudget::new(1, 1, 0, 1));
        let expected = BTreeSet::from([
            pair("ACG-TTGCA", "ACGTATGCA"),
            pair("ACGT-TGCA", "ACGTATGCA"),
            pair("ACGTT-GCA", "ACGTATGCA"),
        ]);
        assert_eq!(got, expected);
    }

    #[test]
    fn rna_bulge_needed() {
        let got = pairs("ACGTATGCA", "ACGTTGCA", AlignmentBudget::new(0, 1, 1, 0));
        assert_eq!(got, BTreeSet::from([pair("ACGTATGCA", "ACGT-TGCA")]));
        // DNA bulge 额度不能替代 RNA bulge
        assert!(pairs("ACGTATGCA", "ACGTTGCA", AlignmentBudget::new(0, 1, 0, 1)).is_empty());
    }

    #[test]
    fn equivalent_bulge_placements_are_kept_apart() {
        let got = pairs("AAGTTCC", "AAGTTTCC", AlignmentBudget::new(0, 1, 0, 1));
        let expected = BTreeSet::from([
            pair("AAG-TTCC", "AAGTTTCC"),
            pair("AAGT-TCC", "AAGTTTCC"),
            pair("AAGTT-CC", "AAGTTTCC"),
        ]);
        assert_eq!(got, expected);
    }

    #[test]
    fn placements_carry_offsets() {
        let got = enumerate_placements(b"GGAC", b"TTGGACTT", &AlignmentBudget::new(0, 0, 0, 0)).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!((got[0].genome_start, got[0].genome_len), (2, 4));
    }

    #[test]
    fn short_window_is_empty_not_error() {
        assert!(pairs("ACGTACGT", "ACG", AlignmentBudget::new(2, 2, 2, 2)).is_empty());
        assert!(enumerate_alignments(b"", b"ACGT", &AlignmentBudget::default()).is_err());
        assert!(enumerate_alignments(b"ACGT", b"", &AlignmentBudget::default()).is_err());
    }

    #[test]
    fn widening_any_budget_never_shrinks_results() {
        let query = b"GTTAGGACTATTAGCG";
        let window = b"TTGTTAGGACGTATTAGCTGACC";
        let base = AlignmentBudget::new(1, 1, 1, 1);
        let before = enumerate_alignments(query, window, &base).unwrap();
        assert!(!before.is_empty());
        for wider in [
            AlignmentBudget { mismatches: 2, ..base },
            AlignmentBudget { total_bulges: 2, ..base },
            AlignmentBudget { rna_bulges: 2, ..base },
            AlignmentBudget { dna_bulges: 2, ..base },
        ] {
            let after = enumerate_alignments(query, window, &wider).unwrap();
            assert!(before.is_subset(&after), "{:?} lost alignments", wider);
        }
    }

    #[test]
    fn every_result_respects_budget_and_round_trips() {
        let query = "GTTAGGACTATTAGCG";
        let budget = AlignmentBudget::new(2, 2, 1, 2);
        for p in pairs(query, "TTGTTAGGACGTATTAGCTGACC", budget) {
            assert_eq!(p.query.len(), p.genome.len());
            assert_eq!(p.query.replace('-', ""), query);
            let gaps_q = p.query.matches('-').count();
            let gaps_g = p.genome.matches('-').count();
            let mm = p
                .query
                .bytes()
                .zip(p.genome.bytes())
                .filter(|&(q, g)| q != b'-' && g != b'-' && !dna::bases_match(q, g))
                .count();
            assert!(budget.admits(mm, gaps_g, gaps_q), "{:?}", p);
        }
    }
}
