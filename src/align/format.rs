use serde::{Deserialize, Serialize};

use super::cigar::{Cigar, CigarOp};
use crate::error::{OffTargetError, Result};
use crate::util::dna;

/// 序列行中的空位字符
pub const ALIGNMENT_GAP_CHARACTER: char = '-';
/// 指示行：匹配（含简并匹配）
pub const VERTICAL_ALIGNMENT_MATCH_CHARACTER: char = '|';
/// 指示行：错配
pub const VERTICAL_ALIGNMENT_MISMATCH_CHARACTER: char = 'X';
/// 指示行：RNA bulge（guide 碱基在基因组上无配对）
pub const VERTICAL_ALIGNMENT_RNA_BULGE_CHARACTER: char = '-';
/// 指示行：DNA bulge（基因组多出的碱基）
pub const VERTICAL_ALIGNMENT_DNA_BULGE_CHARACTER: char = '+';
/// guide 与 PAM 之间的分隔符
pub const SEPARATOR_BETWEEN_GUIDE_AND_PAM: char = ' ';

/// 逐列对应的三行比对：带空位的 guide+PAM、指示行、带空位的基因组片段
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormattedAlignment {
    pub query: String,
    pub indicator: String,
    pub genome: String,
}

/// 单列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Match,
    Mismatch,
    RnaBulge,
    DnaBulge,
}

impl Column {
    /// 按两条序列行判断列类型；`pattern` 来自 guide/PAM
    pub fn classify(pattern: u8, observed: u8) -> Column {
        let gap = ALIGNMENT_GAP_CHARACTER as u8;
        if pattern == gap {
            Column::DnaBulge
        } else if observed == gap {
            Column::RnaBulge
        } else if dna::bases_match(pattern, observed) {
            Column::Match
        } else {
            Column::Mismatch
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Column::Match => VERTICAL_ALIGNMENT_MATCH_CHARACTER,
            Column::Mismatch => VERTICAL_ALIGNMENT_MISMATCH_CHARACTER,
            Column::RnaBulge => VERTICAL_ALIGNMENT_RNA_BULGE_CHARACTER,
            Column::DnaBulge => VERTICAL_ALIGNMENT_DNA_BULGE_CHARACTER,
        }
    }
}

impl FormattedAlignment {
    pub fn new(query: String, indicator: String, genome: String) -> Result<Self> {
        if query.len() != indicator.len() || query.len() != genome.len() {
            return Err(OffTargetError::MisalignedColumns {
                query: query.len(),
                indicator: indicator.len(),
                genome: genome.len(),
            });
        }
        Ok(Self { query, indicator, genome })
    }

    /// 由两条带空位的序列行生成指示行
    pub fn from_pair(query: &str, genome: &str) -> Result<Self> {
        if query.len() != genome.len() {
            return Err(OffTargetError::MisalignedColumns {
                query: query.len(),
                indicator: query.len(),
                genome: genome.len(),
            });
        }
        let indicator = query
            .bytes()
            .zip(genome.bytes())
            .map(|(q, g)| Column::classify(q, g).symbol())
            .collect();
        Ok(Self { query: query.to_string(), indicator, genome: genome.to_string() })
    }

    pub fn len(&self) -> usize {
        self.query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.query.bytes().zip(self.genome.bytes()).map(|(q, g)| Column::classify(q, g))
    }

    /// 去掉空位后的 guide+PAM
    pub fn ungapped_query(&self) -> String {
        self.query.chars().filter(|&c| c != ALIGNMENT_GAP_CHARACTER).collect()
    }

    pub fn ungapped_genome(&self) -> String {
        self.genome.chars().filter(|&c| c != ALIGNMENT_GAP_CHARACTER).collect()
    }

    pub fn mismatches(&self) -> usize {
        self.columns().filter(|&c| c == Column::Mismatch).count()
    }

    pub fn rna_bulges(&self) -> usize {
        self.columns().filter(|&c| c == Column::RnaBulge).count()
    }

    pub fn dna_bulges(&self) -> usize {
        self.columns().filter(|&c| c == Column::DnaBulge).count()
    }
}

/// 把去侧翼后的 CIGAR 展开为三行比对
///
/// `genome` 只包含比对覆盖的基因组片段（侧翼已去掉）。`=`/`X` 游程逐列经
/// 简并匹配重新判断，因此 `X` 也可能显示为匹配（如 R 对 G）。
pub fn format_alignment(interior: &Cigar, query: &[u8], genome: &[u8]) -> Result<FormattedAlignment> {
    if interior.query_len() != query.len() || interior.genome_len() != genome.len() {
        return Err(OffTargetError::StructuralInvariantViolation {
            cigar: interior.to_string(),
            reason: format!(
                "encoding spans {} query / {} genome bases, got {} / {}",
                interior.query_len(),
                interior.genome_len(),
                query.len(),
                genome.len()
            ),
        });
    }

    let width = interior.runs().iter().map(|&(_, n)| n).sum();
    let mut q_line = String::with_capacity(width);
    let mut ind_line = String::with_capacity(width);
    let mut g_line = String::with_capacity(width);
    let mut qi = 0usize;
    let mut gi = 0usize;

    for &(op, n) in interior.runs() {
        match op {
            CigarOp::Match | CigarOp::Mismatch => {
                for _ in 0..n {
                    let (q, g) = (query[qi], genome[gi]);
                    q_line.push(q as char);
                    ind_line.push(Column::classify(q, g).symbol());
                    g_line.push(g as char);
                    qi += 1;
                    gi += 1;
                }
            }
            CigarOp::Insertion => {
                for _ in 0..n {
                    q_line.push(query[qi] as char);
                    ind_line.push(VERTICAL_ALIGNMENT_RNA_BULGE_CHARACTER);
                    g_line.push(ALIGNMENT_GAP_CHARACTER);
                    qi += 1;
                }
            }
            CigarOp::Deletion => {
                for _ in 0..n {
                    q_line.push(ALIGNMENT_GAP_CHARACTER);
                    ind_line.push(VERTICAL_ALIGNMENT_DNA_BULGE_CHARACTER);
                    g_line.push(genome[gi] as char);
                    gi += 1;
                }
            }
        }
    }

    FormattedAlignment::new(q_line, ind_line, g_line)
}

/// 在 guide 与 PAM 的交界处给三行同时插入分隔符
///
/// 交界位于第 `guide_len` 个非空位 query 字符之后。
pub fn insert_separator_between_guide_and_pam(
    alignment: &FormattedAlignment,
    guide_len: usize,
) -> Result<FormattedAlignment> {
    let gap = ALIGNMENT_GAP_CHARACTER as u8;
    let mut consumed = 0usize;
    let mut cut = None;
    for (col, q) in alignment.query.bytes().enumerate() {
        if q != gap {
            consumed += 1;
        }
        if consumed == guide_len {
            cut = Some(col + 1);
            break;
        }
    }
    let cut = match cut {
        Some(c) if guide_len > 0 => c,
        _ => {
            return Err(OffTargetError::StructuralInvariantViolation {
                cigar: alignment.query.clone(),
                reason: format!("guide length {} not found in aligned query", guide_len),
            })
        }
    };

    let split = |s: &str| format!("{}{}{}", &s[..cut], SEPARATOR_BETWEEN_GUIDE_AND_PAM, &s[cut..]);
    FormattedAlignment::new(split(&alignment.query), split(&alignment.indicator), split(&alignment.genome))
}
