use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OffTargetError, Result};
use crate::util::dna;

/// 一段带坐标与链信息的基因组序列
///
/// - 坐标为 1-based、闭区间；`end_coord` 由序列长度推导
/// - 序列总是按 `is_positive_strand` 所在链的 5'→3' 方向存放
/// - 反向互补不改变坐标，只翻转链方向与序列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct GenomicWindow {
    genome: String,
    chromosome: String,
    start_coord: u64,
    is_positive_strand: bool,
    sequence: String,
}

/// 反序列化的中间形态，经 [`GenomicWindow::new`] 校验后才成为窗口
#[derive(Deserialize)]
struct RawWindow {
    genome: String,
    chromosome: String,
    start_coord: u64,
    is_positive_strand: bool,
    sequence: String,
}

impl TryFrom<RawWindow> for GenomicWindow {
    type Error = OffTargetError;

    fn try_from(raw: RawWindow) -> Result<Self> {
        GenomicWindow::new(raw.genome, raw.chromosome, raw.start_coord, raw.is_positive_strand, &raw.sequence)
    }
}

impl GenomicWindow {
    pub fn new(
        genome: impl Into<String>,
        chromosome: impl Into<String>,
        start_coord: u64,
        is_positive_strand: bool,
        sequence: &str,
    ) -> Result<Self> {
        if sequence.is_empty() {
            return Err(OffTargetError::EmptySequence("genomic"));
        }
        if start_coord == 0 {
            return Err(OffTargetError::InvalidCoordinates { start: 0, end: sequence.len() as u64 });
        }
        let norm = dna::normalize_seq(sequence.as_bytes());
        Ok(Self {
            genome: genome.into(),
            chromosome: chromosome.into(),
            start_coord,
            is_positive_strand,
            sequence: String::from_utf8_lossy(&norm).into_owned(),
        })
    }

    pub fn genome(&self) -> &str {
        &self.genome
    }

    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    pub fn start_coord(&self) -> u64 {
        self.start_coord
    }

    pub fn end_coord(&self) -> u64 {
        self.start_coord + self.sequence.len() as u64 - 1
    }

    pub fn is_positive_strand(&self) -> bool {
        self.is_positive_strand
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn strand_symbol(&self) -> char {
        if self.is_positive_strand {
            '+'
        } else {
            '-'
        }
    }

    /// 另一条链上的同一区间
    pub fn reverse_complement(&self) -> Self {
        let rc = dna::revcomp(self.sequence.as_bytes());
        Self {
            genome: self.genome.clone(),
            chromosome: self.chromosome.clone(),
            start_coord: self.start_coord,
            is_positive_strand: !self.is_positive_strand,
            sequence: String::from_utf8_lossy(&rc).into_owned(),
        }
    }

    /// 去掉 5' 端 `n` 个碱基（按本链方向）
    pub fn trim_5prime(&self, n: usize) -> Result<Self> {
        self.check_trim(n)?;
        // 正链 5' 端是低坐标，负链 5' 端是高坐标
        let start_coord = if self.is_positive_strand { self.start_coord + n as u64 } else { self.start_coord };
        Ok(self.with_sequence(start_coord, self.sequence[n..].to_string()))
    }

    /// 去掉 3' 端 `n` 个碱基（按本链方向）
    pub fn trim_3prime(&self, n: usize) -> Result<Self> {
        self.check_trim(n)?;
        let start_coord = if self.is_positive_strand { self.start_coord } else { self.start_coord + n as u64 };
        let keep = self.sequence.len() - n;
        Ok(self.with_sequence(start_coord, self.sequence[..keep].to_string()))
    }

    /// 第 `offset` 个碱基（0-based，按本链方向）对应的基因组坐标
    pub fn coord_at(&self, offset: usize) -> u64 {
        if self.is_positive_strand {
            self.start_coord + offset as u64
        } else {
            self.end_coord() - offset as u64
        }
    }

    fn check_trim(&self, n: usize) -> Result<()> {
        if n >= self.sequence.len() {
            return Err(OffTargetError::InvalidTrim { trim: n, len: self.sequence.len() });
        }
        Ok(())
    }

    fn with_sequence(&self, start_coord: u64, sequence: String) -> Self {
        Self {
            genome: self.genome.clone(),
            chromosome: self.chromosome.clone(),
            start_coord,
            is_positive_strand: self.is_positive_strand,
            sequence,
        }
    }
}

impl fmt::Display for GenomicWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<GenomicWindow {} {}:{}-{} {}>",
            self.genome,
            self.chromosome,
            self.start_coord,
            self.end_coord(),
            self.strand_symbol()
        )
    }
}
