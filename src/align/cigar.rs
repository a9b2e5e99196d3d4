use std::fmt;
use std::str::FromStr;

use crate::error::{OffTargetError, Result};

/// 扩展 CIGAR 操作（`=` / `X` / `I` / `D`）
///
/// 以检索序列（guide+PAM）为 query、基因组为 reference：
/// `I` 消耗 query 不消耗基因组（RNA bulge），`D` 消耗基因组不消耗 query（DNA bulge 或两侧侧翼）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarOp {
    Match,
    Mismatch,
    Insertion,
    Deletion,
}

impl CigarOp {
    pub fn symbol(self) -> char {
        match self {
            CigarOp::Match => '=',
            CigarOp::Mismatch => 'X',
            CigarOp::Insertion => 'I',
            CigarOp::Deletion => 'D',
        }
    }

    pub fn from_symbol(c: char) -> Result<Self> {
        match c {
            '=' => Ok(CigarOp::Match),
            'X' => Ok(CigarOp::Mismatch),
            'I' => Ok(CigarOp::Insertion),
            'D' => Ok(CigarOp::Deletion),
            other => Err(OffTargetError::UnsupportedRunType(other)),
        }
    }

    pub fn consumes_query(self) -> bool {
        !matches!(self, CigarOp::Deletion)
    }

    pub fn consumes_genome(self) -> bool {
        !matches!(self, CigarOp::Insertion)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cigar {
    runs: Vec<(CigarOp, usize)>,
}

impl Cigar {
    pub fn from_runs(runs: Vec<(CigarOp, usize)>) -> Self {
        Self { runs }
    }

    /// 逐列操作 → 游程编码
    pub fn from_ops(ops: &[CigarOp]) -> Self {
        let mut runs: Vec<(CigarOp, usize)> = Vec::new();
        for &op in ops {
            match runs.last_mut() {
                Some((cur, len)) if *cur == op => *len += 1,
                _ => runs.push((op, 1)),
            }
        }
        Self { runs }
    }

    pub fn runs(&self) -> &[(CigarOp, usize)] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn query_len(&self) -> usize {
        self.runs.iter().filter(|(op, _)| op.consumes_query()).map(|&(_, n)| n).sum()
    }

    pub fn genome_len(&self) -> usize {
        self.runs.iter().filter(|(op, _)| op.consumes_genome()).map(|&(_, n)| n).sum()
    }

    /// 去掉首尾的 `D` 侧翼，并校验剩余部分的结构
    ///
    /// 期望形状：`[nD] interior [mD]`，interior 非空、首尾不为 `D`、
    /// 每个游程长度 > 0 且相邻游程操作不同。
    pub fn trim_flanks(&self) -> Result<TrimmedCigar> {
        let violation = |reason: &str| OffTargetError::StructuralInvariantViolation {
            cigar: self.to_string(),
            reason: reason.to_string(),
        };

        if self.runs.is_empty() {
            return Err(violation("empty encoding"));
        }
        if self.runs.iter().any(|&(_, n)| n == 0) {
            return Err(violation("zero-length run"));
        }
        if self.runs.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(violation("adjacent runs share an operation"));
        }

        let mut interior = &self.runs[..];
        let mut leading = 0;
        let mut trailing = 0;
        if let Some(&(CigarOp::Deletion, n)) = interior.first() {
            leading = n;
            interior = &interior[1..];
        }
        if let Some(&(CigarOp::Deletion, n)) = interior.last() {
            trailing = n;
            interior = &interior[..interior.len() - 1];
        }
        if interior.is_empty() {
            return Err(violation("no aligned query bases between the flanking deletions"));
        }
        if interior.first().map(|r| r.0) == Some(CigarOp::Deletion)
            || interior.last().map(|r| r.0) == Some(CigarOp::Deletion)
        {
            return Err(violation("interior begins or ends with a deletion"));
        }

        Ok(TrimmedCigar {
            leading_deletions: leading,
            interior: Cigar::from_runs(interior.to_vec()),
            trailing_deletions: trailing,
        })
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &(op, n) in &self.runs {
            write!(f, "{}{}", n, op.symbol())?;
        }
        Ok(())
    }
}

impl FromStr for Cigar {
    type Err = OffTargetError;

    fn from_str(cigar: &str) -> Result<Self> {
        let mut runs = Vec::new();
        let mut num = 0usize;
        let mut have_num = false;
        for ch in cigar.chars() {
            if let Some(d) = ch.to_digit(10) {
                num = num * 10 + d as usize;
                have_num = true;
            } else {
                let op = CigarOp::from_symbol(ch)?;
                if !have_num {
                    return Err(OffTargetError::StructuralInvariantViolation {
                        cigar: cigar.to_string(),
                        reason: format!("run '{}' has no length", ch),
                    });
                }
                runs.push((op, num));
                num = 0;
                have_num = false;
            }
        }
        if have_num {
            return Err(OffTargetError::StructuralInvariantViolation {
                cigar: cigar.to_string(),
                reason: "trailing length without an operation".to_string(),
            });
        }
        Ok(Self { runs })
    }
}

/// 去侧翼后的比对几何
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedCigar {
    /// 比对起点之前的基因组碱基数
    pub leading_deletions: usize,
    pub interior: Cigar,
    /// 比对终点之后的基因组碱基数
    pub trailing_deletions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_print() {
        let c: Cigar = "5D20=1X2=4D".parse().unwrap();
        assert_eq!(c.runs().len(), 5);
        assert_eq!(c.to_string(), "5D20=1X2=4D");
        assert_eq!(c.query_len(), 23);
        assert_eq!(c.genome_len(), 32);
    }

    #[test]
    fn run_length_compaction() {
        use CigarOp::*;
        let c = Cigar::from_ops(&[Deletion, Deletion, Match, Match, Mismatch, Insertion, Match]);
        assert_eq!(c.to_string(), "2D2=1X1I1=");
        assert!(Cigar::from_ops(&[]).is_empty());
    }

    #[test]
    fn trims_flanks() {
        let c: Cigar = "8D20=1X2=7D".parse().unwrap();
        let t = c.trim_flanks().unwrap();
        assert_eq!(t.leading_deletions, 8);
        assert_eq!(t.trailing_deletions, 7);
        assert_eq!(t.interior.to_string(), "20=1X2=");

        let t = "3=1I19=".parse::<Cigar>().unwrap().trim_flanks().unwrap();
        assert_eq!((t.leading_deletions, t.trailing_deletions), (0, 0));
    }

    #[test]
    fn interior_bulges_survive_trimming() {
        let t = "4D8=1D15=5D".parse::<Cigar>().unwrap().trim_flanks().unwrap();
        assert_eq!(t.interior.to_string(), "8=1D15=");
        assert_eq!(t.interior.genome_len(), 24);
        assert_eq!(t.interior.query_len(), 23);
    }

    #[test]
    fn malformed_encodings_are_rejected() {
        for bad in ["", "10D", "3D2D20=", "20=0X3=", "5D20=20=2D"] {
            let c: Cigar = bad.parse().unwrap();
            match c.trim_flanks() {
                Err(OffTargetError::StructuralInvariantViolation { cigar, .. }) => assert_eq!(cigar, bad),
                other => panic!("{} should be rejected, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn unknown_run_type() {
        assert_eq!("5M".parse::<Cigar>(), Err(OffTargetError::UnsupportedRunType('M')));
        assert!(matches!(
            "5=3".parse::<Cigar>(),
            Err(OffTargetError::StructuralInvariantViolation { .. })
        ));
        assert!(matches!("=".parse::<Cigar>(), Err(OffTargetError::StructuralInvariantViolation { .. })));
    }
}
