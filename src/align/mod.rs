pub mod cigar;
pub mod enumerate;
pub mod format;
pub mod semiglobal;

pub use cigar::{Cigar, CigarOp, TrimmedCigar};
pub use enumerate::{enumerate_alignments, enumerate_placements, AlignedPair, AlignmentBudget, Placement};
pub use format::{format_alignment, insert_separator_between_guide_and_pam, Column, FormattedAlignment};
pub use semiglobal::{semiglobal, semiglobal_with_buf, SgBuffer, SgParams, SgResult};

use log::debug;

use crate::error::{OffTargetError, Result};
use crate::genome::GenomicWindow;
use crate::target::NucleaseTarget;

/// 比对参数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlignOpt {
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl Default for AlignOpt {
    fn default() -> Self {
        let p = SgParams::default();
        Self { gap_open: p.gap_open, gap_extend: p.gap_extend }
    }
}

impl AlignOpt {
    fn sg_params(&self) -> SgParams {
        SgParams { gap_open: self.gap_open, gap_extend: self.gap_extend }
    }
}

/// guide+PAM 在一个基因组窗口上的最佳比对
#[derive(Debug, Clone, PartialEq)]
pub struct CrisprAlignment {
    /// 实际使用的窗口方向（正向或反向互补）
    pub window: GenomicWindow,
    pub score: i32,
    /// 覆盖整个窗口的 CIGAR
    pub cigar: Cigar,
    pub trimmed: TrimmedCigar,
    pub formatted: FormattedAlignment,
}

impl CrisprAlignment {
    /// 比对覆盖的基因组片段（按所用窗口方向）
    pub fn genome_fragment(&self) -> &str {
        let seq = self.window.sequence();
        &seq[self.trimmed.leading_deletions..seq.len() - self.trimmed.trailing_deletions]
    }
}

/// 在窗口两条链上各做一次半全局比对，取得分高者；并列时取正向
pub fn align_best(target: &NucleaseTarget, window: &GenomicWindow, opt: &AlignOpt) -> Result<CrisprAlignment> {
    let query = target.sequence().as_bytes();
    if window.len() < query.len() {
        return Err(OffTargetError::WindowTooShort { window: window.len(), query: query.len() });
    }

    let params = opt.sg_params();
    let mut buf = SgBuffer::new();
    let forward = semiglobal_with_buf(query, window.sequence().as_bytes(), params, &mut buf);
    let revcomp_window = window.reverse_complement();
    let reverse = semiglobal_with_buf(query, revcomp_window.sequence().as_bytes(), params, &mut buf);

    debug!(
        "{}: forward score {} ({}), reverse score {} ({})",
        window, forward.score, forward.cigar, reverse.score, reverse.cigar
    );

    let (used, result) = if forward.score >= reverse.score {
        (window.clone(), forward)
    } else {
        (revcomp_window, reverse)
    };

    let trimmed = result.cigar.trim_flanks()?;
    let seq = used.sequence().as_bytes();
    let fragment = &seq[trimmed.leading_deletions..seq.len() - trimmed.trailing_deletions];
    let formatted = format_alignment(&trimmed.interior, query, fragment)?;

    Ok(CrisprAlignment { window: used, score: result.score, cigar: result.cigar, trimmed, formatted })
}
