use crate::align::{Column, FormattedAlignment};
use crate::error::{OffTargetError, Result};
use crate::target::PenaltyProfile;

/// 脱靶罚分：0 表示完全匹配，越大越不可能被切割
///
/// 从 guide 5' 端向 PAM 逐列累加；“距 PAM 距离”只在消耗 guide/PAM 碱基的列上推进，
/// DNA bulge 列不推进。`alignment` 的 query 行为 guide+PAM，不含分隔符。
pub fn score_alignment(alignment: &FormattedAlignment, guide_len: usize, profile: &PenaltyProfile) -> Result<f64> {
    if alignment.query.len() != alignment.genome.len() {
        return Err(OffTargetError::MisalignedColumns {
            query: alignment.query.len(),
            indicator: alignment.indicator.len(),
            genome: alignment.genome.len(),
        });
    }
    if alignment.query.contains(' ') {
        return Err(OffTargetError::InvalidBase { base: ' ', context: "aligned query" });
    }

    let distal_limit = guide_len.saturating_sub(profile.distal_bulge_window);
    let mut qi = 0usize;
    let mut total = 0.0;
    let mut bulges = 0usize;
    let mut distal_bulge = false;
    let mut proximal_bulge = false;
    let mut note_bulge = |distance: usize| {
        bulges += 1;
        if distance > distal_limit {
            distal_bulge = true;
        }
        if distance <= profile.proximal_bulge_window {
            proximal_bulge = true;
        }
    };

    for col in alignment.columns() {
        let in_guide = qi < guide_len;
        // 本列对应（或紧邻其 PAM 一侧）的 guide 碱基到 PAM 的距离，1 为紧邻 PAM
        let distance = guide_len.saturating_sub(qi);
        match col {
            Column::Match => {}
            Column::Mismatch => {
                total += if in_guide { profile.mismatch_at(distance) } else { profile.pam_mismatch };
            }
            Column::RnaBulge => {
                if in_guide {
                    total += profile.mismatch_at(distance.saturating_sub(1)) + profile.rna_bulge;
                    note_bulge(distance);
                } else {
                    total += profile.pam_mismatch + profile.rna_bulge;
                }
            }
            Column::DnaBulge => {
                if qi <= guide_len {
                    total += profile.mismatch_at(distance) + profile.dna_bulge;
                    note_bulge(distance.max(1));
                } else {
                    total += profile.pam_mismatch + profile.dna_bulge;
                }
            }
        }
        if col != Column::DnaBulge {
            qi += 1;
        }
    }

    if bulges >= 2 && distal_bulge && proximal_bulge {
        total += profile.compound_bulge;
    }
    Ok(total)
}
