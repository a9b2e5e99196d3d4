use crate::align::format::ALIGNMENT_GAP_CHARACTER;
use crate::align::FormattedAlignment;
use crate::error::{OffTargetError, Result};
use crate::genome::GenomicWindow;

/// 把切割点投影回基因组坐标
///
/// `window` 为比对实际使用的方向，`leading` 为比对第一列之前的窗口碱基数。
/// 切割点位于 PAM 起点上游 `-cut_site_relative_to_pam` 个 guide 碱基处；
/// 沿比对逐列累计消耗的基因组碱基数 n（bulge 会改变 guide 下标与基因组下标的对应），
/// 返回 guide 所在链上切割点 3' 侧第一个碱基的坐标：正链为 `start + n`，负链为 `end - n`。
///
/// 换成正链坐标看：正链位点返回切口右侧的碱基（切口位于 `c-1` 与 `c` 之间），
/// 负链位点返回切口左侧的碱基（切口位于 `c` 与 `c+1` 之间）。
pub fn project_cut_site(
    window: &GenomicWindow,
    leading: usize,
    alignment: &FormattedAlignment,
    guide_len: usize,
    cut_site_relative_to_pam: i32,
) -> Result<u64> {
    let gap = ALIGNMENT_GAP_CHARACTER as u8;
    let q_cut = guide_len as i64 + cut_site_relative_to_pam as i64;

    let mut qi = 0i64;
    let mut gi = 0i64;
    let mut reached = q_cut == 0;
    if q_cut > 0 {
        for (q, g) in alignment.query.bytes().zip(alignment.genome.bytes()) {
            if q != gap {
                qi += 1;
            }
            if g != gap {
                gi += 1;
            }
            if qi == q_cut {
                reached = true;
                break;
            }
        }
    }

    // 切割点落在比对覆盖范围之外时按无空位外推
    let consumed = if reached {
        gi
    } else if q_cut < 0 {
        q_cut
    } else {
        gi + (q_cut - qi)
    };
    let n = leading as i64 + consumed;

    let coord = if window.is_positive_strand() {
        window.start_coord() as i64 + n
    } else {
        window.end_coord() as i64 - n
    };
    if coord < 1 {
        return Err(OffTargetError::InvalidCoordinates { start: window.start_coord(), end: window.end_coord() });
    }
    Ok(coord as u64)
}
