pub mod cut_site;
pub mod score;

pub use cut_site::project_cut_site;
pub use score::score_alignment;

use std::cmp::Ordering;
use std::fmt;

use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::align::{
    align_best, enumerate_placements, insert_separator_between_guide_and_pam, AlignOpt, AlignmentBudget,
    FormattedAlignment,
};
use crate::error::Result;
use crate::genome::GenomicWindow;
use crate::target::NucleaseTarget;

/// 文本输出的表头，与 [`SiteReport`] 的 `Display` 列一一对应
pub const REPORT_HEADER: &str =
    "#window\tstrand\tsite_start\tsite_end\tcut_site\toff_target_score\tmm\trna_bulges\tdna_bulges\tcigar\tguide_pam\tindicator\tgenome";

/// 一个候选结合位点的评估结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteReport {
    /// 输入窗口的描述
    pub window: String,
    pub genome: String,
    pub chromosome: String,
    /// 位点所在链（guide 与该链的序列对齐）
    pub strand: char,
    /// 比对覆盖的基因组区间，1-based 闭区间
    pub site_start: u64,
    pub site_end: u64,
    /// 半全局比对得分；多比对枚举没有该值
    pub alignment_score: Option<i32>,
    pub cigar: Option<String>,
    pub alignment: FormattedAlignment,
    /// 在 guide 与 PAM 之间插入分隔符后的展示形式
    pub display: FormattedAlignment,
    pub mismatches: usize,
    pub rna_bulges: usize,
    pub dna_bulges: usize,
    pub off_target_score: f64,
    pub cut_site: u64,
}

impl fmt::Display for SiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{:.3}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.window,
            self.strand,
            self.site_start,
            self.site_end,
            self.cut_site,
            self.off_target_score,
            self.mismatches,
            self.rna_bulges,
            self.dna_bulges,
            self.cigar.as_deref().unwrap_or("*"),
            self.display.query,
            self.display.indicator,
            self.display.genome
        )
    }
}

/// 按方向窗口内的偏移区间换算基因组闭区间
fn site_span(window: &GenomicWindow, offset: usize, len: usize) -> (u64, u64) {
    let a = window.coord_at(offset);
    let b = window.coord_at(offset + len.max(1) - 1);
    (a.min(b), a.max(b))
}

/// 对已经确定方向与起点的比对打分并投影切割点
fn build_report(
    target: &NucleaseTarget,
    input: &GenomicWindow,
    used: &GenomicWindow,
    leading: usize,
    genome_len: usize,
    alignment: FormattedAlignment,
    alignment_score: Option<i32>,
    cigar: Option<String>,
) -> Result<SiteReport> {
    let guide_len = target.guide_len();
    let off_target_score = score_alignment(&alignment, guide_len, target.penalties())?;
    let cut_site = project_cut_site(used, leading, &alignment, guide_len, target.cut_site_relative_to_pam())?;
    let display = insert_separator_between_guide_and_pam(&alignment, guide_len)?;
    let (site_start, site_end) = site_span(used, leading, genome_len);

    Ok(SiteReport {
        window: input.to_string(),
        genome: used.genome().to_string(),
        chromosome: used.chromosome().to_string(),
        strand: used.strand_symbol(),
        site_start,
        site_end,
        alignment_score,
        cigar,
        mismatches: alignment.mismatches(),
        rna_bulges: alignment.rna_bulges(),
        dna_bulges: alignment.dna_bulges(),
        alignment,
        display,
        off_target_score,
        cut_site,
    })
}

/// 单窗口最佳位点：半全局比对 → 展开 → 打分 → 切割点
pub fn evaluate_best_site(target: &NucleaseTarget, window: &GenomicWindow, opt: &AlignOpt) -> Result<SiteReport> {
    let best = align_best(target, window, opt)?;
    let leading = best.trimmed.leading_deletions;
    let genome_len = best.trimmed.interior.genome_len();
    debug!("{}: best site {} on {} strand", window, best.trimmed.interior, best.window.strand_symbol());
    build_report(
        target,
        window,
        &best.window,
        leading,
        genome_len,
        best.formatted,
        Some(best.score),
        Some(best.cigar.to_string()),
    )
}

/// 罚分升序，其次切割点坐标；其余字段只用于让顺序确定
fn report_order(a: &SiteReport, b: &SiteReport) -> Ordering {
    a.off_target_score
        .total_cmp(&b.off_target_score)
        .then(a.cut_site.cmp(&b.cut_site))
        .then(a.strand.cmp(&b.strand))
        .then(a.site_start.cmp(&b.site_start))
        .then_with(|| a.alignment.cmp(&b.alignment))
}

/// 在窗口两条链上枚举所有满足预算的比对，逐个打分并投影切割点
///
/// 没有满足预算的比对时返回空列表。
pub fn find_off_targets(
    target: &NucleaseTarget,
    window: &GenomicWindow,
    budget: &AlignmentBudget,
) -> Result<Vec<SiteReport>> {
    let query = target.sequence().as_bytes();
    let mut reports = Vec::new();

    for used in [window.clone(), window.reverse_complement()] {
        let placements = enumerate_placements(query, used.sequence().as_bytes(), budget)?;
        for p in placements {
            let alignment = FormattedAlignment::from_pair(&p.pair.query, &p.pair.genome)?;
            reports.push(build_report(target, window, &used, p.genome_start, p.genome_len, alignment, None, None)?);
        }
    }

    reports.sort_by(report_order);
    debug!("{}: {} candidate sites", window, reports.len());
    Ok(reports)
}

/// 批量评估多个窗口的最佳位点；各窗口相互独立，按 rayon 线程池并行
///
/// 结果顺序与输入一致，单个窗口失败不影响其他窗口。
pub fn evaluate_windows(
    target: &NucleaseTarget,
    windows: &[GenomicWindow],
    opt: &AlignOpt,
) -> Vec<Result<SiteReport>> {
    windows.par_iter().map(|w| evaluate_best_site(target, w, opt)).collect()
}

/// 批量枚举多个窗口，合并后整体排序
pub fn scan_windows(
    target: &NucleaseTarget,
    windows: &[GenomicWindow],
    budget: &AlignmentBudget,
) -> Result<Vec<SiteReport>> {
    let per_window = windows
        .par_iter()
        .map(|w| find_off_targets(target, w, budget))
        .collect::<Result<Vec<_>>>()?;
    let mut all: Vec<SiteReport> = per_window.into_iter().flatten().collect();
    all.sort_by(report_order);
    Ok(all)
}
