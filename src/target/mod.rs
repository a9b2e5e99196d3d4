pub mod family;

pub use family::{builtin_families, FamilyTable, NucleaseFamily, PenaltyProfile};

use serde::Serialize;

use crate::error::Result;
use crate::util::dna;

/// guide + PAM 的组合检索序列
///
/// 构造后不可变；`cut_site_relative_to_pam` 为从 guide 的 PAM 近端边界到切割点的
/// 有符号碱基数（SpCas9 为 -3，即 PAM 上游 3 bp 处）。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NucleaseTarget {
    guide: String,
    pam: String,
    cut_site_relative_to_pam: i32,
    sequence: String,
    penalties: PenaltyProfile,
}

impl NucleaseTarget {
    pub fn new(guide: &str, pam: &str, cut_site_relative_to_pam: i32, penalties: PenaltyProfile) -> Result<Self> {
        let guide = dna::normalize_pattern(guide, "guide")?;
        let pam = dna::normalize_pattern(pam, "PAM")?;
        let guide = String::from_utf8_lossy(&guide).into_owned();
        let pam = String::from_utf8_lossy(&pam).into_owned();
        let sequence = format!("{}{}", guide, pam);
        Ok(Self { guide, pam, cut_site_relative_to_pam, sequence, penalties })
    }

    /// 按家族名从表中取 PAM、切割偏移与罚分表
    pub fn from_family(table: &FamilyTable, family: &str, guide: &str) -> Result<Self> {
        let fam = table.get(family)?;
        Self::new(guide, &fam.pam, fam.cut_site_relative_to_pam, fam.penalties.clone())
    }

    pub fn spcas9(guide: &str) -> Result<Self> {
        Self::from_family(&FamilyTable::builtin(), "SpCas9", guide)
    }

    pub fn sacas9(guide: &str) -> Result<Self> {
        Self::from_family(&FamilyTable::builtin(), "SaCas9", guide)
    }

    pub fn guide(&self) -> &str {
        &self.guide
    }

    pub fn pam(&self) -> &str {
        &self.pam
    }

    pub fn cut_site_relative_to_pam(&self) -> i32 {
        self.cut_site_relative_to_pam
    }

    /// guide + PAM
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn guide_len(&self) -> usize {
        self.guide.len()
    }

    pub fn penalties(&self) -> &PenaltyProfile {
        &self.penalties
    }
}
