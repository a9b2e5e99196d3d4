use serde::{Deserialize, Serialize};

use crate::error::{OffTargetError, Result};

/// 按“距 PAM 距离”索引的罚分表及 bulge 附加罚分
///
/// `mismatch_by_distance[0]` 对应紧邻 PAM 的 guide 碱基（距离 1），
/// 越往 5' 端罚分越低；超出表长的位置取表尾值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyProfile {
    pub mismatch_by_distance: Vec<f64>,
    pub pam_mismatch: f64,
    pub rna_bulge: f64,
    pub dna_bulge: f64,
    /// 5' 端与 PAM 近端同时出现 bulge 时的一次性附加罚分
    pub compound_bulge: f64,
    /// 距 guide 5' 端多少个碱基内算作“5' 端 bulge”
    pub distal_bulge_window: usize,
    /// 距 PAM 多少个碱基内算作“PAM 前 bulge”
    pub proximal_bulge_window: usize,
}

impl PenaltyProfile {
    /// 距 PAM `distance` 处的错配罚分；0 与越界均钳到表的边界
    pub fn mismatch_at(&self, distance: usize) -> f64 {
        if self.mismatch_by_distance.is_empty() {
            return 0.0;
        }
        let idx = distance.clamp(1, self.mismatch_by_distance.len()) - 1;
        self.mismatch_by_distance[idx]
    }
}

/// 一个核酸酶家族：PAM、切割位点偏移、罚分表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NucleaseFamily {
    pub name: String,
    pub pam: String,
    pub cut_site_relative_to_pam: i32,
    pub penalties: PenaltyProfile,
}

const SPCAS9_MISMATCH: [f64; 20] = [
    6.0, 5.0, 4.2, 3.5, 2.9, 2.4, 2.0, 1.7, 1.4, 1.2, 1.0, 0.85, 0.7, 0.55, 0.45, 0.35, 0.25, 0.2, 0.15, 0.1,
];

const SACAS9_MISMATCH: [f64; 21] = [
    6.0, 5.2, 4.5, 3.8, 3.2, 2.7, 2.2, 1.9, 1.6, 1.3, 1.1, 0.95, 0.8, 0.65, 0.5, 0.4, 0.3, 0.25, 0.2, 0.15, 0.1,
];

fn cas9_profile(table: &[f64]) -> PenaltyProfile {
    PenaltyProfile {
        mismatch_by_distance: table.to_vec(),
        pam_mismatch: 10.0,
        rna_bulge: 0.3,
        dna_bulge: 0.3,
        compound_bulge: 5.2,
        distal_bulge_window: 3,
        proximal_bulge_window: 2,
    }
}

/// 内置家族表
pub fn builtin_families() -> Vec<NucleaseFamily> {
    vec![
        NucleaseFamily {
            name: "SpCas9".to_string(),
            pam: "NGG".to_string(),
            cut_site_relative_to_pam: -3,
            penalties: cas9_profile(&SPCAS9_MISMATCH),
        },
        NucleaseFamily {
            name: "SpCas9-VQR".to_string(),
            pam: "NGA".to_string(),
            cut_site_relative_to_pam: -3,
            penalties: cas9_profile(&SPCAS9_MISMATCH),
        },
        NucleaseFamily {
            name: "SaCas9".to_string(),
            pam: "NNGRRT".to_string(),
            cut_site_relative_to_pam: -3,
            penalties: cas9_profile(&SACAS9_MISMATCH),
        },
    ]
}

/// 家族名 → 家族定义；名称不区分大小写
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyTable {
    families: Vec<NucleaseFamily>,
}

impl FamilyTable {
    pub fn builtin() -> Self {
        Self { families: builtin_families() }
    }

    pub fn get(&self, name: &str) -> Result<&NucleaseFamily> {
        self.families
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| OffTargetError::UnknownNucleaseFamily(name.to_string()))
    }

    /// 合并另一张表，同名条目被覆盖
    pub fn merge(&mut self, other: FamilyTable) {
        for fam in other.families {
            match self.families.iter_mut().find(|f| f.name.eq_ignore_ascii_case(&fam.name)) {
                Some(slot) => *slot = fam,
                None => self.families.push(fam),
            }
        }
    }

    pub fn families(&self) -> &[NucleaseFamily] {
        &self.families
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let families: Vec<NucleaseFamily> = serde_json::from_str(text)?;
        Ok(Self { families })
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.families)?)
    }
}

impl Default for FamilyTable {
    fn default() -> Self {
        Self::builtin()
    }
}
