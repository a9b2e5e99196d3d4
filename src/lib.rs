//! # nuclease-off-target
//!
//! CRISPR 核酸酶脱靶位点评估：把 guide + PAM 与一段基因组窗口比对，
//! 判断结合方式（错配、RNA/DNA bulge），给出脱靶罚分与预测切割坐标。
//!
//! - **成对比对**：EDNAFULL 打分的半全局仿射空位比对，正反两条链各做一次
//! - **比对展开**：CIGAR → 三行比对（guide+PAM / 指示行 / 基因组）
//! - **多比对枚举**：在错配与 bulge 预算内列出所有比对
//! - **打分与切割点**：按距 PAM 距离加权的罚分；切割点投影回基因组坐标
//!
//! ## 快速示例
//!
//! ```rust
//! use nuclease_off_target::align::AlignOpt;
//! use nuclease_off_target::genome::GenomicWindow;
//! use nuclease_off_target::offtarget::evaluate_best_site;
//! use nuclease_off_target::target::NucleaseTarget;
//!
//! let target = NucleaseTarget::spcas9("GATTCCGTAGACAGACTAGG").unwrap();
//! let window = GenomicWindow::new("hg19", "chr1", 10, true, "AGCTGGATTCCGTAGACAGACTAGGTGGACTG").unwrap();
//! let report = evaluate_best_site(&target, &window, &AlignOpt::default()).unwrap();
//! assert_eq!(report.cut_site, 32);
//! assert_eq!(report.display.genome, "GATTCCGTAGACAGACTAGG TGG");
//! ```
//!
//! ## 模块说明
//!
//! - [`util`]：碱基匹配、规范化、反向互补
//! - [`genome`]：基因组窗口与序列来源（含限速）
//! - [`io`]：FASTA 解析
//! - [`target`]：核酸酶家族表与 guide+PAM 目标
//! - [`align`]：半全局比对、CIGAR、比对展开、多比对枚举
//! - [`offtarget`]：脱靶罚分、切割点投影与整体流程
//! - [`error`]：错误类型

pub mod align;
pub mod error;
pub mod genome;
pub mod io;
pub mod offtarget;
pub mod target;
pub mod util;

pub use error::{OffTargetError, Result};
