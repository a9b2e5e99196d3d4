use thiserror::Error;

/// 比对核心的错误类型
///
/// - `StructuralInvariantViolation` / `UnsupportedRunType`：比对器与其下游之间的契约被破坏，不可恢复
/// - 其余变体：调用方输入错误，同步报告，不做静默修正
///
/// 找不到满足预算的比对不是错误，枚举器返回空集合。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OffTargetError {
    #[error("malformed alignment encoding '{cigar}': {reason}")]
    StructuralInvariantViolation { cigar: String, reason: String },
    #[error("unsupported alignment run type '{0}'")]
    UnsupportedRunType(char),
    #[error("invalid base '{base}' in {context}")]
    InvalidBase { base: char, context: &'static str },
    #[error("{0} sequence is empty")]
    EmptySequence(&'static str),
    #[error("genomic window ({window} bp) is shorter than the query ({query} bp)")]
    WindowTooShort { window: usize, query: usize },
    #[error("cannot trim {trim} bases from a {len} bp window")]
    InvalidTrim { trim: usize, len: usize },
    #[error("invalid coordinates {start}-{end}")]
    InvalidCoordinates { start: u64, end: u64 },
    #[error("unknown nuclease family '{0}'")]
    UnknownNucleaseFamily(String),
    #[error("alignment rows differ in length: query={query}, indicator={indicator}, genome={genome}")]
    MisalignedColumns { query: usize, indicator: usize, genome: usize },
    #[error("sequence fetch failed: {0}")]
    Fetch(String),
}

pub type Result<T> = std::result::Result<T, OffTargetError>;
