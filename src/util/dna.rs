use crate::error::{OffTargetError, Result};

/// guide / PAM 中允许出现的碱基（含两个简并码 N、R）
pub const PATTERN_ALPHABET: &[u8] = b"ACGTNR";

/// 简并碱基匹配：`pattern` 一侧来自 guide/PAM，`observed` 一侧来自基因组。
///
/// 规则依次为：N 匹配任意碱基；相等即匹配；R（嘌呤）匹配 A 或 G；其余不匹配。
#[inline]
pub fn bases_match(pattern: u8, observed: u8) -> bool {
    if pattern == b'N' {
        return true;
    }
    if pattern == observed {
        return true;
    }
    pattern == b'R' && matches!(observed, b'A' | b'G')
}

/// 基因组序列规范化：大写，U→T，其余非 ACGTN 字符记为 N
pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq {
        let up = b.to_ascii_uppercase();
        let nb = match up {
            b'A' | b'C' | b'G' | b'T' | b'N' => up,
            b'U' => b'T',
            _ => b'N',
        };
        out.push(nb);
    }
    out
}

/// guide / PAM 规范化：大写后必须全部落在 [`PATTERN_ALPHABET`] 内
pub fn normalize_pattern(seq: &str, context: &'static str) -> Result<Vec<u8>> {
    if seq.is_empty() {
        return Err(OffTargetError::EmptySequence(context));
    }
    seq.bytes()
        .map(|b| {
            let up = b.to_ascii_uppercase();
            if PATTERN_ALPHABET.contains(&up) {
                Ok(up)
            } else {
                Err(OffTargetError::InvalidBase { base: b as char, context })
            }
        })
        .collect()
}

#[inline]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        b'R' => b'Y',
        b'Y' => b'R',
        _ => b'N',
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq.iter().rev() {
        out.push(complement(b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_matches_every_base() {
        for &b in b"ACGTN" {
            assert!(bases_match(b'N', b));
        }
    }

    #[test]
    fn purine_matches_only_a_and_g() {
        assert!(bases_match(b'R', b'A'));
        assert!(bases_match(b'R', b'G'));
        assert!(!bases_match(b'R', b'C'));
        assert!(!bases_match(b'R', b'T'));
    }

    #[test]
    fn concrete_bases_match_only_themselves() {
        for &x in b"ACGT" {
            for &y in b"ACGT" {
                assert_eq!(bases_match(x, y), x == y, "{} vs {}", x as char, y as char);
            }
        }
    }

    #[test]
    fn matching_is_not_symmetric() {
        // 基因组一侧的 N 不是通配符
        assert!(!bases_match(b'A', b'N'));
        assert!(!bases_match(b'G', b'R'));
    }

    #[test]
    fn revcomp_basic() {
        assert_eq!(revcomp(b"ATTGGCC"), b"GGCCAAT");
        assert_eq!(revcomp(b"ACGTN"), b"NACGT");
        assert_eq!(revcomp(&revcomp(b"GATTACA")), b"GATTACA");
    }

    #[test]
    fn normalize_genome_sequence() {
        assert_eq!(normalize_seq(b"acgU-x"), b"ACGTNN");
    }

    #[test]
    fn normalize_pattern_rejects_unsupported_codes() {
        assert_eq!(normalize_pattern("ngg", "PAM").unwrap(), b"NGG");
        assert_eq!(
            normalize_pattern("NYG", "PAM"),
            Err(OffTargetError::InvalidBase { base: 'Y', context: "PAM" })
        );
        assert_eq!(normalize_pattern("", "guide"), Err(OffTargetError::EmptySequence("guide")));
    }
}
