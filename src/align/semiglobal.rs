use super::cigar::{Cigar, CigarOp};

const NEG_INF: i32 = i32::MIN / 4;

/// EDNAFULL (NUC.4.4) 字母顺序
const EDNAFULL_ALPHABET: &[u8; 15] = b"ATGCSWRYKMBVHDN";

#[rustfmt::skip]
const EDNAFULL: [[i8; 15]; 15] = [
    //A   T   G   C   S   W   R   Y   K   M   B   V   H   D   N
    [ 5, -4, -4, -4, -4,  1,  1, -4, -4,  1, -4, -1, -1, -1, -2], // A
    [-4,  5, -4, -4, -4,  1, -4,  1,  1, -4, -1, -4, -1, -1, -2], // T
    [-4, -4,  5, -4,  1, -4,  1, -4,  1, -4, -1, -1, -4, -1, -2], // G
    [-4, -4, -4,  5,  1, -4, -4,  1, -4,  1, -1, -1, -1, -4, -2], // C
    [-4, -4,  1,  1, -1, -4, -2, -2, -2, -2, -1, -1, -3, -3, -1], // S
    [ 1,  1, -4, -4, -4, -1, -2, -2, -2, -2, -3, -3, -1, -1, -1], // W
    [ 1, -4,  1, -4, -2, -2, -1, -4, -2, -2, -3, -1, -3, -1, -1], // R
    [-4,  1, -4,  1, -2, -2, -4, -1, -2, -2, -1, -3, -1, -3, -1], // Y
    [-4,  1,  1, -4, -2, -2, -2, -2, -1, -4, -1, -3, -3, -1, -1], // K
    [ 1, -4, -4,  1, -2, -2, -2, -2, -4, -1, -3, -1, -1, -3, -1], // M
    [-4, -1, -1, -1, -1, -3, -3, -1, -1, -3, -1, -2, -2, -2, -1], // B
    [-1, -4, -1, -1, -1, -3, -1, -3, -3, -1, -2, -1, -2, -2, -1], // V
    [-1, -1, -4, -1, -3, -1, -3, -1, -3, -1, -2, -2, -1, -2, -1], // H
    [-1, -1, -1, -4, -3, -1, -1, -3, -1, -3, -2, -2, -2, -1, -1], // D
    [-2, -2, -2, -2, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1], // N
];

#[inline]
fn ednafull_index(b: u8) -> usize {
    let up = match b.to_ascii_uppercase() {
        b'U' => b'T',
        other => other,
    };
    EDNAFULL_ALPHABET.iter().position(|&c| c == up).unwrap_or(14)
}

/// 核酸替换打分（EDNAFULL）
#[inline]
pub fn ednafull(a: u8, b: u8) -> i32 {
    EDNAFULL[ednafull_index(a)][ednafull_index(b)] as i32
}

/// 仿射间隙罚分：长度为 L 的 gap 扣 `gap_open + (L-1) * gap_extend`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SgParams {
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl Default for SgParams {
    fn default() -> Self {
        Self { gap_open: 10, gap_extend: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SgResult {
    pub score: i32,
    /// 覆盖整条 reference 的 CIGAR（两端未比对的部分记为 `D`）
    pub cigar: Cigar,
}

/// DP 工作缓冲区，可跨调用复用
pub struct SgBuffer {
    h: Vec<i32>,
    e: Vec<i32>,
    f: Vec<i32>,
}

impl SgBuffer {
    pub fn new() -> Self {
        Self {
            h: Vec::new(),
            e: Vec::new(),
            f: Vec::new(),
        }
    }

    fn resize(&mut self, size: usize) {
        self.h.clear();
        self.e.clear();
        self.f.clear();
        self.h.resize(size, 0);
        self.e.resize(size, NEG_INF);
        self.f.resize(size, NEG_INF);
    }
}

impl Default for SgBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Trace {
    Diag,
    Up,
    Left,
}

/// 半全局仿射间隙比对：query 必须完整比对，reference 两端空位免罚
pub fn semiglobal(query: &[u8], reference: &[u8], p: SgParams) -> SgResult {
    semiglobal_with_buf(query, reference, p, &mut SgBuffer::new())
}

pub fn semiglobal_with_buf(query: &[u8], reference: &[u8], p: SgParams, buf: &mut SgBuffer) -> SgResult {
    let m = query.len();
    let n = reference.len();

    if m == 0 {
        return SgResult {
            score: 0,
            cigar: Cigar::from_ops(&vec![CigarOp::Deletion; n]),
        };
    }

    let cols = n + 1;
    buf.resize((m + 1) * cols);
    let h = &mut buf.h;
    let e = &mut buf.e;
    let f = &mut buf.f;

    // 第 0 行：reference 前端空位免罚（h 已置 0）；第 0 列：query 前端必须付 gap 罚分
    for i in 1..=m {
        let idx = i * cols;
        h[idx] = -(p.gap_open + (i as i32 - 1) * p.gap_extend);
        e[idx] = h[idx];
    }

    for i in 1..=m {
        for j in 1..=n {
            let idx = i * cols + j;
            let up_idx = (i - 1) * cols + j;
            let left_idx = i * cols + (j - 1);
            let diag_idx = (i - 1) * cols + (j - 1);

            e[idx] = (h[up_idx] - p.gap_open).max(e[up_idx] - p.gap_extend);
            f[idx] = (h[left_idx] - p.gap_open).max(f[left_idx] - p.gap_extend);

            let diag = h[diag_idx] + ednafull(query[i - 1], reference[j - 1]);
            h[idx] = diag.max(e[idx]).max(f[idx]);
        }
    }

    // 末行取最大值，reference 末端空位免罚；并列时取最靠左的终点
    let last_row = m * cols;
    let mut best_j = 0usize;
    for j in 1..=n {
        if h[last_row + j] > h[last_row + best_j] {
            best_j = j;
        }
    }
    let score = h[last_row + best_j];

    let mut ops: Vec<CigarOp> = vec![CigarOp::Deletion; n - best_j];
    let mut i = m;
    let mut j = best_j;
    let mut state = Trace::Diag;

    while i > 0 {
        let idx = i * cols + j;
        match state {
            Trace::Diag => {
                if j == 0 {
                    ops.push(CigarOp::Insertion);
                    i -= 1;
                    continue;
                }
                let diag_idx = (i - 1) * cols + (j - 1);
                let (qb, rb) = (query[i - 1], reference[j - 1]);
                if h[idx] == h[diag_idx] + ednafull(qb, rb) {
                    ops.push(if qb.eq_ignore_ascii_case(&rb) { CigarOp::Match } else { CigarOp::Mismatch });
                    i -= 1;
                    j -= 1;
                } else if h[idx] == e[idx] {
                    state = Trace::Up;
                } else {
                    state = Trace::Left;
                }
            }
            Trace::Up => {
                ops.push(CigarOp::Insertion);
                let opened = j == 0 || e[idx] == h[(i - 1) * cols + j] - p.gap_open;
                i -= 1;
                if opened {
                    state = Trace::Diag;
                }
            }
            Trace::Left => {
                ops.push(CigarOp::Deletion);
                let opened = f[idx] == h[idx - 1] - p.gap_open;
                j -= 1;
                if opened {
                    state = Trace::Diag;
                }
            }
        }
    }

    ops.extend(std::iter::repeat(CigarOp::Deletion).take(j));
    ops.reverse();

    SgResult { score, cigar: Cigar::from_ops(&ops) }
}
