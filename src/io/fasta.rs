use anyhow::{anyhow, Context, Result};
use std::io::BufRead;

use crate::genome::GenomicWindow;

/// 一条 FASTA 记录；header 中 ID 之后的描述文本不保留
#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub seq: Vec<u8>,
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    peek_header: Option<String>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            done: false,
            peek_header: None,
        }
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        let header = if let Some(h) = self.peek_header.take() {
            h
        } else {
            loop {
                self.buf.clear();
                let n = self.reader.read_line(&mut self.buf)?;
                if n == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if let Some(h) = self.buf.strip_prefix('>') {
                    break h.trim().to_string();
                }
            }
        };

        let id = header.split_whitespace().next().unwrap_or("").to_string();

        let mut seq: Vec<u8> = Vec::new();
        loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf)?;
            if n == 0 {
                self.done = true;
                break;
            }
            if let Some(h) = self.buf.strip_prefix('>') {
                self.peek_header = Some(h.trim().to_string());
                break;
            }
            for &b in self.buf.as_bytes() {
                match b {
                    b'\n' | b'\r' | b' ' | b'\t' => {}
                    _ => seq.push(b.to_ascii_uppercase()),
                }
            }
        }

        Ok(Some(FastaRecord { id, seq }))
    }
}

/// 把窗口记录解析为 [`GenomicWindow`]。
///
/// 记录 ID 格式：`genome:chromosome:start:strand`，例如 `hg19:chr1:10:+`；
/// 坐标为 1-based，序列按所给链的 5'→3' 方向书写。
pub fn parse_window(rec: &FastaRecord) -> Result<GenomicWindow> {
    let fields: Vec<&str> = rec.id.split(':').collect();
    if fields.len() != 4 {
        return Err(anyhow!(
            "window header '{}' is not of the form genome:chromosome:start:strand",
            rec.id
        ));
    }
    let start: u64 = fields[2]
        .parse()
        .with_context(|| format!("bad start coordinate in '{}'", rec.id))?;
    let positive = match fields[3] {
        "+" => true,
        "-" => false,
        s => return Err(anyhow!("bad strand '{}' in '{}'", s, rec.id)),
    };
    let seq = std::str::from_utf8(&rec.seq).with_context(|| format!("non-ASCII sequence in '{}'", rec.id))?;
    Ok(GenomicWindow::new(fields[0], fields[1], start, positive, seq)?)
}

/// 读入全部窗口记录
pub fn read_windows<R: BufRead>(reader: R) -> Result<Vec<GenomicWindow>> {
    let mut fasta = FastaReader::new(reader);
    let mut windows = Vec::new();
    while let Some(rec) = fasta.next_record()? {
        windows.push(parse_window(&rec)?);
    }
    Ok(windows)
}
