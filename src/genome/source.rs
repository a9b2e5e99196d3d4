use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::{OffTargetError, Result};
use crate::genome::window::GenomicWindow;
use crate::io::fasta::FastaReader;
use crate::util::dna;

/// 基因组浏览器两次请求之间的最短间隔（秒）
pub const SECONDS_BETWEEN_REQUESTS: u64 = 10;

/// 基因组序列来源：给定 1-based 闭区间坐标与链方向，返回该链 5'→3' 的序列文本
pub trait SequenceSource {
    fn fetch_sequence(
        &self,
        genome: &str,
        chromosome: &str,
        start_coord: u64,
        end_coord: u64,
        is_positive_strand: bool,
    ) -> Result<String>;
}

impl GenomicWindow {
    pub fn from_source<S: SequenceSource + ?Sized>(
        source: &S,
        genome: &str,
        chromosome: &str,
        start_coord: u64,
        end_coord: u64,
        is_positive_strand: bool,
    ) -> Result<Self> {
        if start_coord == 0 || end_coord < start_coord {
            return Err(OffTargetError::InvalidCoordinates { start: start_coord, end: end_coord });
        }
        let seq = source.fetch_sequence(genome, chromosome, start_coord, end_coord, is_positive_strand)?;
        let expected = (end_coord - start_coord + 1) as usize;
        if seq.len() != expected {
            return Err(OffTargetError::Fetch(format!(
                "expected {} bases for {}:{}-{}, got {}",
                expected,
                chromosome,
                start_coord,
                end_coord,
                seq.len()
            )));
        }
        GenomicWindow::new(genome, chromosome, start_coord, is_positive_strand, &seq)
    }
}

/// 可注入的时钟，测试中用 [`ManualClock`] 替换
pub trait Clock: Send + Sync {
    /// 单调时间，起点任意
    fn now(&self) -> Duration;
    fn sleep(&self, d: Duration);
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// 手动推进的时钟：`sleep` 只把时间往前拨，并记录每次睡眠时长
#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += d;
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.lock().map(|n| *n).unwrap_or_default()
    }

    fn sleep(&self, d: Duration) {
        if let Ok(mut s) = self.sleeps.lock() {
            s.push(d);
        }
        self.advance(d);
    }
}

/// 全局唯一的请求闸门：串行化请求，并保证相邻两次请求间隔不小于 `min_interval`
pub struct RateLimiter<C: Clock> {
    clock: C,
    min_interval: Duration,
    last_request: Mutex<Option<Duration>>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(clock: C, min_interval: Duration) -> Self {
        Self { clock, min_interval, last_request: Mutex::new(None) }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// 持锁执行 `f`；锁贯穿等待与请求本身，保证请求互斥
    pub fn run<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let mut last = self
            .last_request
            .lock()
            .map_err(|_| OffTargetError::Fetch("rate limiter lock poisoned".to_string()))?;
        if let Some(prev) = *last {
            let elapsed = self.clock.now().saturating_sub(prev);
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                warn!("rate limit: waiting {:.1}s before next sequence request", wait.as_secs_f64());
                self.clock.sleep(wait);
            }
        }
        *last = Some(self.clock.now());
        f()
    }
}

impl RateLimiter<SystemClock> {
    pub fn with_default_interval() -> Self {
        Self::new(SystemClock::new(), Duration::from_secs(SECONDS_BETWEEN_REQUESTS))
    }
}

/// 给任意来源套上限速闸门
pub struct RateLimitedSource<'a, S, C: Clock> {
    inner: S,
    limiter: &'a RateLimiter<C>,
}

impl<'a, S: SequenceSource, C: Clock> RateLimitedSource<'a, S, C> {
    pub fn new(inner: S, limiter: &'a RateLimiter<C>) -> Self {
        Self { inner, limiter }
    }
}

impl<'a, S: SequenceSource, C: Clock> SequenceSource for RateLimitedSource<'a, S, C> {
    fn fetch_sequence(
        &self,
        genome: &str,
        chromosome: &str,
        start_coord: u64,
        end_coord: u64,
        is_positive_strand: bool,
    ) -> Result<String> {
        self.limiter
            .run(|| self.inner.fetch_sequence(genome, chromosome, start_coord, end_coord, is_positive_strand))
    }
}

/// 本地 FASTA 参考序列（染色体名 → 序列），作为远程浏览器的离线替代
pub struct FastaSource {
    genome: String,
    contigs: HashMap<String, Vec<u8>>,
}

impl FastaSource {
    pub fn from_reader<R: BufRead>(genome: &str, reader: R) -> anyhow::Result<Self> {
        let mut fasta = FastaReader::new(reader);
        let mut contigs = HashMap::new();
        while let Some(rec) = fasta.next_record()? {
            contigs.insert(rec.id, dna::normalize_seq(&rec.seq));
        }
        if contigs.is_empty() {
            anyhow::bail!("reference for genome '{}' contains no sequences", genome);
        }
        debug!("loaded {} contigs for genome {}", contigs.len(), genome);
        Ok(Self { genome: genome.to_string(), contigs })
    }

    pub fn genome(&self) -> &str {
        &self.genome
    }
}

impl SequenceSource for FastaSource {
    fn fetch_sequence(
        &self,
        genome: &str,
        chromosome: &str,
        start_coord: u64,
        end_coord: u64,
        is_positive_strand: bool,
    ) -> Result<String> {
        if genome != self.genome {
            return Err(OffTargetError::Fetch(format!("genome '{}' not loaded (have '{}')", genome, self.genome)));
        }
        let contig = self
            .contigs
            .get(chromosome)
            .ok_or_else(|| OffTargetError::Fetch(format!("unknown chromosome '{}'", chromosome)))?;
        if start_coord == 0 || end_coord < start_coord || end_coord as usize > contig.len() {
            return Err(OffTargetError::InvalidCoordinates { start: start_coord, end: end_coord });
        }
        let slice = &contig[(start_coord - 1) as usize..end_coord as usize];
        let seq = if is_positive_strand { slice.to_vec() } else { dna::revcomp(slice) };
        Ok(String::from_utf8_lossy(&seq).into_owned())
    }
}
