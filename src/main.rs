use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;

use nuclease_off_target::align::{AlignOpt, AlignmentBudget};
use nuclease_off_target::genome::{FastaSource, GenomicWindow, RateLimitedSource, RateLimiter, SystemClock};
use nuclease_off_target::io::fasta;
use nuclease_off_target::offtarget::{self, SiteReport, REPORT_HEADER};
use nuclease_off_target::target::{FamilyTable, NucleaseTarget};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(
    name = "nuclease-off-target",
    author,
    version,
    about = "Off-target site evaluation for CRISPR nucleases",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Best semi-global alignment of guide+PAM in each window
    Align {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long = "gap-open", default_value_t = AlignOpt::default().gap_open)]
        gap_open: i32,
        #[arg(long = "gap-ext", default_value_t = AlignOpt::default().gap_extend)]
        gap_extend: i32,
    },
    /// Enumerate every alignment within mismatch/bulge budgets
    Scan {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long = "max-mismatches", default_value_t = AlignmentBudget::default().mismatches)]
        max_mismatches: usize,
        #[arg(long = "max-bulges", default_value_t = AlignmentBudget::default().total_bulges)]
        max_bulges: usize,
        #[arg(long = "max-rna-bulges", default_value_t = AlignmentBudget::default().rna_bulges)]
        max_rna_bulges: usize,
        #[arg(long = "max-dna-bulges", default_value_t = AlignmentBudget::default().dna_bulges)]
        max_dna_bulges: usize,
    },
    /// Print the nuclease family table as JSON
    Families {
        /// Extra/overriding families (JSON)
        #[arg(long = "nuclease-table")]
        nuclease_table: Option<String>,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Guide sequence (without PAM)
    #[arg(short, long)]
    guide: String,
    /// Nuclease family name
    #[arg(short, long, default_value = "SpCas9")]
    nuclease: String,
    /// Extra/overriding families (JSON)
    #[arg(long = "nuclease-table")]
    nuclease_table: Option<String>,
    /// FASTA of windows, headers `genome:chromosome:start:strand`
    #[arg(short, long, conflicts_with = "reference")]
    windows: Option<String>,
    /// Reference FASTA to cut a window from (with --region)
    #[arg(short, long, requires = "region")]
    reference: Option<String>,
    /// Window to fetch from --reference, `chromosome:start-end`
    #[arg(long)]
    region: Option<String>,
    /// Genome name for --reference
    #[arg(long = "genome", default_value = "reference")]
    genome: String,
    /// Fetch the window from the negative strand
    #[arg(long)]
    negative: bool,
    /// Minimum seconds between sequence requests
    #[arg(long = "min-request-interval", default_value_t = 0)]
    min_request_interval: u64,
    /// Output path (stdout if omitted)
    #[arg(short, long)]
    out: Option<String>,
    /// Write JSON instead of tab-separated text
    #[arg(long)]
    json: bool,
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    generated_at: String,
    command: String,
    target: &'a NucleaseTarget,
    sites: &'a [SiteReport],
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Align { common, gap_open, gap_extend } => run_align(&common, AlignOpt { gap_open, gap_extend }),
        Commands::Scan { common, max_mismatches, max_bulges, max_rna_bulges, max_dna_bulges } => {
            let budget = AlignmentBudget::new(max_mismatches, max_bulges, max_rna_bulges, max_dna_bulges);
            run_scan(&common, budget)
        }
        Commands::Families { nuclease_table } => run_families(nuclease_table.as_deref()),
    }
}

fn load_families(path: Option<&str>) -> Result<FamilyTable> {
    let mut table = FamilyTable::builtin();
    if let Some(path) = path {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read nuclease table '{}': {}", path, e))?;
        let extra = FamilyTable::from_json(&text)?;
        info!("loaded {} nuclease families from {}", extra.families().len(), path);
        table.merge(extra);
    }
    Ok(table)
}

/// `chr1:100-200` → (chr1, 100, 200)
fn parse_region(region: &str) -> Result<(String, u64, u64)> {
    let (chrom, range) = region
        .rsplit_once(':')
        .ok_or_else(|| anyhow::anyhow!("region '{}' is not chromosome:start-end", region))?;
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| anyhow::anyhow!("region '{}' is not chromosome:start-end", region))?;
    let start: u64 = start.parse().map_err(|e| anyhow::anyhow!("bad region start '{}': {}", start, e))?;
    let end: u64 = end.parse().map_err(|e| anyhow::anyhow!("bad region end '{}': {}", end, e))?;
    if chrom.is_empty() {
        anyhow::bail!("region '{}' has an empty chromosome name", region);
    }
    Ok((chrom.to_string(), start, end))
}

fn load_windows(common: &CommonArgs) -> Result<Vec<GenomicWindow>> {
    if let Some(path) = &common.windows {
        let fh = std::fs::File::open(path).map_err(|e| anyhow::anyhow!("cannot open windows FASTA '{}': {}", path, e))?;
        let windows = fasta::read_windows(std::io::BufReader::new(fh))?;
        if windows.is_empty() {
            anyhow::bail!("windows FASTA '{}' contains no sequences", path);
        }
        return Ok(windows);
    }

    let (Some(reference), Some(region)) = (&common.reference, &common.region) else {
        anyhow::bail!("either --windows or --reference with --region is required");
    };
    let fh = std::fs::File::open(reference)
        .map_err(|e| anyhow::anyhow!("cannot open reference FASTA '{}': {}", reference, e))?;
    let source = FastaSource::from_reader(&common.genome, std::io::BufReader::new(fh))?;
    let limiter = RateLimiter::new(SystemClock::new(), Duration::from_secs(common.min_request_interval));
    let source = RateLimitedSource::new(source, &limiter);

    let (chrom, start, end) = parse_region(region)?;
    let window = GenomicWindow::from_source(&source, &common.genome, &chrom, start, end, !common.negative)?;
    Ok(vec![window])
}

fn setup(common: &CommonArgs) -> Result<(NucleaseTarget, Vec<GenomicWindow>)> {
    if common.threads > 1 {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(common.threads).build_global() {
            warn!("failed to configure thread pool: {}", e);
        }
    }
    let table = load_families(common.nuclease_table.as_deref())?;
    let target = NucleaseTarget::from_family(&table, &common.nuclease, &common.guide)?;
    let windows = load_windows(common)?;
    info!("{} {} against {} window(s)", common.nuclease, target.sequence(), windows.len());
    Ok((target, windows))
}

fn run_align(common: &CommonArgs, opt: AlignOpt) -> Result<()> {
    let (target, windows) = setup(common)?;
    let mut sites = Vec::with_capacity(windows.len());
    for (window, result) in windows.iter().zip(offtarget::evaluate_windows(&target, &windows, &opt)) {
        match result {
            Ok(report) => sites.push(report),
            Err(e) => warn!("{}: {}", window, e),
        }
    }
    info!("aligned {} of {} windows", sites.len(), windows.len());
    write_output(common, &target, &sites)
}

fn run_scan(common: &CommonArgs, budget: AlignmentBudget) -> Result<()> {
    let (target, windows) = setup(common)?;
    let sites = offtarget::scan_windows(&target, &windows, &budget)?;
    info!(
        "found {} candidate sites (mm<={} bulges<={} rna<={} dna<={})",
        sites.len(),
        budget.mismatches,
        budget.total_bulges,
        budget.rna_bulges,
        budget.dna_bulges
    );
    write_output(common, &target, &sites)
}

fn run_families(nuclease_table: Option<&str>) -> Result<()> {
    let table = load_families(nuclease_table)?;
    println!("{}", table.to_json()?);
    Ok(())
}

fn write_output(common: &CommonArgs, target: &NucleaseTarget, sites: &[SiteReport]) -> Result<()> {
    let mut out: Box<dyn Write> = match &common.out {
        Some(path) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(path).map_err(|e| anyhow::anyhow!("cannot create output '{}': {}", path, e))?,
        )),
        None => Box::new(std::io::BufWriter::new(std::io::stdout().lock())),
    };
    let command = std::env::args().collect::<Vec<_>>().join(" ");

    if common.json {
        let doc = RunOutput { generated_at: chrono::Utc::now().to_rfc3339(), command, target, sites };
        serde_json::to_writer_pretty(&mut out, &doc)?;
        writeln!(out)?;
    } else {
        writeln!(out, "#command\t{}", command)?;
        writeln!(out, "#target\t{}\t{}", target.guide(), target.pam())?;
        writeln!(out, "{}", REPORT_HEADER)?;
        for site in sites {
            writeln!(out, "{}", site)?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_parsing() {
        assert_eq!(parse_region("chr21:999-1036").unwrap(), ("chr21".to_string(), 999, 1036));
        assert!(parse_region("chr21").is_err());
        assert!(parse_region("chr21:a-10").is_err());
        assert!(parse_region(":1-10").is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["nuclease-off-target", "scan", "-g", "ACGT", "-w", "w.fa"]);
        match cli.command {
            Commands::Scan { common, max_mismatches, max_bulges, .. } => {
                assert_eq!(common.nuclease, "SpCas9");
                assert_eq!((max_mismatches, max_bulges), (3, 1));
            }
            _ => panic!("expected scan"),
        }
    }
}
