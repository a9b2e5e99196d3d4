use std::collections::BTreeSet;
use std::io::Cursor;

use nuclease_off_target::align::{align_best, enumerate_alignments, AlignOpt, AlignedPair, AlignmentBudget};
use nuclease_off_target::genome::{FastaSource, GenomicWindow};
use nuclease_off_target::io::fasta;
use nuclease_off_target::offtarget::{evaluate_best_site, find_off_targets, scan_windows};
use nuclease_off_target::target::{FamilyTable, NucleaseTarget};
use nuclease_off_target::util::dna::bases_match;

const GUIDE: &str = "GTTAGGACTATTAGCGTGAT";
const REVERSE_WINDOW: &str = "CAGATGTCCCATCACGCTAATAGTCCTAACCGGTTTAG";

fn spcas9() -> NucleaseTarget {
    NucleaseTarget::spcas9(GUIDE).unwrap()
}

fn window(seq: &str) -> GenomicWindow {
    GenomicWindow::new("hg19", "chr1", 1, true, seq).unwrap()
}

#[test]
fn base_match_table() {
    for b in *b"ACGTN" {
        assert!(bases_match(b'N', b));
        assert!(bases_match(b, b));
    }
    assert!(bases_match(b'R', b'A'));
    assert!(bases_match(b'R', b'G'));
    assert!(!bases_match(b'R', b'C'));
    assert!(!bases_match(b'R', b'T'));
    assert!(!bases_match(b'A', b'C'));
    // 简并码只在 guide/PAM 一侧生效
    assert!(!bases_match(b'A', b'N'));
    assert!(!bases_match(b'G', b'R'));
}

#[test]
fn reverse_strand_site() {
    let w = GenomicWindow::new("hg19", "chr21", 999, true, REVERSE_WINDOW).unwrap();
    let a = align_best(&spcas9(), &w, &AlignOpt::default()).unwrap();
    assert!(!a.window.is_positive_strand());
    assert_eq!(a.score, 108);
    assert_eq!(a.cigar.to_string(), "8D20=1X2=7D");
    assert_eq!(a.formatted.query, "GTTAGGACTATTAGCGTGATNGG");
    assert_eq!(a.formatted.indicator, "|".repeat(23));
    assert_eq!(a.formatted.genome, "GTTAGGACTATTAGCGTGATGGG");

    let r = evaluate_best_site(&spcas9(), &w, &AlignOpt::default()).unwrap();
    assert_eq!(r.strand, '-');
    assert_eq!((r.site_start, r.site_end), (1006, 1028));
    assert_eq!(r.cut_site, 1011);
    assert_eq!(r.off_target_score, 0.0);
}

#[test]
fn one_mismatch_near_guide_start() {
    let a = align_best(&spcas9(), &window("GGGTAAGGACTATTAGCGTGATGGGGA"), &AlignOpt::default()).unwrap();
    assert_eq!(a.formatted.indicator, format!("||X{}", "|".repeat(20)));
    assert_eq!(a.genome_fragment(), "GTAAGGACTATTAGCGTGATGGG");
}

#[test]
fn ambiguous_pam_with_two_guide_mismatches() {
    let penalties = FamilyTable::builtin().get("SpCas9").unwrap().penalties.clone();
    let t = NucleaseTarget::new(GUIDE, "RGG", -3, penalties).unwrap();
    let a = align_best(&t, &window("TAGGTCGGGACTATTAGCGTGATTGGATT"), &AlignOpt::default()).unwrap();
    assert_eq!(a.formatted.indicator, format!("||XX{}X||", "|".repeat(16)));
    assert_eq!(a.genome_fragment(), "GTCGGGACTATTAGCGTGATTGG");
    assert_eq!(a.formatted.mismatches(), 3);
}

#[test]
fn unpaired_guide_base() {
    let a = align_best(&spcas9(), &window("GGGTTGGACTATTAGCGTGATGGGGA"), &AlignOpt::default()).unwrap();
    assert_eq!(a.formatted.query, "GTTAGGACTATTAGCGTGATNGG");
    assert_eq!(a.formatted.genome, "GTT-GGACTATTAGCGTGATGGG");
    assert_eq!(a.formatted.indicator, format!("|||-{}", "|".repeat(19)));
    assert_eq!(a.formatted.rna_bulges(), 1);
}

#[test]
fn extra_genomic_base() {
    let a = align_best(&spcas9(), &window("ACCGTTAGGACGTATTAGCGTGATCGGCT"), &AlignOpt::default()).unwrap();
    assert_eq!(a.formatted.query, "GTTAGGAC-TATTAGCGTGATNGG");
    assert_eq!(a.formatted.genome, "GTTAGGACGTATTAGCGTGATCGG");
    assert_eq!(a.formatted.indicator, format!("{}+{}", "|".repeat(8), "|".repeat(15)));
    assert_eq!(a.formatted.dna_bulges(), 1);
}

#[test]
fn sacas9_enumeration_respects_total_bulge_budget() {
    let t = NucleaseTarget::sacas9(GUIDE).unwrap();
    assert_eq!(t.sequence(), "GTTAGGACTATTAGCGTGATNNGRRT");
    let query = t.sequence().as_bytes();
    let seq = b"GTTAGGACGTATTAGCGTGTCAGAGT";

    let got = enumerate_alignments(query, seq, &AlignmentBudget::new(2, 6, 3, 3)).unwrap();
    let expected = AlignedPair {
        query: "GTTAGGAC-TATTAGCGTGATNNGRRT".to_string(),
        genome: "GTTAGGACGTATTAGCGTG-TCAGAGT".to_string(),
    };
    assert!(got.contains(&expected), "{:?}", got);

    let got = enumerate_alignments(query, seq, &AlignmentBudget::new(2, 1, 3, 3)).unwrap();
    assert_eq!(got, BTreeSet::new());
}

#[test]
fn sacas9_enumeration_over_exact_and_bulged_copies() {
    let t = NucleaseTarget::sacas9(GUIDE).unwrap();
    let query = t.sequence().as_bytes();
    let exact = "GTTAGGACTATTAGCGTGATCAGAGT";
    let one_bulge = "GTTAGGACGTATTAGCGTGATCAGAGT";
    let two_bulges = "GTTAGGACGTATTAGCGTGTCAGAGT";
    let seq = format!("{}AA{}AA{}", exact, one_bulge, two_bulges);

    let pair = |q: &str, g: &str| AlignedPair { query: q.to_string(), genome: g.to_string() };
    let exact_pair = pair("GTTAGGACTATTAGCGTGATNNGRRT", exact);
    let one_bulge_pair = pair("GTTAGGAC-TATTAGCGTGATNNGRRT", one_bulge);
    let two_bulge_pair = pair("GTTAGGAC-TATTAGCGTGATNNGRRT", "GTTAGGACGTATTAGCGTG-TCAGAGT");

    let got = enumerate_alignments(query, seq.as_bytes(), &AlignmentBudget::new(2, 6, 3, 3)).unwrap();
    assert!(got.contains(&exact_pair), "{:?}", got);
    assert!(got.contains(&one_bulge_pair), "{:?}", got);
    assert!(got.contains(&two_bulge_pair), "{:?}", got);
    for p in &got {
        let rna = p.genome.matches('-').count();
        let dna = p.query.matches('-').count();
        assert!(rna <= 3 && dna <= 3 && rna + dna <= 6, "{:?}", p);
    }

    // 只允许一个 DNA bulge 时，双 bulge 拷贝不再出现
    let got = enumerate_alignments(query, seq.as_bytes(), &AlignmentBudget::new(0, 1, 0, 1)).unwrap();
    assert!(got.contains(&exact_pair));
    assert!(got.contains(&one_bulge_pair));
    assert!(!got.contains(&two_bulge_pair));
}

#[test]
fn sacas9_exact_site_is_ranked_first() {
    let t = NucleaseTarget::sacas9(GUIDE).unwrap();
    let w = GenomicWindow::new("hg38", "chr3", 1000, true, "CCAGTTAGGACTATTAGCGTGATCAGAGTTTGC").unwrap();
    let reports = find_off_targets(&t, &w, &AlignmentBudget::default()).unwrap();
    let best = &reports[0];
    assert_eq!(best.off_target_score, 0.0);
    assert_eq!(best.strand, '+');
    assert_eq!(best.cut_site, 1020);
    assert_eq!(best.display.query, "GTTAGGACTATTAGCGTGAT NNGRRT");
}

#[test]
fn cut_site_is_strand_and_trim_invariant() {
    let t = NucleaseTarget::spcas9("GATTCCGTAGACAGACTAGG").unwrap();
    let w = GenomicWindow::new("hg19", "chr1", 10, true, "AGCTGGATTCCGTAGACAGACTAGGTGGACTG").unwrap();
    let opt = AlignOpt::default();
    let cut = |w: &GenomicWindow| evaluate_best_site(&t, w, &opt).unwrap().cut_site;

    assert_eq!(cut(&w), 32);
    assert_eq!(cut(&w.reverse_complement()), 32);
    assert_eq!(cut(&w.trim_5prime(3).unwrap()), 32);
    assert_eq!(cut(&w.trim_3prime(2).unwrap()), 32);

    let r = GenomicWindow::new("hg19", "chr21", 999, true, REVERSE_WINDOW).unwrap();
    let t = spcas9();
    let cut = |w: &GenomicWindow| evaluate_best_site(&t, w, &opt).unwrap().cut_site;
    assert_eq!(cut(&r), 1011);
    assert_eq!(cut(&r.reverse_complement()), 1011);
    assert_eq!(cut(&r.trim_5prime(4).unwrap()), 1011);
}

#[test]
fn windows_from_reference_fasta() {
    let mut chr21 = "T".repeat(998);
    chr21.push_str(REVERSE_WINDOW);
    chr21.push_str(&"T".repeat(40));
    let fa = format!(">chr21 toy\n{}\n{}\n", &chr21[..500], &chr21[500..]);
    let source = FastaSource::from_reader("hg19", Cursor::new(fa.into_bytes())).unwrap();

    let w = GenomicWindow::from_source(&source, "hg19", "chr21", 999, 1036, true).unwrap();
    assert_eq!(w.sequence(), REVERSE_WINDOW);
    let r = evaluate_best_site(&spcas9(), &w, &AlignOpt::default()).unwrap();
    assert_eq!(r.cut_site, 1011);

    let neg = GenomicWindow::from_source(&source, "hg19", "chr21", 999, 1036, false).unwrap();
    assert_eq!(neg, w.reverse_complement());
}

#[test]
fn scan_over_window_fasta() {
    let data = format!(
        ">hg19:chr21:999:+\n{}\n>hg19:chr1:10:+\nAGCTGGATTCCGTAGACAGACTAGGTGGACTG\n",
        REVERSE_WINDOW
    );
    let windows = fasta::read_windows(Cursor::new(data.into_bytes())).unwrap();
    assert_eq!(windows.len(), 2);

    let reports = scan_windows(&spcas9(), &windows, &AlignmentBudget::new(0, 0, 0, 0)).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].chromosome, "chr21");
    assert_eq!(reports[0].cut_site, 1011);
}
