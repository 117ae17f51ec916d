use motif_enrichment::binning::{self, BinningParams};
use motif_enrichment::error::MotifError;
use motif_enrichment::table::{Probe, ScoredProbe};

fn probes(n: usize) -> Vec<Probe> {
    (0..n)
        .map(|i| Probe::new("ACGTACGT", 1 + (i % 7) as u64, (i % 5) as u64))
        .collect()
}

fn scored<'a>(probes: &'a [Probe], scores: &[f64]) -> Vec<ScoredProbe<'a>> {
    probes
        .iter()
        .zip(scores)
        .enumerate()
        .map(|(index, (probe, &score))| ScoredProbe::new(index, probe, score))
        .collect()
}

/// Scores descending with table order, so ranking is the identity
fn descending_scores(n: usize) -> Vec<f64> {
    (0..n).map(|i| (n - i) as f64).collect()
}

#[test]
fn test_rank_descending() {
    let probes = probes(5);
    let scored = scored(&probes, &[0.5, 3.0, -1.0, 10.0, 2.0]);
    let ranked = binning::rank(&scored).unwrap();
    let order: Vec<usize> = ranked.iter().map(|p| p.index).collect();
    assert_eq!(order, vec![3, 1, 4, 0, 2]);

    // input untouched
    assert_eq!(scored[0].index, 0);
}

#[test]
fn test_rank_is_stable_on_ties() {
    let probes = probes(5);
    // positions 1 and 3 tie at 5.0
    let scored = scored(&probes, &[1.0, 5.0, 2.0, 5.0, 0.0]);
    let ranked = binning::rank(&scored).unwrap();
    let order: Vec<usize> = ranked.iter().map(|p| p.index).collect();
    assert_eq!(order, vec![1, 3, 2, 0, 4]);

    // the tie keeps input order even when the input is presented reversed
    let reversed: Vec<ScoredProbe> = scored.iter().rev().copied().collect();
    let ranked = binning::rank(&reversed).unwrap();
    let order: Vec<usize> = ranked.iter().map(|p| p.index).collect();
    assert_eq!(order, vec![3, 1, 2, 0, 4]);
}

#[test]
fn test_rank_is_idempotent() {
    let probes = probes(50);
    let scores: Vec<f64> = (0..50).map(|i| ((i * 37) % 11) as f64).collect();
    let scored = scored(&probes, &scores);
    let once = binning::rank(&scored).unwrap();
    let twice = binning::rank(&once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_rank_puts_nan_last() {
    let probes = probes(3);
    let scored = scored(&probes, &[f64::NAN, 1.0, f64::INFINITY]);
    let ranked = binning::rank(&scored).unwrap();
    let order: Vec<usize> = ranked.iter().map(|p| p.index).collect();
    assert_eq!(order, vec![2, 1, 0]);
}

#[test]
fn test_empty_input() {
    assert!(matches!(binning::rank(&[]), Err(MotifError::EmptyInput(_))));
    assert!(matches!(
        binning::bin(&[], &BinningParams::default()),
        Err(MotifError::EmptyInput(_))
    ));
}

#[test]
fn test_invalid_bin_size() {
    assert!(BinningParams::new(0, 10).is_err());
    let probes = probes(3);
    let scored = scored(&probes, &[1.0, 2.0, 3.0]);
    let params = BinningParams {
        bin_size: 0,
        tail_buffer: 0,
    };
    assert!(matches!(
        binning::bin(&scored, &params),
        Err(MotifError::InvalidParameter { .. })
    ));
}

#[test]
fn test_default_params() {
    let params = BinningParams::default();
    assert_eq!(params.bin_size, 1000);
    assert_eq!(params.tail_buffer, 10);
}

#[test]
fn test_bin_1015_probes() {
    let probes = probes(1015);
    let scored = scored(&probes, &descending_scores(1015));
    let ranked = binning::rank(&scored).unwrap();
    let report = binning::bin(&ranked, &BinningParams::default()).unwrap();

    assert_eq!(report.len(), 1);
    let top = report.top_bin().unwrap();
    let expected_r0: u64 = probes[..1000].iter().map(|p| p.r0_count).sum();
    let expected_r1: u64 = probes[..1000].iter().map(|p| p.r1_count).sum();
    assert_eq!(top.r0_sum(), expected_r0);
    assert_eq!(top.r1_sum(), expected_r1);
    // mean of 1015 down to 16
    assert!((top.avg_score() - 515.5).abs() < 1e-9);
    assert_eq!(
        top.enrichment(),
        Some(expected_r1 as f64 / expected_r0 as f64)
    );
}

#[test]
fn test_too_few_probes_gives_empty_report() {
    let probes = probes(1009);
    let scored = scored(&probes, &descending_scores(1009));
    let report = binning::bin(&scored, &BinningParams::default()).unwrap();
    assert!(report.is_empty());
    assert!(report.top_bin().is_none());
}

#[test]
fn test_bin_count_matches_remainder_rule() {
    let probes = probes(130);
    for bin_size in [1, 7, 10, 25] {
        for tail_buffer in [0, 3, 9] {
            let params = BinningParams::new(bin_size, tail_buffer).unwrap();
            for n in 1..=130 {
                let scored = scored(&probes[..n], &descending_scores(n));
                let report = binning::bin(&scored, &params).unwrap();

                let expected = if tail_buffer <= bin_size {
                    // floor(n / B), one fewer when the remainder falls short of the buffer
                    let full = n / bin_size;
                    if n % bin_size >= tail_buffer {
                        full
                    } else {
                        full.saturating_sub(1)
                    }
                } else if n < bin_size + tail_buffer {
                    0
                } else {
                    (n - tail_buffer) / bin_size
                };
                assert_eq!(report.len(), expected, "n={n} B={bin_size} K={tail_buffer}");
                assert_eq!(params.bin_count(n), expected);

                // bins are consecutive windows of exactly bin_size ranked probes
                for (k, bin) in report.iter().enumerate() {
                    let window = &probes[k * bin_size..(k + 1) * bin_size];
                    let r0: u64 = window.iter().map(|p| p.r0_count).sum();
                    assert_eq!(bin.r0_sum(), r0);
                }
            }
        }
    }
}

#[test]
fn test_zero_tail_buffer_keeps_exact_multiples() {
    let probes = probes(2000);
    let scored = scored(&probes, &descending_scores(2000));
    let report = binning::bin(&scored, &BinningParams::new(1000, 0).unwrap()).unwrap();
    assert_eq!(report.len(), 2);

    // with the default buffer the second full bin is not cut
    let report = binning::bin(&scored, &BinningParams::default()).unwrap();
    assert_eq!(report.len(), 1);
}

#[test]
fn test_zero_round0_reads_leave_enrichment_undefined() {
    let probes = vec![
        Probe::new("ACGT", 0, 4),
        Probe::new("ACGT", 0, 4),
        Probe::new("ACGT", 0, 4),
        Probe::new("ACGT", 2, 1),
        Probe::new("ACGT", 2, 1),
        Probe::new("ACGT", 0, 1),
    ];
    let scored = scored(&probes, &descending_scores(6));
    let report = binning::bin(&scored, &BinningParams::new(3, 0).unwrap()).unwrap();

    assert_eq!(report.len(), 2);
    let first = &report.bins()[0];
    assert_eq!(first.r0_sum(), 0);
    assert_eq!(first.r1_sum(), 12);
    assert_eq!(first.enrichment(), None);
    assert!(!first.is_enrichment_defined());

    let second = &report.bins()[1];
    assert_eq!(second.enrichment(), Some(0.75));

    for bin in &report {
        if bin.r0_sum() == 0 {
            assert!(bin.enrichment().is_none());
        }
    }
}

#[test]
fn test_top_bin_enrichment_curve() {
    let probes = vec![
        Probe::new("ACGT", 1, 3),
        Probe::new("ACGT", 1, 1),
        Probe::new("ACGT", 1, 0),
        Probe::new("ACGT", 1, 0),
    ];
    let scored = scored(&probes, &descending_scores(4));
    let curve = binning::top_bin_enrichment_curve(&scored, 2, 1.0).unwrap();

    let sizes: Vec<usize> = curve.iter().map(|p| p.size).collect();
    assert_eq!(sizes, vec![2, 3, 4]);
    assert!((curve[0].enrichment - 5.0 / 3.0).abs() < 1e-12);
    assert!((curve[1].enrichment - 5.0 / 4.0).abs() < 1e-12);
    assert!((curve[2].enrichment - 1.0).abs() < 1e-12);

    assert!(binning::top_bin_enrichment_curve(&scored, 5, 1.0)
        .unwrap()
        .is_empty());
    assert!(binning::top_bin_enrichment_curve(&scored, 0, 1.0).is_err());
    assert!(binning::top_bin_enrichment_curve(&scored, 1, 0.0).is_err());
    assert!(binning::top_bin_enrichment_curve(&[], 1, 1.0).is_err());
}

#[test]
fn test_bin_with_cofactor() {
    let probes = probes(6);
    // reference ranks probes 5, 4, ..., 0
    let scored = scored(&probes, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let ranked = binning::rank(&scored).unwrap();
    let cofactor = [0.0, 10.0, 20.0, 30.0, 40.0, 50.0];
    let params = BinningParams::new(2, 0).unwrap();

    let bins = binning::bin_with_cofactor(&ranked, &cofactor, &params).unwrap();
    assert_eq!(bins.len(), 3);
    assert!((bins[0].avg_cofactor_score - 45.0).abs() < 1e-12);
    assert!((bins[0].bin.avg_score() - 5.5).abs() < 1e-12);
    assert!((bins[2].avg_cofactor_score - 5.0).abs() < 1e-12);

    let plain = binning::bin(&ranked, &params).unwrap();
    let from_cofactor: Vec<_> = bins.iter().map(|b| b.bin).collect();
    assert_eq!(plain.bins(), from_cofactor.as_slice());

    // a co-factor score is required for every binned probe
    assert!(matches!(
        binning::bin_with_cofactor(&ranked, &cofactor[..3], &params),
        Err(MotifError::InvalidParameter { .. })
    ));
}

#[test]
fn test_read_sum_overflow() {
    let probes = vec![Probe::new("ACGT", i64::MAX as u64, 1); 3];
    let scored = scored(&probes, &descending_scores(3));
    let params = BinningParams::new(3, 0).unwrap();

    assert!(matches!(
        binning::bin(&scored, &params),
        Err(MotifError::DataError(_))
    ));
    assert!(matches!(
        binning::top_bin_enrichment_curve(&scored, 1, 1.0),
        Err(MotifError::DataError(_))
    ));
    assert!(matches!(
        binning::bin_composition(&scored, &params),
        Err(MotifError::DataError(_))
    ));

    // two such counts still fit
    let report = binning::bin(&scored[..2], &BinningParams::new(2, 0).unwrap()).unwrap();
    assert_eq!(report.bins()[0].r0_sum(), 2 * (i64::MAX as u64));
}

#[test]
fn test_bin_composition() {
    let probes = vec![
        Probe::new("AAAA", 1, 1),
        Probe::new("ACGT", 1, 1),
        Probe::new("CCCC", 1, 1),
        Probe::new("GGTT", 1, 1),
    ];
    let ranked = scored(&probes, &descending_scores(4));
    let params = BinningParams::new(2, 0).unwrap();

    let bins = binning::bin_composition(&ranked, &params).unwrap();
    assert_eq!(bins.len(), 2);

    // AAAA and ACGT
    let expected_mono = [0.625, 0.125, 0.125, 0.125];
    for (got, want) in bins[0].mononucleotide.iter().zip(expected_mono) {
        assert!((got - want).abs() < 1e-12);
    }
    // AA: 3/4 in AAAA, none in ACGT
    assert!((bins[0].dinucleotide[0] - 0.375).abs() < 1e-12);
    // AC: 1/4 in ACGT
    assert!((bins[0].dinucleotide[1] - 0.125).abs() < 1e-12);

    // CCCC and GGTT
    let expected_mono = [0.0, 0.5, 0.25, 0.25];
    for (got, want) in bins[1].mononucleotide.iter().zip(expected_mono) {
        assert!((got - want).abs() < 1e-12);
    }

    let plain = binning::bin(&ranked, &params).unwrap();
    let from_composition: Vec<_> = bins.iter().map(|b| b.bin).collect();
    assert_eq!(plain.bins(), from_composition.as_slice());

    assert!(binning::bin_composition(&[], &params).is_err());

    let invalid = vec![Probe::new("ACNT", 1, 1), Probe::new("ACGT", 1, 1)];
    let scored_invalid = scored(&invalid, &descending_scores(2));
    assert!(matches!(
        binning::bin_composition(&scored_invalid, &params),
        Err(MotifError::InvalidBase { .. })
    ));
}
