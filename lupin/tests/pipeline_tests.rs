use approx::assert_abs_diff_eq;
use lupin::io::{read_draws, read_trial, write_draws, write_summary, write_trial};
use lupin::model::{fit_conjugate, impute_missing, record_cell, FitConfig, PriorSpec};
use lupin::recovery::summarize_recovery;
use lupin::simulation::{simulate_trial, TrialSimParams, Visit};
use mcmc_util::{
    LinearDesign, PosteriorContrastSummarizer, PosteriorDraws, SummaryConfig, SummaryMode,
};
use nalgebra::DVector;

/// Large, clean trial so the posterior concentrates near the truth
fn clean_params() -> TrialSimParams {
    TrialSimParams {
        n_per_group: 400,
        subject_sd: 0.0,
        noise_sd: 1.0,
        lower_bound: f64::NEG_INFINITY,
        missing_rate: 0.1,
        outlier_rate: 0.0,
        seed: 7,
        ..TrialSimParams::default()
    }
}

fn small_config() -> FitConfig {
    FitConfig {
        n_draws: 2000,
        n_chains: 4,
        seed: 1,
        prior: PriorSpec::default(),
    }
}

#[test]
fn fit_recovers_generating_coefficients() {
    let trial = simulate_trial(&clean_params()).unwrap();
    let design = LinearDesign::group_by_time();
    let fit = fit_conjugate(&trial.records, &design, &small_config()).unwrap();

    assert_eq!(fit.draws.nrows(), 2000);
    assert_eq!(fit.draws.ncols(), 6);
    assert_eq!(fit.sigma.len(), 2000);
    assert_eq!(fit.n_obs, trial.num_observed());

    let mean = fit.draws.posterior_mean();
    for (m, t) in mean.iter().zip(trial.truth.iter()) {
        assert_abs_diff_eq!(*m, *t, epsilon = 0.35);
    }

    let sigma = fit.sigma.iter().sum::<f64>() / fit.sigma.len() as f64;
    assert_abs_diff_eq!(sigma, 1.0, epsilon = 0.1);
}

#[test]
fn fit_is_reproducible_and_seed_dependent() {
    let trial = simulate_trial(&clean_params()).unwrap();
    let design = LinearDesign::group_by_time();
    let a = fit_conjugate(&trial.records, &design, &small_config()).unwrap();
    let b = fit_conjugate(&trial.records, &design, &small_config()).unwrap();
    assert_eq!(a.draws, b.draws);

    let other = FitConfig {
        seed: 2,
        ..small_config()
    };
    let c = fit_conjugate(&trial.records, &design, &other).unwrap();
    assert_ne!(a.draws, c.draws);
}

#[test]
fn uneven_chain_split_keeps_every_draw() {
    let trial = simulate_trial(&clean_params()).unwrap();
    let config = FitConfig {
        n_draws: 1003,
        n_chains: 4,
        ..small_config()
    };
    let fit = fit_conjugate(&trial.records, &LinearDesign::group_by_time(), &config).unwrap();
    assert_eq!(fit.draws.nrows(), 1003);
}

#[test]
fn too_few_observations() {
    let params = TrialSimParams {
        n_per_group: 1,
        missing_rate: 1.0,
        ..TrialSimParams::default()
    };
    let trial = simulate_trial(&params).unwrap();
    // two baseline measurements for six coefficients
    let res = fit_conjugate(&trial.records, &LinearDesign::group_by_time(), &small_config());
    assert!(res.is_err());
}

#[test]
fn contrasts_cover_the_truth() {
    let trial = simulate_trial(&clean_params()).unwrap();
    let design = LinearDesign::group_by_time();
    let fit = fit_conjugate(&trial.records, &design, &small_config()).unwrap();

    let summarizer = PosteriorContrastSummarizer::new(
        design,
        SummaryConfig {
            mass: 0.999,
            ..SummaryConfig::default()
        },
    );
    let recovery = summarize_recovery(&summarizer, &fit.draws, &trial.truth).unwrap();
    assert_eq!(recovery.len(), 12);
    assert_eq!(
        recovery
            .iter()
            .filter(|r| r.mode == SummaryMode::Contrasts)
            .count(),
        6
    );

    // intervention t3-t1 = time3 + interaction3 = 5 + 1
    let r = recovery
        .iter()
        .find(|r| {
            r.mode == SummaryMode::Contrasts
                && r.row.group.as_ref() == "intervention"
                && r.row.label.as_ref() == "t3-t1"
        })
        .unwrap();
    assert_abs_diff_eq!(r.truth, 6.0);

    for r in &recovery {
        assert!(r.covered(), "{:?}", r);
    }
}

#[test]
fn imputes_every_missing_response() {
    let trial = simulate_trial(&clean_params()).unwrap();
    let design = LinearDesign::group_by_time();
    let fit = fit_conjugate(&trial.records, &design, &small_config()).unwrap();

    let imputed = impute_missing(&trial.records, &design, &fit, &small_config()).unwrap();
    let n_missing = trial.records.len() - trial.num_observed();
    assert_eq!(imputed.len(), n_missing);
    assert!(n_missing > 0);

    for imp in &imputed {
        assert!(imp.record.response.is_none());
        assert_ne!(imp.record.visit, Visit::T1);
        assert_eq!(imp.draws.len(), fit.draws.nrows());
    }
}

#[test]
fn imputation_noise_is_independent_of_the_chain() {
    let trial = simulate_trial(&clean_params()).unwrap();
    let design = LinearDesign::group_by_time();
    let config = FitConfig {
        n_draws: 200,
        n_chains: 1,
        ..small_config()
    };
    let fit = fit_conjugate(&trial.records, &design, &config).unwrap();
    assert_ne!(config.imputation_seed(), config.seed);

    // standard normals behind each coefficient draw: L^{-1} (beta - mean) / sigma
    let chol_l = fit.posterior.cov.clone().cholesky().unwrap().l();
    let mut chain_normals = vec![];
    for (i, row) in fit.draws.rows().enumerate() {
        let centred = DVector::from_column_slice(row) - &fit.posterior.mean;
        let z = chol_l.solve_lower_triangular(&centred).unwrap() / fit.sigma[i];
        chain_normals.extend(z.iter().copied());
    }

    let imputed = impute_missing(&trial.records, &design, &fit, &config).unwrap();
    let first = &imputed[0];
    let mu = fit
        .draws
        .combine(&record_cell(&design, &first.record).unwrap().weights)
        .unwrap();

    let n_shared = first
        .draws
        .iter()
        .zip(mu.iter().zip(fit.sigma.iter()))
        .map(|(y, (m, s))| (y - m) / s)
        .filter(|e| chain_normals.iter().any(|z| (z - e).abs() < 1e-8))
        .count();
    assert_eq!(n_shared, 0);
}

#[test]
fn files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let trial = simulate_trial(&TrialSimParams {
        n_per_group: 5,
        ..TrialSimParams::default()
    })
    .unwrap();

    let trial_file = dir.path().join("sim.trial.tsv.gz");
    let trial_file = trial_file.to_str().unwrap();
    write_trial(&trial.records, trial_file).unwrap();
    let records = read_trial(trial_file).unwrap();
    assert_eq!(records.len(), trial.records.len());
    for (a, b) in records.iter().zip(trial.records.iter()) {
        assert_eq!((a.subject, a.arm, a.visit), (b.subject, b.arm, b.visit));
        match (a.response, b.response) {
            (Some(x), Some(y)) => assert_abs_diff_eq!(x, y, epsilon = 1e-6),
            (None, None) => {}
            _ => panic!("missingness changed for subject {}", a.subject),
        }
    }

    let fit = fit_conjugate(
        &records,
        &LinearDesign::group_by_time(),
        &FitConfig {
            n_draws: 50,
            ..small_config()
        },
    )
    .unwrap();
    let draws_file = dir.path().join("sim.draws.tsv");
    let draws_file = draws_file.to_str().unwrap();
    write_draws(&fit.draws, draws_file).unwrap();
    let draws = read_draws(draws_file).unwrap();
    assert_eq!(draws, fit.draws);
}

#[test]
fn summary_table_model_column() {
    let dir = tempfile::tempdir().unwrap();
    let summarizer = PosteriorContrastSummarizer::default();
    let means = |row: Vec<f64>| {
        let draws = PosteriorDraws::from_rows(vec![row]).unwrap();
        summarizer.summarize(&draws, SummaryMode::Means).unwrap()
    };
    let run1 = means(vec![10.0, 2.0, 5.0, 1.0, 0.0, 1.0]);
    let run2 = means(vec![20.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

    // one model: no model column
    let single = dir.path().join("single.tsv");
    let single = single.to_str().unwrap();
    write_summary(&[(Box::<str>::from("run1"), run1.clone())], "time", single).unwrap();
    let text = std::fs::read_to_string(single).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "group\ttime\testimate\tlower\tupper");
    assert_eq!(lines[1], "control\tt1\t10\t10\t10");
    assert_eq!(lines[6], "intervention\tt3\t17\t17\t17");

    // several models: leading model column, input order kept
    let batch = dir.path().join("batch.tsv");
    let batch = batch.to_str().unwrap();
    let models: Vec<(Box<str>, _)> = vec![("run1".into(), run1), ("run2".into(), run2)];
    write_summary(&models, "time", batch).unwrap();
    let text = std::fs::read_to_string(batch).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 13);
    assert_eq!(lines[0], "model\tgroup\ttime\testimate\tlower\tupper");
    assert_eq!(lines[1], "run1\tcontrol\tt1\t10\t10\t10");
    assert_eq!(lines[7], "run2\tcontrol\tt1\t20\t20\t20");
    assert!(lines[1..7].iter().all(|l| l.starts_with("run1\t")));
    assert!(lines[7..].iter().all(|l| l.starts_with("run2\t")));
}

#[test]
fn malformed_files_report_the_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.tsv");
    std::fs::write(
        &path,
        "subject\tgroup\ttime\tresponse\n0\tcontrol\tt1\t1.5\n1\tplacebo\tt1\t2.0\n",
    )
    .unwrap();
    let err = read_trial(path.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains(":3:"), "{}", err);

    let draws_path = dir.path().join("bad.draws.tsv");
    std::fs::write(&draws_path, "a\tb\n1\t2\n3\n").unwrap();
    assert!(read_draws(draws_path.to_str().unwrap()).is_err());
}
