use anyhow::{Context, Result};
use cuex_core::{
    CueValidity, CueValue, SignalIntensity, StimulusSet, TargetDuration, TrialFactors, TrialRecord,
};
use cuex_experiment::{
    evaluate as evaluate_block, ExperimentConfig, Session, SessionContext, SessionSummary,
    SimulatedObserver, TrialPlan,
};
use cuex_timing::{HighPrecisionTimer, SimulatedTimer, Timer};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct SimulateOptions {
    pub config: Option<PathBuf>,
    pub participant: u32,
    pub seed: Option<u64>,
    pub out: Option<PathBuf>,
    pub realtime: bool,
    pub skill: f64,
}

/// Layout of the results file.
#[derive(Serialize)]
struct Results<'a> {
    seed: u64,
    summary: Option<&'a SessionSummary>,
    trials: &'a [TrialRecord],
}

pub fn load_config(path: Option<&Path>) -> Result<ExperimentConfig> {
    match path {
        Some(path) => Ok(ExperimentConfig::load(path)?),
        None => Ok(ExperimentConfig::default()),
    }
}

pub fn simulate(opts: &SimulateOptions) -> Result<SessionSummary> {
    let config = load_config(opts.config.as_deref())?;
    let seed = opts.seed.unwrap_or_else(rand::random);
    info!(
        participant = opts.participant,
        seed,
        realtime = opts.realtime,
        skill = opts.skill,
        "simulating session"
    );

    if opts.realtime {
        run_with(HighPrecisionTimer::new(), config, opts, seed)
    } else {
        run_with(SimulatedTimer::new(), config, opts, seed)
    }
}

fn run_with<T: Timer>(
    timer: T,
    config: ExperimentConfig,
    opts: &SimulateOptions,
    seed: u64,
) -> Result<SessionSummary> {
    let mut session = Session::new(
        opts.participant,
        config,
        timer.clone(),
        StdRng::seed_from_u64(seed),
    );
    let mut observer =
        SimulatedObserver::new(timer, StdRng::seed_from_u64(seed.wrapping_add(1)), opts.skill);

    let result = session.run(&mut observer);

    // Trials run before a failure are still written out.
    if let Some(out) = &opts.out {
        save_results(
            out,
            &Results {
                seed,
                summary: result.as_ref().ok(),
                trials: session.results(),
            },
        )?;
    }
    let summary = result.context("session failed")?;
    analyze_results(&summary, session.results());
    Ok(summary)
}

fn save_results(path: &Path, results: &Results<'_>) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("cannot create result file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), results)
        .with_context(|| format!("failed to write results to {}", path.display()))?;
    info!(path = %path.display(), trials = results.trials.len(), "results saved");
    Ok(())
}

pub fn analyze_results(summary: &SessionSummary, records: &[TrialRecord]) {
    println!("Session {:?} after {} trials", summary.outcome, summary.trials_run);
    println!(
        "Practice blocks: {}, final target duration: {}",
        summary.practice_blocks, summary.final_target_duration
    );
    for check in &summary.checks {
        println!(
            "  block {}: mean error {:.1} deg at {} -> {}",
            check.block, check.mean_error, check.prior, check.decision.next
        );
    }

    let targets: Vec<&TrialRecord> = records
        .iter()
        .filter(|r| !r.practice && !r.is_catch())
        .collect();
    if targets.is_empty() {
        return;
    }
    let times: Vec<f64> = targets.iter().filter_map(|r| r.rt_ms()).collect();
    let rate = times.len() as f64 / targets.len() as f64 * 100.0;
    println!(
        "Test trials with a target: {}, response rate: {:.1}%",
        targets.len(),
        rate
    );
    if !times.is_empty() {
        let mean = times.iter().sum::<f64>() / times.len() as f64;
        let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        println!("Response times: mean {mean:.1} ms, min {min:.1} ms, max {max:.1} ms");
    }

    for validity in CueValidity::ALL {
        let errors: Vec<f64> = targets
            .iter()
            .filter(|r| r.cue_valid.value() == Some(&validity))
            .filter_map(|r| r.error_deg())
            .map(f64::abs)
            .collect();
        if errors.is_empty() {
            continue;
        }
        let mean = errors.iter().sum::<f64>() / errors.len() as f64;
        println!(
            "  {:<13} mean |error| {:.1} deg (n={})",
            validity.label(),
            mean,
            errors.len()
        );
    }
}

pub fn evaluate(duration_ms: u64, mean_error: f64) -> Result<()> {
    let current = TargetDuration::try_from(duration_ms)?;
    if !mean_error.is_finite() || mean_error < 0.0 {
        warn!(mean_error, "mean error should be a non-negative number of degrees");
    }
    let decision = evaluate_block(mean_error, current);
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

pub fn schedule(config: Option<&Path>, seed: Option<u64>) -> Result<()> {
    let config = load_config(config)?;
    let mut rng = StdRng::seed_from_u64(seed.unwrap_or_else(rand::random));
    let ctx = SessionContext {
        participant_id: 0,
        block_number: 1,
        trial_number: 1,
        practicing: false,
        target_duration: config.initial_target_duration,
    };
    let factors = TrialFactors {
        signal_intensity: SignalIntensity::Hi,
        cue_value: CueValue::Short,
        cue_validity: CueValidity::Valid,
        catch_trial: false,
    };
    let plan = TrialPlan::prepare(&ctx, factors, &config, &mut rng)?;

    println!(
        "cue {} / {} / {}, ctoa {} ms, target {}",
        factors.cue_value.label(),
        factors.cue_validity.label(),
        factors.signal_intensity.label(),
        plan.ctoa_ms,
        plan.target_duration
    );
    for (event, offset) in plan.schedule.events() {
        println!("{:>9.1} ms  {}", offset.as_secs_f64() * 1000.0, event.label());
    }
    let stimuli = &config.stimuli;
    println!(
        "cue \"{}\" at {} deg, target {} deg, mask cells {} deg, wheel {} deg",
        StimulusSet::cue_text(factors.cue_value),
        stimuli.cue_size_deg,
        stimuli.target_size_deg,
        stimuli.mask_cell_deg(),
        stimuli.wheel_diameter_deg
    );
    println!(
        "noise track {:.1} ms, response timeout {} ms, ITI {} ms",
        plan.noise_duration(&config).as_secs_f64() * 1000.0,
        config.discrimination_timeout_ms,
        config.inter_trial_interval_ms
    );
    Ok(())
}
