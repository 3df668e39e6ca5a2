use crate::config::ExperimentConfig;
use crate::state::SessionContext;
use cuex_core::stimulus::MASK_CELLS;
use cuex_core::{
    hue_to_rgb, Catchable, MaskGrid, Measure, TargetDuration, TrialFactors, TrialRecord, TrialState,
};
use cuex_timing::{EventSchedule, ScheduleError};
use rand::Rng;
use std::time::Duration;

/// Scheduled points of a trial, in the order they fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrialEvent {
    PlayAlertingSignal,
    StopAlertingSignal,
    TargetOn,
    MaskOn,
    ResponsePeriod,
}

impl TrialEvent {
    pub const SEQUENCE: [TrialEvent; 5] = [
        Self::PlayAlertingSignal,
        Self::StopAlertingSignal,
        Self::TargetOn,
        Self::MaskOn,
        Self::ResponsePeriod,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::PlayAlertingSignal => "play_alerting_signal",
            Self::StopAlertingSignal => "stop_alerting_signal",
            Self::TargetOn => "target_on",
            Self::MaskOn => "mask_on",
            Self::ResponsePeriod => "response_period",
        }
    }
}

/// Noise volume outside and during the alerting signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertLevels {
    pub base: f32,
    pub cue: f32,
}

/// Visual assets of a trial that shows a target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpec {
    /// True target colour as a wheel hue.
    pub hue_deg: f64,
    pub rgb: [u8; 3],
    pub wheel_rotation_deg: f64,
    pub mask: MaskGrid,
}

/// Result of the colour-wheel response period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discrimination {
    pub rt: Measure,
    pub error: Measure,
}

impl Discrimination {
    pub fn timeout() -> Self {
        Self {
            rt: Measure::Timeout,
            error: Measure::Timeout,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrialTimestamps {
    pub start: u64,
    pub target_on: Option<u64>,
    pub response_period: Option<u64>,
    pub response: Option<u64>,
}

/// Everything decided before a trial starts.
#[derive(Debug, Clone)]
pub struct TrialPlan {
    pub participant_id: u32,
    pub block: u32,
    pub number: u32,
    pub practice: bool,
    pub factors: TrialFactors,
    pub fixation_ms: f64,
    pub ctoa_ms: u64,
    pub target_duration: TargetDuration,
    pub alert: AlertLevels,
    pub target: Option<TargetSpec>,
    pub schedule: EventSchedule<TrialEvent>,
    pub state: TrialState,
    pub timestamps: TrialTimestamps,
}

impl TrialPlan {
    pub fn prepare<R: Rng + ?Sized>(
        ctx: &SessionContext,
        factors: TrialFactors,
        config: &ExperimentConfig,
        rng: &mut R,
    ) -> Result<Self, ScheduleError> {
        let ctoa_ms = factors.ctoa_ms();
        let fixation_ms = sample_fixation_ms(
            rng,
            config.fixation_min_ms as f64,
            config.fixation_mean_ms as f64,
            config.fixation_max_ms as f64,
        );
        let alert = AlertLevels {
            base: config.base_volume,
            cue: match factors.signal_intensity {
                cuex_core::SignalIntensity::Hi => config.hi_cue_volume,
                cuex_core::SignalIntensity::Lo => config.base_volume,
            },
        };
        let target = (!factors.catch_trial).then(|| generate_target(rng));

        let mut schedule = EventSchedule::new();
        let ms = Duration::from_millis;
        schedule.register_after(
            TrialEvent::PlayAlertingSignal,
            Duration::from_secs_f64(fixation_ms / 1000.0),
        )?;
        schedule.register_after(TrialEvent::StopAlertingSignal, ms(config.cue_duration_ms))?;
        schedule.register_after(TrialEvent::TargetOn, ms(ctoa_ms))?;
        schedule.register_after(TrialEvent::MaskOn, ctx.target_duration.as_duration())?;
        schedule.register_after(TrialEvent::ResponsePeriod, ms(config.mask_duration_ms))?;

        Ok(Self {
            participant_id: ctx.participant_id,
            block: ctx.block_number,
            number: ctx.trial_number,
            practice: ctx.practicing,
            factors,
            fixation_ms,
            ctoa_ms,
            target_duration: ctx.target_duration,
            alert,
            target,
            schedule,
            state: TrialState::PreCue,
            timestamps: TrialTimestamps::default(),
        })
    }

    pub fn is_catch(&self) -> bool {
        self.target.is_none()
    }

    /// Length of the noise track: it must outlast the whole trial including
    /// the response period and the inter-trial interval.
    pub fn noise_duration(&self, config: &ExperimentConfig) -> Duration {
        let post_ms = self.ctoa_ms
            + self.target_duration.as_millis()
            + config.discrimination_timeout_ms
            + config.inter_trial_interval_ms
            + 1000;
        Duration::from_secs_f64(self.fixation_ms / 1000.0)
            + Duration::from_millis(config.cue_duration_ms + post_ms)
    }

    pub fn record(&self, discrimination: Option<Discrimination>) -> TrialRecord {
        let discrimination = match (&self.target, discrimination) {
            (Some(_), Some(d)) => Some(d),
            (Some(_), None) => Some(Discrimination::timeout()),
            (None, _) => None,
        };
        let catchable = |m: Option<Measure>| m.map_or(Catchable::Catch, Catchable::Value);

        TrialRecord {
            participant_id: self.participant_id,
            block: self.block,
            trial: self.number,
            practice: self.practice,
            fixation_ms: self.fixation_ms,
            target_duration: self.target_duration,
            ctoa_ms: self.ctoa_ms,
            cue_valid: match self.target {
                Some(_) => Catchable::Value(self.factors.cue_validity),
                None => Catchable::Catch,
            },
            signal_intensity: self.factors.signal_intensity,
            target_rgb: self
                .target
                .as_ref()
                .map_or(Catchable::Catch, |t| Catchable::Value(t.rgb)),
            discrimination_rt: catchable(discrimination.map(|d| d.rt)),
            discrimination_error: catchable(discrimination.map(|d| d.error)),
        }
    }
}

/// Whether a between-trials break is due: test blocks pause after each
/// quarter of their trials.
pub fn quarter_break_due(ctx: &SessionContext, config: &ExperimentConfig) -> bool {
    let quarter = config.quarter_block();
    !ctx.practicing && ctx.trial_number > 1 && quarter > 0 && ctx.trial_number % quarter == 1
}

/// Draws from `min + Exp(mean - min)`, redrawing anything above `max`.
pub fn sample_fixation_ms<R: Rng + ?Sized>(rng: &mut R, min: f64, mean: f64, max: f64) -> f64 {
    let scale = mean - min;
    loop {
        let u: f64 = rng.random();
        let interval = min - scale * (1.0 - u).ln();
        if interval <= max {
            return interval;
        }
    }
}

/// Random wheel orientation, target colour and mask for a target trial.
pub fn generate_target<R: Rng + ?Sized>(rng: &mut R) -> TargetSpec {
    let wheel_rotation_deg = rng.random_range(0..360) as f64;
    let target_angle = rng.random_range(0..360) as f64;
    let hue_deg = (target_angle - wheel_rotation_deg).rem_euclid(360.0);
    TargetSpec {
        hue_deg,
        rgb: hue_to_rgb(hue_deg),
        wheel_rotation_deg,
        mask: generate_mask(rng),
    }
}

pub fn generate_mask<R: Rng + ?Sized>(rng: &mut R) -> MaskGrid {
    let mut hues = [0u16; MASK_CELLS];
    for hue in hues.iter_mut() {
        *hue = rng.random_range(0..360);
    }
    MaskGrid::from_hues(hues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuex_core::{CueValidity, CueValue, SignalIntensity};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ctx() -> SessionContext {
        SessionContext {
            participant_id: 9,
            block_number: 2,
            trial_number: 5,
            practicing: false,
            target_duration: TargetDuration::Ms67,
        }
    }

    fn factors(catch_trial: bool) -> TrialFactors {
        TrialFactors {
            signal_intensity: SignalIntensity::Hi,
            cue_value: CueValue::Long,
            cue_validity: CueValidity::InvalidShort,
            catch_trial,
        }
    }

    #[test]
    fn schedule_chains_the_five_events() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = ExperimentConfig::default();
        let plan = TrialPlan::prepare(&ctx(), factors(false), &config, &mut rng).unwrap();

        let offsets: Vec<(TrialEvent, Duration)> = plan.schedule.events().collect();
        let events: Vec<TrialEvent> = offsets.iter().map(|(e, _)| *e).collect();
        assert_eq!(events, TrialEvent::SEQUENCE.to_vec());

        let fixation = offsets[0].1;
        assert_eq!(fixation, Duration::from_secs_f64(plan.fixation_ms / 1000.0));
        let ms = Duration::from_millis;
        assert_eq!(offsets[1].1 - offsets[0].1, ms(100));
        assert_eq!(offsets[2].1 - offsets[1].1, ms(400));
        assert_eq!(offsets[3].1 - offsets[2].1, ms(67));
        assert_eq!(offsets[4].1 - offsets[3].1, ms(50));
    }

    #[test]
    fn target_trial_gets_assets_and_loud_cue() {
        let mut rng = StdRng::seed_from_u64(2);
        let config = ExperimentConfig::default();
        let plan = TrialPlan::prepare(&ctx(), factors(false), &config, &mut rng).unwrap();
        let target = plan.target.as_ref().unwrap();
        assert!((0.0..360.0).contains(&target.hue_deg));
        assert_eq!(target.rgb, hue_to_rgb(target.hue_deg));
        assert_eq!(plan.alert, AlertLevels { base: 0.1, cue: 0.2 });
        assert_eq!(plan.ctoa_ms, 400);
        assert_eq!(plan.target_duration, TargetDuration::Ms67);
    }

    #[test]
    fn catch_trial_records_sentinels() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = ExperimentConfig::default();
        let plan = TrialPlan::prepare(&ctx(), factors(true), &config, &mut rng).unwrap();
        assert!(plan.is_catch());
        assert_eq!(plan.ctoa_ms, 1600);

        let record = plan.record(None);
        assert!(record.cue_valid.is_catch());
        assert!(record.target_rgb.is_catch());
        assert!(record.discrimination_rt.is_catch());
        assert!(record.is_catch());
        assert_eq!(record.block, 2);
        assert_eq!(record.trial, 5);
    }

    #[test]
    fn missing_response_on_target_trial_is_a_timeout() {
        let mut rng = StdRng::seed_from_u64(4);
        let config = ExperimentConfig::default();
        let plan = TrialPlan::prepare(&ctx(), factors(false), &config, &mut rng).unwrap();
        let record = plan.record(None);
        assert_eq!(
            record.discrimination_error,
            Catchable::Value(Measure::Timeout)
        );
        assert_eq!(
            record.cue_valid,
            Catchable::Value(CueValidity::InvalidShort)
        );
    }

    #[test]
    fn low_intensity_keeps_base_volume() {
        let mut rng = StdRng::seed_from_u64(5);
        let config = ExperimentConfig::default();
        let f = TrialFactors {
            signal_intensity: SignalIntensity::Lo,
            ..factors(false)
        };
        let plan = TrialPlan::prepare(&ctx(), f, &config, &mut rng).unwrap();
        assert_eq!(plan.alert.cue, plan.alert.base);
    }

    #[test]
    fn fixation_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..2000 {
            let f = sample_fixation_ms(&mut rng, 700.0, 1000.0, 2500.0);
            assert!((700.0..=2500.0).contains(&f), "{f}");
        }
    }

    #[test]
    fn breaks_fall_on_quarter_boundaries_of_test_blocks() {
        let config = ExperimentConfig::default();
        let mut c = ctx();
        let due: Vec<u32> = (1..=120)
            .filter(|n| {
                c.trial_number = *n;
                quarter_break_due(&c, &config)
            })
            .collect();
        assert_eq!(due, vec![31, 61, 91]);

        c.practicing = true;
        c.trial_number = 31;
        assert!(!quarter_break_due(&c, &config));
    }

    #[test]
    fn noise_track_outlasts_trial() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = ExperimentConfig::default();
        let plan = TrialPlan::prepare(&ctx(), factors(false), &config, &mut rng).unwrap();
        let tail_ms = config.discrimination_timeout_ms + config.inter_trial_interval_ms;
        let end = plan.schedule.offset(TrialEvent::ResponsePeriod).unwrap()
            + Duration::from_millis(tail_ms);
        assert!(plan.noise_duration(&config) > end);
    }
}
