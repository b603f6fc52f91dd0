/// ADSR times in seconds and sustain level in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrParameters {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl AdsrParameters {
    /// Negative or non-finite times become zero (instantaneous stage) and
    /// sustain is clamped to [0, 1].
    pub fn sanitized(self) -> Self {
        let time = |seconds: f32| if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        Self {
            attack: time(self.attack),
            decay: time(self.decay),
            sustain: if self.sustain.is_nan() {
                0.0
            } else {
                self.sustain.clamp(0.0, 1.0)
            },
            release: time(self.release),
        }
    }
}

impl Default for AdsrParameters {
    fn default() -> Self {
        Self {
            attack: 0.1,
            decay: 0.2,
            sustain: 0.8,
            release: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Per-sample linear ADSR state machine.
///
/// Rates are derived from the parameters and the sample rate; a stage with
/// zero length has no rate and is skipped. Parameters may change at any
/// time and take effect from the current level without retriggering.
#[derive(Debug, Clone)]
pub struct EnvelopeGenerator {
    parameters: AdsrParameters,
    stage: EnvelopeStage,
    level: f32,
    sample_rate: f32,
    attack_rate: Option<f32>,
    decay_rate: Option<f32>,
    release_rate: Option<f32>,
}

impl EnvelopeGenerator {
    pub fn new() -> Self {
        let mut envelope = Self {
            parameters: AdsrParameters::default(),
            stage: EnvelopeStage::Idle,
            level: 0.0,
            sample_rate: 44_100.0,
            attack_rate: None,
            decay_rate: None,
            release_rate: None,
        };
        envelope.recalculate_rates();
        envelope
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_rates();
    }

    pub fn set_parameters(&mut self, parameters: AdsrParameters) {
        let parameters = parameters.sanitized();
        if parameters == self.parameters {
            return;
        }
        self.parameters = parameters;
        self.recalculate_rates();
    }

    pub fn parameters(&self) -> AdsrParameters {
        self.parameters
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn note_on(&mut self) {
        if self.attack_rate.is_some() {
            self.stage = EnvelopeStage::Attack;
        } else if self.decay_rate.is_some() {
            self.level = 1.0;
            self.stage = EnvelopeStage::Decay;
        } else {
            self.level = self.parameters.sustain;
            self.stage = EnvelopeStage::Sustain;
        }
    }

    pub fn note_off(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }
        if self.parameters.release > 0.0 {
            self.release_rate = Some(self.remaining_release_rate());
            self.stage = EnvelopeStage::Release;
        } else {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
        self.stage = EnvelopeStage::Idle;
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => return 0.0,
            EnvelopeStage::Attack => match self.attack_rate {
                Some(rate) => {
                    self.level += rate;
                    if self.level >= 1.0 {
                        self.level = 1.0;
                        self.enter_decay();
                    }
                }
                None => {
                    self.level = 1.0;
                    self.enter_decay();
                }
            },
            EnvelopeStage::Decay => match self.decay_rate {
                Some(rate) if self.level > self.parameters.sustain => {
                    self.level -= rate;
                    if self.level <= self.parameters.sustain {
                        self.level = self.parameters.sustain;
                        self.stage = EnvelopeStage::Sustain;
                    }
                }
                _ => {
                    self.level = self.level.min(self.parameters.sustain);
                    self.stage = EnvelopeStage::Sustain;
                }
            },
            EnvelopeStage::Sustain => {
                self.level = self.parameters.sustain;
            }
            EnvelopeStage::Release => {
                self.level -= self.release_rate.unwrap_or(self.level);
                if self.level <= 0.0 {
                    self.reset();
                }
            }
        }
        self.level
    }

    fn enter_decay(&mut self) {
        self.stage = if self.decay_rate.is_some() {
            EnvelopeStage::Decay
        } else {
            EnvelopeStage::Sustain
        };
    }

    // Slope that takes the current level to zero in the release time.
    fn remaining_release_rate(&self) -> f32 {
        self.level / (self.parameters.release * self.sample_rate)
    }

    fn recalculate_rates(&mut self) {
        let per_sample = |seconds: f32, distance: f32| {
            let rate = distance / (seconds * self.sample_rate);
            (seconds > 0.0 && rate > 0.0 && rate.is_finite()).then_some(rate)
        };
        let AdsrParameters {
            attack,
            decay,
            sustain,
            release,
        } = self.parameters;
        self.attack_rate = per_sample(attack, 1.0);
        self.decay_rate = per_sample(decay, 1.0 - sustain);

        if self.stage == EnvelopeStage::Release {
            self.release_rate = if release > 0.0 {
                Some(self.remaining_release_rate())
            } else {
                None
            };
        } else {
            self.release_rate = per_sample(release, sustain);
        }
    }
}

impl Default for EnvelopeGenerator {
    fn default() -> Self {
        Self::new()
    }
}
