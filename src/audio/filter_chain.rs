use super::biquad::{BiquadKind, BiquadSection};
use super::{denormalize, normalize};
use crate::config::PipelineConfig;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Cascade layouts shipped across the hardware variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterProfile {
    /// High-pass then low-pass, 12 dB/octave skirts.
    SpeechBand,
    /// Two high-pass then two low-pass sections, 24 dB/octave skirts.
    SpeechBandSteep,
    /// Single band-pass centred on the geometric mean of the band edges.
    BandPass,
}

impl FilterProfile {
    pub fn label(self) -> &'static str {
        match self {
            FilterProfile::SpeechBand => "speech-band",
            FilterProfile::SpeechBandSteep => "speech-band-steep",
            FilterProfile::BandPass => "band-pass",
        }
    }
}

/// Ordered cascade of biquads applied one sample at a time.
///
/// The number and order of sections is fixed at construction. State carries
/// across blocks, so samples must be fed strictly in arrival order.
#[derive(Debug, Clone)]
pub struct FilterChain {
    sections: Vec<BiquadSection>,
}

impl FilterChain {
    pub fn new(sections: Vec<BiquadSection>) -> Self {
        Self { sections }
    }

    /// Build the configured profile at `sample_rate`.
    pub fn for_profile(
        profile: FilterProfile,
        sample_rate: u32,
        highpass_hz: f32,
        lowpass_hz: f32,
        q: f32,
    ) -> Self {
        let fs = sample_rate as f32;
        let sections = match profile {
            FilterProfile::SpeechBand => vec![
                BiquadSection::new(BiquadKind::HighPass, fs, highpass_hz, q),
                BiquadSection::new(BiquadKind::LowPass, fs, lowpass_hz, q),
            ],
            FilterProfile::SpeechBandSteep => vec![
                BiquadSection::new(BiquadKind::HighPass, fs, highpass_hz, q),
                BiquadSection::new(BiquadKind::HighPass, fs, highpass_hz, q),
                BiquadSection::new(BiquadKind::LowPass, fs, lowpass_hz, q),
                BiquadSection::new(BiquadKind::LowPass, fs, lowpass_hz, q),
            ],
            FilterProfile::BandPass => {
                let centre = (highpass_hz * lowpass_hz).sqrt();
                vec![BiquadSection::new(BiquadKind::BandPass, fs, centre, q)]
            }
        };
        Self::new(sections)
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::for_profile(
            cfg.filter_profile,
            cfg.input_rate,
            cfg.highpass_hz,
            cfg.lowpass_hz,
            cfg.filter_q,
        )
    }

    pub fn sections(&self) -> &[BiquadSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Clear every delay line. Only used when the whole pipeline is rebuilt.
    pub fn reinit(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.sections
            .iter_mut()
            .fold(x, |acc, section| section.process(acc))
    }

    /// Filter a PCM block, appending saturated output to `out`.
    pub fn process_block(&mut self, input: &[i16], out: &mut Vec<i16>) {
        out.reserve(input.len());
        for &sample in input {
            let y = self.process(normalize(sample));
            out.push(denormalize(y));
        }
    }
}
