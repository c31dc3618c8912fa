use anyhow::{bail, Result};
use serde::Serialize;

/// Little-endian PCM, the layout the host expects for audio windows.
pub fn audio_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

pub fn bytes_to_audio(bytes: &[u8]) -> Result<Vec<i16>> {
    if bytes.len() % 2 != 0 {
        bail!("audio payload has odd length {}", bytes.len());
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Classifier output shipped to the host after each recorded window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub sample_count: u32,
    pub scores: Vec<f32>,
}

impl ScoreReport {
    const HEADER_LEN: usize = 8;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::HEADER_LEN + self.scores.len() * 4);
        out.extend_from_slice(&self.sample_count.to_le_bytes());
        out.extend_from_slice(&(self.scores.len() as u32).to_le_bytes());
        for score in &self.scores {
            out.extend_from_slice(&score.to_le_bytes());
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::HEADER_LEN {
            bail!("score payload too short ({} bytes)", bytes.len());
        }
        let sample_count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let label_count = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let body = &bytes[Self::HEADER_LEN..];
        if body.len() != label_count * 4 {
            bail!(
                "score payload declares {label_count} labels but carries {} bytes",
                body.len()
            );
        }
        let scores = body
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Self {
            sample_count,
            scores,
        })
    }
}
