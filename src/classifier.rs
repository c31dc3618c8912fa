//! Keyword classifier boundary. The model itself lives outside this crate; the
//! pipeline only needs per-label scores for one 16 kHz window.

use crate::log_debug;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub trait Classifier {
    /// Label names, in score order.
    fn labels(&self) -> &[String];

    fn classify(&mut self, window: &[i16]) -> Result<Classification>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub scores: Vec<f32>,
}

impl Classification {
    /// Highest score and its index. Ties keep the first label; NaN never wins.
    pub fn best(&self) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (index, &score) in self.scores.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if score <= current => {}
                _ => best = Some((index, score)),
            }
        }
        best
    }
}

/// Stand-in used when no classifier program is configured: windows are still
/// captured and shipped, but nothing is ever recognised.
#[derive(Debug, Default)]
pub struct NullClassifier {
    labels: Vec<String>,
}

impl NullClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for NullClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn classify(&mut self, _window: &[i16]) -> Result<Classification> {
        Ok(Classification::default())
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    samples: &'a [i16],
}

#[derive(Deserialize)]
struct ClassifyResponse {
    scores: Vec<f32>,
}

/// Long-lived child process speaking newline-delimited JSON: one
/// `{"samples":[...]}` request per window, one `{"scores":[...]}` reply.
pub struct ExternalClassifier {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    labels: Vec<String>,
    line: String,
}

impl ExternalClassifier {
    pub fn spawn(program: &str, args: &[String], labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            bail!("classifier needs at least one label");
        }
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start classifier '{program}'"))?;
        let stdin = child
            .stdin
            .take()
            .context("failed to capture classifier stdin")?;
        let stdout = child
            .stdout
            .take()
            .context("failed to capture classifier stdout")?;
        log_debug(&format!(
            "classifier '{program}' started with {} labels",
            labels.len()
        ));
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            labels,
            line: String::new(),
        })
    }

    fn read_response(&mut self) -> Result<ClassifyResponse> {
        loop {
            self.line.clear();
            let read = self
                .stdout
                .read_line(&mut self.line)
                .context("failed to read classifier output")?;
            if read == 0 {
                let status = self.child.try_wait().ok().flatten();
                return Err(anyhow!("classifier exited (status {status:?})"));
            }
            let trimmed = self.line.trim();
            // Skip chatter the program prints besides its replies.
            if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
                log_debug(&format!("classifier output ignored: {trimmed}"));
                continue;
            }
            return serde_json::from_str(trimmed)
                .with_context(|| format!("invalid classifier reply `{trimmed}`"));
        }
    }
}

impl Classifier for ExternalClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn classify(&mut self, window: &[i16]) -> Result<Classification> {
        let mut request = serde_json::to_vec(&ClassifyRequest { samples: window })
            .context("failed to encode classifier request")?;
        request.push(b'\n');
        self.stdin
            .write_all(&request)
            .and_then(|_| self.stdin.flush())
            .context("failed to send window to classifier")?;

        let response = self.read_response()?;
        if response.scores.len() != self.labels.len() {
            bail!(
                "classifier returned {} scores for {} labels",
                response.scores.len(),
                self.labels.len()
            );
        }
        Ok(Classification {
            scores: response.scores,
        })
    }
}

impl Drop for ExternalClassifier {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_prefers_first_of_equal_scores() {
        let result = Classification {
            scores: vec![0.1, 0.4, 0.4, 0.2],
        };
        assert_eq!(result.best(), Some((1, 0.4)));
    }

    #[test]
    fn best_skips_nan_and_handles_empty() {
        let result = Classification {
            scores: vec![f32::NAN, 0.3, f32::NAN],
        };
        assert_eq!(result.best(), Some((1, 0.3)));
        assert_eq!(Classification::default().best(), None);
    }

    #[test]
    fn null_classifier_returns_no_scores() {
        let mut classifier = NullClassifier::new();
        assert!(classifier.labels().is_empty());
        assert!(classifier.classify(&[0; 16]).unwrap().best().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn external_classifier_round_trips_ndjson() {
        let script = r#"while read -r line; do echo "loading"; echo '{"scores":[0.2,0.8]}'; done"#;
        let mut classifier = ExternalClassifier::spawn(
            "sh",
            &["-c".to_string(), script.to_string()],
            vec!["silence".to_string(), "weiter".to_string()],
        )
        .unwrap();
        let result = classifier.classify(&[1, 2, 3]).unwrap();
        assert_eq!(result.best(), Some((1, 0.8)));
        assert!(classifier.classify(&[4, 5]).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn external_classifier_rejects_score_count_mismatch() {
        let script = r#"while read -r line; do echo '{"scores":[1.0]}'; done"#;
        let mut classifier = ExternalClassifier::spawn(
            "sh",
            &["-c".to_string(), script.to_string()],
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap();
        assert!(classifier.classify(&[0; 4]).is_err());
    }
}
