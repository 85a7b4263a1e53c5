//! Admission check for codec/container pairs
//!
//! Every distinct pair is probed once; later requests reuse the verdict.

use std::collections::HashMap;
use std::fmt;
use stillmotion_core::{CodecChoice, Error};
use stillmotion_encoder::ProbeReport;

type ProbeFn = fn(&CodecChoice) -> ProbeReport;

/// Caches probe results and applies the fallback policy
pub struct CodecGate {
    probe: ProbeFn,
    reports: HashMap<CodecChoice, ProbeReport>,
}

impl fmt::Debug for CodecGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecGate")
            .field("reports", &self.reports)
            .finish_non_exhaustive()
    }
}

impl Default for CodecGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecGate {
    /// Gate backed by the real FFmpeg probe
    pub fn new() -> Self {
        Self::with_probe(stillmotion_encoder::probe)
    }

    /// Gate backed by a custom probe
    pub fn with_probe(probe: ProbeFn) -> Self {
        Self {
            probe,
            reports: HashMap::new(),
        }
    }

    /// Decides which codec jobs requesting `requested` will actually use.
    ///
    /// A passing codec is used as is. A failing one is an `Encode` error
    /// carrying the ranked suggestions, unless `auto_fallback` is set, in
    /// which case the first verified suggestion is used instead. With
    /// nothing verified to fall back on the result is a `Config` error.
    pub fn admit(&mut self, requested: &CodecChoice, auto_fallback: bool) -> Result<CodecChoice, Error> {
        let probe = self.probe;
        let report = self
            .reports
            .entry(requested.clone())
            .or_insert_with(|| probe(requested));

        if report.ok {
            return Ok(requested.clone());
        }

        let reason = report
            .failure
            .clone()
            .unwrap_or_else(|| format!("{requested} failed the probe"));

        if !auto_fallback {
            return Err(Error::Encode {
                message: format!("codec {requested} is not usable: {reason}"),
                suggestions: report.suggestions.clone(),
            });
        }

        match report.suggestions.iter().find(|s| s.verified) {
            Some(suggestion) => {
                let fallback = suggestion.choice();
                tracing::warn!(
                    requested = %requested,
                    fallback = %fallback,
                    reason = %reason,
                    "falling back to a verified codec"
                );
                Ok(fallback)
            }
            None => Err(Error::Config(format!(
                "codec {requested} is not usable ({reason}) and no fallback for .{} could be verified",
                requested.extension
            ))),
        }
    }

    /// Number of distinct pairs probed so far
    pub fn probed(&self) -> usize {
        self.reports.len()
    }
}
