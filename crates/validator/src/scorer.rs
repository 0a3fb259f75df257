//! Unified fidelity scoring
//!
//! Combines an optional static-analysis result and an optional behavioral
//! result into one weighted score, verdict and merged discrepancy list.

use chrono::{DateTime, Utc};
use fidelity_common::{ComponentStatus, Discrepancy, UnifiedStatus, ValidationSource};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ScoringConfig;
use crate::error::{ValidatorError, ValidatorResult};

/// Output of one independently scored validation component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub score: f64,
    pub status: ComponentStatus,
    #[serde(default)]
    pub discrepancies: Vec<Discrepancy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ComponentResult {
    pub fn new(score: f64, status: impl Into<ComponentStatus>) -> Self {
        Self {
            score,
            status: status.into(),
            discrepancies: Vec::new(),
            summary: None,
        }
    }

    pub fn with_discrepancies(mut self, discrepancies: Vec<Discrepancy>) -> Self {
        self.discrepancies = discrepancies;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// How one present component contributed to the unified score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub score: f64,
    /// Effective weight after renormalization over present components
    pub weight: f64,
    pub status: ComponentStatus,
    pub discrepancy_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentsBreakdown {
    #[serde(rename = "static", default, skip_serializing_if = "Option::is_none")]
    pub static_analysis: Option<ComponentBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavioral: Option<ComponentBreakdown>,
}

/// Configured weights as supplied to the scorer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightConfiguration {
    pub static_weight: f64,
    pub behavioral_weight: f64,
}

/// Final unified verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedResult {
    pub overall_status: UnifiedStatus,
    pub fidelity_score: f64,
    /// CRITICAL first, then WARNING, then INFO; stable within a band
    pub discrepancies: Vec<Discrepancy>,
    pub components: ComponentsBreakdown,
    pub weights: WeightConfiguration,
    /// Seconds
    pub execution_time: f64,
    pub timestamp: DateTime<Utc>,
}

impl UnifiedResult {
    pub fn count(&self, severity: fidelity_common::Severity) -> usize {
        self.discrepancies
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Weighted combination of validation components
#[derive(Debug, Clone, Default)]
pub struct FidelityScorer {
    config: ScoringConfig,
}

impl FidelityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Produce the unified result
    ///
    /// Fails only when both components are absent or the configured weights
    /// cannot be normalized.
    pub fn score(
        &self,
        static_result: Option<&ComponentResult>,
        behavioral_result: Option<&ComponentResult>,
    ) -> ValidatorResult<UnifiedResult> {
        let start = Instant::now();

        let present: Vec<(ValidationSource, &ComponentResult, f64)> = [
            (ValidationSource::Static, static_result, self.config.static_weight),
            (
                ValidationSource::Behavioral,
                behavioral_result,
                self.config.behavioral_weight,
            ),
        ]
        .into_iter()
        .filter_map(|(source, result, weight)| result.map(|r| (source, r, weight)))
        .collect();

        if present.is_empty() {
            return Err(ValidatorError::MissingComponents);
        }
        let weights = self.effective_weights(&present)?;

        let mut fidelity_score = 0.0;
        let mut components = ComponentsBreakdown::default();
        for ((source, result, _), weight) in present.iter().zip(&weights) {
            let score = clamp_score(*source, result.score);
            fidelity_score += weight * score;

            let breakdown = ComponentBreakdown {
                score,
                weight: *weight,
                status: result.status.clone(),
                discrepancy_count: result.discrepancies.len(),
            };
            match source {
                ValidationSource::Static => components.static_analysis = Some(breakdown),
                ValidationSource::Behavioral => components.behavioral = Some(breakdown),
            }
        }
        let fidelity_score = fidelity_score.clamp(0.0, 1.0);

        let overall_status = self.decide_status(fidelity_score, &present);
        let discrepancies = merge_discrepancies(&present);

        info!(
            "Unified fidelity {:.3} -> {} ({} discrepancies from {} component(s))",
            fidelity_score,
            overall_status,
            discrepancies.len(),
            present.len()
        );

        Ok(UnifiedResult {
            overall_status,
            fidelity_score,
            discrepancies,
            components,
            weights: WeightConfiguration {
                static_weight: self.config.static_weight,
                behavioral_weight: self.config.behavioral_weight,
            },
            execution_time: start.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
        })
    }

    fn effective_weights(
        &self,
        present: &[(ValidationSource, &ComponentResult, f64)],
    ) -> ValidatorResult<Vec<f64>> {
        if present.len() == 1 {
            return Ok(vec![1.0]);
        }

        for (source, _, weight) in present {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ValidatorError::InvalidWeights(format!(
                    "{} weight must be a non-negative number, got {}",
                    source, weight
                )));
            }
        }
        let total: f64 = present.iter().map(|(_, _, w)| w).sum();
        if total <= 0.0 {
            return Err(ValidatorError::InvalidWeights(
                "weights of the supplied components sum to zero".to_string(),
            ));
        }
        if (total - 1.0).abs() > 1e-9 {
            debug!("Renormalizing component weights (sum {})", total);
        }

        Ok(present.iter().map(|(_, _, w)| w / total).collect())
    }

    fn decide_status(
        &self,
        fidelity_score: f64,
        present: &[(ValidationSource, &ComponentResult, f64)],
    ) -> UnifiedStatus {
        if let Some((source, _, _)) = present.iter().find(|(_, r, _)| r.status.is_error()) {
            warn!("{} component reported an error, rejecting", source);
            return UnifiedStatus::Rejected;
        }
        if fidelity_score < self.config.reject_threshold {
            return UnifiedStatus::Rejected;
        }
        if fidelity_score < self.config.approve_threshold
            || present.iter().any(|(_, r, _)| r.status.has_warnings())
        {
            return UnifiedStatus::ApprovedWithWarnings;
        }
        UnifiedStatus::Approved
    }
}

fn clamp_score(source: ValidationSource, score: f64) -> f64 {
    if score.is_nan() {
        warn!("{} score is NaN, treating as 0", source);
        return 0.0;
    }
    if !(0.0..=1.0).contains(&score) {
        warn!("{} score {} outside [0, 1], clamping", source, score);
    }
    score.clamp(0.0, 1.0)
}

fn merge_discrepancies(present: &[(ValidationSource, &ComponentResult, f64)]) -> Vec<Discrepancy> {
    let mut merged: Vec<Discrepancy> = present
        .iter()
        .flat_map(|(source, result, _)| {
            result
                .discrepancies
                .iter()
                .cloned()
                .map(move |d| d.attributed_to(*source))
        })
        .collect();
    // sort_by_key is stable, so source order survives within a band
    merged.sort_by_key(|d| d.severity);
    merged
}
