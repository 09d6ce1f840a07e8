//! Per-field comparison of requested vs. measured stream settings.

use serde::{Deserialize, Serialize};

use crate::cameras::{CameraId, ValidationResult};

pub const DEFAULT_FPS_TOLERANCE: f64 = 1.0;
pub const DEFAULT_BITRATE_TOLERANCE: f64 = 0.10;

/// Tolerances used when comparing a validation result field by field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchRules {
    /// Largest accepted absolute FPS difference.
    pub fps_tolerance: f64,
    /// Largest accepted bitrate deviation as a fraction of the expected value.
    pub bitrate_tolerance: f64,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            fps_tolerance: DEFAULT_FPS_TOLERANCE,
            bitrate_tolerance: DEFAULT_BITRATE_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldMatch {
    Match,
    Mismatch,
    /// The camera did not report a value to compare.
    Unknown,
}

impl FieldMatch {
    fn from_bool(matches: bool) -> Self {
        if matches {
            Self::Match
        } else {
            Self::Mismatch
        }
    }

    pub fn is_mismatch(self) -> bool {
        self == Self::Mismatch
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChecks {
    pub resolution: FieldMatch,
    pub fps: FieldMatch,
    pub bitrate: FieldMatch,
    pub encoding: FieldMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Passed,
    Warning,
    Failed,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Passed => "Validation Passed",
            Verdict::Warning => "Validation Warning",
            Verdict::Failed => "Validation Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub camera_id: Option<CameraId>,
    pub checks: FieldChecks,
    pub verdict: Verdict,
    pub summary: String,
    pub result: ValidationResult,
}

impl MatchRules {
    pub fn resolution_matches(&self, expected: (u32, u32), actual: (u32, u32)) -> bool {
        expected == actual
    }

    pub fn fps_matches(&self, expected: f64, actual: f64) -> bool {
        (actual - expected).abs() <= self.fps_tolerance
    }

    /// An absent or zero expectation accepts any bitrate.
    pub fn bitrate_matches(&self, expected: Option<u32>, actual: u32) -> bool {
        match expected {
            None | Some(0) => true,
            Some(expected) => {
                let expected = f64::from(expected);
                (f64::from(actual) - expected).abs() <= expected * self.bitrate_tolerance
            }
        }
    }

    pub fn encoding_matches(&self, expected: Option<&str>, actual: &str) -> bool {
        let expected = match expected.map(str::trim) {
            None | Some("") => return true,
            Some(expected) => expected.to_lowercase(),
        };
        let actual = actual.trim().to_lowercase();
        actual.contains(&expected) || expected.contains(&actual)
    }

    pub fn check_fields(&self, result: &ValidationResult) -> FieldChecks {
        let resolution = match (
            result.expected_width.zip(result.expected_height),
            result.actual_width.zip(result.actual_height),
        ) {
            (None, _) => FieldMatch::Match,
            (Some(_), None) => FieldMatch::Unknown,
            (Some(expected), Some(actual)) => {
                FieldMatch::from_bool(self.resolution_matches(expected, actual))
            }
        };

        let fps = match (result.expected_fps, result.actual_fps) {
            (None, _) => FieldMatch::Match,
            (Some(_), None) => FieldMatch::Unknown,
            (Some(expected), Some(actual)) => FieldMatch::from_bool(self.fps_matches(expected, actual)),
        };

        let bitrate = match (result.expected_bitrate, result.actual_bitrate) {
            (None | Some(0), _) => FieldMatch::Match,
            (Some(_), None) => FieldMatch::Unknown,
            (expected, Some(actual)) => {
                FieldMatch::from_bool(self.bitrate_matches(expected, actual))
            }
        };

        let encoding = match (
            result.expected_encoding.as_deref(),
            result.actual_encoding.as_deref(),
        ) {
            (None, _) => FieldMatch::Match,
            (Some(_), None) => FieldMatch::Unknown,
            (expected, Some(actual)) => {
                FieldMatch::from_bool(self.encoding_matches(expected, actual))
            }
        };

        FieldChecks {
            resolution,
            fps,
            bitrate,
            encoding,
        }
    }

    /// Resolution and FPS mismatches fail a camera; bitrate and encoding
    /// mismatches only warn.
    pub fn evaluate(&self, result: &ValidationResult) -> ValidationReport {
        let checks = self.check_fields(result);
        let mut problems = Vec::new();

        if checks.resolution.is_mismatch() {
            problems.push(format!(
                "resolution {}x{} (expected {}x{})",
                result.actual_width.unwrap_or_default(),
                result.actual_height.unwrap_or_default(),
                result.expected_width.unwrap_or_default(),
                result.expected_height.unwrap_or_default(),
            ));
        }
        if checks.fps.is_mismatch() {
            problems.push(format!(
                "fps {} (expected {})",
                result.actual_fps.unwrap_or_default(),
                result.expected_fps.unwrap_or_default(),
            ));
        }
        if checks.bitrate.is_mismatch() {
            problems.push(format!(
                "bitrate {} (expected {})",
                result.actual_bitrate.unwrap_or_default(),
                result.expected_bitrate.unwrap_or_default(),
            ));
        }
        if checks.encoding.is_mismatch() {
            problems.push(format!(
                "encoding {} (expected {})",
                result.actual_encoding.as_deref().unwrap_or("?"),
                result.expected_encoding.as_deref().unwrap_or("?"),
            ));
        }

        let stream_unreadable = !result.has_actual_values() && (result.error.is_some() || !result.is_valid);
        let verdict = if stream_unreadable || checks.resolution.is_mismatch() || checks.fps.is_mismatch() {
            Verdict::Failed
        } else if checks.bitrate.is_mismatch() || checks.encoding.is_mismatch() {
            Verdict::Warning
        } else {
            Verdict::Passed
        };

        let summary = if stream_unreadable {
            format!(
                "{}: {}",
                verdict.label(),
                result.error.as_deref().unwrap_or("no stream data returned")
            )
        } else if problems.is_empty() {
            verdict.label().to_string()
        } else {
            format!("{}: {}", verdict.label(), problems.join(", "))
        };

        ValidationReport {
            camera_id: result.camera_id.clone(),
            checks,
            verdict,
            summary,
            result: result.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_1080p30() -> ValidationResult {
        ValidationResult {
            camera_id: Some(CameraId::new("1")),
            is_valid: true,
            expected_width: Some(1920),
            expected_height: Some(1080),
            expected_fps: Some(30.0),
            actual_width: Some(1920),
            actual_height: Some(1080),
            actual_fps: Some(30.0),
            ..Default::default()
        }
    }

    #[test]
    fn equal_resolution_is_never_flagged() {
        let rules = MatchRules::default();
        assert!(rules.resolution_matches((1920, 1080), (1920, 1080)));
        assert_eq!(rules.evaluate(&result_1080p30()).verdict, Verdict::Passed);
    }

    #[test]
    fn fps_tolerance_boundary() {
        let rules = MatchRules::default();
        assert!(rules.fps_matches(30.0, 29.0));
        assert!(rules.fps_matches(30.0, 31.0));
        assert!(rules.fps_matches(30.0, 29.97));
        assert!(!rules.fps_matches(30.0, 28.0));
        assert!(!rules.fps_matches(30.0, 15.0));
    }

    #[test]
    fn fps_mismatch_fails_validation() {
        let mut result = result_1080p30();
        result.actual_fps = Some(25.0);
        let report = MatchRules::default().evaluate(&result);
        assert_eq!(report.checks.fps, FieldMatch::Mismatch);
        assert_eq!(report.verdict, Verdict::Failed);
    }

    #[test]
    fn bitrate_tolerance() {
        let rules = MatchRules::default();
        assert!(rules.bitrate_matches(Some(4000), 4400));
        assert!(rules.bitrate_matches(Some(4000), 3600));
        assert!(!rules.bitrate_matches(Some(4000), 4401));
        assert!(!rules.bitrate_matches(Some(4000), 2000));
        assert!(rules.bitrate_matches(Some(0), 123_456));
        assert!(rules.bitrate_matches(None, 1));
    }

    #[test]
    fn bitrate_mismatch_only_warns() {
        let mut result = result_1080p30();
        result.expected_bitrate = Some(4000);
        result.actual_bitrate = Some(8000);
        let report = MatchRules::default().evaluate(&result);
        assert_eq!(report.verdict, Verdict::Warning);
        assert!(report.summary.contains("bitrate 8000"));
    }

    #[test]
    fn encoding_is_case_insensitive_substring() {
        let rules = MatchRules::default();
        assert!(rules.encoding_matches(Some("H264"), "h264"));
        assert!(rules.encoding_matches(Some("h264"), "H264 Main Profile"));
        assert!(rules.encoding_matches(None, "H265"));
        assert!(!rules.encoding_matches(Some("H265"), "H264"));
    }

    #[test]
    fn resolution_mismatch_is_failure_not_warning() {
        let mut result = result_1080p30();
        result.is_valid = false;
        result.actual_width = Some(1280);
        let report = MatchRules::default().evaluate(&result);
        assert_eq!(report.checks.resolution, FieldMatch::Mismatch);
        assert_eq!(report.verdict, Verdict::Failed);
        assert!(report.summary.starts_with("Validation Failed"));
    }

    #[test]
    fn missing_stream_data_with_error_fails() {
        let result = ValidationResult {
            camera_id: Some(CameraId::new("2")),
            is_valid: false,
            expected_width: Some(640),
            expected_height: Some(480),
            error: Some("RTSP timeout".into()),
            ..Default::default()
        };
        let report = MatchRules::default().evaluate(&result);
        assert_eq!(report.verdict, Verdict::Failed);
        assert_eq!(report.checks.resolution, FieldMatch::Unknown);
        assert!(report.summary.contains("RTSP timeout"));
    }

    #[test]
    fn custom_rules_tighten_fps() {
        let rules = MatchRules {
            fps_tolerance: 0.5,
            ..MatchRules::default()
        };
        assert!(!rules.fps_matches(30.0, 29.0));
    }
}
