//! Tri-state compliance status and its normalization boundary.
//!
//! Models phrase their verdicts loosely ("Met", "pass", "Compliant",
//! "Requirement Met"), so the raw string is collapsed into
//! [`ComplianceStatus`] exactly once, at the parse boundary. The loose
//! string never lives past [`ComplianceStatus::classify`].

use serde::{Deserialize, Serialize};

/// Status phrases that collapse to `PartiallyMet`, matched on the folded
/// form (lowercase, punctuation stripped).
const PARTIAL_MARKERS: &[&str] = &["partial", "needs improvement", "in part"];

/// Status phrases that collapse to `NotMet`. Checked before the met set:
/// "not met" would otherwise match on "met".
const NOT_MET_MARKERS: &[&str] = &[
    "not met",
    "unmet",
    "not satisfied",
    "unsatisfied",
    "fail",
    "failed",
    "non compliant",
    "noncompliant",
    "not compliant",
];

/// Status phrases that collapse to `Met`.
const MET_MARKERS: &[&str] = &[
    "met",
    "requirement met",
    "fully met",
    "pass",
    "passed",
    "compliant",
    "satisfied",
    "fully satisfied",
    "yes",
];

/// Validation verdict for one requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// The requirement is fully covered by the documents.
    Met,
    /// Some coverage exists but gaps remain.
    PartiallyMet,
    /// No adequate coverage, or validation could not complete.
    NotMet,
}

impl ComplianceStatus {
    /// Collapse a raw model status phrase into the tri-state verdict.
    ///
    /// Matching is case-, whitespace-, and punctuation-insensitive and
    /// idempotent. Unrecognized phrases classify as `NotMet`: a verdict
    /// the pipeline cannot read must not pass as satisfied.
    pub fn classify(raw: &str) -> ComplianceStatus {
        let folded = fold(raw);

        if PARTIAL_MARKERS.iter().any(|m| folded.contains(m)) {
            return ComplianceStatus::PartiallyMet;
        }
        if folded == "no" || NOT_MET_MARKERS.iter().any(|m| folded.contains(m)) {
            return ComplianceStatus::NotMet;
        }
        if MET_MARKERS.iter().any(|m| folded == *m) || folded.ends_with(" met") {
            return ComplianceStatus::Met;
        }
        ComplianceStatus::NotMet
    }

    /// Canonical string form used in persisted records and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Met => "Met",
            Self::PartiallyMet => "Partially Met",
            Self::NotMet => "Not Met",
        }
    }

    /// Whether remediation generation applies to this verdict.
    pub fn needs_remediation(&self) -> bool {
        !matches!(self, Self::Met)
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lowercase, map punctuation to spaces, collapse whitespace runs.
fn fold(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    let mut last_was_space = true;
    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            folded.push(c);
            last_was_space = false;
        } else if !last_was_space {
            folded.push(' ');
            last_was_space = true;
        }
    }
    folded.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_case_and_whitespace_insensitive() {
        assert_eq!(
            ComplianceStatus::classify("Met"),
            ComplianceStatus::classify("met ")
        );
        assert_eq!(
            ComplianceStatus::classify("met "),
            ComplianceStatus::classify("MET")
        );
        assert_eq!(ComplianceStatus::classify("MET"), ComplianceStatus::Met);
    }

    #[test]
    fn test_classify_met_synonyms() {
        for phrase in ["pass", "Passed", "Compliant", "Satisfied", "Requirement Met", "Fully Met"] {
            assert_eq!(
                ComplianceStatus::classify(phrase),
                ComplianceStatus::Met,
                "phrase: {phrase}"
            );
        }
    }

    #[test]
    fn test_classify_partial_synonyms() {
        for phrase in [
            "Partially Met",
            "partial",
            "PARTIALLY SATISFIED",
            "Partially Compliant",
            "needs improvement",
        ] {
            assert_eq!(
                ComplianceStatus::classify(phrase),
                ComplianceStatus::PartiallyMet,
                "phrase: {phrase}"
            );
        }
    }

    #[test]
    fn test_classify_not_met_synonyms() {
        for phrase in ["Not Met", "not-met", "FAIL", "Failed", "Non-Compliant", "Unsatisfied"] {
            assert_eq!(
                ComplianceStatus::classify(phrase),
                ComplianceStatus::NotMet,
                "phrase: {phrase}"
            );
        }
    }

    #[test]
    fn test_classify_not_met_beats_met_substring() {
        // "not met" contains "met"; the negative set must win.
        assert_eq!(
            ComplianceStatus::classify("Requirement not met"),
            ComplianceStatus::NotMet
        );
    }

    #[test]
    fn test_classify_unknown_defaults_to_not_met() {
        assert_eq!(
            ComplianceStatus::classify("inconclusive"),
            ComplianceStatus::NotMet
        );
        assert_eq!(ComplianceStatus::classify(""), ComplianceStatus::NotMet);
    }

    #[test]
    fn test_classify_idempotent_through_canonical_form() {
        for status in [
            ComplianceStatus::Met,
            ComplianceStatus::PartiallyMet,
            ComplianceStatus::NotMet,
        ] {
            assert_eq!(ComplianceStatus::classify(status.as_str()), status);
        }
    }

    #[test]
    fn test_needs_remediation() {
        assert!(!ComplianceStatus::Met.needs_remediation());
        assert!(ComplianceStatus::PartiallyMet.needs_remediation());
        assert!(ComplianceStatus::NotMet.needs_remediation());
    }
}
