use crate::matcher::Mismatch;
use serde::Serialize;
use std::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionFailure {
    Mismatches(Vec<Mismatch>),
    StateSetup(String),
    Request(String),
    TimedOut,
}

impl Display for InteractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionFailure::Mismatches(mismatches) => {
                for (index, mismatch) in mismatches.iter().enumerate() {
                    if index > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", mismatch)?;
                }
                Ok(())
            }
            InteractionFailure::StateSetup(reason) => write!(f, "State setup failed: {}", reason),
            InteractionFailure::Request(reason) => write!(f, "Request failed: {}", reason),
            InteractionFailure::TimedOut => write!(f, "The verification run timed out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionResult {
    pub consumer: String,
    pub provider: String,
    pub description: String,
    pub provider_state: Option<String>,
    pub failure: Option<InteractionFailure>,
}

impl InteractionResult {
    pub fn outcome(&self) -> Outcome {
        match self.failure {
            Some(_) => Outcome::Fail,
            None => Outcome::Pass,
        }
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        match &self.failure {
            Some(InteractionFailure::Mismatches(mismatches)) => mismatches,
            _ => &[],
        }
    }
}

/// Per-interaction outcomes of a verification run, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationResult {
    pub interaction_results: Vec<InteractionResult>,
    /// Publishing problems. They never affect the outcome.
    pub publish_errors: Vec<String>,
}

impl VerificationResult {
    pub fn overall_outcome(&self) -> Outcome {
        if self
            .interaction_results
            .iter()
            .all(|result| result.outcome() == Outcome::Pass)
        {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }

    pub fn is_success(&self) -> bool {
        self.overall_outcome() == Outcome::Pass
    }

    pub fn failures(&self) -> impl Iterator<Item = &InteractionResult> {
        self.interaction_results
            .iter()
            .filter(|result| result.outcome() == Outcome::Fail)
    }

    /// The broker representation of the results for one consumer.
    pub fn publish_payload(&self, consumer: &str, provider_version: &str) -> VerificationPayload {
        let test_results: Vec<_> = self
            .interaction_results
            .iter()
            .filter(|result| result.consumer == consumer)
            .map(|result| TestResult {
                interaction_description: result.description.clone(),
                provider_state: result.provider_state.clone(),
                success: result.outcome() == Outcome::Pass,
                mismatches: result.mismatches().to_vec(),
                error: match &result.failure {
                    None | Some(InteractionFailure::Mismatches(_)) => None,
                    Some(failure) => Some(failure.to_string()),
                },
            })
            .collect();

        VerificationPayload {
            success: test_results.iter().all(|result| result.success),
            provider_application_version: provider_version.into(),
            test_results,
        }
    }
}

impl Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failures: Vec<_> = self.failures().collect();

        writeln!(
            f,
            "{} interactions, {} failed",
            self.interaction_results.len(),
            failures.len()
        )?;

        for (index, result) in failures.iter().enumerate() {
            write!(f, "{}) {} - {}", index + 1, result.consumer, result.description)?;
            if let Some(state) = &result.provider_state {
                write!(f, " (given {})", state)?;
            }
            writeln!(f)?;
            if let Some(failure) = &result.failure {
                for line in failure.to_string().lines() {
                    writeln!(f, "    {}", line)?;
                }
            }
        }

        for error in &self.publish_errors {
            writeln!(f, "publishing failed: {}", error)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPayload {
    pub success: bool,
    pub provider_application_version: String,
    pub test_results: Vec<TestResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub interaction_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_state: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Mismatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MismatchKind;

    fn result(description: &str, failure: Option<InteractionFailure>) -> InteractionResult {
        InteractionResult {
            consumer: "Our Little Consumer".into(),
            provider: "Our Provider".into(),
            description: description.into(),
            provider_state: Some("date count > 0".into()),
            failure,
        }
    }

    #[test]
    fn test_every_failure_is_reported() {
        let verification = VerificationResult {
            interaction_results: vec![
                result(
                    "first",
                    Some(InteractionFailure::Mismatches(vec![Mismatch::new(
                        MismatchKind::Status,
                        "$.status",
                        "400",
                        "200",
                    )])),
                ),
                result("second", None),
                result("third", Some(InteractionFailure::TimedOut)),
            ],
            publish_errors: Vec::new(),
        };

        let report = verification.to_string();

        assert_eq!(verification.overall_outcome(), Outcome::Fail);
        assert!(report.starts_with("3 interactions, 2 failed"));
        assert!(report.contains("1) Our Little Consumer - first (given date count > 0)"));
        assert!(report.contains("$.status: expected 400 but got 200"));
        assert!(report.contains("2) Our Little Consumer - third"));
        assert!(!report.contains("second"));
    }

    #[test]
    fn test_publish_payload() {
        let verification = VerificationResult {
            interaction_results: vec![
                result("first", None),
                result(
                    "second",
                    Some(InteractionFailure::StateSetup("refused".into())),
                ),
            ],
            publish_errors: Vec::new(),
        };

        let payload = verification.publish_payload("Our Little Consumer", "2.0.0");

        assert!(!payload.success);
        assert_eq!(payload.provider_application_version, "2.0.0");
        assert_eq!(
            payload.test_results[1].error.as_deref(),
            Some("State setup failed: refused")
        );
        assert!(verification
            .publish_payload("Someone Else", "2.0.0")
            .test_results
            .is_empty());
    }

    #[test]
    fn test_empty_run_passes() {
        assert!(VerificationResult::default().is_success());
    }
}
