//! Integer factorization tool.

use std::fmt;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;

use super::{Tool, ToolOutput};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactorError {
    #[error("No number found in the input text.")]
    NoNumberFound,

    #[error("Please provide a positive integer greater than 0.")]
    NonPositiveInput,

    #[error("The number is too large to factorize.")]
    NumberTooLarge,
}

/// Divisors of a positive integer, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factorization {
    pub number: u64,
    pub factors: Vec<u64>,
}

impl fmt::Display for Factorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factors = self
            .factors
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "The factors of {} are: {}", self.number, factors)
    }
}

fn digit_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("static regex"))
}

/// Find every divisor of the first decimal number embedded in `input`.
///
/// Only ASCII digits count and sign characters are not part of the run, so
/// `"-5"` factorizes 5.
pub fn find_factors(input: &str) -> Result<Factorization, FactorError> {
    let digits = digit_run()
        .find(input)
        .ok_or(FactorError::NoNumberFound)?
        .as_str();

    let number: u64 = digits.parse().map_err(|_| FactorError::NumberTooLarge)?;
    if number == 0 {
        return Err(FactorError::NonPositiveInput);
    }

    let factors = (1..=number).filter(|i| number % i == 0).collect();

    Ok(Factorization { number, factors })
}

/// Tool wrapper exposing [`find_factors`] to the agent.
pub struct FindFactors;

#[async_trait]
impl Tool for FindFactors {
    fn name(&self) -> &str {
        "find_factors"
    }

    fn description(&self) -> &str {
        "Extract a number from the input text and return all possible factors of that number. Searches for numbers in the input text, takes the first one found and calculates all of its divisors."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input_text": {
                    "type": "string",
                    "description": "The input text containing a number to factorize"
                }
            },
            "required": ["input_text"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolOutput> {
        let input = args["input_text"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'input_text' argument"))?
            .to_string();

        // Trial division is linear in the number; keep it off the runtime workers.
        let outcome = tokio::task::spawn_blocking(move || find_factors(&input)).await?;

        let output = match outcome {
            Ok(result) => {
                tracing::debug!(number = result.number, count = result.factors.len(), "Factorized");
                ToolOutput::success(result.to_string())
            }
            Err(e) => ToolOutput::error(e.to_string()),
        };

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factorize_embedded_number() {
        let result = find_factors("Factorize 12 please").unwrap();
        assert_eq!(result.factors, vec![1, 2, 3, 4, 6, 12]);
        assert_eq!(
            result.to_string(),
            "The factors of 12 are: 1, 2, 3, 4, 6, 12"
        );
    }

    #[test]
    fn divisors_are_exact_and_ascending() {
        for n in 1..=200u64 {
            let result = find_factors(&format!("n = {}", n)).unwrap();
            let expected: Vec<u64> = (1..=n).filter(|i| n % i == 0).collect();
            assert_eq!(result.factors, expected);
            assert_eq!(result.factors.first(), Some(&1));
            assert_eq!(result.factors.last(), Some(&n));
            assert!(result.factors.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn uses_first_digit_run_only() {
        let result = find_factors("7 and 12").unwrap();
        assert_eq!(result.number, 7);
        assert_eq!(result.factors, vec![1, 7]);

        let result = find_factors("v2.5").unwrap();
        assert_eq!(result.number, 2);
    }

    #[test]
    fn prime_and_one() {
        assert_eq!(find_factors("13").unwrap().factors, vec![1, 13]);
        assert_eq!(find_factors("1").unwrap().factors, vec![1]);
    }

    #[test]
    fn leading_zeros_are_ignored() {
        assert_eq!(find_factors("007").unwrap().number, 7);
    }

    #[test]
    fn no_number() {
        let err = find_factors("no numbers here").unwrap_err();
        assert_eq!(err, FactorError::NoNumberFound);
        assert_eq!(err.to_string(), "No number found in the input text.");
        assert_eq!(find_factors("").unwrap_err(), FactorError::NoNumberFound);
    }

    #[test]
    fn zero_is_rejected() {
        let err = find_factors("0").unwrap_err();
        assert_eq!(err, FactorError::NonPositiveInput);
        assert_eq!(
            err.to_string(),
            "Please provide a positive integer greater than 0."
        );
        assert_eq!(find_factors("000").unwrap_err(), FactorError::NonPositiveInput);
    }

    #[test]
    fn sign_is_not_part_of_the_number() {
        let result = find_factors("-5").unwrap();
        assert_eq!(result.number, 5);
        assert_eq!(result.factors, vec![1, 5]);
    }

    #[test]
    fn overflow_is_reported() {
        let err = find_factors("99999999999999999999999").unwrap_err();
        assert_eq!(err, FactorError::NumberTooLarge);
    }

    #[tokio::test]
    async fn tool_reports_errors_as_data() {
        let out = FindFactors
            .execute(json!({"input_text": "nothing"}))
            .await
            .unwrap();
        assert!(!out.is_success());
        assert_eq!(out.text(), "No number found in the input text.");
    }

    #[tokio::test]
    async fn large_factorization_does_not_block_the_runtime() {
        // 100000007 is prime: a full 10^8-step trial division.
        let factoring = tokio::spawn(async {
            FindFactors
                .execute(json!({"input_text": "factor 100000007"}))
                .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!factoring.is_finished());

        let out = factoring.await.unwrap().unwrap();
        assert!(out.is_success());
        assert_eq!(out.text(), "The factors of 100000007 are: 1, 100000007");
    }

    #[tokio::test]
    async fn tool_requires_input_text() {
        assert!(FindFactors.execute(json!({})).await.is_err());
    }
}
