//! Rendering of evaluation outcomes.

use healthgate_health::{EvaluationOutcome, PassRatio, ProbeStatus};
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    healthy: bool,
    ratio: PassRatio,
    statuses: Vec<&'a ProbeStatus>,
}

pub fn print_outcome(outcome: &EvaluationOutcome, format: &str) -> anyhow::Result<()> {
    println!("{}", render(outcome, format)?);
    Ok(())
}

fn render(outcome: &EvaluationOutcome, format: &str) -> anyhow::Result<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(&JsonReport {
            healthy: outcome.is_healthy(),
            ratio: outcome.pass_ratio(),
            statuses: outcome.sorted(),
        })?),
        _ if outcome.is_empty() => Ok("No probes defined.".to_string()),
        _ => Ok(format!(
            "{}\nSucceeded: {}",
            outcome.report(),
            outcome.pass_ratio()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> EvaluationOutcome {
        EvaluationOutcome::new(vec![
            ProbeStatus::succeeded("web", "GET / -> 200 OK"),
            ProbeStatus::failed("db", "refused"),
        ])
    }

    #[test]
    fn text_lists_failures_first() {
        let text = render(&outcome(), "text").unwrap();
        assert_eq!(
            text,
            "[failed] db: refused\n[ok] web: GET / -> 200 OK\nSucceeded: 1/2 (50.00%)"
        );
    }

    #[test]
    fn json_includes_ratio_and_statuses() {
        let json: serde_json::Value =
            serde_json::from_str(&render(&outcome(), "json").unwrap()).unwrap();
        assert_eq!(json["healthy"], false);
        assert_eq!(json["ratio"]["passed"], 1);
        assert_eq!(json["statuses"][0]["name"], "db");
        assert_eq!(json["statuses"][0]["result"], "failed");
    }

    #[test]
    fn empty_outcome_text() {
        assert_eq!(
            render(&EvaluationOutcome::default(), "text").unwrap(),
            "No probes defined."
        );
    }
}
