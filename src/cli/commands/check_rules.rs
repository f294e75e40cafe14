//! Check rules command implementation
//!
//! Loads rule definitions from the configured rule source and reports every
//! expression that does not compile.

use crate::adapters::rules::{create_rule_source, RuleSource};
use crate::config::load_config;
use crate::domain::ids::TemplateId;
use crate::domain::rules::RuleSet;
use clap::Args;

/// Arguments for the check-rules command
#[derive(Args, Debug, Default)]
pub struct CheckRulesArgs {
    /// Check only the rule set of this template
    #[arg(short, long)]
    pub template: Option<String>,
}

impl CheckRulesArgs {
    /// Execute the check-rules command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let source = match create_rule_source(&config.rules) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to create rule source: {e}");
                return Ok(2);
            }
        };

        println!("Checking rules from {}", source.describe());
        println!();
        self.check(source.as_ref()).await
    }

    async fn check(&self, source: &(dyn RuleSource + Send + Sync)) -> anyhow::Result<i32> {
        let loaded: crate::domain::Result<Vec<RuleSet>> = match &self.template {
            Some(id) => {
                let template_id = match TemplateId::new(id.as_str()) {
                    Ok(t) => t,
                    Err(e) => {
                        eprintln!("Invalid template id: {e}");
                        return Ok(2);
                    }
                };
                source.load(&template_id).await.map(|set| set.into_iter().collect())
            }
            None => source.load_all().await,
        };

        let rule_sets: Vec<RuleSet> = match loaded {
            Ok(sets) => sets,
            Err(e) => {
                eprintln!("Failed to load rules: {e}");
                return Ok(4);
            }
        };

        if rule_sets.is_empty() {
            println!("No rule sets found");
            return Ok(if self.template.is_some() { 1 } else { 0 });
        }

        let mut issue_count = 0;
        for rule_set in &rule_sets {
            let issues = rule_set.compile_errors();
            println!(
                "  Template {}: {} rule(s), {} issue(s)",
                rule_set.id,
                rule_set.rule_count(),
                issues.len()
            );
            for issue in &issues {
                println!(
                    "    - [{} -> {}] {}",
                    issue.rule_set, issue.target_table, issue.source
                );
                println!("      {}", issue.error);
            }
            issue_count += issues.len();
        }

        println!();
        if issue_count == 0 {
            println!("All {} rule set(s) compiled", rule_sets.len());
            Ok(0)
        } else {
            println!("{issue_count} expression(s) failed to compile");
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rules::StaticRuleSource;

    #[tokio::test]
    async fn test_clean_rules_exit_zero() {
        let source = StaticRuleSource::from_json(
            r#"{"id": 1, "rule_set": [{"target_table": "x", "field_map": ["t.A = e.A"]}]}"#,
        )
        .unwrap();
        let code = CheckRulesArgs::default().check(&source).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_compile_errors_exit_one() {
        let source = StaticRuleSource::from_json(
            r#"{"id": 1, "rule_set": [{"target_table": "x", "condition": "e.A ==", "field_map": []}]}"#,
        )
        .unwrap();
        let code = CheckRulesArgs::default().check(&source).await.unwrap();
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn test_unknown_template_exit_one() {
        let source = StaticRuleSource::from_json(r#"{"id": 1}"#).unwrap();
        let args = CheckRulesArgs {
            template: Some("2".to_string()),
        };
        assert_eq!(args.check(&source).await.unwrap(), 1);
    }
}
