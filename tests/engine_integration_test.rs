//! End-to-end tests of the transformation engine through the public API

use ehr2row::adapters::rules::StaticRuleSource;
use ehr2row::adapters::sink::MemorySink;
use ehr2row::config::OutputConfig;
use ehr2row::core::completion::CompletionStatus;
use ehr2row::core::engine::{DocumentStatus, Engine};
use ehr2row::domain::{OutputMessage, TargetTable};
use serde_json::json;
use std::sync::Arc;

const RULES: &str = r#"[
  {
    "id": 1001,
    "level": "template",
    "rule_set": [
      {
        "target_table": "visit_occurrence",
        "queue": "x",
        "condition": "d.ESTADO == 'C'",
        "field_map": ["t.VISIT_ID = d.ID_INSTANCIA_PLANT; t.STATE = d.ESTADO"]
      }
    ],
    "child_rules": [
      {
        "id": "SIGNS",
        "child_rules": [
          {
            "id": "TEMP",
            "rule_set": [
              {
                "target_table": "measurement",
                "queue": "x",
                "condition": "e.VALOR != null",
                "field_map": [
                  "t.VISIT_ID = d.ID_INSTANCIA_PLANT",
                  "t.VALUE = number(e.VALOR)",
                  "t.UNIT = d.content.id('SIGNS').content.idDato('UNIT')?.VALOR ?? 'Cel'"
                ]
              },
              {
                "target_table": "observation",
                "queue": "obs",
                "field_map": ["t.NOTE = concat('temp ', e.VALOR)"]
              }
            ]
          }
        ]
      }
    ]
  },
  {
    "id": 2002,
    "rule_set": [
      {"target_table": "note", "queue": "y", "field_map": ["t.TEXT = upper(d.TEXT)"]}
    ]
  }
]"#;

fn engine(sink: &Arc<MemorySink>) -> Engine {
    let rules = Arc::new(StaticRuleSource::from_json(RULES).unwrap());
    Engine::new(rules, sink.clone(), &OutputConfig::default())
}

fn vitals_document() -> serde_json::Value {
    json!({
        "id": 1001,
        "ID_INSTANCIA_PLANT": "V-1",
        "ESTADO": "C",
        "content": [
            {"id": "SIGNS", "content": [
                {"id": "TEMP", "VALOR": "36.6"},
                {"id": "TEMP", "VALOR": "38.1"},
                {"id": "UNIT", "VALOR": "Fahrenheit", "ESTADO": "P"},
                {"id": "PULSE", "VALOR": "80"}
            ]},
            {"id": "OTHER", "content": [{"id": "TEMP", "VALOR": "1"}]}
        ]
    })
}

#[tokio::test]
async fn test_two_documents_two_channels_one_sentinel_each() {
    let sink = Arc::new(MemorySink::new());
    let engine = engine(&sink);

    assert_eq!(engine.start(2).await.unwrap(), CompletionStatus::Pending(2));

    let a = engine
        .process_document(&json!({"id": 1001, "ESTADO": "C", "ID_INSTANCIA_PLANT": 1}))
        .await
        .unwrap();
    assert_eq!(a.completion, CompletionStatus::Pending(1));

    let b = engine
        .process_document(&json!({"id": 2002, "TEXT": "hello"}))
        .await
        .unwrap();
    assert_eq!(b.completion, CompletionStatus::Finished);

    let sentinel = |channel: &str| OutputMessage {
        target_table: TargetTable::EndOfStream,
        queue: Some(channel.to_string()),
        record: json!(""),
    };
    assert_eq!(sink.messages_on("x").last(), Some(&sentinel("x")));
    assert_eq!(sink.messages_on("y").last(), Some(&sentinel("y")));
    assert_eq!(sink.sentinel_count("x"), 1);
    assert_eq!(sink.sentinel_count("y"), 1);
    assert_eq!(sink.sentinel_channels(), vec!["x", "y"]);
    assert!(sink.is_closed());
}

#[tokio::test]
async fn test_structural_matching_and_fan_out() {
    let sink = Arc::new(MemorySink::new());
    let engine = engine(&sink);

    let report = engine.process_document(&vitals_document()).await.unwrap();
    assert_eq!(report.status, DocumentStatus::Processed);

    // one visit, two measurements, two observations; PULSE, UNIT and OTHER/TEMP never match
    assert_eq!(report.records_emitted, 5);

    let measurements: Vec<_> = sink
        .messages_on("x")
        .into_iter()
        .filter(|m| m.target_table == TargetTable::Table("measurement".to_string()))
        .map(|m| m.record)
        .collect();
    assert_eq!(
        measurements,
        vec![
            json!({"VISIT_ID": "V-1", "VALUE": 36.6, "UNIT": "Cel"}),
            json!({"VISIT_ID": "V-1", "VALUE": 38.1, "UNIT": "Cel"}),
        ]
    );

    let notes: Vec<_> = sink.messages_on("obs").into_iter().map(|m| m.record).collect();
    assert_eq!(notes, vec![json!({"NOTE": "temp 36.6"}), json!({"NOTE": "temp 38.1"})]);
}

#[tokio::test]
async fn test_unsatisfied_condition_emits_nothing() {
    let sink = Arc::new(MemorySink::new());
    let engine = engine(&sink);

    let report = engine
        .process_document(&json!({"id": 1001, "ESTADO": "P", "content": []}))
        .await
        .unwrap();

    assert_eq!(report.records_emitted, 0);
    assert_eq!(report.stats.rules_skipped, 1);
    assert!(sink.deliveries().is_empty());
}

#[tokio::test]
async fn test_document_without_rules_produces_nothing() {
    let sink = Arc::new(MemorySink::new());
    let engine = engine(&sink);
    engine.start(1).await.unwrap();

    let report = engine.process_document(&json!({"id": 3003})).await.unwrap();

    assert_eq!(report.status, DocumentStatus::NoRules);
    assert_eq!(report.completion, CompletionStatus::Finished);
    // no channel was ever used, so no sentinel either
    assert!(sink.deliveries().is_empty());
    assert!(sink.is_closed());
}

#[tokio::test]
async fn test_default_queues_receive_sentinel_without_rows() {
    let sink = Arc::new(MemorySink::new());
    let rules = Arc::new(StaticRuleSource::from_json(RULES).unwrap());
    let output = OutputConfig {
        default_queues: vec!["person".to_string()],
        ..OutputConfig::default()
    };
    let engine = Engine::new(rules, sink.clone(), &output);

    engine.start(1).await.unwrap();
    engine
        .process_document(&json!({"id": 2002, "TEXT": "t"}))
        .await
        .unwrap();

    assert_eq!(sink.sentinel_channels(), vec!["person", "y"]);
}

#[tokio::test]
async fn test_rows_after_end_are_dropped() {
    let sink = Arc::new(MemorySink::new());
    let engine = engine(&sink);
    engine.start(1).await.unwrap();
    engine
        .process_document(&json!({"id": 2002, "TEXT": "a"}))
        .await
        .unwrap();

    let late = engine
        .process_document(&json!({"id": 2002, "TEXT": "late"}))
        .await
        .unwrap();

    assert_eq!(late.records_failed, 1);
    assert_eq!(late.completion, CompletionStatus::AlreadyFinished);
    assert_eq!(engine.dispatcher().stats().dropped, 1);
    let last = sink.deliveries().pop().unwrap();
    assert!(last.message.is_end_of_stream());
}
