// src/responses/export.rs
//! Flattens stored responses into CSV keyed by human-readable question
//! labels.

use std::collections::HashMap;

use super::models::ResponseView;
use crate::surveys::models::Question;

fn escape_csv(field: &str) -> String {
    format!("\"{}\"", field.replace('\"', "\"\""))
}

/// Build the CSV text for a survey's responses.
///
/// One row per response, keyed by response id and timestamp. One column per
/// survey question, labelled by its question text; answers referencing
/// question ids that no longer resolve get their own columns labelled by the
/// raw id, in first-seen order. Callers must reject an empty response set
/// before getting here.
pub fn responses_to_csv(questions: &[Question], responses: &[ResponseView]) -> String {
    // Columns in survey order first; only questions with stable ids can be
    // matched to answers
    let mut column_ids: Vec<String> = Vec::new();
    let mut labels: HashMap<String, String> = HashMap::new();
    for question in questions {
        if let Some(id) = &question.id {
            column_ids.push(id.clone());
            labels.insert(id.clone(), question.label().to_string());
        }
    }

    // Unresolved question ids become fallback columns
    for response in responses {
        for answer in &response.answers {
            if !labels.contains_key(&answer.question_id) {
                column_ids.push(answer.question_id.clone());
                labels.insert(answer.question_id.clone(), answer.question_id.clone());
            }
        }
    }

    let mut csv = String::new();
    let header: Vec<String> = std::iter::once("responseId".to_string())
        .chain(std::iter::once("timestamp".to_string()))
        .chain(column_ids.iter().map(|id| labels[id].clone()))
        .map(|label| escape_csv(&label))
        .collect();
    csv.push_str(&header.join(","));
    csv.push('\n');

    for response in responses {
        let answered: HashMap<&str, String> = response
            .answers
            .iter()
            .map(|answer| {
                let value = answer
                    .answer
                    .as_ref()
                    .map(|v| v.to_export_string())
                    .unwrap_or_default();
                (answer.question_id.as_str(), value)
            })
            .collect();

        let row: Vec<String> = std::iter::once(response.id.clone())
            .chain(std::iter::once(response.timestamp.clone()))
            .chain(column_ids.iter().map(|id| {
                answered.get(id.as_str()).cloned().unwrap_or_default()
            }))
            .map(|cell| escape_csv(&cell))
            .collect();
        csv.push_str(&row.join(","));
        csv.push('\n');
    }

    csv
}
