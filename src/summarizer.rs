//! Turns a free-text prompt into a validated task list via a remote
//! chat-completions call. The model is not trusted to return bare JSON:
//! the payload is dug out of the response text defensively, then every
//! element is checked against an exact three-key schema before anything is
//! accepted. Validation is all-or-nothing and failures carry the raw model
//! output for diagnosis.

use crate::errors::{AppError, AppResult};
use crate::models::{AppSettings, TaskRecord};
use once_cell::sync::Lazy;
use serde_json::Value;

static TASK_ITEM_SCHEMA_JSON: Lazy<Value> = Lazy::new(|| {
    serde_json::json!({
        "type": "object",
        "properties": {
            "text": { "type": "string" },
            "done": { "type": "boolean" },
            "pinned": { "type": "boolean" }
        },
        "required": ["text", "done", "pinned"],
        "additionalProperties": false
    })
});

static TASK_ITEM_SCHEMA: Lazy<jsonschema::JSONSchema> = Lazy::new(|| {
    jsonschema::JSONSchema::compile(&TASK_ITEM_SCHEMA_JSON).expect("task item schema compiles")
});

#[derive(Debug, Clone)]
pub struct SummarizeOutcome {
    pub tasks: Vec<TaskRecord>,
    /// The model's message content verbatim, for the editor's debug view.
    pub raw: String,
}

#[derive(Debug, Default, Clone)]
pub struct Summarizer {
    client: reqwest::Client,
}

impl Summarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// One remote call, no retries. Transport problems (network, HTTP
    /// status, missing content) surface as `Transport`; anything wrong with
    /// the returned task payload surfaces as `Validation` with the raw text
    /// attached. The caller's existing task list is never touched here.
    pub async fn summarize(
        &self,
        settings: &AppSettings,
        input: &str,
        api_key: &str,
    ) -> AppResult<SummarizeOutcome> {
        let url = format!(
            "{}/chat/completions",
            settings.api_base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": settings.model,
            "messages": [
                { "role": "system", "content": settings.system_prompt },
                { "role": "user", "content": input }
            ]
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Transport(format!(
                "model endpoint returned {}: {}",
                status, detail
            )));
        }

        let payload: Value = response.json().await?;
        let content = payload
            .get("choices")
            .and_then(|choices| choices.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| {
                AppError::Transport("model response carried no message content".to_string())
            })?;

        let tasks = parse_tasks(content)?;
        tracing::info!(count = tasks.len(), "summarization accepted");
        Ok(SummarizeOutcome {
            tasks,
            raw: content.to_string(),
        })
    }
}

/// Full extraction-and-validation pass over raw model output. All-or-nothing:
/// any bad element rejects the whole array.
pub fn parse_tasks(raw: &str) -> AppResult<Vec<TaskRecord>> {
    parse_tasks_inner(raw)
        .map_err(|reason| AppError::Validation(format!("{}; raw response: {}", reason, raw)))
}

fn parse_tasks_inner(raw: &str) -> Result<Vec<TaskRecord>, String> {
    let value =
        extract_json_payload(raw).ok_or_else(|| "response is not extractable as JSON".to_string())?;
    let items = normalize_tasks_value(value)?;

    let mut pinned_count = 0usize;
    let mut tasks = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if let Err(errors) = TASK_ITEM_SCHEMA.validate(item) {
            let details = errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path, error)
                    }
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(format!("task {} does not match the required shape ({})", index, details));
        }

        let text = item["text"].as_str().unwrap_or_default().trim();
        if text.is_empty() {
            return Err(format!("task {} has empty text", index));
        }
        let done = item["done"].as_bool().unwrap_or(false);
        let pinned = item["pinned"].as_bool().unwrap_or(false);
        if pinned {
            pinned_count += 1;
        }
        tasks.push(TaskRecord::with_flags(text, done, pinned));
    }

    if pinned_count > 1 {
        return Err(format!("{} tasks are pinned, at most one is allowed", pinned_count));
    }

    Ok(tasks)
}

/// Best-effort JSON recovery: the whole text first, then the widest
/// bracketed substring, array form before object form.
fn extract_json_payload(raw: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(raw.trim()) {
        return Some(value);
    }

    for (open, close) in [('[', ']'), ('{', '}')] {
        let (Some(start), Some(end)) = (raw.find(open), raw.rfind(close)) else {
            continue;
        };
        if end <= start {
            continue;
        }
        if let Ok(value) = serde_json::from_str(raw[start..=end].trim()) {
            return Some(value);
        }
    }
    None
}

/// Resolves the parsed value to the array of candidate task objects: arrays
/// pass through, a lone task object is wrapped, and common wrapper objects
/// ("tasks"/"items"/"data"/"list") are unwrapped.
fn normalize_tasks_value(value: Value) -> Result<Vec<Value>, String> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => {
            if map.len() == 3 && map.contains_key("text") && map.contains_key("done") && map.contains_key("pinned") {
                return Ok(vec![Value::Object(map)]);
            }
            for key in ["tasks", "items", "data", "list"] {
                if let Some(Value::Array(items)) = map.get(key) {
                    return Ok(items.clone());
                }
            }
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            Err(format!(
                "response JSON is an object, not a task array (keys: {})",
                keys.join(", ")
            ))
        }
        _ => Err("response JSON is not an array".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_tasks;
    use crate::errors::AppError;

    fn expect_validation(raw: &str) -> String {
        match parse_tasks(raw) {
            Err(AppError::Validation(message)) => message,
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn accepts_a_bare_json_array() {
        let tasks = parse_tasks(
            r#"[{"text":"Draft outline","done":false,"pinned":true},
                {"text":"Send it","done":false,"pinned":false}]"#,
        )
        .expect("parse");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].text, "Draft outline");
        assert!(tasks[0].pinned);
    }

    #[test]
    fn extracts_an_array_embedded_in_prose() {
        let tasks = parse_tasks(
            "Here you go:\n[{\"text\":\"Buy milk\",\"done\":false,\"pinned\":false}]\nThanks!",
        )
        .expect("parse");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "Buy milk");
        assert!(!tasks[0].done && !tasks[0].pinned);
    }

    #[test]
    fn unwraps_known_wrapper_keys() {
        let tasks =
            parse_tasks(r#"{"tasks":[{"text":"X","done":false,"pinned":false}]}"#).expect("parse");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "X");

        let tasks =
            parse_tasks(r#"{"items":[{"text":"Y","done":true,"pinned":false}]}"#).expect("parse");
        assert!(tasks[0].done);
    }

    #[test]
    fn wraps_a_single_task_object() {
        let tasks = parse_tasks(
            "note: {\"text\":\"Solo\",\"done\":false,\"pinned\":false} -- end",
        )
        .expect("parse");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "Solo");
    }

    #[test]
    fn rejects_more_than_one_pinned_task() {
        let raw = r#"[{"text":"A","done":false,"pinned":true},{"text":"B","done":false,"pinned":true}]"#;
        let message = expect_validation(raw);
        assert!(message.contains("pinned"));
        // The offending raw text rides along for diagnosis.
        assert!(message.contains(raw));
    }

    #[test]
    fn rejects_wrong_key_sets() {
        expect_validation(r#"[{"text":"A","done":false}]"#);
        expect_validation(r#"[{"text":"A","done":false,"pinned":false,"extra":1}]"#);
        expect_validation(r#"[{"text":"A","completed":false,"pinned":false}]"#);
    }

    #[test]
    fn rejects_wrong_value_types_and_non_objects() {
        expect_validation(r#"[{"text":42,"done":false,"pinned":false}]"#);
        expect_validation(r#"[{"text":"A","done":"no","pinned":false}]"#);
        expect_validation(r#"[{"text":"A","done":false,"pinned":0}]"#);
        expect_validation(r#"["just a string"]"#);
    }

    #[test]
    fn rejects_unextractable_and_misshapen_responses() {
        expect_validation("the model had nothing to say");
        expect_validation(r#""a bare string""#);
        expect_validation(r#"{"result":"done"}"#);
    }

    #[test]
    fn all_or_nothing_one_bad_entry_rejects_everything() {
        expect_validation(
            r#"[{"text":"Good","done":false,"pinned":false},
                {"text":"Bad","done":false}]"#,
        );
    }

    #[test]
    fn task_text_is_trimmed_and_must_not_be_blank() {
        let tasks = parse_tasks(r#"[{"text":"  padded  ","done":false,"pinned":false}]"#)
            .expect("parse");
        assert_eq!(tasks[0].text, "padded");

        expect_validation(r#"[{"text":"   ","done":false,"pinned":false}]"#);
    }

    #[test]
    fn accepts_an_empty_array() {
        assert!(parse_tasks("[]").expect("parse").is_empty());
    }
}
