use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde_json::{json, Value as JsonValue};
use tracing::error;

use crate::error::{AppError, AppResult, RemoteErrorCode};

static ANALYSIS_RESPONSE_SCHEMA: Lazy<JsonValue> = Lazy::new(|| {
    let score = json!({"type": ["integer", "number", "null"], "minimum": 0, "maximum": 100});
    let string_list = json!({"type": "array", "items": {"type": "string"}});

    json!({
        "type": "object",
        "properties": {
            "overall_score": score,
            "body_score": score,
            "speech_score": score,
            "emotion": {"type": ["string", "null"]},
            "body_language": {
                "type": ["object", "null"],
                "properties": {
                    "score": score,
                    "strengths": string_list,
                    "problems_detected": string_list,
                    "keys_to_improve": string_list
                }
            },
            "speech_analysis": {
                "type": ["object", "null"],
                "properties": {
                    "duration": {"type": "number", "minimum": 0},
                    "speaking_rate": {"type": "number", "minimum": 0},
                    "volume": {"type": "number", "minimum": 0, "maximum": 100},
                    "pitch": {"type": "number", "minimum": 0}
                }
            },
            "emotion_analysis": {
                "type": ["object", "null"],
                "properties": {
                    "dominant_emotion": {"type": ["string", "null"]},
                    "emotions": {
                        "type": "object",
                        "additionalProperties": {"type": "number", "minimum": 0, "maximum": 1}
                    }
                }
            }
        }
    })
});

static COMPILED_ANALYSIS_SCHEMA: Lazy<Result<JSONSchema, String>> = Lazy::new(|| {
    JSONSchema::compile(&ANALYSIS_RESPONSE_SCHEMA).map_err(|err| {
        error!(target: "app::inference", error = %err, "analysis schema failed to compile");
        err.to_string()
    })
});

/// Checks an `/analyze` payload before it is typed and stored.
pub fn validate_analysis_payload(payload: &JsonValue) -> AppResult<()> {
    let schema = COMPILED_ANALYSIS_SCHEMA
        .as_ref()
        .map_err(|err| AppError::other(format!("invalid analysis schema: {err}")))?;

    if let Err(errors) = schema.validate(payload) {
        let messages: Vec<String> = errors
            .map(|err| {
                let path = err.instance_path.to_string();
                let path = if path.is_empty() {
                    "root".to_string()
                } else {
                    path
                };
                format!("{path}: {err}")
            })
            .collect();

        return Err(AppError::remote_with_details(
            RemoteErrorCode::InvalidResponse,
            "analysis response has an unexpected shape",
            None,
            Some(json!({ "violations": messages })),
        ));
    }

    Ok(())
}
