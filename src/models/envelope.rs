use serde_json::Value;

/// The `{success, data, message, code}` wrapper the API puts around most responses.
///
/// Every field is optional: plain JSON bodies read as an empty envelope.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ApiEnvelope {
    pub success: Option<bool>,
    pub data: Option<Value>,
    pub message: Option<String>,
    pub code: Option<String>,
}

impl ApiEnvelope {
    /// Reads the envelope fields out of a parsed body without consuming it.
    ///
    /// Each field is read on its own, so an unexpected type in one never hides the others.
    pub fn from_body(body: &Value) -> Self {
        let Value::Object(fields) = body else {
            return ApiEnvelope::default();
        };
        ApiEnvelope {
            success: fields.get("success").and_then(Value::as_bool),
            data: fields.get("data").filter(|data| !data.is_null()).cloned(),
            message: fields.get("message").and_then(message_text),
            code: fields.get("code").and_then(code_text),
        }
    }

    /// True only when the body explicitly says `success: false`.
    pub fn is_failure(&self) -> bool {
        self.success == Some(false)
    }

    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.message.as_deref().unwrap_or(fallback)
    }
}

// Validation failures arrive as a list of messages.
fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(message_text).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        other => Some(other.to_string()),
    }
}

fn code_text(value: &Value) -> Option<String> {
    match value {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

/// Returns the `data` member of an envelope, or the body itself when there is none.
pub fn payload(body: &Value) -> &Value {
    match body.get("data") {
        Some(data) if !data.is_null() => data,
        _ => body,
    }
}
