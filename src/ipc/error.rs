use serde_json::json;

use crate::records::RecordError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<RecordError> for HandlerErr {
    fn from(e: RecordError) -> Self {
        let details = match &e {
            RecordError::DuplicateKey { table, column } => {
                Some(json!({ "table": table, "column": column }))
            }
            RecordError::NotFound { table, id } | RecordError::ConfirmationRequired { table, id } => {
                Some(json!({ "table": table, "id": id }))
            }
            RecordError::InvalidValue { field, .. } => Some(json!({ "field": field })),
            RecordError::TableMismatch { .. } | RecordError::Database(_) => None,
        };
        Self {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}
