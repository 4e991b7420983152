use rusqlite::Connection;

use crate::entities::Entity;
use crate::ipc::error::HandlerErr;
use crate::ipc::types::AppState;

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn get_required_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

/// Accepts a JSON integer or a numeric string.
pub fn parse_id(v: &serde_json::Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
}

pub fn get_required_id(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    let v = params
        .get(key)
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))?;
    parse_id(v).ok_or_else(|| HandlerErr::new("bad_params", format!("{} must be an integer", key)))
}

pub fn get_bool(params: &serde_json::Value, key: &str) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

pub fn get_entity(params: &serde_json::Value) -> Result<Entity, HandlerErr> {
    let name = get_required_str(params, "entity")?;
    Entity::parse(name).ok_or_else(|| HandlerErr {
        code: "unknown_entity",
        message: format!("unknown entity: {}", name),
        details: Some(serde_json::json!({
            "known": Entity::ALL.iter().map(|e| e.as_str()).collect::<Vec<_>>()
        })),
    })
}

/// Submitted form values; only configured field names are accepted.
pub fn get_values(
    params: &serde_json::Value,
    entity: Entity,
) -> Result<serde_json::Map<String, serde_json::Value>, HandlerErr> {
    let values = match params.get("values") {
        None | Some(serde_json::Value::Null) => serde_json::Map::new(),
        Some(serde_json::Value::Object(m)) => m.clone(),
        Some(_) => return Err(HandlerErr::new("bad_params", "values must be an object")),
    };
    let config = entity.config();
    if let Some(unknown) = values.keys().find(|k| config.field(k).is_none()) {
        return Err(HandlerErr::new(
            "bad_params",
            format!("{} has no field {}", config.table, unknown),
        ));
    }
    Ok(values)
}
