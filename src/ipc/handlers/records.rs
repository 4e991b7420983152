use crate::entities::Entity;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{get_bool, get_entity, get_required_id, get_values, parse_id, require_db};
use crate::ipc::types::{AppState, Request};
use crate::records::{self, PendingEdit, RecordError};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashMap;

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn records_form(params: &serde_json::Value, today: NaiveDate) -> Result<serde_json::Value, HandlerErr> {
    let entity = get_entity(params)?;
    let cfg = entity.config();
    Ok(json!({
        "entity": cfg.table,
        "title": cfg.title,
        "fields": records::form(cfg, today),
    }))
}

fn records_search(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let entity = get_entity(params)?;
    let keyword = match params.get("keyword") {
        None | Some(serde_json::Value::Null) => "",
        Some(v) => v
            .as_str()
            .ok_or_else(|| HandlerErr::new("bad_params", "keyword must be a string"))?,
    };
    let listing = records::search(conn, entity.config(), keyword)?;
    let empty = listing.is_empty();
    Ok(json!({
        "entity": entity.as_str(),
        "keyword": keyword,
        "columns": listing.columns,
        "empty": empty,
        "rows": listing.rows,
    }))
}

fn records_add(
    conn: &Connection,
    params: &serde_json::Value,
    today: NaiveDate,
) -> Result<serde_json::Value, HandlerErr> {
    let entity = get_entity(params)?;
    let values = get_values(params, entity)?;
    let id = records::add(conn, entity.config(), &values, today)?;
    Ok(json!({ "entity": entity.as_str(), "id": id }))
}

fn pending_json(entity: Entity, pending: &PendingEdit, today: NaiveDate) -> serde_json::Value {
    let cfg = entity.config();
    json!({
        "entity": cfg.table,
        "id": pending.id(),
        "fields": records::edit_form(cfg, pending, today),
        "snapshot": pending.to_json(cfg),
    })
}

fn records_load_for_update(
    conn: &Connection,
    pending: &mut HashMap<Entity, PendingEdit>,
    params: &serde_json::Value,
    today: NaiveDate,
) -> Result<serde_json::Value, HandlerErr> {
    let entity = get_entity(params)?;
    let id = get_required_id(params, "id")?;
    // A failed load must leave any earlier snapshot in place.
    let snapshot = records::load_for_update(conn, entity.config(), id)?;
    let result = pending_json(entity, &snapshot, today);
    if let Some(previous) = pending.insert(entity, snapshot) {
        if previous.id() != id {
            tracing::debug!(table = entity.as_str(), previous = previous.id(), id, "replaced pending edit");
        }
    }
    Ok(result)
}

fn records_pending(
    pending: &HashMap<Entity, PendingEdit>,
    params: &serde_json::Value,
    today: NaiveDate,
) -> Result<serde_json::Value, HandlerErr> {
    let entity = get_entity(params)?;
    Ok(json!({
        "pending": pending.get(&entity).map(|p| pending_json(entity, p, today)),
    }))
}

fn records_update(
    conn: &Connection,
    pending: &mut HashMap<Entity, PendingEdit>,
    params: &serde_json::Value,
    today: NaiveDate,
) -> Result<serde_json::Value, HandlerErr> {
    let entity = get_entity(params)?;
    let changes = get_values(params, entity)?;
    let Some(snapshot) = pending.remove(&entity) else {
        return Err(HandlerErr::new(
            "no_pending_edit",
            format!("load a {} record for update first", entity.as_str()),
        ));
    };
    // Optional guard: the shell may echo the id it believes it is editing.
    if let Some(expected) = params.get("id").filter(|v| !v.is_null()) {
        if parse_id(expected) != Some(snapshot.id()) {
            let held = snapshot.id();
            pending.insert(entity, snapshot);
            return Err(HandlerErr {
                code: "bad_params",
                message: format!("pending edit is for id {}", held),
                details: Some(json!({ "pendingId": held })),
            });
        }
    }

    match records::update(conn, entity.config(), snapshot.clone(), &changes, today) {
        Ok(id) => Ok(json!({ "entity": entity.as_str(), "id": id })),
        Err(e) => {
            // The row is gone; keeping its snapshot would only fail again.
            if !matches!(e, RecordError::NotFound { .. }) {
                pending.insert(entity, snapshot);
            }
            Err(e.into())
        }
    }
}

fn records_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let entity = get_entity(params)?;
    let id = get_required_id(params, "id")?;
    let confirmed = get_bool(params, "confirm");
    if let Err(e) = records::delete(conn, entity.config(), id, confirmed) {
        if matches!(e, RecordError::ConfirmationRequired { .. }) {
            tracing::warn!(table = entity.as_str(), id, "delete not confirmed");
        }
        return Err(e.into());
    }
    Ok(json!({ "entity": entity.as_str(), "id": id }))
}

fn handle_records_form(_state: &mut AppState, req: &Request) -> serde_json::Value {
    match records_form(&req.params, today()) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_records_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    match require_db(state).and_then(|conn| records_search(conn, &req.params)) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_records_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    match require_db(state).and_then(|conn| records_add(conn, &req.params, today())) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_records_load_for_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match records_load_for_update(conn, &mut state.pending, &req.params, today()) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_records_pending(state: &mut AppState, req: &Request) -> serde_json::Value {
    match records_pending(&state.pending, &req.params, today()) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_records_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match records_update(conn, &mut state.pending, &req.params, today()) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_records_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    match require_db(state).and_then(|conn| records_delete(conn, &req.params)) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.form" => Some(handle_records_form(state, req)),
        "records.search" => Some(handle_records_search(state, req)),
        "records.add" => Some(handle_records_add(state, req)),
        "records.loadForUpdate" => Some(handle_records_load_for_update(state, req)),
        "records.pending" => Some(handle_records_pending(state, req)),
        "records.update" => Some(handle_records_update(state, req)),
        "records.delete" => Some(handle_records_delete(state, req)),
        _ => None,
    }
}
