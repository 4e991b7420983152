use crate::entities::Entity;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::require_db;
use crate::ipc::types::{AppState, Request};
use crate::records;
use rusqlite::Connection;
use serde_json::json;

fn views_list() -> serde_json::Value {
    let mut views = vec![json!({
        "id": "dashboard",
        "title": "Dashboard",
        "kind": "dashboard",
    })];
    for e in Entity::ALL {
        let cfg = e.config();
        views.push(json!({
            "id": cfg.table,
            "title": cfg.title,
            "kind": "records",
            "displayColumns": cfg.display_columns,
            "searchColumns": cfg.search_columns,
        }));
    }
    json!({ "views": views })
}

fn dashboard_summary(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut counts = serde_json::Map::new();
    for e in Entity::ALL {
        let n = records::count(conn, e.config())?;
        counts.insert(e.as_str().to_string(), json!(n));
    }
    let fees_total: f64 = conn
        .query_row("SELECT COALESCE(SUM(amount), 0.0) FROM fees", [], |r| {
            r.get(0)
        })
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    let book_copies: i64 = conn
        .query_row("SELECT CAST(COALESCE(SUM(copies), 0) AS INTEGER) FROM books", [], |r| {
            r.get(0)
        })
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;

    Ok(json!({
        "counts": counts,
        "feesTotal": fees_total,
        "bookCopies": book_copies,
    }))
}

fn handle_views_list(_state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, views_list())
}

fn handle_dashboard_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    match require_db(state).and_then(dashboard_summary) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "views.list" => Some(handle_views_list(state, req)),
        "dashboard.summary" => Some(handle_dashboard_summary(state, req)),
        _ => None,
    }
}
