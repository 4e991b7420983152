//! Generic CRUD+search over one configured table.
//!
//! Every entity view runs through the same operations here; the only thing
//! that differs between them is the [`EntityConfig`]. Table and column names
//! always come from static configuration; user-supplied values are bound as
//! parameters.

mod error;
mod field;

pub use error::{RecordError, Result};
pub use field::{sql_to_json, FieldSpec, FormField};

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::json;

#[derive(Debug)]
pub struct EntityConfig {
    pub table: &'static str,
    pub title: &'static str,
    /// Ordered editable fields; `id` is never listed here.
    pub fields: &'static [FieldSpec],
    pub display_columns: &'static [&'static str],
    pub search_columns: &'static [&'static str],
}

impl EntityConfig {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn column_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Display-column rows matching the active search.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub columns: Vec<&'static str>,
    pub rows: Vec<serde_json::Value>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Snapshot of one row captured for editing. Handed back to [`update`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    table: &'static str,
    id: i64,
    /// Positionally aligned with `EntityConfig::fields`.
    values: Vec<Value>,
}

impl PendingEdit {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn to_json(&self, config: &EntityConfig) -> serde_json::Value {
        let mut values = serde_json::Map::new();
        for (f, v) in config.fields.iter().zip(&self.values) {
            values.insert(f.name.to_string(), sql_to_json(v));
        }
        json!({
            "table": self.table,
            "id": self.id,
            "values": values,
        })
    }
}

pub fn search(conn: &Connection, config: &EntityConfig, keyword: &str) -> Result<Listing> {
    let columns = config.display_columns.join(", ");
    let mut sql = format!("SELECT {} FROM {}", columns, config.table);
    let mut params: Vec<Value> = Vec::new();
    if !keyword.is_empty() && !config.search_columns.is_empty() {
        // instr() is a case-sensitive substring test; LIKE would fold ASCII case.
        let conditions = config
            .search_columns
            .iter()
            .map(|c| format!("instr({}, ?1) > 0", c))
            .collect::<Vec<_>>()
            .join(" OR ");
        sql.push_str(" WHERE ");
        sql.push_str(&conditions);
        params.push(Value::Text(keyword.to_string()));
    }
    sql.push_str(" ORDER BY id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            let mut obj = serde_json::Map::new();
            for (i, col) in config.display_columns.iter().enumerate() {
                let v: Value = row.get(i)?;
                obj.insert(col.to_string(), sql_to_json(&v));
            }
            Ok(serde_json::Value::Object(obj))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Listing {
        columns: config.display_columns.to_vec(),
        rows,
    })
}

/// Add-form descriptors with defaults filled in.
pub fn form(config: &EntityConfig, today: NaiveDate) -> Vec<FormField> {
    config
        .fields
        .iter()
        .map(|f| f.form_field(sql_to_json(&f.default_value(today))))
        .collect()
}

/// Inserts one row binding every configured field; returns the new id.
pub fn add(
    conn: &Connection,
    config: &EntityConfig,
    values: &serde_json::Map<String, serde_json::Value>,
    today: NaiveDate,
) -> Result<i64> {
    let bound = config
        .fields
        .iter()
        .map(|f| f.coerce(values.get(f.name), today))
        .collect::<Result<Vec<_>>>()?;

    let placeholders = vec!["?"; bound.len()].join(", ");
    let sql = format!(
        "INSERT INTO {}({}) VALUES({})",
        config.table,
        config.column_list(),
        placeholders
    );
    conn.execute(&sql, params_from_iter(bound.iter()))
        .map_err(|e| RecordError::from_write(config.table, e))?;

    let id = conn.last_insert_rowid();
    tracing::info!(table = config.table, id, "record added");
    Ok(id)
}

pub fn load_for_update(conn: &Connection, config: &EntityConfig, id: i64) -> Result<PendingEdit> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?",
        config.column_list(),
        config.table
    );
    let values = conn
        .query_row(&sql, [id], |row| {
            (0..config.fields.len())
                .map(|i| row.get::<_, Value>(i))
                .collect::<std::result::Result<Vec<_>, _>>()
        })
        .optional()?;
    let Some(values) = values else {
        return Err(RecordError::NotFound {
            table: config.table,
            id,
        });
    };
    Ok(PendingEdit {
        table: config.table,
        id,
        values,
    })
}

/// Edit-form descriptors pre-populated from the captured snapshot.
pub fn edit_form(config: &EntityConfig, pending: &PendingEdit, today: NaiveDate) -> Vec<FormField> {
    config
        .fields
        .iter()
        .zip(&pending.values)
        .map(|(f, v)| f.form_field(f.prefill(v, today)))
        .collect()
}

/// Overwrites every configured column of the captured row.
///
/// Fields absent from `changes` keep the snapshot value exactly as it was
/// stored. There is no conflict detection; the last write wins.
pub fn update(
    conn: &Connection,
    config: &EntityConfig,
    pending: PendingEdit,
    changes: &serde_json::Map<String, serde_json::Value>,
    today: NaiveDate,
) -> Result<i64> {
    if pending.table != config.table {
        return Err(RecordError::TableMismatch {
            expected: config.table,
            found: pending.table,
        });
    }

    let mut bound = Vec::with_capacity(config.fields.len() + 1);
    for (f, old) in config.fields.iter().zip(pending.values) {
        match changes.get(f.name) {
            Some(raw) => bound.push(f.coerce(Some(raw), today)?),
            None => bound.push(old),
        }
    }
    bound.push(Value::Integer(pending.id));

    let set_clause = config
        .fields
        .iter()
        .map(|f| format!("{} = ?", f.name))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {} SET {} WHERE id = ?", config.table, set_clause);
    let changed = conn
        .execute(&sql, params_from_iter(bound.iter()))
        .map_err(|e| RecordError::from_write(config.table, e))?;
    if changed == 0 {
        return Err(RecordError::NotFound {
            table: config.table,
            id: pending.id,
        });
    }

    tracing::info!(table = config.table, id = pending.id, "record updated");
    Ok(pending.id)
}

/// Removes one row. Nothing happens unless `confirmed` is set.
pub fn delete(conn: &Connection, config: &EntityConfig, id: i64, confirmed: bool) -> Result<()> {
    if !confirmed {
        return Err(RecordError::ConfirmationRequired {
            table: config.table,
            id,
        });
    }
    let sql = format!("DELETE FROM {} WHERE id = ?", config.table);
    let removed = conn.execute(&sql, [id])?;
    if removed == 0 {
        return Err(RecordError::NotFound {
            table: config.table,
            id,
        });
    }
    tracing::info!(table = config.table, id, "record deleted");
    Ok(())
}

pub fn count(conn: &Connection, config: &EntityConfig) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", config.table);
    Ok(conn.query_row(&sql, [], |r| r.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::field::InputKind;
    use super::*;
    use crate::db;
    use crate::entities::Entity;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        db::create_schema(&conn).expect("schema");
        conn
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).expect("date")
    }

    fn values(v: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        v.as_object().cloned().expect("object")
    }

    fn add_student(conn: &Connection, name: &str, roll_no: &str, age: i64) -> i64 {
        add(
            conn,
            Entity::Students.config(),
            &values(json!({
                "name": name,
                "roll_no": roll_no,
                "class": "8",
                "section": "B",
                "age": age,
                "phone": "555-0100"
            })),
            today(),
        )
        .expect("add student")
    }

    fn ids(listing: &Listing) -> Vec<i64> {
        listing
            .rows
            .iter()
            .map(|r| r["id"].as_i64().expect("id"))
            .collect()
    }

    #[test]
    fn empty_keyword_lists_everything_in_id_order() {
        let conn = setup();
        let a = add_student(&conn, "Asha", "R1", 14);
        let b = add_student(&conn, "Ben", "R2", 13);
        let c = add_student(&conn, "Chen", "R3", 15);

        let listing = search(&conn, Entity::Students.config(), "").expect("search");
        assert_eq!(ids(&listing), vec![a, b, c]);
        assert_eq!(
            listing.columns,
            vec!["id", "name", "roll_no", "class", "section", "age", "phone"]
        );
    }

    #[test]
    fn keyword_matches_any_search_column_case_sensitively() {
        let conn = setup();
        let asha = add_student(&conn, "Asha", "R1", 14);
        let _ben = add_student(&conn, "Ben", "R2", 13);
        let rashid = add_student(&conn, "Rashid", "X9", 12);

        let cfg = Entity::Students.config();
        assert_eq!(ids(&search(&conn, cfg, "R1").unwrap()), vec![asha]);
        // "sh" hits two names; "SH" hits none.
        assert_eq!(ids(&search(&conn, cfg, "sh").unwrap()), vec![asha, rashid]);
        assert!(search(&conn, cfg, "SH").unwrap().is_empty());
        // class and section are displayed but not searchable.
        assert!(search(&conn, cfg, "8").unwrap().is_empty());
        assert_eq!(search(&conn, cfg, "B").unwrap().rows.len(), 1);
    }

    #[test]
    fn keyword_is_bound_not_interpolated() {
        let conn = setup();
        add_student(&conn, "Asha", "R1", 14);
        let cfg = Entity::Students.config();
        let listing = search(&conn, cfg, "' OR 1=1 --").expect("search");
        assert!(listing.is_empty());
        let listing = search(&conn, cfg, "%").expect("search");
        assert!(listing.is_empty());
        assert_eq!(count(&conn, cfg).unwrap(), 1);
    }

    #[test]
    fn integer_search_columns_match_as_text() {
        let conn = setup();
        let cfg = Entity::Attendance.config();
        let a = add(
            &conn,
            cfg,
            &values(json!({ "student_id": 12, "date": "2024-05-02", "status": "Present" })),
            today(),
        )
        .unwrap();
        add(
            &conn,
            cfg,
            &values(json!({ "student_id": 3, "date": "2024-05-02", "status": "Absent" })),
            today(),
        )
        .unwrap();
        assert_eq!(ids(&search(&conn, cfg, "12").unwrap()), vec![a]);
        assert_eq!(search(&conn, cfg, "2024-05").unwrap().rows.len(), 2);
    }

    #[test]
    fn duplicate_unique_value_is_rejected_without_insert() {
        let conn = setup();
        add_student(&conn, "Asha", "R1", 14);
        let cfg = Entity::Students.config();
        let err = add(
            &conn,
            cfg,
            &values(json!({ "name": "Other", "roll_no": "R1", "age": 10 })),
            today(),
        )
        .unwrap_err();
        match err {
            RecordError::DuplicateKey { table, column } => {
                assert_eq!(table, "students");
                assert_eq!(column, "roll_no");
            }
            other => panic!("expected duplicate key, got {other:?}"),
        }
        assert_eq!(count(&conn, cfg).unwrap(), 1);
    }

    #[test]
    fn add_fills_defaults_for_missing_fields() {
        let conn = setup();
        let cfg = Entity::Fees.config();
        let id = add(&conn, cfg, &values(json!({ "student_id": 1 })), today()).unwrap();
        let pending = load_for_update(&conn, cfg, id).unwrap();
        assert_eq!(
            pending.to_json(cfg)["values"],
            json!({
                "student_id": 1,
                "amount": 0.0,
                "due_date": "2024-06-01",
                "status": ""
            })
        );
    }

    #[test]
    fn invalid_value_inserts_nothing() {
        let conn = setup();
        let cfg = Entity::Books.config();
        let err = add(
            &conn,
            cfg,
            &values(json!({ "title": "Dune", "isbn": "X1", "copies": 0 })),
            today(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "bad_params");
        assert_eq!(count(&conn, cfg).unwrap(), 0);
    }

    #[test]
    fn load_missing_id_is_not_found() {
        let conn = setup();
        let err = load_for_update(&conn, Entity::Students.config(), 9999).unwrap_err();
        assert!(matches!(
            err,
            RecordError::NotFound {
                table: "students",
                id: 9999
            }
        ));
    }

    #[test]
    fn update_without_changes_leaves_row_identical() {
        let conn = setup();
        let cfg = Entity::Students.config();
        let id = add_student(&conn, "Asha", "R1", 14);
        // Odd stored values must survive an untouched update.
        conn.execute("UPDATE students SET phone = NULL, age = 'n/a' WHERE id = ?", [id])
            .unwrap();
        let before: Vec<Value> = conn
            .query_row("SELECT * FROM students WHERE id = ?", [id], |r| {
                (0..7).map(|i| r.get::<_, Value>(i)).collect()
            })
            .unwrap();

        let pending = load_for_update(&conn, cfg, id).unwrap();
        update(&conn, cfg, pending, &serde_json::Map::new(), today()).unwrap();

        let after: Vec<Value> = conn
            .query_row("SELECT * FROM students WHERE id = ?", [id], |r| {
                (0..7).map(|i| r.get::<_, Value>(i)).collect()
            })
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn round_trip_add_search_update() {
        let conn = setup();
        let cfg = Entity::Students.config();
        add_student(&conn, "Ben", "R2", 13);
        let id = add(
            &conn,
            cfg,
            &values(json!({ "name": "Asha", "roll_no": "R1", "age": 14 })),
            today(),
        )
        .unwrap();

        let found = search(&conn, cfg, "R1").unwrap();
        assert_eq!(found.rows.len(), 1);
        assert_eq!(found.rows[0]["name"], json!("Asha"));
        assert_eq!(found.rows[0]["age"], json!(14));

        let pending = load_for_update(&conn, cfg, id).unwrap();
        update(&conn, cfg, pending, &values(json!({ "age": 15 })), today()).unwrap();

        let found = search(&conn, cfg, "R1").unwrap();
        assert_eq!(
            found.rows,
            vec![json!({
                "id": id,
                "name": "Asha",
                "roll_no": "R1",
                "class": "",
                "section": "",
                "age": 15,
                "phone": ""
            })]
        );
    }

    #[test]
    fn update_after_row_vanished_is_not_found() {
        let conn = setup();
        let cfg = Entity::Teachers.config();
        let id = add(
            &conn,
            cfg,
            &values(json!({ "name": "Ms Rao", "teacher_id": "T1" })),
            today(),
        )
        .unwrap();
        let pending = load_for_update(&conn, cfg, id).unwrap();
        delete(&conn, cfg, id, true).unwrap();
        let err = update(&conn, cfg, pending, &serde_json::Map::new(), today()).unwrap_err();
        assert!(matches!(err, RecordError::NotFound { .. }));
    }

    #[test]
    fn update_into_existing_unique_value_is_duplicate() {
        let conn = setup();
        let cfg = Entity::Books.config();
        add(&conn, cfg, &values(json!({ "title": "A", "isbn": "I1" })), today()).unwrap();
        let b = add(&conn, cfg, &values(json!({ "title": "B", "isbn": "I2" })), today()).unwrap();
        let pending = load_for_update(&conn, cfg, b).unwrap();
        let err = update(&conn, cfg, pending, &values(json!({ "isbn": "I1" })), today()).unwrap_err();
        assert_eq!(err.code(), "duplicate_key");
        let stored: String = conn
            .query_row("SELECT isbn FROM books WHERE id = ?", [b], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, "I2");
    }

    #[test]
    fn pending_edit_for_other_table_is_rejected() {
        let conn = setup();
        let id = add_student(&conn, "Asha", "R1", 14);
        let pending = load_for_update(&conn, Entity::Students.config(), id).unwrap();
        let err = update(
            &conn,
            Entity::Teachers.config(),
            pending,
            &serde_json::Map::new(),
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::TableMismatch { .. }));
    }

    #[test]
    fn delete_requires_confirmation_and_removes_only_target() {
        let conn = setup();
        let cfg = Entity::Students.config();
        let a = add_student(&conn, "Asha", "R1", 14);
        let b = add_student(&conn, "Ben", "R2", 13);

        let err = delete(&conn, cfg, a, false).unwrap_err();
        assert_eq!(err.code(), "confirmation_required");
        assert_eq!(count(&conn, cfg).unwrap(), 2);

        delete(&conn, cfg, a, true).unwrap();
        assert_eq!(ids(&search(&conn, cfg, "").unwrap()), vec![b]);

        let err = delete(&conn, cfg, a, true).unwrap_err();
        assert!(matches!(err, RecordError::NotFound { .. }));
    }

    #[test]
    fn delete_does_not_cascade() {
        let conn = setup();
        let sid = add_student(&conn, "Asha", "R1", 14);
        let fees = Entity::Fees.config();
        add(
            &conn,
            fees,
            &values(json!({ "student_id": sid, "amount": 120.5, "status": "Paid" })),
            today(),
        )
        .unwrap();
        delete(&conn, Entity::Students.config(), sid, true).unwrap();
        assert_eq!(count(&conn, fees).unwrap(), 1);
    }

    #[test]
    fn edit_form_prefills_from_snapshot() {
        let conn = setup();
        let cfg = Entity::Exams.config();
        let id = add(
            &conn,
            cfg,
            &values(json!({
                "exam_name": "Midterm",
                "subject": "Maths",
                "class": "8",
                "exam_date": "2024-03-11",
                "max_marks": 100
            })),
            today(),
        )
        .unwrap();
        let pending = load_for_update(&conn, cfg, id).unwrap();
        let fields = edit_form(cfg, &pending, today());
        let by_name = |n: &str| fields.iter().find(|f| f.name == n).expect("field").clone();
        assert_eq!(by_name("exam_date").value, json!("2024-03-11"));
        assert_eq!(by_name("exam_date").input, InputKind::Date);
        assert_eq!(by_name("max_marks").value, json!(100));
        assert_eq!(by_name("exam_name").value, json!("Midterm"));
    }

    #[test]
    fn add_form_uses_defaults() {
        let fields = form(Entity::Fees.config(), today());
        let names: Vec<_> = fields.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["student_id", "amount", "due_date", "status"]);
        assert_eq!(fields[1].min, Some(json!(0.0)));
        assert_eq!(fields[0].min, Some(json!(1)));
        assert_eq!(fields[2].value, json!("2024-06-01"));
    }
}
