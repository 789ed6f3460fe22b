use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

pub const PROFILE: &str = "profile";
pub const FOOD_ITEM: &str = "food_item";
pub const FOOD_LOG: &str = "food_log";

/// One audit entry as surfaced to clients: who changed the record, when, and
/// which fields differed from the next-older snapshot (previous values).
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub changed_by: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub change_date: OffsetDateTime,
    pub old_values: Map<String, Value>,
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    changed_by: Option<String>,
    changed_at: OffsetDateTime,
    data: Value,
}

/// Append a full-row snapshot. Runs inside the caller's transaction so the
/// snapshot commits or rolls back with the live-row write.
pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    entity_type: &str,
    entity_id: Uuid,
    changed_by: Option<Uuid>,
    data: Value,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO history_snapshots (entity_type, entity_id, changed_by, data)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(entity_type)
    .bind(entity_id)
    .bind(changed_by)
    .bind(data)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Load the audit trail for one entity, newest first. Diffs are computed
/// here, on read; only full snapshots are stored.
pub async fn for_entity(
    db: &PgPool,
    entity_type: &str,
    entity_id: Uuid,
) -> Result<Vec<HistoryEntry>, ApiError> {
    let rows = sqlx::query_as::<_, SnapshotRow>(
        r#"
        SELECT u.username AS changed_by, h.changed_at, h.data
        FROM history_snapshots h
        LEFT JOIN users u ON u.id = h.changed_by
        WHERE h.entity_type = $1 AND h.entity_id = $2
        ORDER BY h.changed_at ASC, h.id ASC
        "#,
    )
    .bind(entity_type)
    .bind(entity_id)
    .fetch_all(db)
    .await?;

    let mut entries: Vec<HistoryEntry> = Vec::with_capacity(rows.len());
    let mut previous: Option<&Value> = None;
    for row in &rows {
        let old_values = match previous {
            Some(prev) => old_values(prev, &row.data),
            None => Map::new(),
        };
        entries.push(HistoryEntry {
            changed_by: row.changed_by.clone(),
            change_date: row.changed_at,
            old_values,
        });
        previous = Some(&row.data);
    }
    entries.reverse();
    Ok(entries)
}

/// Fields whose value changed between two snapshots, mapped to the value
/// they held in the older one.
fn old_values(older: &Value, newer: &Value) -> Map<String, Value> {
    let (Some(older), Some(newer)) = (older.as_object(), newer.as_object()) else {
        return Map::new();
    };
    let mut changed = Map::new();
    for (field, old) in older {
        if newer.get(field) != Some(old) {
            changed.insert(field.clone(), old.clone());
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn old_values_reports_only_changed_fields() {
        let older = json!({"name": "Oats", "calories_per_unit": "389.00", "fats_per_unit": "6.90"});
        let newer = json!({"name": "Rolled oats", "calories_per_unit": "389.00", "fats_per_unit": "6.50"});
        let diff = old_values(&older, &newer);
        assert_eq!(diff.len(), 2);
        assert_eq!(diff["name"], json!("Oats"));
        assert_eq!(diff["fats_per_unit"], json!("6.90"));
        assert!(!diff.contains_key("calories_per_unit"));
    }

    #[test]
    fn old_values_empty_when_nothing_changed() {
        let snapshot = json!({"name": "Oats", "calories_per_unit": "389.00"});
        assert!(old_values(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn old_values_includes_removed_fields() {
        let older = json!({"name": "Oats", "notes": "bulk"});
        let newer = json!({"name": "Oats"});
        let diff = old_values(&older, &newer);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff["notes"], json!("bulk"));
    }

    #[test]
    fn first_goals_change_diffs_against_registration_snapshot() {
        // Registration seeds a zero-goal snapshot, so the first update has
        // something to diff against.
        let initial =
            json!({"calorie_goal": 0, "carbs_goal": 0, "protein_goal": 0, "fat_goal": 0});
        let updated =
            json!({"calorie_goal": 2000, "carbs_goal": 0, "protein_goal": 150, "fat_goal": 0});
        let diff = old_values(&initial, &updated);
        assert_eq!(diff.len(), 2);
        assert_eq!(diff["calorie_goal"], json!(0));
        assert_eq!(diff["protein_goal"], json!(0));
    }

    #[test]
    fn entry_sequence_diffs_against_next_older() {
        // Three snapshots, oldest to newest; the serialized trail is newest
        // first with the oldest entry carrying an empty change set.
        let snapshots = [
            json!({"name": "Oats", "calories_per_unit": "389.00"}),
            json!({"name": "Oats", "calories_per_unit": "380.00"}),
            json!({"name": "Rolled oats", "calories_per_unit": "380.00"}),
        ];
        let mut entries = Vec::new();
        let mut previous: Option<&Value> = None;
        for snap in &snapshots {
            entries.push(match previous {
                Some(prev) => old_values(prev, snap),
                None => Map::new(),
            });
            previous = Some(snap);
        }
        entries.reverse();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["name"], json!("Oats"));
        assert_eq!(entries[1]["calories_per_unit"], json!("389.00"));
        assert!(entries[2].is_empty());
    }
}
