use crate::config::TransactionMode;
use crate::context::{HandleError, HandleResult, PersistenceHandle};
use crate::db::DbResult;
use crate::model::entity::{validate_entity, Entity, EntityId};
use log::{debug, warn};
use rusqlite::{params, Connection, Row};
use std::marker::PhantomData;
use uuid::Uuid;

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 500;

/// Paging options for `SqliteContext::list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityListQuery {
    /// Maximum rows to return. Defaults to 50 and clamps to 500.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// One SQLite connection with an open transaction, bound to entity type `E`.
///
/// Writes become visible to other handles only after `save_changes` or a
/// flushing `release`.
pub struct SqliteContext<E: Entity> {
    conn: Connection,
    mode: TransactionMode,
    flush_on_release: bool,
    pending_writes: usize,
    released: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqliteContext<E> {
    pub(crate) fn begin(conn: Connection, mode: TransactionMode) -> DbResult<Self> {
        conn.execute_batch(mode.begin_sql())?;
        Ok(Self {
            conn,
            mode,
            flush_on_release: false,
            pending_writes: 0,
            released: false,
            _entity: PhantomData,
        })
    }

    /// Inserts a new entity.
    ///
    /// # Errors
    /// - `Validation` when the entity fails its write-path checks.
    /// - `Duplicate` when an entity with the same id already exists.
    pub fn insert(&mut self, entity: &E) -> HandleResult<EntityId> {
        validate_entity(entity)?;
        self.ensure_transaction()?;
        let id = entity.id();
        let body = serde_json::to_string(entity)?;

        let changed = self.conn.execute(
            "INSERT INTO entities (kind, id, body)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (kind, id) DO NOTHING;",
            params![E::KIND, id.to_string(), body],
        )?;
        if changed == 0 {
            return Err(HandleError::Duplicate { kind: E::KIND, id });
        }

        self.pending_writes += 1;
        Ok(id)
    }

    /// Replaces the body of an existing entity.
    pub fn update(&mut self, entity: &E) -> HandleResult<()> {
        validate_entity(entity)?;
        self.ensure_transaction()?;
        let id = entity.id();
        let body = serde_json::to_string(entity)?;

        let changed = self.conn.execute(
            "UPDATE entities
             SET
                body = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE kind = ?1 AND id = ?2;",
            params![E::KIND, id.to_string(), body],
        )?;
        if changed == 0 {
            return Err(HandleError::NotFound { kind: E::KIND, id });
        }

        self.pending_writes += 1;
        Ok(())
    }

    /// Inserts the entity or replaces its body when it already exists.
    pub fn upsert(&mut self, entity: &E) -> HandleResult<EntityId> {
        validate_entity(entity)?;
        self.ensure_transaction()?;
        let id = entity.id();
        let body = serde_json::to_string(entity)?;

        self.conn.execute(
            "INSERT INTO entities (kind, id, body)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (kind, id) DO UPDATE SET
                body = excluded.body,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![E::KIND, id.to_string(), body],
        )?;

        self.pending_writes += 1;
        Ok(id)
    }

    pub fn get(&self, id: EntityId) -> HandleResult<Option<E>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, body
             FROM entities
             WHERE kind = ?1 AND id = ?2;",
        )?;

        let mut rows = stmt.query(params![E::KIND, id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entity_row(row)?));
        }

        Ok(None)
    }

    /// Lists entities sorted by `updated_at DESC, id ASC`.
    pub fn list(&self, query: &EntityListQuery) -> HandleResult<Vec<E>> {
        let limit = normalize_list_limit(query.limit);
        let mut stmt = self.conn.prepare(
            "SELECT id, body
             FROM entities
             WHERE kind = ?1
             ORDER BY updated_at DESC, id ASC
             LIMIT ?2 OFFSET ?3;",
        )?;

        let mut rows = stmt.query(params![
            E::KIND,
            i64::from(limit),
            i64::from(query.offset)
        ])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(parse_entity_row(row)?);
        }

        Ok(entities)
    }

    pub fn count(&self) -> HandleResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entities WHERE kind = ?1;",
            [E::KIND],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| HandleError::InvalidData(format!("negative row count {count}")))
    }

    /// Hard-deletes one entity.
    pub fn remove(&mut self, id: EntityId) -> HandleResult<()> {
        self.ensure_transaction()?;
        let changed = self.conn.execute(
            "DELETE FROM entities WHERE kind = ?1 AND id = ?2;",
            params![E::KIND, id.to_string()],
        )?;
        if changed == 0 {
            return Err(HandleError::NotFound { kind: E::KIND, id });
        }

        self.pending_writes += 1;
        Ok(())
    }

    /// Commits accumulated changes now and opens a fresh transaction, so the
    /// handle stays usable.
    ///
    /// If the fresh transaction cannot be opened the commit still stands and
    /// the next write retries `BEGIN`, so no later write escapes release.
    pub fn save_changes(&mut self) -> HandleResult<usize> {
        let saved = self.pending_writes;
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT;")?;
        }
        self.pending_writes = 0;
        debug!(
            "event=context_save module=store status=ok kind={} writes={}",
            E::KIND,
            saved
        );

        self.ensure_transaction()?;
        Ok(saved)
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending_writes > 0
    }

    /// Number of writes since the last commit.
    pub fn pending_writes(&self) -> usize {
        self.pending_writes
    }
}

impl<E: Entity> SqliteContext<E> {
    /// Reopens the unit-of-work transaction when the connection fell back to
    /// autocommit. Every write path calls this first.
    fn ensure_transaction(&mut self) -> HandleResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch(self.mode.begin_sql())?;
        }
        Ok(())
    }
}

impl<E: Entity> PersistenceHandle for SqliteContext<E> {
    fn flush_on_release(&self) -> bool {
        self.flush_on_release
    }

    fn set_flush_on_release(&mut self, flush: bool) {
        self.flush_on_release = flush;
    }

    fn release(mut self) -> HandleResult<()> {
        self.released = true;
        if self.conn.is_autocommit() {
            return Ok(());
        }

        let action = if self.flush_on_release {
            "commit"
        } else {
            "rollback"
        };
        let sql = if self.flush_on_release {
            "COMMIT;"
        } else {
            "ROLLBACK;"
        };
        self.conn.execute_batch(sql)?;

        debug!(
            "event=context_release module=store status=ok kind={} action={} writes={}",
            E::KIND,
            action,
            self.pending_writes
        );
        Ok(())
    }
}

impl<E: Entity> Drop for SqliteContext<E> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            "event=context_drop module=store status=error kind={} error_code=handle_not_released writes={}",
            E::KIND,
            self.pending_writes
        );
        if !self.conn.is_autocommit() {
            let _ = self.conn.execute_batch("ROLLBACK;");
        }
    }
}

fn parse_entity_row<E: Entity>(row: &Row<'_>) -> HandleResult<E> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        HandleError::InvalidData(format!("invalid uuid value `{id_text}` in entities.id"))
    })?;

    let body: String = row.get("body")?;
    let entity: E = serde_json::from_str(&body).map_err(|err| {
        HandleError::InvalidData(format!(
            "invalid {} body for `{id}` in entities.body: {err}",
            E::KIND
        ))
    })?;

    if entity.id() != id {
        return Err(HandleError::InvalidData(format!(
            "{} body id `{}` does not match row id `{id}`",
            E::KIND,
            entity.id()
        )));
    }
    Ok(entity)
}

fn normalize_list_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => DEFAULT_LIST_LIMIT,
        Some(value) => value.min(MAX_LIST_LIMIT),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_list_limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
    use crate::config::StoreConfig;
    use crate::context::{HandleFactory, PersistenceHandle};
    use crate::model::entity::{Entity, EntityId};
    use crate::store::SqliteContextFactory;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Serialize, Deserialize)]
    struct Ticket {
        id: EntityId,
    }

    impl Entity for Ticket {
        const KIND: &'static str = "ticket";

        fn id(&self) -> EntityId {
            self.id
        }
    }

    fn ticket() -> Ticket {
        Ticket { id: Uuid::new_v4() }
    }

    #[test]
    fn writes_after_lost_transaction_stay_inside_the_unit_of_work() {
        let dir = tempfile::tempdir().unwrap();
        let factory =
            SqliteContextFactory::<Ticket>::new(StoreConfig::new(dir.path().join("t.db")).unwrap());

        let mut ctx = factory.create().unwrap();
        ctx.insert(&ticket()).unwrap();
        // Same state save_changes leaves behind when its re-BEGIN fails.
        ctx.conn.execute_batch("COMMIT;").unwrap();
        ctx.pending_writes = 0;
        assert!(ctx.conn.is_autocommit());

        ctx.insert(&ticket()).unwrap();
        assert!(!ctx.conn.is_autocommit());
        assert_eq!(ctx.pending_writes(), 1);
        ctx.release().unwrap();

        let reader = factory.create().unwrap();
        assert_eq!(reader.count().unwrap(), 1);
        reader.release().unwrap();
    }

    #[test]
    fn remove_after_lost_transaction_is_rolled_back_on_release() {
        let dir = tempfile::tempdir().unwrap();
        let factory =
            SqliteContextFactory::<Ticket>::new(StoreConfig::new(dir.path().join("t.db")).unwrap());
        let kept = ticket();

        let mut writer = factory.create().unwrap();
        writer.set_flush_on_release(true);
        writer.insert(&kept).unwrap();
        writer.release().unwrap();

        let mut ctx = factory.create().unwrap();
        ctx.conn.execute_batch("COMMIT;").unwrap();
        ctx.remove(kept.id).unwrap();
        ctx.release().unwrap();

        let reader = factory.create().unwrap();
        assert!(reader.get(kept.id).unwrap().is_some());
        reader.release().unwrap();
    }

    #[test]
    fn list_limit_defaults_and_clamps() {
        assert_eq!(normalize_list_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(normalize_list_limit(Some(0)), DEFAULT_LIST_LIMIT);
        assert_eq!(normalize_list_limit(Some(7)), 7);
        assert_eq!(normalize_list_limit(Some(10_000)), MAX_LIST_LIMIT);
    }
}
