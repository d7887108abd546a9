use crate::config::StoreConfig;
use crate::context::{HandleError, HandleFactory, HandleResult};
use crate::db::open_db;
use crate::model::entity::{validate_kind, Entity};
use crate::store::context::SqliteContext;
use log::{debug, error};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::time::Instant;

/// Opens one SQLite connection and transaction per created handle.
pub struct SqliteContextFactory<E: Entity> {
    config: StoreConfig,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqliteContextFactory<E> {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            _entity: PhantomData,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl<E: Entity> Clone for SqliteContextFactory<E> {
    fn clone(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl<E: Entity> Debug for SqliteContextFactory<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteContextFactory")
            .field("kind", &E::KIND)
            .field("config", &self.config)
            .finish()
    }
}

impl<E: Entity> HandleFactory for SqliteContextFactory<E> {
    type Handle = SqliteContext<E>;

    fn create(&self) -> HandleResult<SqliteContext<E>> {
        let started_at = Instant::now();
        let mode = self.config.transaction_mode();

        let opened = validate_kind(E::KIND)
            .map_err(HandleError::creation)
            .and_then(|()| open_db(&self.config).map_err(HandleError::creation))
            .and_then(|conn| SqliteContext::begin(conn, mode).map_err(HandleError::creation));

        match opened {
            Ok(context) => {
                debug!(
                    "event=context_open module=store status=ok kind={} mode={} duration_ms={}",
                    E::KIND,
                    mode.as_str(),
                    started_at.elapsed().as_millis()
                );
                Ok(context)
            }
            Err(err) => {
                error!(
                    "event=context_open module=store status=error kind={} mode={} duration_ms={} error={}",
                    E::KIND,
                    mode.as_str(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}
