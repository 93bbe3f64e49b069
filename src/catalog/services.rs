use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    codes::{self, CodeLookup},
    error::{Error, Result},
    lifecycle::{Clock, IdGenerator, LifecycleManager},
};

use super::{CatalogItem, CatalogStore};

pub struct CatalogService<E: CatalogItem> {
    lifecycle: LifecycleManager<E, dyn CatalogStore<E>>,
}

impl<E: CatalogItem> Clone for CatalogService<E> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
        }
    }
}

impl<E: CatalogItem> CatalogService<E> {
    pub fn new(store: Arc<dyn CatalogStore<E>>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            lifecycle: LifecycleManager::new(store, clock, ids),
        }
    }

    /// Creates the item, generating a code when the draft has none.
    /// A supplied code must not collide with a live item.
    #[instrument(skip_all, fields(entity = E::NAME))]
    pub async fn create(&self, draft: E::Draft) -> Result<E> {
        let mut item = E::from_draft(draft)?;
        let store = self.lifecycle.store();

        if item.code().trim().is_empty() {
            let code = codes::generate_unique(&item.code_source(), store).await?;
            info!(%code, "auto-generated {} code", E::NAME);
            item.set_code(code);
        } else {
            let supplied = codes::normalize_supplied(item.code())?;
            if store.code_exists(&supplied).await? {
                return Err(Error::invalid("code", format!("{supplied} is already in use")));
            }
            item.set_code(supplied);
        }

        self.lifecycle.create(item).await
    }

    pub async fn update(&self, extid: &str, patch: E::Patch) -> Result<E> {
        E::check_patch(&patch)?;
        self.lifecycle.update(extid, patch).await
    }

    pub async fn delete(&self, extid: &str) -> Result<E> {
        self.lifecycle.delete(extid).await
    }

    pub async fn get(&self, extid: &str) -> Result<E> {
        self.lifecycle.get(extid).await
    }

    pub async fn list_active(&self) -> Result<Vec<E>> {
        self.lifecycle.list_active().await
    }
}
