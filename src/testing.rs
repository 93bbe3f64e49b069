//! In-memory collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::{
    catalog::{CatalogItem, Food},
    codes::CodeLookup,
    compositions::{Composition, CompositionStore, FoodResolver},
    lifecycle::{ChildWrite, Clock, Entity, IdGenerator, Store},
};

pub struct FixedClock(Mutex<OffsetDateTime>);

impl FixedClock {
    pub fn at(unix: i64) -> Self {
        let now = OffsetDateTime::from_unix_timestamp(unix).unwrap();
        Self(Mutex::new(now))
    }

    pub fn advance(&self, secs: i64) {
        *self.0.lock().unwrap() += Duration::seconds(secs);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.lock().unwrap()
    }
}

/// Hands out `prefix-1`, `prefix-2`, ...
pub struct SequentialIds {
    prefix: &'static str,
    next: AtomicUsize,
}

impl SequentialIds {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicUsize::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn new_extid(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}-{n}", self.prefix)
    }
}

/// Vec-backed store. Counts batch lookups so tests can assert on them.
pub struct MemoryStore<E> {
    items: Mutex<Vec<E>>,
    lookups: AtomicUsize,
}

impl<E> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::with(Vec::new())
    }
}

impl<E> MemoryStore<E> {
    pub fn with(items: Vec<E>) -> Self {
        Self {
            items: Mutex::new(items),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl<E: Entity> MemoryStore<E> {
    fn active_where(&self, keep: impl Fn(&E) -> bool) -> Vec<E> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.record().active.is_active() && keep(e))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl<E: Entity> Store<E> for MemoryStore<E> {
    async fn insert(&self, entity: &E) -> anyhow::Result<()> {
        self.items.lock().unwrap().push(entity.clone());
        Ok(())
    }

    async fn find_by_extid(&self, extid: &str) -> anyhow::Result<Option<E>> {
        let items = self.items.lock().unwrap();
        Ok(items.iter().find(|e| e.record().extid == extid).cloned())
    }

    async fn save(&self, entity: &E, _children: ChildWrite) -> anyhow::Result<()> {
        let mut items = self.items.lock().unwrap();
        let slot = items
            .iter_mut()
            .find(|e| e.record().extid == entity.record().extid)
            .ok_or_else(|| anyhow::anyhow!("no row {}", entity.record().extid))?;
        *slot = entity.clone();
        Ok(())
    }

    async fn list_active(&self) -> anyhow::Result<Vec<E>> {
        Ok(self.active_where(|_| true))
    }
}

#[async_trait]
impl<E: CatalogItem> CodeLookup for MemoryStore<E> {
    async fn code_exists(&self, code: &str) -> anyhow::Result<bool> {
        let items = self.items.lock().unwrap();
        Ok(items
            .iter()
            .any(|e| e.record().deleted_at.is_none() && e.code() == code))
    }
}

#[async_trait]
impl FoodResolver for MemoryStore<Food> {
    async fn resolve_foods(&self, extids: &[String]) -> anyhow::Result<Vec<Food>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.active_where(|f| extids.contains(&f.record.extid)))
    }
}

#[async_trait]
impl CompositionStore for MemoryStore<Composition> {
    async fn list_active_by_user(&self, user_extid: &str) -> anyhow::Result<Vec<Composition>> {
        Ok(self.active_where(|c| c.user_extid.as_deref() == Some(user_extid)))
    }
}
