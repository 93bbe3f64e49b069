//! Identity, timestamps and soft-delete state shared by every catalog and
//! composition entity.
//!
//! The only state transition is `ACTIVE -> INACTIVE` (soft delete). Records
//! are never removed and never reactivated.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Active {
    Active,
    Inactive,
}

impl Active {
    /// Column value: 1 active, 0 inactive.
    pub fn as_i16(self) -> i16 {
        match self {
            Active::Active => 1,
            Active::Inactive => 0,
        }
    }

    pub fn from_i16(v: i16) -> Self {
        if v == 0 {
            Active::Inactive
        } else {
            Active::Active
        }
    }

    pub fn is_active(self) -> bool {
        self == Active::Active
    }
}

/// Lifecycle header carried by every entity and every ingredient row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub extid: String,
    pub active: Active,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl Record {
    /// Placeholder header for an entity that has not been created yet.
    /// `LifecycleManager::create` overwrites every field.
    pub fn unsaved() -> Self {
        Self {
            extid: String::new(),
            active: Active::Active,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        !self.active.is_active() || self.deleted_at.is_some()
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

pub trait IdGenerator: Send + Sync {
    fn new_extid(&self) -> String;
}

pub struct UuidV4;

impl IdGenerator for UuidV4 {
    fn new_extid(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Hands out fresh headers that all share one instant.
pub struct Stamper<'a> {
    now: OffsetDateTime,
    ids: &'a dyn IdGenerator,
}

impl<'a> Stamper<'a> {
    pub fn now(&self) -> OffsetDateTime {
        self.now
    }

    pub fn fresh(&self) -> Record {
        Record {
            extid: self.ids.new_extid(),
            active: Active::Active,
            created_at: self.now,
            updated_at: self.now,
            deleted_at: None,
        }
    }
}

/// One field of a partial update.
///
/// In JSON both an omitted field and an explicit `null` read as `Keep`;
/// only a concrete value overwrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T> {
    Keep,
    Set(T),
}

impl<T> Default for Change<T> {
    fn default() -> Self {
        Change::Keep
    }
}

impl<T> Change<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Change::Set(_))
    }

    pub fn apply_to(self, slot: &mut T) {
        if let Change::Set(v) = self {
            *slot = v;
        }
    }

    /// For nullable columns: a set value always lands as `Some`.
    pub fn apply_to_option(self, slot: &mut Option<T>) {
        if let Change::Set(v) = self {
            *slot = Some(v);
        }
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Change::Set(v) => Some(v),
            Change::Keep => None,
        }
    }
}

impl<T> From<Option<T>> for Change<T> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Change::Keep, Change::Set)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Change<T> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(d).map(Change::from)
    }
}

/// What a save has to do with an entity's owned child rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildWrite {
    Keep,
    /// Delete every existing child row, then insert the current ones,
    /// in the same transaction as the parent update.
    Replace,
}

pub trait Entity: Clone + Send + Sync + 'static {
    type Patch: Send;

    /// Name used in logs and `NotFound` errors.
    const NAME: &'static str;

    fn record(&self) -> &Record;
    fn record_mut(&mut self) -> &mut Record;

    /// Gives owned child rows their own header on create.
    fn stamp_children(&mut self, _stamper: &Stamper<'_>) {}

    fn apply_patch(&mut self, patch: Self::Patch, stamper: &Stamper<'_>) -> ChildWrite;
}

/// Persistence collaborator for one entity type.
#[async_trait]
pub trait Store<E: Entity>: Send + Sync {
    async fn insert(&self, entity: &E) -> anyhow::Result<()>;
    /// Finds active and inactive records alike.
    async fn find_by_extid(&self, extid: &str) -> anyhow::Result<Option<E>>;
    async fn save(&self, entity: &E, children: ChildWrite) -> anyhow::Result<()>;
    async fn list_active(&self) -> anyhow::Result<Vec<E>>;
}

pub struct LifecycleManager<E: Entity, S: Store<E> + ?Sized = dyn Store<E>> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, S: Store<E> + ?Sized> Clone for LifecycleManager<E, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            ids: self.ids.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, S: Store<E> + ?Sized> LifecycleManager<E, S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            store,
            clock,
            ids,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn stamper(&self) -> Stamper<'_> {
        Stamper {
            now: self.clock.now(),
            ids: self.ids.as_ref(),
        }
    }

    pub async fn create(&self, mut entity: E) -> Result<E> {
        let stamper = self.stamper();
        *entity.record_mut() = stamper.fresh();
        entity.stamp_children(&stamper);

        self.store.insert(&entity).await?;
        info!(extid = %entity.record().extid, "{} created", E::NAME);
        Ok(entity)
    }

    pub async fn get(&self, extid: &str) -> Result<E> {
        self.store
            .find_by_extid(extid)
            .await?
            .ok_or_else(|| Error::not_found(E::NAME, extid))
    }

    pub async fn list_active(&self) -> Result<Vec<E>> {
        Ok(self.store.list_active().await?)
    }

    /// Partial update. Inactive records can still be updated.
    pub async fn update(&self, extid: &str, patch: E::Patch) -> Result<E> {
        let Some(mut entity) = self.store.find_by_extid(extid).await? else {
            warn!(%extid, "{} not found for update", E::NAME);
            return Err(Error::not_found(E::NAME, extid));
        };

        let stamper = self.stamper();
        let children = entity.apply_patch(patch, &stamper);
        entity.record_mut().updated_at = stamper.now();

        self.store.save(&entity, children).await?;
        info!(%extid, replaced_children = (children == ChildWrite::Replace), "{} updated", E::NAME);
        Ok(entity)
    }

    /// Soft delete. A second delete of the same record is `NotFound` and
    /// leaves the first `deleted_at` in place.
    pub async fn delete(&self, extid: &str) -> Result<E> {
        let mut entity = match self.store.find_by_extid(extid).await? {
            Some(e) if !e.record().is_deleted() => e,
            Some(_) => {
                warn!(%extid, "{} already deleted", E::NAME);
                return Err(Error::not_found(E::NAME, extid));
            }
            None => {
                warn!(%extid, "{} not found for delete", E::NAME);
                return Err(Error::not_found(E::NAME, extid));
            }
        };

        let record = entity.record_mut();
        record.active = Active::Inactive;
        record.deleted_at = Some(self.clock.now());

        self.store.save(&entity, ChildWrite::Keep).await?;
        info!(%extid, "{} deleted", E::NAME);
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedClock, MemoryStore, SequentialIds};

    #[derive(Debug, Clone)]
    struct Note {
        record: Record,
        text: String,
        tag: Option<String>,
    }

    struct NotePatch {
        text: Change<String>,
        tag: Change<String>,
    }

    impl Entity for Note {
        type Patch = NotePatch;
        const NAME: &'static str = "Note";

        fn record(&self) -> &Record {
            &self.record
        }
        fn record_mut(&mut self) -> &mut Record {
            &mut self.record
        }
        fn apply_patch(&mut self, patch: NotePatch, _stamper: &Stamper<'_>) -> ChildWrite {
            patch.text.apply_to(&mut self.text);
            patch.tag.apply_to_option(&mut self.tag);
            ChildWrite::Keep
        }
    }

    fn note(text: &str) -> Note {
        Note {
            record: Record::unsaved(),
            text: text.into(),
            tag: Some("keep-me".into()),
        }
    }

    fn manager() -> (LifecycleManager<Note>, Arc<MemoryStore<Note>>, Arc<FixedClock>) {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(FixedClock::at(1_700_000_000));
        let lm = LifecycleManager::new(
            store.clone() as Arc<dyn Store<Note>>,
            clock.clone() as Arc<dyn Clock>,
            Arc::new(SequentialIds::new("note")),
        );
        (lm, store, clock)
    }

    #[tokio::test]
    async fn create_assigns_identity_and_timestamps() {
        let (lm, _, clock) = manager();
        let created = lm.create(note("hello")).await.unwrap();

        assert_eq!(created.record.extid, "note-1");
        assert_eq!(created.record.active, Active::Active);
        assert_eq!(created.record.created_at, clock.now());
        assert_eq!(created.record.updated_at, clock.now());
        assert!(created.record.deleted_at.is_none());
    }

    #[tokio::test]
    async fn update_overwrites_only_set_fields() {
        let (lm, _, clock) = manager();
        let created = lm.create(note("hello")).await.unwrap();
        clock.advance(60);

        let patch = NotePatch {
            text: Change::Set("bye".into()),
            tag: Change::Keep,
        };
        let updated = lm.update(&created.record.extid, patch).await.unwrap();

        assert_eq!(updated.text, "bye");
        assert_eq!(updated.tag.as_deref(), Some("keep-me"));
        assert_eq!(updated.record.created_at, created.record.created_at);
        assert_eq!(updated.record.updated_at, clock.now());
        assert_eq!(lm.get("note-1").await.unwrap().text, "bye");
    }

    #[tokio::test]
    async fn update_of_unknown_extid_is_not_found() {
        let (lm, _, _) = manager();
        let patch = NotePatch {
            text: Change::Keep,
            tag: Change::Keep,
        };
        let err = lm.update("nope", patch).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Note", .. }));
    }

    #[tokio::test]
    async fn delete_is_soft_and_hides_from_active_listing() {
        let (lm, store, clock) = manager();
        let a = lm.create(note("a")).await.unwrap();
        lm.create(note("b")).await.unwrap();
        clock.advance(5);

        let deleted = lm.delete(&a.record.extid).await.unwrap();
        assert_eq!(deleted.record.active, Active::Inactive);
        assert_eq!(deleted.record.deleted_at, Some(clock.now()));

        let active: Vec<String> = lm
            .list_active()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.text)
            .collect();
        assert_eq!(active, vec!["b".to_string()]);

        // still readable by extid
        assert_eq!(store.len(), 2);
        assert_eq!(lm.get(&a.record.extid).await.unwrap().record.active, Active::Inactive);
    }

    #[tokio::test]
    async fn second_delete_is_not_found_and_keeps_first_stamp() {
        let (lm, _, clock) = manager();
        let a = lm.create(note("a")).await.unwrap();
        let first = lm.delete(&a.record.extid).await.unwrap().record.deleted_at;
        clock.advance(60);

        let err = lm.delete(&a.record.extid).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(lm.get(&a.record.extid).await.unwrap().record.deleted_at, first);
    }

    #[tokio::test]
    async fn deleted_records_can_still_be_updated() {
        let (lm, _, _) = manager();
        let a = lm.create(note("a")).await.unwrap();
        lm.delete(&a.record.extid).await.unwrap();

        let patch = NotePatch {
            text: Change::Set("edited".into()),
            tag: Change::Keep,
        };
        let updated = lm.update(&a.record.extid, patch).await.unwrap();
        assert_eq!(updated.record.active, Active::Inactive);
        assert_eq!(updated.text, "edited");
    }

    #[test]
    fn change_reads_null_and_missing_as_keep() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default)]
            name: Change<String>,
            #[serde(default)]
            grams: Change<i32>,
            #[serde(default)]
            notes: Change<String>,
        }
        let body: Body = serde_json::from_str(r#"{"name": null, "grams": 40}"#).unwrap();
        assert_eq!(body.name, Change::Keep);
        assert_eq!(body.grams, Change::Set(40));
        assert_eq!(body.notes, Change::Keep);
    }
}
