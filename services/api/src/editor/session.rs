//! services/api/src/editor/session.rs
//!
//! One user's editing session: the current document snapshot, the mutation entry
//! points and the autosave wiring. Mutations are synchronous; persistence happens
//! in the background once edits have been quiet for the debounce delay.

use portfolio_core::domain::{
    AuthUser, DocumentError, PortfolioDocument, Preset, Section, SectionId, SectionKind,
    SectionPatch, Theme,
};
use portfolio_core::ports::{DocumentStore, PortResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::autosave::{DebounceTimer, SaveEvent, SaveLane, Snapshot};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Where the session's initial document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSource {
    Stored,
    Default,
}

pub struct SessionOptions {
    pub debounce: Duration,
    /// Preset picked on the landing page, applied once on top of the loaded document.
    pub preset: Option<Preset>,
    pub events: Option<mpsc::UnboundedSender<SaveEvent>>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            preset: None,
            events: None,
        }
    }
}

pub struct EditorSession {
    owner: Uuid,
    source: LoadSource,
    current: Snapshot,
    lane: Arc<SaveLane>,
    timer: DebounceTimer,
}

/// Fetches the owner's portfolio for editing.
///
/// A missing document and a failed fetch both fall back to the starter document;
/// the failure is only logged.
pub async fn load_or_default(
    store: &dyn DocumentStore,
    user: &AuthUser,
) -> (PortfolioDocument, LoadSource) {
    match store.get_portfolio(user.uid).await {
        Ok(Some(document)) => (document, LoadSource::Stored),
        Ok(None) => (
            PortfolioDocument::starter(user.display_name.as_deref()),
            LoadSource::Default,
        ),
        Err(e) => {
            warn!(
                "Failed to load portfolio of {}, starting from default: {:?}",
                user.uid, e
            );
            (
                PortfolioDocument::starter(user.display_name.as_deref()),
                LoadSource::Default,
            )
        }
    }
}

impl EditorSession {
    /// Starts a session for `user` on top of `load_or_default`.
    pub async fn load(
        store: Arc<dyn DocumentStore>,
        user: &AuthUser,
        options: SessionOptions,
    ) -> Self {
        let (document, source) = load_or_default(store.as_ref(), user).await;
        info!("Editor session started for {} ({:?})", user.uid, source);

        let mut session = Self {
            owner: user.uid,
            source,
            current: Snapshot {
                revision: 0,
                document: Arc::new(document),
            },
            lane: Arc::new(SaveLane::new(store, user.uid, options.events)),
            timer: DebounceTimer::new(options.debounce),
        };
        if let Some(preset) = options.preset {
            info!("Applying preset '{}' for {}", preset.id(), user.uid);
            session.apply_preset(preset);
        }
        session
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn source(&self) -> LoadSource {
        self.source
    }

    pub fn document(&self) -> &PortfolioDocument {
        &self.current.document
    }

    pub fn revision(&self) -> u64 {
        self.current.revision
    }

    pub fn snapshot(&self) -> Snapshot {
        self.current.clone()
    }

    /// Replaces the snapshot and re-arms the autosave. Unchanged documents are ignored.
    fn commit(&mut self, document: PortfolioDocument) {
        if document == *self.current.document {
            return;
        }
        self.current = Snapshot {
            revision: self.current.revision + 1,
            document: Arc::new(document),
        };
        self.timer.arm(self.lane.clone(), self.current.clone());
    }

    //=====================================================================================
    // Mutations
    //=====================================================================================

    /// Appends a templated section and returns its id.
    pub fn add_section(&mut self, kind: SectionKind) -> Result<SectionId, DocumentError> {
        let section = Section::from_template(kind);
        let id = section.id.clone();
        let next = self.current.document.with_section(section)?;
        self.commit(next);
        Ok(id)
    }

    pub fn update_section(
        &mut self,
        id: &SectionId,
        patch: &SectionPatch,
    ) -> Result<(), DocumentError> {
        let next = self.current.document.with_section_updated(id, patch)?;
        self.commit(next);
        Ok(())
    }

    pub fn delete_section(&mut self, id: &SectionId) -> Result<(), DocumentError> {
        let next = self.current.document.without_section(id)?;
        self.commit(next);
        Ok(())
    }

    pub fn move_section(&mut self, id: &SectionId, to: usize) -> Result<(), DocumentError> {
        let next = self.current.document.with_section_moved(id, to)?;
        self.commit(next);
        Ok(())
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let next = self.current.document.with_title(title);
        self.commit(next);
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        let next = self.current.document.with_description(description);
        self.commit(next);
    }

    pub fn set_username(&mut self, username: &str) -> Result<(), DocumentError> {
        let next = self.current.document.with_username(username)?;
        self.commit(next);
        Ok(())
    }

    pub fn set_theme(&mut self, theme: Theme) {
        let next = self.current.document.with_theme(theme);
        self.commit(next);
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        let next = self.current.document.with_preset(preset);
        self.commit(next);
    }

    //=====================================================================================
    // Saving & Teardown
    //=====================================================================================

    /// Writes the current snapshot immediately, bypassing the debounce.
    ///
    /// Edits made after this call are not part of the write.
    pub async fn save_now(&mut self) -> PortResult<()> {
        self.timer.cancel();
        let snapshot = self.current.clone();
        self.lane.write(snapshot).await.map(|_| ())
    }

    /// Ends the session. A save that has not fired yet is dropped.
    pub fn close(mut self) {
        self.timer.cancel();
        info!(
            "Editor session closed for {} at revision {}",
            self.owner, self.current.revision
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use portfolio_core::ports::{PortError, PublishedPortfolio};
    use std::sync::Mutex;

    /// Records every write; can be told to fail loads or saves.
    #[derive(Default)]
    struct RecordingStore {
        stored: Mutex<Option<PortfolioDocument>>,
        writes: Mutex<Vec<PortfolioDocument>>,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl RecordingStore {
        fn writes(&self) -> Vec<PortfolioDocument> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn get_portfolio(&self, _owner: Uuid) -> PortResult<Option<PortfolioDocument>> {
            if self.fail_reads {
                return Err(PortError::Unexpected("store offline".into()));
            }
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn put_portfolio(
            &self,
            _owner: Uuid,
            document: &PortfolioDocument,
        ) -> PortResult<DateTime<Utc>> {
            if self.fail_writes {
                return Err(PortError::Unexpected("store offline".into()));
            }
            self.writes.lock().unwrap().push(document.clone());
            *self.stored.lock().unwrap() = Some(document.clone());
            Ok(Utc::now())
        }

        async fn find_by_username(&self, _username: &str) -> PortResult<Vec<PublishedPortfolio>> {
            Ok(Vec::new())
        }
    }

    fn user() -> AuthUser {
        AuthUser {
            uid: Uuid::new_v4(),
            display_name: Some("Alice".into()),
            email: "alice@example.com".into(),
        }
    }

    async fn session_with(store: Arc<RecordingStore>) -> EditorSession {
        EditorSession::load(store, &user(), SessionOptions::default()).await
    }

    #[tokio::test(start_paused = true)]
    async fn missing_document_starts_from_default_without_saving() {
        let store = Arc::new(RecordingStore::default());
        let session = session_with(store.clone()).await;
        assert_eq!(session.source(), LoadSource::Default);
        assert_eq!(session.document().username, "alice");
        assert_eq!(session.document().sections.len(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(store.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_load_falls_back_to_default() {
        let store = Arc::new(RecordingStore {
            fail_reads: true,
            ..Default::default()
        });
        let session = session_with(store).await;
        assert_eq!(session.source(), LoadSource::Default);
        assert_eq!(session.document().title, "My Portfolio");
    }

    #[tokio::test]
    async fn read_only_load_writes_nothing() {
        let store = RecordingStore {
            fail_reads: true,
            ..Default::default()
        };
        let (document, source) = load_or_default(&store, &user()).await;
        assert_eq!(source, LoadSource::Default);
        assert_eq!(document.username, "alice");
        assert!(store.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stored_document_is_loaded() {
        let stored = PortfolioDocument::starter(None).with_title("Saved before");
        let store = Arc::new(RecordingStore {
            stored: Mutex::new(Some(stored.clone())),
            ..Default::default()
        });
        let session = session_with(store).await;
        assert_eq!(session.source(), LoadSource::Stored);
        assert_eq!(session.document(), &stored);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_coalesce_into_one_write_of_the_final_snapshot() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session_with(store.clone()).await;

        for i in 0..5 {
            session.set_title(format!("Draft {}", i));
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        let contact = session.add_section(SectionKind::Contact).unwrap();
        assert!(store.writes().is_empty());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].title, "Draft 4");
        assert!(writes[0].section(&contact).is_some());
        assert_eq!(&writes[0], session.document());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_save_does_not_include_later_edits() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session_with(store.clone()).await;

        session.set_title("Saved");
        session.save_now().await.unwrap();
        session.set_description("Edited after save");

        let persisted = store.writes().last().cloned().unwrap();
        assert_eq!(persisted.title, "Saved");
        assert_ne!(&persisted, session.document());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let writes = store.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(&writes[1], session.document());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_save_cancels_the_pending_autosave() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session_with(store.clone()).await;

        session.set_title("Once");
        session.save_now().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_session_drops_the_pending_save() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session_with(store.clone()).await;

        session.set_title("Never written");
        session.close();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(store.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_session_drops_the_pending_save() {
        let store = Arc::new(RecordingStore::default());
        {
            let mut session = session_with(store.clone()).await;
            session.set_title("Never written");
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(store.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn preset_is_applied_and_scheduled_for_saving() {
        let store = Arc::new(RecordingStore::default());
        let options = SessionOptions {
            preset: Some(Preset::ArtistLight),
            ..Default::default()
        };
        let session = EditorSession::load(store.clone(), &user(), options).await;
        assert_eq!(session.revision(), 1);
        assert_eq!(session.document().theme, Preset::ArtistLight.theme().unwrap());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_op_edits_do_not_schedule_a_save() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session_with(store.clone()).await;
        let title = session.document().title.clone();

        session.set_title(title);
        session.apply_preset(Preset::Custom);
        assert_eq!(session.revision(), 0);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(store.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_edit_leaves_snapshot_alone() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session_with(store).await;
        let before = session.snapshot();

        assert!(session.set_username("not valid").is_err());
        assert!(session.delete_section(&SectionId::from("missing")).is_err());
        assert_eq!(session.revision(), before.revision);
        assert_eq!(session.document(), &*before.document);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_reports_and_keeps_editing() {
        let store = Arc::new(RecordingStore {
            fail_writes: true,
            ..Default::default()
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let options = SessionOptions {
            events: Some(tx),
            ..Default::default()
        };
        let mut session = EditorSession::load(store.clone(), &user(), options).await;

        session.set_title("Unlucky");
        assert!(session.save_now().await.is_err());
        assert_eq!(rx.recv().await, Some(SaveEvent::Started { revision: 1 }));
        assert_eq!(rx.recv().await, Some(SaveEvent::Failed { revision: 1 }));

        session.set_title("Still editing");
        assert_eq!(session.revision(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_hero_contact_delete_hero() {
        let store = Arc::new(RecordingStore::default());
        let mut session = session_with(store.clone()).await;
        let hero = session.document().sections[0].id.clone();

        session
            .update_section(
                &hero,
                &SectionPatch {
                    title: Some("Welcome".into()),
                    content: Some("Hi".into()),
                    image: None,
                },
            )
            .unwrap();
        let contact = session.add_section(SectionKind::Contact).unwrap();
        session.delete_section(&hero).unwrap();

        let ids: Vec<_> = session
            .document()
            .sections
            .iter()
            .map(|s| s.id.clone())
            .collect();
        assert_eq!(ids, vec![contact]);
        session.save_now().await.unwrap();
        assert_eq!(store.writes()[0].sections.len(), 1);
    }
}
