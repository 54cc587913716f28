//! The set of document timelines and the global viewing timestamp.
//!
//! The registry owns every [`DocumentTimeline`] and is the only place the
//! viewing timestamp is set; each change is pushed down to every timeline.
//! Notifications are queued as [`RegistryEvent`]s and drained by the caller.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info, warn};

use crate::buffer::{BufferFactory, HighlightId, ScratchBufferFactory, TextRange};
use crate::delta::{Delta, DeltaKind};
use crate::error::ErrorCode;
use crate::fuzzy;
use crate::model::{DeltaId, DocumentId, ParticipantId, Timestamp, ViewingTimestamp};
use crate::record::{ChangeRecord, CursorRecord};
use crate::timeline::{DocumentState, DocumentTimeline, InsertMode};

/// Notifications queued by [`DocumentRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RegistryEvent {
    TimestampChanged { timestamp: ViewingTimestamp },
    DocumentOpened { document: DocumentId },
}

impl RegistryEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TimestampChanged { .. } => "timestampChanged",
            Self::DocumentOpened { .. } => "documentOpened",
        }
    }
}

/// Current state plus history for a document joining mid-session.
///
/// `contents` and `state` must already reflect every delta in `deltas`.
#[derive(Debug, Clone, Default)]
pub struct DocumentSnapshot {
    pub state: DocumentState,
    pub contents: String,
    pub deltas: Vec<Delta>,
}

/// Maps titles to document ids; used when resolving file references.
pub trait TitleLookup {
    fn find_by_title(&self, query: &str) -> Option<DocumentId>;

    fn title_of(&self, document: &DocumentId) -> Option<String>;
}

pub struct DocumentRegistry {
    documents: IndexMap<DocumentId, DocumentTimeline>,
    viewing: ViewingTimestamp,
    factory: Box<dyn BufferFactory>,
    local: Option<ParticipantId>,
    fuzzy_min_score: f64,
    events: VecDeque<RegistryEvent>,
}

impl fmt::Debug for DocumentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRegistry")
            .field("documents", &self.documents)
            .field("viewing", &self.viewing)
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}

impl Default for DocumentRegistry {
    fn default() -> Self {
        Self::new(Box::new(ScratchBufferFactory))
    }
}

impl DocumentRegistry {
    #[must_use]
    pub fn new(factory: Box<dyn BufferFactory>) -> Self {
        Self {
            documents: IndexMap::new(),
            viewing: ViewingTimestamp::Latest,
            factory,
            local: None,
            fuzzy_min_score: fuzzy::DEFAULT_MIN_SCORE,
            events: VecDeque::new(),
        }
    }

    #[must_use]
    pub const fn with_fuzzy_min_score(mut self, min_score: f64) -> Self {
        self.fuzzy_min_score = min_score;
        self
    }

    /// Set the local participant, whose cursor updates are ignored.
    pub fn set_local_participant(&mut self, local: Option<ParticipantId>) {
        for timeline in self.documents.values_mut() {
            timeline.set_local_participant(local.clone());
        }
        self.local = local;
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    /// Return the timeline for `id`, creating and hydrating it from
    /// `snapshot` if it does not exist yet. An existing timeline ignores the
    /// snapshot.
    pub fn open_or_get(
        &mut self,
        id: &DocumentId,
        snapshot: Option<DocumentSnapshot>,
    ) -> &mut DocumentTimeline {
        let Self {
            documents,
            viewing,
            factory,
            local,
            events,
            ..
        } = self;
        documents.entry(id.clone()).or_insert_with(|| {
            let mut timeline = DocumentTimeline::new(id.clone(), factory.create(id));
            timeline.set_local_participant(local.clone());
            if let Some(snapshot) = snapshot {
                timeline.seed(snapshot.state, &snapshot.contents);
                for delta in snapshot.deltas {
                    timeline.insert(delta, InsertMode::AlreadyApplied);
                }
            }
            timeline.set_viewing_timestamp(*viewing);
            info!(document = %id, deltas = timeline.len(), "document registered");
            events.push_back(RegistryEvent::DocumentOpened {
                document: id.clone(),
            });
            timeline
        })
    }

    /// Insert a change into its document's timeline. An `open` for an
    /// unknown document registers it; any other kind for an unknown document
    /// is dropped.
    pub fn route(&mut self, record: ChangeRecord) -> Option<DeltaId> {
        let ChangeRecord { document, delta } = record;
        if !self.documents.contains_key(&document) {
            if delta.kind() != DeltaKind::Open {
                warn!(
                    code = %ErrorCode::UnknownDocument,
                    document = %document,
                    kind = %delta.kind(),
                    "dropping change for unknown document"
                );
                return None;
            }
            self.open_or_get(&document, None);
        }
        let timeline = self.documents.get_mut(&document)?;
        let id = timeline.insert(delta, InsertMode::Apply);
        debug!(document = %document, delta = %id, "routed change");
        Some(id)
    }

    /// Route a remote cursor update. Unknown documents are a no-op.
    pub fn apply_cursor(&mut self, record: &CursorRecord) -> bool {
        let Some(timeline) = self.documents.get_mut(record.document()) else {
            debug!(
                code = %ErrorCode::UnknownDocument,
                document = %record.document(),
                "dropping cursor for unknown document"
            );
            return false;
        };
        timeline.cursors_mut().apply(record)
    }

    /// Drop a participant's cursors from every document.
    pub fn remove_participant_cursors(&mut self, participant: &ParticipantId) {
        for timeline in self.documents.values_mut() {
            timeline.cursors_mut().remove_cursor(participant);
        }
    }

    // -----------------------------------------------------------------------
    // Time travel
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn has_delta_after(&self, t: Timestamp) -> bool {
        self.documents.values().any(|d| d.has_delta_after(t))
    }

    /// Set the viewing timestamp on every document. A moment after every
    /// recorded delta is indistinguishable from the present and clamps to
    /// [`ViewingTimestamp::Latest`]. Returns the timestamp actually applied.
    pub fn set_global_viewing_timestamp(&mut self, viewing: ViewingTimestamp) -> ViewingTimestamp {
        let viewing = match viewing {
            ViewingTimestamp::At(t) if !self.has_delta_after(t) => ViewingTimestamp::Latest,
            other => other,
        };
        self.viewing = viewing;
        for timeline in self.documents.values_mut() {
            timeline.set_viewing_timestamp(viewing);
        }
        debug!(viewing = %viewing, "viewing timestamp changed");
        self.events
            .push_back(RegistryEvent::TimestampChanged { timestamp: viewing });
        viewing
    }

    #[must_use]
    pub const fn viewing_timestamp(&self) -> ViewingTimestamp {
        self.viewing
    }

    pub fn to_latest(&mut self) -> ViewingTimestamp {
        self.set_global_viewing_timestamp(ViewingTimestamp::Latest)
    }

    /// Show the documents just before a delta stamped `t`.
    pub fn go_before(&mut self, t: Timestamp) -> ViewingTimestamp {
        self.set_global_viewing_timestamp(ViewingTimestamp::At(t.saturating_sub(1)))
    }

    /// Show the documents just after a delta stamped `t`.
    pub fn go_after(&mut self, t: Timestamp) -> ViewingTimestamp {
        self.set_global_viewing_timestamp(ViewingTimestamp::At(t.saturating_add(1)))
    }

    #[must_use]
    pub const fn is_at_latest(&self) -> bool {
        self.viewing.is_latest()
    }

    #[must_use]
    pub fn is_showing_before(&self, t: Timestamp) -> bool {
        self.viewing == ViewingTimestamp::At(t.saturating_sub(1))
    }

    #[must_use]
    pub fn is_showing_after(&self, t: Timestamp) -> bool {
        self.viewing == ViewingTimestamp::At(t.saturating_add(1))
    }

    // -----------------------------------------------------------------------
    // Highlights
    // -----------------------------------------------------------------------

    /// Move to `viewing`, then highlight `range` in `document`.
    pub fn add_highlight(
        &mut self,
        document: &DocumentId,
        range: TextRange,
        viewing: ViewingTimestamp,
    ) -> Option<HighlightId> {
        self.set_global_viewing_timestamp(viewing);
        self.documents
            .get_mut(document)
            .map(|timeline| timeline.add_highlight(range))
    }

    pub fn remove_highlight(&mut self, document: &DocumentId, id: HighlightId) -> bool {
        self.documents
            .get_mut(document)
            .is_some_and(|timeline| timeline.remove_highlight(id))
    }

    /// Move to `viewing`, then scroll `document` to `range`.
    pub fn focus(
        &mut self,
        document: &DocumentId,
        range: TextRange,
        viewing: ViewingTimestamp,
    ) -> bool {
        self.set_global_viewing_timestamp(viewing);
        self.documents
            .get_mut(document)
            .is_some_and(|timeline| timeline.focus(range))
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Best title match in registration order.
    #[must_use]
    pub fn fuzzy_find_by_title(&self, query: &str) -> Option<&DocumentTimeline> {
        let titles = self.documents.values().map(DocumentTimeline::title);
        let (index, score) = fuzzy::best_match(query, titles, self.fuzzy_min_score)?;
        let (_, timeline) = self.documents.get_index(index)?;
        debug!(query, document = %timeline.id(), score, "fuzzy title match");
        Some(timeline)
    }

    /// Documents open at the current viewing timestamp.
    #[must_use]
    pub fn get_active_documents(&self) -> Vec<&DocumentTimeline> {
        self.documents.values().filter(|d| d.is_open()).collect()
    }

    #[must_use]
    pub fn get_document(&self, id: &DocumentId) -> Option<&DocumentTimeline> {
        self.documents.get(id)
    }

    pub fn get_document_mut(&mut self, id: &DocumentId) -> Option<&mut DocumentTimeline> {
        self.documents.get_mut(id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &DocumentTimeline> {
        self.documents.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        self.events.drain(..).collect()
    }
}

impl TitleLookup for DocumentRegistry {
    fn find_by_title(&self, query: &str) -> Option<DocumentId> {
        self.fuzzy_find_by_title(query).map(|d| d.id().clone())
    }

    fn title_of(&self, document: &DocumentId) -> Option<String> {
        self.documents.get(document).map(|d| d.title().to_owned())
    }
}
