//! Cross-page selection for bulk actions.
//!
//! Selection is keyed by track id, so it survives paging, sorting and
//! filtering. "Select all" only ever looks at the rows currently loaded.

use crate::error::Result;
use crate::models::BulkDeleteOutcome;
use crate::mutation::{ActiveDialog, MutationCoordinator};
use crate::query::QueryController;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

/// Source of the ids currently displayed.
pub trait VisibleRows: Send + Sync {
    fn visible_ids(&self) -> Vec<String>;
}

impl VisibleRows for QueryController {
    fn visible_ids(&self) -> Vec<String> {
        QueryController::visible_ids(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionView {
    pub active: bool,
    pub selected: BTreeSet<String>,
}

impl SelectionView {
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }
}

pub struct SelectionManager {
    rows: Arc<dyn VisibleRows>,
    mutations: Arc<MutationCoordinator>,
    state: Mutex<SelectionView>,
    view: watch::Sender<SelectionView>,
}

impl fmt::Debug for SelectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionManager")
            .field("selection", &self.snapshot())
            .finish()
    }
}

impl SelectionManager {
    pub fn new(rows: Arc<dyn VisibleRows>, mutations: Arc<MutationCoordinator>) -> Self {
        let (view, _) = watch::channel(SelectionView::default());
        Self {
            rows,
            mutations,
            state: Mutex::new(SelectionView::default()),
            view,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SelectionView> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn modify<R>(&self, f: impl FnOnce(&mut SelectionView) -> R) -> R {
        let mut state = self.lock();
        let result = f(&mut state);
        self.view.send_replace(state.clone());
        result
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionView> {
        self.view.subscribe()
    }

    pub fn snapshot(&self) -> SelectionView {
        self.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.lock().selected.iter().cloned().collect()
    }

    /// Enter selection mode with an empty selection.
    pub fn enter(&self) {
        self.modify(|s| {
            s.active = true;
            s.selected.clear();
        });
    }

    /// Leave selection mode; the selection is discarded.
    pub fn exit(&self) {
        self.modify(|s| {
            s.active = false;
            s.selected.clear();
        });
    }

    /// Flip one id. Returns whether it is now selected.
    pub fn toggle(&self, id: &str) -> bool {
        self.modify(|s| {
            if s.selected.remove(id) {
                false
            } else {
                s.selected.insert(id.to_string());
                true
            }
        })
    }

    /// Select every loaded row, or clear the selection if they already are.
    ///
    /// Selections on other pages are kept when adding and dropped when clearing.
    /// Calling this twice restores the previous selection only when no other
    /// page had selected rows; clearing the whole set is intended.
    pub fn toggle_all(&self) {
        let visible = self.rows.visible_ids();
        self.modify(|s| {
            let all_selected = !visible.is_empty() && visible.iter().all(|id| s.selected.contains(id));
            if all_selected {
                s.selected.clear();
            } else {
                s.selected.extend(visible);
            }
        });
    }

    /// Delete every selected track. The selection is cleared afterwards
    /// whether or not the request succeeded; nothing is sent when it is empty.
    pub async fn bulk_delete(&self) -> Result<BulkDeleteOutcome> {
        let ids = self.selected_ids();
        if ids.is_empty() {
            debug!("Bulk delete requested with an empty selection");
            return Ok(BulkDeleteOutcome::default());
        }

        self.mutations
            .open_dialog(ActiveDialog::BulkDelete { count: ids.len() });
        let result = self.mutations.bulk_delete(ids).await;
        self.modify(|s| s.selected.clear());
        result
    }
}
