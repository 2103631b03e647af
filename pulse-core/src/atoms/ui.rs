use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bounded::BoundedVec;
use crate::models::{ErrorRecord, Modal, ModalKind, Notification, Toast, ToastLevel};
use crate::reactive::{Action, Atom, Derived};

pub const DEFAULT_VIEW: &str = "dashboard";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    pub toasts: Vec<Toast>,
    /// Open modals, topmost last.
    pub modals: Vec<Modal>,
    pub notifications: BoundedVec<Notification>,
    pub sidebar_open: bool,
    pub active_view: String,
    pub loading: bool,
    pub errors: BoundedVec<ErrorRecord>,
    pub max_visible_toasts: usize,
}

impl UiState {
    pub fn new(notification_cap: usize, error_cap: usize, max_visible_toasts: usize) -> Self {
        Self {
            toasts: Vec::new(),
            modals: Vec::new(),
            notifications: BoundedVec::new(notification_cap),
            sidebar_open: true,
            active_view: DEFAULT_VIEW.to_string(),
            loading: false,
            errors: BoundedVec::new(error_cap),
            max_visible_toasts,
        }
    }

    /// Newest first, at most `max_visible_toasts`.
    pub fn visible_toasts(&self) -> Vec<Toast> {
        self.toasts
            .iter()
            .rev()
            .take(self.max_visible_toasts)
            .cloned()
            .collect()
    }

    pub fn top_modal(&self) -> Option<&Modal> {
        self.modals.last()
    }

    pub fn unread_notifications(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub fn reduce(&self, action: UiAction) -> Option<UiState> {
        match action {
            UiAction::AddToast(toast) => {
                let mut next = self.clone();
                next.toasts.push(toast);
                Some(next)
            }
            UiAction::RemoveToast(id) => {
                if !self.toasts.iter().any(|t| t.id == id) {
                    return None;
                }
                let mut next = self.clone();
                next.toasts.retain(|t| t.id != id);
                Some(next)
            }
            UiAction::ClearToasts => {
                if self.toasts.is_empty() {
                    return None;
                }
                Some(UiState {
                    toasts: Vec::new(),
                    ..self.clone()
                })
            }
            UiAction::ExpireToasts(now) => {
                if !self.toasts.iter().any(|t| t.is_expired(now)) {
                    return None;
                }
                let mut next = self.clone();
                next.toasts.retain(|t| !t.is_expired(now));
                Some(next)
            }
            UiAction::OpenModal(modal) => {
                let mut next = self.clone();
                next.modals.push(modal);
                Some(next)
            }
            UiAction::CloseModal(id) => {
                if !self.modals.iter().any(|m| m.id == id) {
                    return None;
                }
                let mut next = self.clone();
                next.modals.retain(|m| m.id != id);
                Some(next)
            }
            UiAction::CloseTopModal => {
                self.modals.last()?;
                let mut next = self.clone();
                next.modals.pop();
                Some(next)
            }
            UiAction::AddNotification(notification) => {
                let mut next = self.clone();
                next.notifications.push(notification);
                Some(next)
            }
            UiAction::MarkNotificationRead(id) => {
                if !self.notifications.iter().any(|n| n.id == id && !n.read) {
                    return None;
                }
                let mut next = self.clone();
                for n in next.notifications.iter_mut().filter(|n| n.id == id) {
                    n.read = true;
                }
                Some(next)
            }
            UiAction::MarkAllNotificationsRead => {
                if self.unread_notifications() == 0 {
                    return None;
                }
                let mut next = self.clone();
                for n in next.notifications.iter_mut() {
                    n.read = true;
                }
                Some(next)
            }
            UiAction::RemoveNotification(id) => {
                if !self.notifications.iter().any(|n| n.id == id) {
                    return None;
                }
                let mut next = self.clone();
                next.notifications.retain(|n| n.id != id);
                Some(next)
            }
            UiAction::ToggleSidebar => Some(UiState {
                sidebar_open: !self.sidebar_open,
                ..self.clone()
            }),
            UiAction::SetActiveView(view) => {
                if view == self.active_view {
                    return None;
                }
                Some(UiState {
                    active_view: view,
                    ..self.clone()
                })
            }
            UiAction::SetLoading(loading) => {
                if loading == self.loading {
                    return None;
                }
                Some(UiState {
                    loading,
                    ..self.clone()
                })
            }
            UiAction::PushError(record) => {
                let mut next = self.clone();
                next.errors.push(record);
                Some(next)
            }
            UiAction::ClearErrors => {
                if self.errors.is_empty() {
                    return None;
                }
                let mut next = self.clone();
                next.errors.clear();
                Some(next)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum UiAction {
    AddToast(Toast),
    RemoveToast(String),
    ClearToasts,
    ExpireToasts(DateTime<Utc>),
    OpenModal(Modal),
    CloseModal(String),
    CloseTopModal,
    AddNotification(Notification),
    MarkNotificationRead(String),
    MarkAllNotificationsRead,
    RemoveNotification(String),
    ToggleSidebar,
    SetActiveView(String),
    SetLoading(bool),
    PushError(ErrorRecord),
    ClearErrors,
}

/// UI slice: toasts, the modal stack, notifications and layout flags.
#[derive(Clone)]
pub struct UiAtoms {
    pub state: Atom<UiState>,
    pub dispatch: Action<UiState, UiAction>,
    pub unread_notifications: Derived<usize>,
    pub top_modal: Derived<Option<Modal>>,
    pub visible_toasts: Derived<Vec<Toast>>,
    default_toast_ms: u64,
}

impl UiAtoms {
    pub fn new(notification_cap: usize, error_cap: usize, max_visible_toasts: usize) -> Self {
        let state = Atom::named(
            "ui",
            UiState::new(notification_cap, error_cap, max_visible_toasts),
        );
        let dispatch = Action::filter_map("ui", &state, |s: &UiState, a: UiAction| s.reduce(a));
        let unread_notifications = Derived::map(&state, UiState::unread_notifications);
        let top_modal = Derived::map(&state, |s: &UiState| s.top_modal().cloned());
        let visible_toasts = Derived::map(&state, UiState::visible_toasts);

        Self {
            state,
            dispatch,
            unread_notifications,
            top_modal,
            visible_toasts,
            default_toast_ms: 5000,
        }
    }

    pub fn with_default_toast_ms(mut self, ms: u64) -> Self {
        self.default_toast_ms = ms;
        self
    }

    pub fn snapshot(&self) -> UiState {
        self.state.get()
    }

    pub fn add_toast(&self, toast: Toast) -> String {
        let id = toast.id.clone();
        debug!(toast_id = %id, level = ?toast.level, "toast added");
        self.dispatch.dispatch(UiAction::AddToast(toast));
        id
    }

    /// Builds a toast with the configured default duration.
    pub fn toast(&self, level: ToastLevel, message: impl Into<String>) -> Toast {
        Toast::new(message, level).with_duration_ms(self.default_toast_ms)
    }

    pub fn remove_toast(&self, id: &str) -> bool {
        self.dispatch.dispatch(UiAction::RemoveToast(id.to_string()))
    }

    pub fn clear_toasts(&self) {
        self.dispatch.dispatch(UiAction::ClearToasts);
    }

    /// Drops every toast whose duration has elapsed at `now`.
    pub fn expire_toasts(&self, now: DateTime<Utc>) -> usize {
        self.dispatch
            .dispatch_with(UiAction::ExpireToasts(now), |before, after| {
                before.toasts.len() - after.toasts.len()
            })
            .unwrap_or(0)
    }

    pub fn open_modal(&self, kind: ModalKind, title: impl Into<String>) -> String {
        self.push_modal(Modal::new(kind, title))
    }

    pub fn push_modal(&self, modal: Modal) -> String {
        let id = modal.id.clone();
        self.dispatch.dispatch(UiAction::OpenModal(modal));
        id
    }

    pub fn close_modal(&self, id: &str) -> bool {
        self.dispatch.dispatch(UiAction::CloseModal(id.to_string()))
    }

    pub fn close_top_modal(&self) -> bool {
        self.dispatch.dispatch(UiAction::CloseTopModal)
    }

    pub fn add_notification(&self, notification: Notification) -> String {
        let id = notification.id.clone();
        self.dispatch.dispatch(UiAction::AddNotification(notification));
        id
    }

    pub fn mark_notification_read(&self, id: &str) -> bool {
        self.dispatch
            .dispatch(UiAction::MarkNotificationRead(id.to_string()))
    }

    pub fn mark_all_notifications_read(&self) {
        self.dispatch.dispatch(UiAction::MarkAllNotificationsRead);
    }

    pub fn remove_notification(&self, id: &str) -> bool {
        self.dispatch
            .dispatch(UiAction::RemoveNotification(id.to_string()))
    }

    /// Returns the new sidebar state.
    pub fn toggle_sidebar(&self) -> bool {
        self.dispatch
            .dispatch_with(UiAction::ToggleSidebar, |_, after| after.sidebar_open)
            .unwrap_or_else(|| self.state.with(|s| s.sidebar_open))
    }

    pub fn set_active_view(&self, view: impl Into<String>) {
        self.dispatch.dispatch(UiAction::SetActiveView(view.into()));
    }

    pub fn set_loading(&self, loading: bool) {
        self.dispatch.dispatch(UiAction::SetLoading(loading));
    }

    pub fn push_error(&self, record: ErrorRecord) {
        self.dispatch.dispatch(UiAction::PushError(record));
    }

    pub fn clear_errors(&self) {
        self.dispatch.dispatch(UiAction::ClearErrors);
    }
}
