use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PulseError, PulseResult};
use crate::models::{ConnectionState, StreamQuality, VncSession, Viewport};
use crate::reactive::{Action, Atom, Derived};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VncState {
    pub session: Option<VncSession>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum VncAction {
    Connect(VncSession),
    MarkConnected,
    MarkError(String),
    Disconnect,
    SetQuality(StreamQuality),
    SetViewport(Viewport),
    RecordFrames(u64),
    ToggleViewOnly,
}

impl VncState {
    pub fn reduce(&self, action: VncAction) -> Option<VncState> {
        match action {
            VncAction::Connect(session) => Some(VncState {
                session: Some(session),
                last_error: None,
            }),
            VncAction::MarkConnected => {
                let mut session = self.session.clone()?;
                if session.state != ConnectionState::Connecting {
                    return None;
                }
                session.state = ConnectionState::Connected;
                session.connected_at = Some(Utc::now());
                Some(VncState {
                    session: Some(session),
                    ..self.clone()
                })
            }
            VncAction::MarkError(reason) => {
                let mut session = self.session.clone()?;
                session.state = ConnectionState::Error(reason.clone());
                Some(VncState {
                    session: Some(session),
                    last_error: Some(reason),
                })
            }
            VncAction::Disconnect => {
                self.session.as_ref()?;
                Some(VncState {
                    session: None,
                    ..self.clone()
                })
            }
            VncAction::SetQuality(quality) => {
                let mut session = self.session.clone()?;
                if session.quality == quality {
                    return None;
                }
                session.quality = quality;
                Some(VncState {
                    session: Some(session),
                    ..self.clone()
                })
            }
            VncAction::SetViewport(viewport) => {
                let mut session = self.session.clone()?;
                session.viewport = viewport.with_scale(viewport.scale);
                Some(VncState {
                    session: Some(session),
                    ..self.clone()
                })
            }
            VncAction::RecordFrames(count) => {
                let mut session = self.session.clone()?;
                let frames = session.frames_received.saturating_add(count);
                if !session.is_connected() || frames == session.frames_received {
                    return None;
                }
                session.frames_received = frames;
                Some(VncState {
                    session: Some(session),
                    ..self.clone()
                })
            }
            VncAction::ToggleViewOnly => {
                let mut session = self.session.clone()?;
                session.viewport.view_only = !session.viewport.view_only;
                Some(VncState {
                    session: Some(session),
                    ..self.clone()
                })
            }
        }
    }
}

#[derive(Clone)]
pub struct VncAtoms {
    pub state: Atom<VncState>,
    pub dispatch: Action<VncState, VncAction>,
    pub is_connected: Derived<bool>,
}

impl VncAtoms {
    pub fn new() -> Self {
        let state = Atom::named("vnc", VncState::default());
        let dispatch =
            Action::filter_map("vnc", &state, |s: &VncState, a: VncAction| s.reduce(a));
        let is_connected = Derived::map(&state, |s: &VncState| {
            s.session.as_ref().is_some_and(VncSession::is_connected)
        });

        Self {
            state,
            dispatch,
            is_connected,
        }
    }

    pub fn snapshot(&self) -> VncState {
        self.state.get()
    }

    /// Starts a new session in the connecting state, replacing any previous one.
    pub fn connect(&self, host: impl Into<String>, port: u16) -> String {
        let session = VncSession::new(host, port);
        let id = session.id.clone();
        info!(address = %session.address(), "remote desktop connecting");
        self.dispatch.dispatch(VncAction::Connect(session));
        id
    }

    pub fn mark_connected(&self) -> PulseResult<()> {
        if self.dispatch.dispatch(VncAction::MarkConnected) {
            return Ok(());
        }
        match self.state.with(|s| s.session.as_ref().map(|x| x.state.clone())) {
            Some(state) => Err(PulseError::InvalidTransition {
                entity: "remote desktop".to_string(),
                from: state.to_string(),
                to: ConnectionState::Connected.to_string(),
            }),
            None => Err(PulseError::VncNotConnected),
        }
    }

    pub fn mark_error(&self, reason: impl Into<String>) -> PulseResult<()> {
        let reason = reason.into();
        warn!(reason = %reason, "remote desktop error");
        if self.dispatch.dispatch(VncAction::MarkError(reason)) {
            Ok(())
        } else {
            Err(PulseError::VncNotConnected)
        }
    }

    pub fn disconnect(&self) -> bool {
        self.dispatch.dispatch(VncAction::Disconnect)
    }

    pub fn set_quality(&self, quality: StreamQuality) -> PulseResult<()> {
        self.require_session()?;
        self.dispatch.dispatch(VncAction::SetQuality(quality));
        Ok(())
    }

    pub fn set_viewport(&self, viewport: Viewport) -> PulseResult<()> {
        self.require_session()?;
        self.dispatch.dispatch(VncAction::SetViewport(viewport));
        Ok(())
    }

    pub fn record_frames(&self, count: u64) {
        self.dispatch.dispatch(VncAction::RecordFrames(count));
    }

    pub fn toggle_view_only(&self) -> PulseResult<()> {
        self.require_session()?;
        self.dispatch.dispatch(VncAction::ToggleViewOnly);
        Ok(())
    }

    fn require_session(&self) -> PulseResult<()> {
        if self.state.with(|s| s.session.is_some()) {
            Ok(())
        } else {
            Err(PulseError::VncNotConnected)
        }
    }
}

impl Default for VncAtoms {
    fn default() -> Self {
        Self::new()
    }
}
