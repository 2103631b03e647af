use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PulseError, PulseResult};
use crate::models::{Role, User, UserPreferences};
use crate::reactive::{Action, Atom, Derived};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    pub current_user: Option<User>,
    pub signed_in_at: Option<DateTime<Utc>>,
}

impl UserState {
    pub fn reduce(&self, action: UserAction) -> Option<UserState> {
        match action {
            UserAction::SignIn(user) => Some(UserState {
                current_user: Some(user),
                signed_in_at: Some(Utc::now()),
            }),
            UserAction::SignOut => {
                self.current_user.as_ref()?;
                Some(UserState::default())
            }
            UserAction::UpdatePreferences(preferences) => {
                let mut user = self.current_user.clone()?;
                if user.preferences == preferences {
                    return None;
                }
                user.preferences = preferences;
                Some(UserState {
                    current_user: Some(user),
                    ..self.clone()
                })
            }
            UserAction::AddRole(role) => {
                let mut user = self.current_user.clone()?;
                if user.has_role(role) {
                    return None;
                }
                user.roles.push(role);
                user.roles.sort();
                Some(UserState {
                    current_user: Some(user),
                    ..self.clone()
                })
            }
            UserAction::RemoveRole(role) => {
                let mut user = self.current_user.clone()?;
                if !user.has_role(role) {
                    return None;
                }
                user.roles.retain(|r| *r != role);
                Some(UserState {
                    current_user: Some(user),
                    ..self.clone()
                })
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum UserAction {
    SignIn(User),
    SignOut,
    UpdatePreferences(UserPreferences),
    AddRole(Role),
    RemoveRole(Role),
}

#[derive(Clone)]
pub struct UserAtoms {
    pub state: Atom<UserState>,
    pub dispatch: Action<UserState, UserAction>,
    pub is_admin: Derived<bool>,
    pub display_name: Derived<String>,
}

impl UserAtoms {
    pub fn new() -> Self {
        let state = Atom::named("user", UserState::default());
        let dispatch =
            Action::filter_map("user", &state, |s: &UserState, a: UserAction| s.reduce(a));
        let is_admin = Derived::map(&state, |s: &UserState| {
            s.current_user
                .as_ref()
                .is_some_and(|u| u.has_role(Role::Admin))
        });
        let display_name = Derived::map(&state, |s: &UserState| match &s.current_user {
            Some(user) if !user.name.trim().is_empty() => user.name.clone(),
            Some(user) => user.email.clone(),
            None => "Guest".to_string(),
        });

        Self {
            state,
            dispatch,
            is_admin,
            display_name,
        }
    }

    pub fn snapshot(&self) -> UserState {
        self.state.get()
    }

    pub fn current(&self) -> Option<User> {
        self.state.with(|s| s.current_user.clone())
    }

    pub fn sign_in(&self, user: User) {
        info!(user_id = %user.id, "user signed in");
        self.dispatch.dispatch(UserAction::SignIn(user));
    }

    pub fn sign_out(&self) -> bool {
        let changed = self.dispatch.dispatch(UserAction::SignOut);
        if changed {
            info!("user signed out");
        }
        changed
    }

    pub fn update_preferences(&self, preferences: UserPreferences) -> PulseResult<()> {
        self.require_user()?;
        self.dispatch
            .dispatch(UserAction::UpdatePreferences(preferences));
        Ok(())
    }

    pub fn add_role(&self, role: Role) -> PulseResult<()> {
        self.require_user()?;
        self.dispatch.dispatch(UserAction::AddRole(role));
        Ok(())
    }

    pub fn remove_role(&self, role: Role) -> PulseResult<()> {
        self.require_user()?;
        self.dispatch.dispatch(UserAction::RemoveRole(role));
        Ok(())
    }

    fn require_user(&self) -> PulseResult<()> {
        if self.state.with(|s| s.current_user.is_some()) {
            Ok(())
        } else {
            Err(PulseError::NotSignedIn)
        }
    }
}

impl Default for UserAtoms {
    fn default() -> Self {
        Self::new()
    }
}
