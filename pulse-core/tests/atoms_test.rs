use std::sync::{Arc, Mutex};

use pulse_core::{
    AppAtoms, Atom, ChatStatus, Derived, MessageRole, ModalKind, Notification, Participant,
    PulseError, Toast, ToastLevel, UiAtoms, User,
};

mod removal_tests {
    use super::*;

    #[test]
    fn test_toast_removal_is_idempotent() {
        let ui = UiAtoms::new(50, 50, 5);
        let id = ui.add_toast(Toast::info("saved"));

        assert!(ui.remove_toast(&id));
        let version = ui.state.version();
        assert!(!ui.remove_toast(&id));
        assert!(!ui.remove_toast("never-existed"));
        assert_eq!(ui.state.version(), version);
    }

    #[test]
    fn test_modal_close_is_idempotent() {
        let ui = UiAtoms::new(50, 50, 5);
        let first = ui.open_modal(ModalKind::Info, "About");
        let second = ui.open_modal(ModalKind::Confirm, "Delete?");

        assert!(ui.close_modal(&first));
        assert!(!ui.close_modal(&first));
        assert_eq!(ui.snapshot().top_modal().map(|m| m.id.clone()), Some(second));

        assert!(ui.close_top_modal());
        assert!(!ui.close_top_modal());
    }

    #[test]
    fn test_notification_removal_is_idempotent() {
        let ui = UiAtoms::new(50, 50, 5);
        let id = ui.add_notification(Notification::new(ToastLevel::Info, "Build", "passed"));

        assert!(ui.remove_notification(&id));
        assert!(!ui.remove_notification(&id));
        assert!(!ui.mark_notification_read(&id));
    }
}

mod bounded_tests {
    use super::*;

    #[test]
    fn test_notifications_keep_newest() {
        let ui = UiAtoms::new(3, 50, 5);
        for i in 0..5 {
            ui.add_notification(Notification::new(ToastLevel::Info, format!("n{i}"), ""));
        }

        let titles: Vec<String> = ui
            .snapshot()
            .notifications
            .iter()
            .map(|n| n.title.clone())
            .collect();
        assert_eq!(titles, vec!["n2", "n3", "n4"]);
        assert_eq!(ui.unread_notifications.get(), 3);
    }

    #[test]
    fn test_visible_toasts_capped() {
        let ui = UiAtoms::new(50, 50, 2);
        for i in 0..4 {
            ui.add_toast(Toast::info(format!("t{i}")));
        }
        assert_eq!(ui.snapshot().toasts.len(), 4);
        assert_eq!(ui.visible_toasts.get().len(), 2);
    }
}

mod reactive_tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let atom = Atom::new(1);
        atom.set(7);
        assert_eq!(atom.get(), 7);
        assert_eq!(atom.version(), 1);
    }

    #[test]
    fn test_derived_follows_source() {
        let count = Atom::new(2);
        let doubled = Derived::map(&count, |n: &i32| n * 2);
        assert_eq!(doubled.get(), 4);

        count.set(5);
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn test_observer_dropped_stops_notifications() {
        let atom = Atom::new(String::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = atom.observe(move |v: &String| sink.lock().unwrap().push(v.clone()));

        atom.set("a".to_string());
        drop(sub);
        atom.set("b".to_string());

        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string()]);
        assert_eq!(atom.observer_count(), 0);
    }
}

mod app_tests {
    use super::*;

    #[test]
    fn test_summary_tracks_slices() {
        let atoms = AppAtoms::default();
        assert!(atoms.summary.get().user.is_none());

        atoms.user.sign_in(User::new("Grace", "grace@example.com"));
        let session = atoms
            .chat
            .create_session("Ops", vec![Participant::human("u1", "Grace")]);
        atoms
            .chat
            .send_message(&session, "bot", MessageRole::Agent, "hello")
            .unwrap();

        let summary = atoms.summary.get();
        assert_eq!(summary.user.as_deref(), Some("Grace"));
        assert_eq!(summary.unread_messages, 1);

        atoms.chat.mark_session_read(&session);
        assert_eq!(atoms.summary.get().unread_messages, 0);
    }

    #[test]
    fn test_closed_session_rejects_messages() {
        let atoms = AppAtoms::default();
        let session = atoms.chat.create_session("Ops", vec![]);
        atoms
            .chat
            .set_session_status(&session, ChatStatus::Closed)
            .unwrap();

        let err = atoms
            .chat
            .send_message(&session, "u1", MessageRole::User, "anyone?")
            .unwrap_err();
        assert!(matches!(err, PulseError::InvalidTransition { .. }));
        assert!(atoms
            .chat
            .set_session_status(&session, ChatStatus::Active)
            .is_err());
    }

    #[test]
    fn test_role_change_requires_user() {
        let atoms = AppAtoms::default();
        let err = atoms.user.add_role(pulse_core::Role::Admin).unwrap_err();
        assert!(matches!(err, PulseError::NotSignedIn));
    }
}
