use zoning_lookup::models::session::{SessionState, TransportKind};

const ALL: [SessionState; 4] = [
    SessionState::Pending,
    SessionState::Initialized,
    SessionState::Active,
    SessionState::Closed,
];

#[test]
fn forward_transitions_are_allowed() {
    assert!(SessionState::Pending.can_transition_to(SessionState::Initialized));
    assert!(SessionState::Initialized.can_transition_to(SessionState::Active));
    assert!(SessionState::Active.can_transition_to(SessionState::Closed));
}

#[test]
fn any_open_state_can_close() {
    for state in [SessionState::Pending, SessionState::Initialized, SessionState::Active] {
        assert!(state.can_transition_to(SessionState::Closed), "{state:?}");
    }
}

#[test]
fn closed_is_terminal() {
    for next in ALL {
        assert!(!SessionState::Closed.can_transition_to(next), "{next:?}");
    }
}

#[test]
fn backward_and_skipping_transitions_are_refused() {
    assert!(!SessionState::Active.can_transition_to(SessionState::Initialized));
    assert!(!SessionState::Initialized.can_transition_to(SessionState::Pending));
    assert!(!SessionState::Pending.can_transition_to(SessionState::Active));
    for state in ALL {
        assert!(!state.can_transition_to(state), "{state:?} -> itself");
    }
}

#[test]
fn only_registered_states_are_open() {
    assert!(!SessionState::Pending.is_open());
    assert!(SessionState::Initialized.is_open());
    assert!(SessionState::Active.is_open());
    assert!(!SessionState::Closed.is_open());
}

#[test]
fn serialized_names_are_snake_case() {
    assert_eq!(
        serde_json::to_value(SessionState::Initialized).unwrap(),
        "initialized"
    );
    assert_eq!(
        serde_json::to_value(TransportKind::RequestResponse).unwrap(),
        "request_response"
    );
}
