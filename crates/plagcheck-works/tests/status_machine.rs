use plagcheck_works::models::WorkStatus;

#[test]
fn uploaded_can_advance_to_analyzing_but_not_analyzed() {
    assert!(WorkStatus::Uploaded.can_transition_to(WorkStatus::Analyzing));
    assert!(!WorkStatus::Uploaded.can_transition_to(WorkStatus::Analyzed));
}

#[test]
fn analyzing_can_advance_to_analyzed() {
    assert!(WorkStatus::Analyzing.can_transition_to(WorkStatus::Analyzed));
}

#[test]
fn any_state_can_fail() {
    for status in [
        WorkStatus::Uploaded,
        WorkStatus::Analyzing,
        WorkStatus::Analyzed,
        WorkStatus::Failed,
    ] {
        assert!(status.can_transition_to(WorkStatus::Failed));
    }
}

#[test]
fn failed_can_retry_into_analyzing_but_analyzed_is_terminal() {
    assert!(WorkStatus::Failed.can_transition_to(WorkStatus::Analyzing));
    assert!(!WorkStatus::Analyzed.can_transition_to(WorkStatus::Analyzing));
    assert!(!WorkStatus::Analyzed.can_transition_to(WorkStatus::Uploaded));
}

#[test]
fn status_round_trips_through_as_str_and_parse() {
    for status in [
        WorkStatus::Uploaded,
        WorkStatus::Analyzing,
        WorkStatus::Analyzed,
        WorkStatus::Failed,
    ] {
        assert_eq!(WorkStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(WorkStatus::parse("bogus"), None);
}
