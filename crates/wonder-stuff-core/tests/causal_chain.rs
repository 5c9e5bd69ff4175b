//! Integration tests for causal messages and chain walking.

use rstest::rstest;
use wonder_stuff_core::{
    errors_from_error, ErrorCause, ErrorInfo, ErrorKind, ErrorOrder, KindError, OpaqueError,
};

#[rstest]
#[case::kind_cause(ErrorCause::Kind(KindError::new("inner problem", ErrorKind::NOT_FOUND)))]
#[case::opaque_cause(ErrorCause::Opaque(OpaqueError::new("RangeError", "out of range")))]
#[case::multiline_cause(ErrorCause::Kind(KindError::new(
    "line one\nline two",
    ErrorKind::INTERNAL
)))]
fn message_contains_consequence_and_cause(#[case] cause: ErrorCause) {
    let cause_text = ErrorInfo::from_error(cause.as_error_ref()).message_with_name();
    let error = KindError::caused_by("Outer failure", ErrorKind::UNKNOWN, cause);

    let message = error.message();
    let (head, tail) = message
        .split_once("caused by")
        .expect("message should describe the cause");
    assert!(head.contains("Outer failure"));
    assert!(tail.contains(&cause_text));
}

#[test]
fn chain_round_trip_orders_are_reverses() {
    let root = KindError::new("root", ErrorKind::INVALID_INPUT);
    let middle = KindError::caused_by("middle", ErrorKind::INVALID_USE, root);
    let outer = KindError::caused_by("outer", ErrorKind::INTERNAL, middle);

    let forward: Vec<_> =
        errors_from_error(Some(outer.as_error_ref()), ErrorOrder::ConsequenceFirst)
            .map(|e| e.name())
            .collect();
    let mut backward: Vec<_> =
        errors_from_error(Some(outer.as_error_ref()), ErrorOrder::CauseFirst)
            .map(|e| e.name())
            .collect();
    backward.reverse();

    assert_eq!(forward, backward);
    assert_eq!(forward.len(), 3);
}

#[test]
fn std_error_source_follows_causes() {
    use std::error::Error;

    let io = std::io::Error::other("socket closed");
    let inner = KindError::builder("read failed", ErrorKind::INTERNAL)
        .opaque_cause(io)
        .build();
    let outer = KindError::caused_by("request failed", ErrorKind::UNKNOWN, inner);

    let mut depth = 0;
    let mut current: Option<&dyn Error> = Some(&outer);
    while let Some(error) = current {
        depth += 1;
        current = error.source();
    }
    // outer -> inner -> opaque wrapper (the io error has no source)
    assert_eq!(depth, 3);
}
