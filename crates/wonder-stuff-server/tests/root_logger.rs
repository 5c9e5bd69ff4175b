//! Root logger lifecycle. Kept in its own test binary so the process-wide
//! logger starts unset.

use wonder_stuff_core::ErrorKind;
use wonder_stuff_server::{get_logger, get_root_logger, set_root_logger, Logger};

#[test]
fn root_logger_is_set_once() {
    assert!(get_root_logger().is_none());

    let missing = get_logger(None).unwrap_err();
    assert_eq!(missing.kind(), &ErrorKind::INTERNAL);

    set_root_logger(Logger::new("first")).unwrap();
    assert_eq!(get_root_logger().unwrap().name(), "first");
    assert_eq!(get_logger(None).unwrap().name(), "first");

    let again = set_root_logger(Logger::new("second")).unwrap_err();
    assert_eq!(again.kind(), &ErrorKind::INTERNAL);
    assert_eq!(get_root_logger().unwrap().name(), "first");
}
