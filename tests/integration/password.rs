//! Password helper against a real state directory.

use crate::temp_dir;

use std::time::Duration;

use keel_services::helper::{read_password_from_helper, read_password_with_timeout, HelperError};

#[tokio::test]
async fn helper_can_derive_the_password_from_the_state_dir() {
    let dir = temp_dir("helper");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("pw-hint"), "from-the-state-dir\n").unwrap();

    // A realistic helper: looks up material under $BRIG_PATH.
    let pw = read_password_from_helper("cat \"$BRIG_PATH/pw-hint\"", &dir)
        .await
        .unwrap();
    assert_eq!(pw, "from-the-state-dir");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn failing_helper_is_a_hard_error() {
    let dir = temp_dir("helper-fail");
    std::fs::create_dir_all(&dir).unwrap();

    // The hint file does not exist, so cat fails.
    let err = read_password_from_helper("cat \"$BRIG_PATH/pw-hint\"", &dir)
        .await
        .unwrap_err();
    assert!(matches!(err, HelperError::Failed { .. }));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn hung_helper_is_killed_at_the_deadline() {
    let dir = temp_dir("helper-hang");
    std::fs::create_dir_all(&dir).unwrap();

    let err = read_password_with_timeout("sleep 30", &dir, Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, HelperError::Timeout(_)));

    let _ = std::fs::remove_dir_all(&dir);
}
