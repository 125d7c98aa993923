//! Tests for the installed-version lookup, using a scripted `eix`.
#![cfg(unix)]

mod common;

use common::fake_eix;
use ebvcheck::error::Error;
use ebvcheck::model::WorkKey;
use ebvcheck::portage::{Installed, Portage};

fn key(s: &str) -> WorkKey {
    WorkKey::new(s).unwrap()
}

#[tokio::test]
async fn classifies_eix_output() {
    let dir = tempfile::tempdir().unwrap();
    let eix = fake_eix(
        dir.path(),
        &[
            ("dev-python/foo", "printf 'dev-python/foo-1.2.3\\ndev-python/foo-1.1\\n'"),
            ("app-misc/live", "echo app-misc/live-9999"),
        ],
    );
    let portage = Portage::new(eix.to_string_lossy());

    assert_eq!(
        portage.installed_version(&key("dev-python/foo")).await.unwrap(),
        Installed::Version("1.2.3".into())
    );
    assert_eq!(
        portage.installed_version(&key("app-misc/live")).await.unwrap(),
        Installed::Live
    );
    assert_eq!(
        portage.installed_version(&key("dev-util/absent")).await.unwrap(),
        Installed::NotInstalled
    );
}

#[tokio::test]
async fn failing_command_reports_its_output() {
    let dir = tempfile::tempdir().unwrap();
    let eix = fake_eix(dir.path(), &[("bad/pkg", "echo 'database locked' >&2; exit 3")]);
    let portage = Portage::new(eix.to_string_lossy());

    match portage.installed_version(&key("bad/pkg")).await {
        Err(Error::Command { code, stderr, .. }) => {
            assert_eq!(code, 3);
            assert_eq!(stderr, "database locked");
        }
        other => panic!("expected Command error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_command_is_an_io_error() {
    let portage = Portage::new("/nonexistent/eix");
    let result = portage.installed_version(&key("dev-python/foo")).await;
    assert!(matches!(result, Err(Error::Io(_))));
}
