// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
    platform: CommandDataPlatform,
}

impl Harness {
    fn new(dump: &str, restore: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("live.db");
        std::fs::write(&live, "v1").unwrap();
        let toml = format!(
            "[environments.staging]\ndata_dump = {:?}\ndata_restore = {:?}\n[environments.bare]\n",
            dump.replace("LIVE", &live.display().to_string()),
            restore.replace("LIVE", &live.display().to_string()),
        );
        let config = Config::from_toml(Path::new("rollback.toml"), &toml).unwrap();
        let platform = CommandDataPlatform::new(&config, dir.path().join("dumps"));
        Self { dir, platform }
    }

    fn live(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("live.db")).unwrap()
    }

    fn set_live(&self, content: &str) {
        std::fs::write(self.dir.path().join("live.db"), content).unwrap();
    }
}

fn copying() -> Harness {
    Harness::new("cp LIVE \"$RB_DUMP_PATH\"", "cp \"$RB_DUMP_PATH\" LIVE")
}

#[tokio::test]
async fn dump_then_restore_round_trips_live_data() {
    let h = copying();
    let dump = h.platform.dump("staging").await.unwrap();
    assert!(dump.locator.starts_with("staging-"));
    assert!(dump.locator.ends_with(".dump"));
    assert_eq!(dump.size_bytes, 2);
    assert_eq!(dump.checksum, format!("{:x}", Sha256::digest(b"v1")));

    h.set_live("v2");
    h.platform.restore("staging", &dump.locator).await.unwrap();

    assert_eq!(h.live(), "v1");
}

#[tokio::test]
async fn restoring_twice_matches_restoring_once() {
    let h = copying();
    let dump = h.platform.dump("staging").await.unwrap();
    h.set_live("v2");

    h.platform.restore("staging", &dump.locator).await.unwrap();
    let once = h.live();
    h.platform.restore("staging", &dump.locator).await.unwrap();

    assert_eq!(h.live(), once);
}

#[tokio::test]
async fn each_dump_gets_a_fresh_locator() {
    let h = copying();
    let a = h.platform.dump("staging").await.unwrap();
    let b = h.platform.dump("staging").await.unwrap();
    assert_ne!(a.locator, b.locator);
    assert_eq!(a.checksum, b.checksum);
}

#[tokio::test]
async fn dump_command_that_writes_nothing_fails() {
    let h = Harness::new("true", "true");
    let err = h.platform.dump("staging").await.unwrap_err();
    assert!(err.to_string().contains("did not write"));
}

#[tokio::test]
async fn failing_dump_command_reports_stderr() {
    let h = Harness::new("echo 'db offline' >&2; exit 2", "true");
    let err = h.platform.dump("staging").await.unwrap_err();
    assert!(matches!(
        err,
        AdapterError::CommandFailed { code: 2, ref stderr, .. } if stderr == "db offline"
    ));
}

#[tokio::test]
async fn unconfigured_environment_commands() {
    let h = copying();
    assert!(h.platform.dump("bare").await.unwrap_err().is_not_configured());
    assert!(matches!(
        h.platform.dump("qa").await.unwrap_err(),
        AdapterError::UnknownEnvironment(_)
    ));
}

#[tokio::test]
async fn restore_of_missing_dump_is_not_found() {
    let h = copying();
    let err = h.platform.restore("staging", "staging-gone.dump").await.unwrap_err();
    assert!(matches!(err, AdapterError::NotFound(_)));
}

#[yare::parameterized(
    traversal = { "../etc/passwd" },
    hidden    = { ".hidden" },
    slash     = { "a/b.dump" },
    empty     = { "" },
)]
fn rejects_unsafe_locators(locator: &str) {
    let h = copying();
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let err = rt.block_on(h.platform.inspect(locator)).unwrap_err();
    assert!(matches!(err, AdapterError::InvalidLocator(_)));
}

#[tokio::test]
async fn discard_is_idempotent() {
    let h = copying();
    let dump = h.platform.dump("staging").await.unwrap();

    h.platform.discard(&dump.locator).await.unwrap();
    h.platform.discard(&dump.locator).await.unwrap();

    assert!(matches!(h.platform.inspect(&dump.locator).await, Err(AdapterError::NotFound(_))));
}

#[tokio::test]
async fn fake_restores_dumped_content() {
    let fake = FakeDataPlatform::new();
    fake.set_data("prod", "orders=10");
    let dump = fake.dump("prod").await.unwrap();
    fake.set_data("prod", "orders=0");

    fake.restore("prod", &dump.locator).await.unwrap();

    assert_eq!(fake.data("prod").as_deref(), Some("orders=10"));
    assert_eq!(fake.restored(), vec![dump.locator.clone()]);
    assert_eq!(fake.inspect(&dump.locator).await.unwrap(), dump);
}

#[tokio::test]
async fn fake_restore_failure_once_then_succeeds() {
    let fake = FakeDataPlatform::new();
    let dump = fake.dump("prod").await.unwrap();
    fake.fail_restore_once("disk full");

    assert_eq!(fake.restore("prod", &dump.locator).await.unwrap_err().to_string(), "disk full");
    fake.restore("prod", &dump.locator).await.unwrap();
}
