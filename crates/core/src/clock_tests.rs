// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_starts_at_fixed_epoch() {
    assert_eq!(FakeClock::new().epoch_ms(), FakeClock::START_MS);
    assert_eq!(FakeClock::at(42).epoch_ms(), 42);
}

#[test]
fn advance_is_visible_through_clones() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_secs(2));
    assert_eq!(other.epoch_ms(), FakeClock::START_MS + 2_000);
}

#[test]
fn advance_saturates() {
    let clock = FakeClock::at(u64::MAX - 1);
    clock.advance(Duration::from_secs(1));
    assert_eq!(clock.epoch_ms(), u64::MAX);
}

#[test]
fn system_clock_is_after_2020() {
    assert!(SystemClock.epoch_ms() > 1_577_836_800_000);
}
