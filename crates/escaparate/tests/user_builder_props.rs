//! Property checks for the user test-data builder.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use escaparate::{FakeClock, UserBuilder, DEFAULT_NAME, DEFAULT_PASSWORD, DEFAULT_ROLE};
use proptest::prelude::*;

fn field() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 @._-]{0,24}"
}

proptest! {
    #[test]
    fn prop_defaults_carry_clock_reading(now in 0u64..4_102_444_800_000) {
        let clock = FakeClock::new(now);
        let user = UserBuilder::with_clock(&clock).build();

        prop_assert_eq!(user.name(), DEFAULT_NAME);
        prop_assert_eq!(user.password(), DEFAULT_PASSWORD);
        prop_assert_eq!(user.role(), DEFAULT_ROLE);
        prop_assert!(user.active());
        prop_assert_eq!(user.email(), format!("test-{now}@example.com"));
    }

    #[test]
    fn prop_last_write_wins(first in field(), second in field(), active in any::<bool>()) {
        let mut builder = UserBuilder::with_clock(&FakeClock::new(0));
        builder
            .with_name(first.clone())
            .with_role(first.clone())
            .with_active_status(!active)
            .with_name(second.clone())
            .with_role(second.clone())
            .with_active_status(active);

        let user = builder.build();
        prop_assert_eq!(user.name(), second.as_str());
        prop_assert_eq!(user.role(), second.as_str());
        prop_assert_eq!(user.active(), active);
    }

    #[test]
    fn prop_build_is_a_snapshot(name in field(), later in field()) {
        let mut builder = UserBuilder::with_clock(&FakeClock::new(7));
        builder.with_name(name.clone());
        let before = builder.build();
        let again = builder.build();
        prop_assert_eq!(&before, &again);

        builder.with_name(later.clone());
        let rebuilt = builder.build();
        prop_assert_eq!(before.name(), name.as_str());
        prop_assert_eq!(rebuilt.name(), later.as_str());
    }

    #[test]
    fn prop_presets_only_differ_in_role_and_name(now in 0u64..4_102_444_800_000) {
        let clock = FakeClock::new(now);
        let admin = UserBuilder::admin_with_clock(&clock).build();
        let regular = UserBuilder::regular_with_clock(&clock).build();

        prop_assert_eq!(admin.role(), "admin");
        prop_assert_eq!(regular.role(), DEFAULT_ROLE);
        prop_assert_eq!(admin.email(), regular.email());
        prop_assert_eq!(admin.password(), regular.password());
        prop_assert_eq!(admin.active(), regular.active());
    }

    #[test]
    fn prop_record_serializes_every_field(name in field(), email in field(), active in any::<bool>()) {
        let mut builder = UserBuilder::with_clock(&FakeClock::new(1));
        builder.with_name(name.clone()).with_email(email.clone()).with_active_status(active);
        let user = builder.build();

        let json = serde_json::to_value(&user).unwrap();
        prop_assert_eq!(
            json,
            serde_json::json!({
                "name": name,
                "email": email,
                "password": DEFAULT_PASSWORD,
                "role": DEFAULT_ROLE,
                "active": active
            })
        );
    }
}

#[test]
fn advancing_the_clock_changes_new_emails_only() {
    let clock = FakeClock::new(1_705_312_800_000);
    let builder = UserBuilder::with_clock(&clock);
    clock.fast_forward_ms(1);
    let later = UserBuilder::with_clock(&clock).build();

    assert_eq!(builder.build().email(), "test-1705312800000@example.com");
    assert_eq!(later.email(), "test-1705312800001@example.com");
}
