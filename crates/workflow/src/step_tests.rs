// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    version = { "acme/setup@v2" },
    semver = { "acme/setup@v2.1.0" },
    branch_name = { "acme/setup@release-2024" },
    sha = { "acme/setup@0123456789abcdef0123456789abcdef01234567" },
)]
fn explicit_accepts(spec: &str) {
    assert!(ActionRef::parse(spec, PinPolicy::Explicit).is_ok(), "{}", spec);
}

#[parameterized(
    version = { "acme/setup@v2" },
    minor = { "acme/setup@v2.1" },
    patch = { "acme/setup@v2.1.3" },
    sha = { "acme/setup@0123456789abcdef0123456789abcdef01234567" },
)]
fn strict_accepts(spec: &str) {
    assert!(ActionRef::parse(spec, PinPolicy::Strict).is_ok(), "{}", spec);
}

#[parameterized(
    named_branch = { "acme/setup@release-2024" },
    short_sha = { "acme/setup@0123abc" },
    four_parts = { "acme/setup@v1.2.3.4" },
    no_v = { "acme/setup@1.2" },
)]
fn strict_rejects(spec: &str) {
    assert!(matches!(
        ActionRef::parse(spec, PinPolicy::Strict),
        Err(PinError::NotStrict(_))
    ));
}

#[parameterized(
    latest = { "acme/setup@latest" },
    main = { "acme/setup@main" },
    master = { "acme/setup@master" },
    head = { "acme/setup@HEAD" },
)]
fn floating_refs_rejected(spec: &str) {
    assert!(matches!(
        ActionRef::parse(spec, PinPolicy::Explicit),
        Err(PinError::Floating(_))
    ));
}

#[test]
fn missing_pin_rejected() {
    assert_eq!(
        ActionRef::parse("acme/setup", PinPolicy::Explicit),
        Err(PinError::Unpinned("acme/setup".to_string()))
    );
    assert_eq!(
        ActionRef::parse("acme/setup@", PinPolicy::Explicit),
        Err(PinError::Unpinned("acme/setup@".to_string()))
    );
}

#[parameterized(
    no_owner = { "setup@v1" },
    empty_name = { "acme/@v1" },
    nested = { "acme/setup/extra@v1" },
    traversal = { "acme/setup@../../bin" },
)]
fn malformed_rejected(spec: &str) {
    assert!(matches!(
        ActionRef::parse(spec, PinPolicy::Explicit),
        Err(PinError::Malformed(_))
    ));
}

#[test]
fn action_ref_display_round_trips_components() {
    let action = ActionRef::parse("acme/publish@v2", PinPolicy::Explicit).unwrap();
    assert_eq!(action.owner, "acme");
    assert_eq!(action.name, "publish");
    assert_eq!(action.git_ref, "v2");
    assert_eq!(action.to_string(), "acme/publish@v2");
}

#[test]
fn display_name_prefers_name_then_id() {
    let mut step = StepDef::run("cargo build --release\ncargo test");
    assert_eq!(step.display_name(0), "cargo build --release");
    step.id = Some("build".to_string());
    assert_eq!(step.display_name(0), "build");
    step.name = Some("Build it".to_string());
    assert_eq!(step.display_name(0), "Build it");
}

#[test]
fn display_name_for_empty_command_uses_position() {
    assert_eq!(StepDef::run("  ").display_name(2), "step 3");
}

#[test]
fn pin_policy_from_str() {
    assert_eq!("strict".parse::<PinPolicy>(), Ok(PinPolicy::Strict));
    assert_eq!("explicit".parse::<PinPolicy>(), Ok(PinPolicy::Explicit));
    assert!("loose".parse::<PinPolicy>().is_err());
}
