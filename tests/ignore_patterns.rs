use std::path::Path;

use quartz_config::watch::ignore::relative_str;
use quartz_config::watch::IgnoreMatcher;

#[test]
fn patterns_cover_the_path_and_everything_below() {
    let matcher = IgnoreMatcher::new(&["private", "templates/", "**/*.tmp"]).unwrap();

    assert!(matcher.is_ignored("private"));
    assert!(matcher.is_ignored("private/a/b.md"));
    assert!(matcher.is_ignored("templates/note.md"));
    assert!(matcher.is_ignored("content/draft.tmp"));
    assert!(!matcher.is_ignored("content/private.md"));
    assert!(!matcher.is_ignored("quartz/quartz.config.js"));
}

#[test]
fn vcs_and_dependency_dirs_are_always_ignored() {
    let matcher = IgnoreMatcher::new::<&str>(&[]).unwrap();
    assert!(matcher.is_ignored(".git/index"));
    assert!(matcher.is_ignored("node_modules/pkg/index.js"));
    assert!(!matcher.is_ignored("content/index.md"));
}

#[test]
fn invalid_patterns_are_rejected() {
    let err = IgnoreMatcher::new(&["[unclosed"]).unwrap_err();
    assert!(format!("{err:#}").contains("[unclosed"));
}

#[test]
fn relative_paths_use_forward_slashes() {
    let root = Path::new("/project");
    assert_eq!(
        relative_str(root, Path::new("/project/content/a.md")).as_deref(),
        Some("content/a.md")
    );
    assert_eq!(relative_str(root, Path::new("/elsewhere/a.md")), None);
}
