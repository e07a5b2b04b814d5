// tests/watch_classify.rs

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use devloop::assets::StaticKind;
use devloop::layout::Layout;
use devloop::matcher::PatternMatcher;
use devloop::watch::{
    ignore_patterns, rules_from_config, Classifier, ClassifierDirs, Debouncer, EventBatch,
    FileEvent, FileOps, PathKind, RuleRef, WatchRule,
};
use devloop_test_utils::builders::{ConfigFileBuilder, RuleBuilder};

fn classifier_with(rules: Vec<WatchRule>) -> Classifier {
    let cfg = ConfigFileBuilder::new().ignore("**/*.tmp").build();
    let layout = Layout::from_config(&cfg);
    Classifier::new(
        rules,
        ignore_patterns(&layout.output_rel, &cfg.watch.ignore),
        ClassifierDirs::from_layout(&layout, &cfg.app.source_extensions),
        Arc::new(PatternMatcher::new()),
    )
}

fn write(path: &str, at: Instant) -> FileEvent {
    FileEvent::new(path, FileOps::WRITE, at).with_len(10)
}

#[test]
fn rapid_writes_to_one_path_coalesce() {
    let start = Instant::now();
    let mut d = Debouncer::new(Duration::from_millis(30));
    assert!(d.is_idle());

    for i in 0..10 {
        d.add(write("src/main.rs", start + Duration::from_millis(i)));
    }
    assert!(!d.is_ready(start + Duration::from_millis(29)));
    assert!(d.take_if_ready(start + Duration::from_millis(29)).is_none());

    let batch = d.take_if_ready(start + Duration::from_millis(30)).expect("window elapsed");
    assert_eq!(batch.len(), 1);
    assert!(d.is_idle());

    let classified = classifier_with(vec![]).classify(&batch);
    assert_eq!(classified.paths.len(), 1);
}

#[test]
fn window_is_fixed_from_the_first_event() {
    let start = Instant::now();
    let mut d = Debouncer::new(Duration::from_millis(30));
    d.add(write("a.rs", start));
    d.add(write("b.rs", start + Duration::from_millis(25)));
    assert_eq!(d.deadline(), Some(start + Duration::from_millis(30)));

    let batch = d.take_if_ready(start + Duration::from_millis(30)).unwrap();
    assert_eq!(batch.paths().collect::<Vec<_>>(), vec!["a.rs", "b.rs"]);
}

#[test]
fn last_event_per_path_wins() {
    let now = Instant::now();
    let mut batch = EventBatch::new();
    batch.insert(FileEvent::new("x.css", FileOps::CREATE, now));
    batch.insert(FileEvent::new("./x.css", FileOps::REMOVE, now));
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.get("x.css").unwrap().ops, FileOps::REMOVE);
}

#[test]
fn default_rule_covers_sources_styles_and_static_dirs() {
    let c = classifier_with(vec![]);
    let now = Instant::now();
    let batch: EventBatch = [
        "src/main.rs",
        "styles/critical/a.css",
        "styles/normal/b.css",
        "static/public/logo.png",
        "static/private/mail.html",
        "README.md",
    ]
    .into_iter()
    .map(|p| write(p, now))
    .collect();

    let out = c.classify(&batch);
    let kinds: Vec<(&str, PathKind)> = out.paths.iter().map(|p| (p.path.as_str(), p.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("src/main.rs", PathKind::Source),
            ("static/private/mail.html", PathKind::Static(StaticKind::Private)),
            ("static/public/logo.png", PathKind::Static(StaticKind::Public)),
            ("styles/critical/a.css", PathKind::CriticalCss),
            ("styles/normal/b.css", PathKind::NormalCss),
        ]
    );
    assert!(out.paths.iter().all(|p| p.rule == RuleRef::Default));
    assert!(out.needs_hard_reload);
}

#[test]
fn ignored_paths_and_output_dir_are_dropped() {
    let c = classifier_with(vec![]);
    let now = Instant::now();
    let batch: EventBatch = [
        ".git/objects/ab.rs",
        "web/node_modules/x/index.rs",
        "dist/static/assets/public/a.css",
        "static/public/draft.tmp",
    ]
    .into_iter()
    .map(|p| write(p, now))
    .collect();

    assert!(c.classify(&batch).is_empty());
}

#[test]
fn first_matching_rule_wins() {
    let cfg = ConfigFileBuilder::new()
        .with_rule(RuleBuilder::new("templates/**/*.html").restart_process().build())
        .with_rule(RuleBuilder::new("templates/**").run_callbacks_only().build())
        .build();
    let c = classifier_with(rules_from_config(&cfg.watch.rule, cfg.root()));

    let batch: EventBatch = [write("templates/index.html", Instant::now())].into_iter().collect();
    let out = c.classify(&batch);
    assert_eq!(out.paths[0].rule, RuleRef::User(0));
    assert_eq!(out.paths[0].kind, PathKind::Other);
    assert!(out.needs_hard_reload);
}

#[test]
fn opaque_source_rule_does_not_force_a_rebuild() {
    let mut rule = WatchRule::new("src/generated/**");
    rule.treat_source_as_opaque = true;
    let c = classifier_with(vec![rule]);

    let batch: EventBatch = [write("src/generated/schema.rs", Instant::now())].into_iter().collect();
    let out = c.classify(&batch);
    assert_eq!(out.paths[0].kind, PathKind::Source);
    assert!(!out.needs_hard_reload);
    assert!(!c.needs_recompile(&out.paths[0]));
}

#[test]
fn metadata_only_noise_is_dropped_unless_batch_has_real_changes() {
    let c = classifier_with(vec![]);
    let now = Instant::now();
    let touch = FileEvent::new("src/lib.rs", FileOps::METADATA, now).with_len(120);

    let only_noise: EventBatch = [touch.clone()].into_iter().collect();
    assert!(c.classify(&only_noise).is_empty());

    let mixed: EventBatch = [touch, write("static/public/a.png", now)].into_iter().collect();
    assert_eq!(c.classify(&mixed).paths.len(), 2);

    let empty_file: EventBatch = [FileEvent::new("src/new.rs", FileOps::METADATA, now).with_len(0)]
        .into_iter()
        .collect();
    assert_eq!(c.classify(&empty_file).paths.len(), 1);
}

#[test]
fn rebuilding_notice_skipped_only_when_every_rule_opts_out() {
    let mut quiet = WatchRule::new("**/*.rs");
    quiet.skip_rebuilding_notice = true;
    let c = classifier_with(vec![quiet]);
    let now = Instant::now();

    let quiet_batch: EventBatch = [write("src/a.rs", now)].into_iter().collect();
    assert!(!c.wants_rebuilding_notice(&c.classify(&quiet_batch)));

    let mixed: EventBatch = [write("src/a.rs", now), write("static/public/x.png", now)]
        .into_iter()
        .collect();
    assert!(c.wants_rebuilding_notice(&c.classify(&mixed)));
}
