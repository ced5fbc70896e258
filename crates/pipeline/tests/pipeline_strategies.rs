mod support;

use pretty_assertions::assert_eq;
use repowiki_generation::ClusterLabelFallback;
use repowiki_pipeline::{ErrorKind, PipelineConfig, Strategy, WikiStore};
use std::sync::atomic::Ordering;
use std::time::Duration;
use support::{grouped_files, harness, FakeHost, ScriptedGenerator, REPO_URL};

fn sorted(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items
}

#[tokio::test]
async fn structural_run_partitions_every_filtered_path() {
    let host = FakeHost::with_files(vec![
        ("src/a.rs", ""),
        ("src/b/c.rs", ""),
        ("docs/guide.md", ""),
        ("README.md", ""),
        ("Cargo.toml", ""),
        ("package-lock.json", ""),
        ("dist/bundle.js", ""),
        ("assets/logo.png", ""),
        ("web/node_modules/react/index.js", ""),
    ]);
    let h = harness(host, ScriptedGenerator::default(), PipelineConfig::default());

    let id = h.wiki.generate_from_paths(REPO_URL).await.expect("run");

    let page = h
        .store
        .find_page_by_repo_url(REPO_URL)
        .await
        .unwrap()
        .expect("page stored");
    assert_eq!(page.id, id);
    assert_eq!(page.title, "acme/widgets");
    assert_eq!(page.branch, "main");
    assert_eq!(page.summary, "Widgets is a toolkit for widgets.");
    assert_eq!(page.short_summary, "Widget toolkit");

    let covered: Vec<String> = page
        .subsystems
        .iter()
        .flat_map(|s| s.subsystem.files.clone())
        .collect();
    assert_eq!(
        sorted(covered),
        sorted(vec![
            "src/a.rs".into(),
            "src/b/c.rs".into(),
            "docs/guide.md".into(),
            "README.md".into(),
            "Cargo.toml".into(),
        ])
    );
    // Structural runs never read file contents.
    assert_eq!(h.generator.synopsis_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn structural_run_survives_unparseable_labels() {
    let host = FakeHost::with_files(vec![("src/a.rs", ""), ("src/b.rs", "")]);
    let generator = ScriptedGenerator {
        path_answer: Some("I think there are two subsystems: core and cli.".into()),
        ..Default::default()
    };
    let h = harness(host, generator, PipelineConfig::default());

    h.wiki.generate_from_paths(REPO_URL).await.expect("run");

    let page = h.store.find_page_by_repo_url(REPO_URL).await.unwrap().unwrap();
    assert!(page.subsystems.is_empty());
    assert_eq!(page.summary, "Widgets is a toolkit for widgets.");
}

#[tokio::test]
async fn content_run_splits_two_blobs_into_two_subsystems() {
    let files: Vec<(String, String)> = "abcdefghijkl"
        .chars()
        .enumerate()
        .map(|(i, letter)| {
            let group = if i < 6 { 0 } else { 1 };
            (format!("src/{letter}.ts"), format!("module {letter} group-{group}"))
        })
        .collect();
    let all_paths: Vec<String> = files.iter().map(|(p, _)| p.clone()).collect();
    let h = harness(
        FakeHost::with_files(files),
        ScriptedGenerator::default(),
        PipelineConfig::default(),
    );

    h.wiki.generate_from_content(REPO_URL).await.expect("run");

    let page = h.store.find_page_by_repo_url(REPO_URL).await.unwrap().unwrap();
    let mut subsystems: Vec<_> = page.subsystems.iter().map(|s| s.subsystem.clone()).collect();
    subsystems.sort_by(|a, b| a.title.cmp(&b.title));

    assert_eq!(subsystems.len(), 2);
    assert_eq!(subsystems[0].title, "Group 0");
    assert_eq!(
        subsystems[0].files,
        vec!["src/a.ts", "src/b.ts", "src/c.ts", "src/d.ts", "src/e.ts", "src/f.ts"]
    );
    assert_eq!(subsystems[1].title, "Group 1");
    assert_eq!(subsystems[1].files.len(), 6);

    let covered: Vec<String> = subsystems.iter().flat_map(|s| s.files.clone()).collect();
    assert_eq!(sorted(covered), sorted(all_paths));
    assert_eq!(page.files.len(), 12);
    assert!(page.files.iter().all(|f| f.embedding.is_some()));
}

#[tokio::test]
async fn content_run_yields_one_subsystem_per_cluster() {
    let h = harness(
        FakeHost::with_files(grouped_files(20, 4)),
        ScriptedGenerator::default(),
        PipelineConfig::default(),
    );

    h.wiki.generate(REPO_URL, Strategy::Content).await.expect("run");

    let page = h.store.find_page_by_repo_url(REPO_URL).await.unwrap().unwrap();
    assert_eq!(page.subsystems.len(), 4);
    for stored in &page.subsystems {
        assert_eq!(stored.subsystem.files.len(), 5);
    }
    let covered: Vec<String> = page
        .subsystems
        .iter()
        .flat_map(|s| s.subsystem.files.clone())
        .collect();
    let expected: Vec<String> = grouped_files(20, 4).into_iter().map(|(p, _)| p).collect();
    assert_eq!(sorted(covered), sorted(expected));
}

#[tokio::test]
async fn one_failed_synopsis_does_not_fail_the_run() {
    let mut files = grouped_files(5, 2);
    files[2].1 = "FAIL group-0".to_string();
    let h = harness(
        FakeHost::with_files(files),
        ScriptedGenerator::default(),
        PipelineConfig::default(),
    );

    h.wiki.generate_from_content(REPO_URL).await.expect("run");

    assert_eq!(h.generator.synopsis_calls.load(Ordering::SeqCst), 5);
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 4);

    let page = h.store.find_page_by_repo_url(REPO_URL).await.unwrap().unwrap();
    let covered: Vec<String> = page
        .subsystems
        .iter()
        .flat_map(|s| s.subsystem.files.clone())
        .collect();
    assert_eq!(covered.len(), 4);
    assert!(!covered.contains(&"src/file_02.ts".to_string()));

    assert_eq!(page.files.len(), 5);
    assert_eq!(page.files[2].synopsis, "");
    assert!(page.files[2].embedding.is_none());
}

#[tokio::test]
async fn embedding_failure_aborts_without_writing() {
    let mut files = grouped_files(6, 2);
    files[4].1 = "EMBED_FAIL group-0".to_string();
    let h = harness(
        FakeHost::with_files(files),
        ScriptedGenerator::default(),
        PipelineConfig::default(),
    );

    let err = h.wiki.generate_from_content(REPO_URL).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);
    assert_eq!(h.store.page_count().await, 0);
}

#[tokio::test]
async fn mismatched_embedding_lengths_abort_without_writing() {
    let mut files = grouped_files(6, 2);
    files[2].1 = "EMBED_SHORT group-0".to_string();
    let h = harness(
        FakeHost::with_files(files),
        ScriptedGenerator::default(),
        PipelineConfig::default(),
    );

    let err = h.wiki.generate_from_content(REPO_URL).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);
    assert_eq!(h.store.page_count().await, 0);
}

#[tokio::test]
async fn large_repositories_go_through_importance_selection() {
    let generator = ScriptedGenerator {
        important: 10,
        ..Default::default()
    };
    let h = harness(
        FakeHost::with_files(grouped_files(60, 3)),
        generator,
        PipelineConfig::default(),
    );

    h.wiki.generate_from_content(REPO_URL).await.expect("run");

    assert_eq!(h.generator.synopsis_calls.load(Ordering::SeqCst), 10);
    let page = h.store.find_page_by_repo_url(REPO_URL).await.unwrap().unwrap();
    assert_eq!(page.files.len(), 10);
    assert_eq!(page.files[0].path, "src/file_00.ts");
}

#[tokio::test]
async fn small_repositories_skip_importance_selection() {
    let h = harness(
        FakeHost::with_files(grouped_files(50, 5)),
        ScriptedGenerator::default(),
        PipelineConfig::default(),
    );

    h.wiki.generate_from_content(REPO_URL).await.expect("run");

    let selection_prompt = repowiki_generation::prompts::important_files(50);
    assert_eq!(h.generator.prompts_seen(&selection_prompt), 0);
    assert_eq!(h.generator.synopsis_calls.load(Ordering::SeqCst), 50);
}

#[tokio::test]
async fn nothing_documentable_is_no_valid_files() {
    for strategy in [Strategy::Paths, Strategy::Content] {
        let host = FakeHost::with_files(vec![
            ("package-lock.json", "{}"),
            ("dist/app.js", "x"),
            ("logo.png", "x"),
        ]);
        let h = harness(host, ScriptedGenerator::default(), PipelineConfig::default());

        let err = h.wiki.generate(REPO_URL, strategy).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoValidFiles, "{}", strategy.as_str());
        assert_eq!(h.store.page_count().await, 0);
    }
}

#[tokio::test]
async fn invalid_url_is_rejected_before_any_external_call() {
    let h = harness(
        FakeHost::with_files(grouped_files(3, 1)),
        ScriptedGenerator::default(),
        PipelineConfig::default(),
    );

    for url in ["", "https://gitlab.com/acme/widgets", "https://github.com/acme"] {
        let err = h.wiki.generate_from_paths(url).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }
    assert_eq!(h.host.calls.load(Ordering::SeqCst), 0);
    assert!(h.generator.requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn run_past_its_budget_is_abandoned() {
    let mut host = FakeHost::with_files(grouped_files(4, 2));
    host.branch_delay = Some(Duration::from_secs(30));
    let config = PipelineConfig {
        run_timeout_secs: Some(5),
        ..Default::default()
    };
    let h = harness(host, ScriptedGenerator::default(), config);

    let err = h.wiki.generate_from_content(REPO_URL).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);
    assert_eq!(h.store.page_count().await, 0);
}

#[tokio::test]
async fn regenerating_replaces_the_page_in_place() {
    let h = harness(
        FakeHost::with_files(grouped_files(10, 2)),
        ScriptedGenerator::default(),
        PipelineConfig::default(),
    );

    let first = h.wiki.generate_from_paths(REPO_URL).await.unwrap();
    let second = h
        .wiki
        .generate_from_content("https://github.com/acme/widgets.git")
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(h.store.page_count().await, 1);
    let page = h.store.find_page_by_repo_url(REPO_URL).await.unwrap().unwrap();
    assert_eq!(page.files.len(), 10);
    assert!(page.subsystems.iter().all(|s| s.subsystem.title.starts_with("Group")));
}

fn two_directory_files() -> Vec<(String, String)> {
    (0..6)
        .map(|i| (format!("src/auth/a{i}.ts"), format!("login step {i} group-0")))
        .chain((0..6).map(|i| (format!("src/db/d{i}.ts"), format!("query {i} group-1"))))
        .collect()
}

#[tokio::test]
async fn unlabeled_clusters_fall_back_to_their_directory() {
    let generator = ScriptedGenerator {
        fail_cluster_labels: true,
        ..Default::default()
    };
    let h = harness(
        FakeHost::with_files(two_directory_files()),
        generator,
        PipelineConfig::default(),
    );

    h.wiki.generate_from_content(REPO_URL).await.expect("run");

    let page = h.store.find_page_by_repo_url(REPO_URL).await.unwrap().unwrap();
    let mut titles: Vec<String> = page
        .subsystems
        .iter()
        .map(|s| s.subsystem.title.clone())
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["src/auth", "src/db"]);
}

#[tokio::test]
async fn drop_fallback_loses_unlabeled_clusters_but_keeps_the_page() {
    let generator = ScriptedGenerator {
        fail_cluster_labels: true,
        ..Default::default()
    };
    let config = PipelineConfig {
        cluster_label_fallback: ClusterLabelFallback::Drop,
        ..Default::default()
    };
    let h = harness(FakeHost::with_files(two_directory_files()), generator, config);

    h.wiki.generate_from_content(REPO_URL).await.expect("run");

    let page = h.store.find_page_by_repo_url(REPO_URL).await.unwrap().unwrap();
    assert!(page.subsystems.is_empty());
    assert_eq!(page.files.len(), 12);
}
