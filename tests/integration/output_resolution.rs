//! Output resolution for virtual and physical targets

use super::test_utils::{plugin_with_graph, Project, BASE_CONFIG, EXTENDED_CONFIG};
use stylesync::output::{OutputTarget, RESOLVED_VIRTUAL_ID, VIRTUAL_ID};
use stylesync::StylePlugin;

#[tokio::test]
async fn test_resolution_is_idempotent_without_changes() {
    let project = Project::new(BASE_CONFIG);
    let (plugin, _graph) = plugin_with_graph(&project);
    let a = project.write("src/a.ts", "p-4 text-brand");
    plugin.transform(&a, "p-4 text-brand").await.unwrap();

    let first = plugin.load(RESOLVED_VIRTUAL_ID).await.unwrap().unwrap();
    let second = plugin.load(RESOLVED_VIRTUAL_ID).await.unwrap().unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[tokio::test]
async fn test_every_resolution_rerenders_current_usages() {
    let project = Project::new(BASE_CONFIG);
    let (plugin, _graph) = plugin_with_graph(&project);
    let a = project.write("src/a.ts", "p-4");
    plugin.transform(&a, "p-4").await.unwrap();
    let before = plugin.load(RESOLVED_VIRTUAL_ID).await.unwrap().unwrap();
    assert!(!before.contains("color: var(--color-brand)"));

    let b = project.write("src/b.ts", "text-brand");
    plugin.transform(&b, "text-brand").await.unwrap();
    let after = plugin.load(RESOLVED_VIRTUAL_ID).await.unwrap().unwrap();
    assert!(after.contains("color: var(--color-brand)"));
}

#[tokio::test]
async fn test_virtual_target_ids() {
    let project = Project::new(BASE_CONFIG);
    let (plugin, _graph) = plugin_with_graph(&project);

    assert_eq!(plugin.output_target(), &OutputTarget::Virtual);
    assert_eq!(plugin.resolve_id(VIRTUAL_ID).as_deref(), Some(RESOLVED_VIRTUAL_ID));
    assert!(plugin.resolve_id("./styles.css").is_none());
    assert!(plugin.load("/some/other/module.ts").await.unwrap().is_none());
    assert!(plugin
        .load(&format!("{}?direct", RESOLVED_VIRTUAL_ID))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_optimize_strips_unused_tokens() {
    let project = Project::new(BASE_CONFIG);
    let a = project.write("src/a.ts", "text-brand");

    let (optimized, _graph) = plugin_with_graph(&project);
    optimized.transform(&a, "text-brand").await.unwrap();
    let css = optimized.render().await.unwrap();
    assert!(css.contains("--color-brand"));
    assert!(!css.contains("--space-unused"));

    let mut options = project.options();
    options.optimize_css = false;
    let plain = StylePlugin::builder(options).build().unwrap();
    plain.transform(&a, "text-brand").await.unwrap();
    assert!(plain.render().await.unwrap().contains("--space-unused: 3rem;"));
}

#[tokio::test]
async fn test_physical_target_is_rewritten_on_invalidation() {
    let project = Project::new(BASE_CONFIG);
    let mut options = project.options();
    options.outfile = Some("dist/app.css".into());
    let graph = std::sync::Arc::new(stylesync::host::ModuleGraph::new());
    let plugin = StylePlugin::builder(options)
        .host(graph.clone())
        .build()
        .unwrap();
    let outfile = project.path("dist/app.css");

    assert_eq!(plugin.output_target(), &OutputTarget::Physical(outfile.clone()));
    assert!(plugin.resolve_id(VIRTUAL_ID).is_none());

    let a = project.write("src/a.ts", "p-4");
    plugin.transform(&a, "p-4").await.unwrap();
    assert!(plugin.write_output().await.unwrap());
    assert!(!plugin.write_output().await.unwrap(), "unchanged content is not rewritten");
    assert!(std::fs::read_to_string(&outfile).unwrap().contains("padding: 1rem"));

    plugin.transform(&a, "p-4 text-brand").await.unwrap();
    plugin.handle_hot_update(&a).await.unwrap();
    let written = std::fs::read_to_string(&outfile).unwrap();
    assert!(written.contains("color: var(--color-brand)"));
    assert_eq!(
        graph.invalidated_modules(),
        vec![stylesync::path::FileId::from_path(&outfile).to_string()]
    );

    project.write_config(EXTENDED_CONFIG);
    plugin
        .handle_watcher_change(&project.config_path())
        .await
        .unwrap();
    let written = std::fs::read_to_string(&outfile).unwrap();
    assert!(written.contains("#ff5500"));

    let loaded = plugin.load(outfile.to_str().unwrap()).await.unwrap().unwrap();
    assert_eq!(loaded, written);
}

#[tokio::test]
async fn test_scan_populates_registry_from_disk() {
    let project = Project::new(BASE_CONFIG);
    project.write("src/a.ts", "p-4");
    project.write("src/components/Button.tsx", "text-brand");
    project.write("src/empty.ts", "export {}");
    project.write("node_modules/pkg/index.js", "p-4");
    let (plugin, _graph) = plugin_with_graph(&project);

    let summary = plugin.scan().await.unwrap();
    assert_eq!(summary.files, 3);
    assert_eq!(summary.recorded, 2);
    assert_eq!(summary.failed, 0);
    assert!(plugin.tracked().has(&project.id("src/components/Button.tsx")));
    assert!(!plugin.tracked().has(&project.id("node_modules/pkg/index.js")));
}
