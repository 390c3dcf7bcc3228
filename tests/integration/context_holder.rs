//! Context initialization through the plugin surface

use super::test_utils::{CountingLoader, Project, BASE_CONFIG};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use stylesync::error::{ContextError, PluginError};
use stylesync::output::RESOLVED_VIRTUAL_ID;
use stylesync::StylePlugin;

#[tokio::test]
async fn test_concurrent_pipeline_stages_load_config_once() {
    let project = Project::new(BASE_CONFIG);
    let loader = Arc::new(CountingLoader::with_delay(Duration::from_millis(25)));
    let plugin = StylePlugin::builder(project.options())
        .config_loader(loader.clone())
        .build()
        .unwrap();

    let sources: Vec<_> = (0..8)
        .map(|i| project.write(&format!("src/c{}.tsx", i), "p-4 text-brand"))
        .collect();

    let transforms = join_all(sources.iter().map(|path| plugin.transform(path, "p-4")));
    let loads = join_all((0..4).map(|_| plugin.load(RESOLVED_VIRTUAL_ID)));
    let (transforms, loads) = tokio::join!(transforms, loads);

    assert!(transforms.iter().all(|r| r.is_ok()));
    assert!(loads.iter().all(|r| matches!(r, Ok(Some(_)))));
    assert_eq!(loader.loads(), 1);
    assert_eq!(plugin.context().generation(), 1);
}

#[tokio::test]
async fn test_initialization_failure_is_retried_on_next_request() {
    let project = Project::empty();
    let loader = Arc::new(CountingLoader::new());
    let plugin = StylePlugin::builder(project.options())
        .config_loader(loader.clone())
        .build()
        .unwrap();

    let err = plugin.load(RESOLVED_VIRTUAL_ID).await.unwrap_err();
    assert!(matches!(
        err,
        PluginError::Context(ContextError::ConfigNotFound(_))
    ));
    assert!(plugin.context().current().is_none());

    project.write_config(BASE_CONFIG);
    let css = plugin.load(RESOLVED_VIRTUAL_ID).await.unwrap();
    assert!(css.is_some());
    assert_eq!(loader.loads(), 2);
}

#[tokio::test]
async fn test_invalid_config_is_an_initialization_error() {
    let project = Project::new("[utilities\np-4 = ");
    let plugin = StylePlugin::builder(project.options()).build().unwrap();

    let err = plugin.render().await.unwrap_err();
    assert!(matches!(
        err,
        PluginError::Context(ContextError::Initialization(_))
    ));
}

#[tokio::test]
async fn test_explicit_config_path_is_used() {
    let project = Project::empty();
    project.write("config/styles.toml", BASE_CONFIG);
    let mut options = project.options();
    options.config_path = Some("config/styles.toml".into());
    let plugin = StylePlugin::builder(options).build().unwrap();

    let generation = plugin.context().get().await.unwrap();
    assert_eq!(generation.config_path(), project.path("config/styles.toml"));
    assert!(plugin.watched().contains(&project.id("config/styles.toml")));
}
