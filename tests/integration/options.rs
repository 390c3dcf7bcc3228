//! Integration tests for layered plugin options

use super::test_utils::{with_env, without_env, Project, BASE_CONFIG};
use std::path::Path;
use stylesync::config::OptionsLoader;
use stylesync::output::OutputTarget;
use stylesync::{PluginError, StylePlugin};

#[test]
fn test_project_file_overrides_defaults() {
    let project = Project::new(BASE_CONFIG);
    project.write(
        "stylesync.toml",
        r#"
outfile = "public/app.css"
exclude = ["**/legacy/**"]

[logging]
format = "json"
"#,
    );

    let options = without_env(|| OptionsLoader::load(project.root())).unwrap();
    assert_eq!(options.cwd.as_deref(), Some(project.root()));
    assert_eq!(options.outfile.as_deref(), Some(Path::new("public/app.css")));
    assert_eq!(options.exclude, vec!["**/legacy/**".to_string()]);
    assert_eq!(options.logging.format, "json");
    assert!(options.optimize_css);
}

#[test]
fn test_environment_overrides_project_file() {
    let project = Project::new(BASE_CONFIG);
    project.write("stylesync.toml", "optimize_css = true\n");

    let options = with_env(
        &[
            ("STYLESYNC_OPTIMIZE_CSS", "false"),
            ("STYLESYNC_LOGGING__LEVEL", "trace"),
            ("STYLESYNC_INCLUDE", "src/**/*.ts;pages/**/*.vue"),
        ],
        || OptionsLoader::load(project.root()),
    )
    .unwrap();

    assert!(!options.optimize_css);
    assert_eq!(options.logging.level, "trace");
    assert_eq!(
        options.include,
        vec!["src/**/*.ts".to_string(), "pages/**/*.vue".to_string()]
    );
}

#[test]
fn test_invalid_options_file_is_rejected() {
    let project = Project::new(BASE_CONFIG);
    project.write("stylesync.toml", "include = []\n");

    let err = without_env(|| OptionsLoader::load(project.root())).unwrap_err();
    assert!(matches!(err, PluginError::Options(_)));
}

#[test]
fn test_loaded_options_drive_the_plugin() {
    let project = Project::new(BASE_CONFIG);
    project.write("stylesync.toml", "outfile = \"dist/styles.css\"\n");

    let options = without_env(|| OptionsLoader::load(project.root())).unwrap();
    let plugin = StylePlugin::builder(options).build().unwrap();
    assert_eq!(
        plugin.output_target(),
        &OutputTarget::Physical(project.path("dist/styles.css"))
    );
    assert!(plugin.filter().should_process_path(&project.path("src/App.tsx")));
}

#[test]
fn test_invalid_glob_fails_plugin_build() {
    let project = Project::new(BASE_CONFIG);
    let mut options = project.options();
    options.include = vec!["src/[".to_string()];
    assert!(matches!(
        StylePlugin::builder(options).build(),
        Err(PluginError::Options(_))
    ));
}

#[test]
fn test_environment_include_keeps_brace_groups() {
    let project = Project::new(BASE_CONFIG);

    let options = with_env(
        &[
            ("STYLESYNC_INCLUDE", "src/**/*.{ts,tsx}"),
            ("STYLESYNC_EXCLUDE", "**/{dist,build}/**;**/*.test.{ts,tsx}"),
        ],
        || OptionsLoader::load(project.root()),
    )
    .unwrap();

    assert_eq!(options.include, vec!["src/**/*.{ts,tsx}".to_string()]);
    assert_eq!(
        options.exclude,
        vec!["**/{dist,build}/**".to_string(), "**/*.test.{ts,tsx}".to_string()]
    );

    let plugin = StylePlugin::builder(options).build().unwrap();
    assert!(plugin.filter().should_process_path(&project.path("src/App.tsx")));
    assert!(!plugin.filter().should_process_path(&project.path("src/App.test.tsx")));
    assert!(!plugin.filter().should_process_path(&project.path("src/styles.css")));
}
