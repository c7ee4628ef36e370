//! Command handlers: turn parsed arguments into an [`AppConfig`] and print
//! what it produces

use super::commands::{ComponentArgs, NewAppArgs, NewBuildArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::app::{Environment, Strategy};
use crate::client::{BollardDockerClient, Catalog, DockerClient, Git, GitCli};
use crate::config::AppgenConfig;
use crate::fs::{FileSystem, RealFileSystem};
use crate::newapp::{AppConfig, NewAppError};
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Applies command line overrides on top of the environment configuration
pub fn effective_config(common: &ComponentArgs, base: AppgenConfig) -> AppgenConfig {
    AppgenConfig {
        namespace: common.namespace.clone().unwrap_or(base.namespace),
        catalog: common.catalog.clone().or(base.catalog),
        docker_enabled: base.docker_enabled && !common.no_docker,
        insecure_registry: base.insecure_registry || common.insecure_registry,
        ..base
    }
}

fn parse_labels(values: &[String]) -> Result<BTreeMap<String, String>> {
    let labels = Environment::parse(values).context("invalid --labels")?;
    Ok(labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect())
}

/// Builds the engine configuration for one invocation.
///
/// `docker` is only consulted when the configuration enables it.
pub fn build_app_config(
    common: &ComponentArgs,
    config: &AppgenConfig,
    fs: Arc<dyn FileSystem>,
    git: Rc<dyn Git>,
    docker: Option<Rc<dyn DockerClient>>,
) -> Result<AppConfig> {
    let mut app = AppConfig::new(fs, git);

    app.inputs.docker_images = common.docker_images.clone();
    app.inputs.image_streams = common.image_streams.clone();
    app.inputs.source_repositories = common.source_repositories.clone();
    app.inputs.groups = common.groups.clone();

    let g = &mut app.generation;
    g.environment = common.environment.clone();
    g.build_environment = common.build_environment.clone();
    g.labels = parse_labels(&common.labels)?;
    g.name = common.name.clone().unwrap_or_default();
    g.strategy = common.strategy.map(Strategy::from).unwrap_or_default();
    g.context_dir = common.context_dir.clone().unwrap_or_default();
    g.allow_missing_image_stream_tags = common.allow_missing_image_stream_tags;
    g.allow_non_numeric_exposed_ports = common.allow_non_numeric_exposed_ports;
    g.insecure_registry = config.insecure_registry;

    let catalog = Rc::new(config.load_catalog()?);
    debug!(
        image_streams = catalog.image_streams.len(),
        templates = catalog.templates.len(),
        registry_images = catalog.registry.len(),
        "loaded catalog"
    );
    app.set_cluster_clients(
        Rc::clone(&catalog) as Rc<dyn crate::client::ImageStreamClient>,
        Rc::clone(&catalog) as Rc<dyn crate::client::TemplateClient>,
        &config.namespace,
        &config.shared_namespace,
    );
    let docker = if config.docker_enabled { docker } else { None };
    app.set_docker_clients(docker, catalog as Rc<dyn crate::client::RegistryClient>);

    let unknown = app.add_arguments(&common.arguments);
    if !unknown.is_empty() {
        let mut message = format!("did not recognize the argument(s): {}", unknown.join(", "));
        for argument in &unknown {
            for rejection in app.classification.rejections(argument) {
                message.push_str("\n  ");
                message.push_str(&rejection);
            }
        }
        bail!(message);
    }
    for argument in &common.arguments {
        if let Some(description) = app.classification.describe(argument) {
            debug!("{}", description);
        }
    }
    Ok(app)
}

fn connect_docker() -> Option<Rc<dyn DockerClient>> {
    match BollardDockerClient::connect() {
        Ok(client) => Some(Rc::new(client)),
        Err(e) => {
            debug!("Docker daemon unavailable, searching registries only: {}", e);
            None
        }
    }
}

fn setup(common: &ComponentArgs) -> Result<AppConfig> {
    let config = effective_config(common, AppgenConfig::default());
    config.validate()?;
    debug!("{}", config);

    let docker = if config.docker_enabled {
        connect_docker()
    } else {
        None
    };
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem::new());
    build_app_config(common, &config, fs, Rc::new(GitCli), docker)
}

fn report(err: &NewAppError) {
    error!("{}", err);
    if let Some(hint) = err.help_message() {
        eprintln!("\n{}", hint);
    }
}

fn print_result(app: &AppConfig, format: OutputFormat, quiet: bool) -> i32 {
    let formatter = OutputFormatter::new(format);
    let result = match app.run() {
        Ok(result) => result,
        Err(e) => {
            report(&e);
            return 1;
        }
    };
    info!(
        "Generated {} objects for \"{}\"",
        result.list.items.len(),
        result.name
    );

    match formatter.format_list(&result.list) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            error!("Failed to format output: {}", e);
            return 1;
        }
    }
    if !quiet && atty::is(atty::Stream::Stderr) {
        eprint!("\n{}", formatter.format_summary(&result));
    }
    0
}

pub fn handle_new_app(args: &NewAppArgs, quiet: bool) -> i32 {
    let mut app = match setup(&args.common) {
        Ok(app) => app,
        Err(e) => {
            error!("{:#}", e);
            return 1;
        }
    };
    app.inputs.templates = args.templates.clone();
    app.inputs.template_files = args.template_files.clone();
    app.generation.template_parameters = args.template_parameters.clone();
    app.generation.ignore_unknown_parameters = args.ignore_unknown_parameters;
    app.as_search = args.search;
    app.as_list = args.list;

    let format: OutputFormat = args.common.output.into();
    if !app.querying() {
        return print_result(&app, format, quiet);
    }

    let result = match app.run_query() {
        Ok(result) => result,
        Err(e) => {
            report(&e);
            return 1;
        }
    };
    let formatter = OutputFormatter::new(format);
    if atty::is(atty::Stream::Stdout) {
        print!("{}", formatter.format_matches(&result.matches));
        return 0;
    }
    match formatter.format_list(&result.list) {
        Ok(output) => {
            print!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {}", e);
            1
        }
    }
}

pub fn handle_new_build(args: &NewBuildArgs, quiet: bool) -> i32 {
    let mut app = match setup(&args.common) {
        Ok(app) => app,
        Err(e) => {
            error!("{:#}", e);
            return 1;
        }
    };
    let g = &mut app.generation;
    g.expect_to_build = true;
    g.deploy = false;
    g.to = args.to.clone().unwrap_or_default();
    g.output_docker = args.to_docker;
    if g.output_docker && g.to.is_empty() {
        warn!("--to-docker without --to pushes to an image named after the build");
    }

    print_result(&app, args.common.output.into(), quiet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use clap::Parser;

    fn common(args: &[&str]) -> ComponentArgs {
        let mut argv = vec!["appgen", "new-app"];
        argv.extend_from_slice(args);
        match super::super::CliArgs::parse_from(argv).command {
            super::super::Commands::NewApp(a) => a.common,
            _ => unreachable!(),
        }
    }

    fn base() -> AppgenConfig {
        AppgenConfig {
            namespace: "default".to_string(),
            shared_namespace: "openshift".to_string(),
            catalog: None,
            docker_enabled: true,
            insecure_registry: false,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_flags_override_environment() {
        let config = effective_config(
            &common(&["-n", "team-a", "--no-docker", "--insecure-registry"]),
            base(),
        );
        assert_eq!(config.namespace, "team-a");
        assert!(!config.docker_enabled);
        assert!(config.insecure_registry);
        assert_eq!(config.shared_namespace, "openshift");
    }

    #[test]
    fn test_build_app_config_classifies_arguments() {
        let fs = MockFileSystem::new();
        fs.add_dir("/mock/app");
        let args = common(&["mysql", "RACK_ENV=production", "/mock/app", "-l", "team=web"]);

        let app = build_app_config(&args, &base(), Arc::new(fs), Rc::new(GitCli), None).unwrap();
        assert_eq!(app.inputs.components, vec!["mysql"]);
        assert_eq!(app.inputs.source_repositories, vec!["/mock/app"]);
        assert_eq!(app.generation.environment, vec!["RACK_ENV=production"]);
        assert_eq!(app.generation.labels.get("team").map(String::as_str), Some("web"));
        assert_eq!(app.origin_namespace, "default");
    }

    #[test]
    fn test_unknown_arguments_are_reported() {
        let args = common(&["Not Valid"]);
        let err = build_app_config(&args, &base(), Arc::new(MockFileSystem::new()), Rc::new(GitCli), None)
            .unwrap_err();
        assert!(err.to_string().contains("did not recognize the argument(s): Not Valid"));
    }
}
