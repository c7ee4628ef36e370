use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Generates application definitions from images, templates and source code
#[derive(Parser, Debug)]
#[command(
    name = "appgen",
    about = "Generates application definitions from images, templates and source code",
    version,
    author,
    long_about = "appgen resolves image names, image streams, templates and source \
                  repositories into image streams, build configs, deployment configs and \
                  services, printed as a list ready to be created on a cluster."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Create an application from images, templates or source code",
        long_about = "Resolves each argument to an image, image stream, template or source \
                      repository and generates the objects that build and deploy it.\n\n\
                      Examples:\n  \
                      appgen new-app mysql\n  \
                      appgen new-app ruby~https://github.com/openshift/ruby-hello-world.git\n  \
                      appgen new-app ./app --strategy docker\n  \
                      appgen new-app mysql+ruby~./app --env RACK_ENV=production\n  \
                      appgen new-app --search ruby"
    )]
    NewApp(NewAppArgs),

    #[command(
        about = "Create a build configuration from source code or a Dockerfile",
        long_about = "Like new-app, but every component builds source and no deployment \
                      or service is generated.\n\n\
                      Examples:\n  \
                      appgen new-build https://github.com/openshift/ruby-hello-world.git\n  \
                      appgen new-build ruby~./app --to myapp:v1\n  \
                      appgen new-build ./app --to-docker --to registry.example.com/team/app"
    )]
    NewBuild(NewBuildArgs),
}

/// Arguments shared by `new-app` and `new-build`
#[derive(Args, Debug, Clone, Default)]
pub struct ComponentArgs {
    #[arg(
        value_name = "ARG",
        help = "Images, image streams, templates, source locations or KEY=VALUE pairs"
    )]
    pub arguments: Vec<String>,

    #[arg(long = "image", visible_alias = "docker-image", value_name = "IMAGE", help = "Docker image to include")]
    pub docker_images: Vec<String>,

    #[arg(short = 'i', long = "image-stream", value_name = "STREAM", help = "Image stream to include")]
    pub image_streams: Vec<String>,

    #[arg(long = "code", value_name = "LOCATION", help = "Source code location to build")]
    pub source_repositories: Vec<String>,

    #[arg(long = "group", value_name = "A+B", help = "Components to deploy together")]
    pub groups: Vec<String>,

    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", help = "Environment variable for deployments")]
    pub environment: Vec<String>,

    #[arg(long = "build-env", value_name = "KEY=VALUE", help = "Environment variable for builds")]
    pub build_environment: Vec<String>,

    #[arg(short = 'l', long = "labels", value_name = "KEY=VALUE", help = "Label applied to every object")]
    pub labels: Vec<String>,

    #[arg(long, value_name = "NAME", help = "Name of the generated objects")]
    pub name: Option<String>,

    #[arg(long, value_enum, help = "Build strategy for source repositories")]
    pub strategy: Option<StrategyArg>,

    #[arg(long = "context-dir", value_name = "DIR", help = "Directory in the repository to build")]
    pub context_dir: Option<String>,

    #[arg(long = "allow-missing-imagestream-tags", help = "Accept image streams whose tags have no image yet")]
    pub allow_missing_image_stream_tags: bool,

    #[arg(long = "allow-non-numeric-exposed-ports", help = "Ignore non-numeric EXPOSE entries in Dockerfiles")]
    pub allow_non_numeric_exposed_ports: bool,

    #[arg(long = "insecure-registry", help = "Allow images from insecure registries")]
    pub insecure_registry: bool,

    #[arg(short = 'n', long, value_name = "NAMESPACE", help = "Namespace the objects are generated for")]
    pub namespace: Option<String>,

    #[arg(long, value_name = "FILE", help = "YAML catalog of image streams, templates and registry images")]
    pub catalog: Option<PathBuf>,

    #[arg(long = "no-docker", help = "Do not search the local Docker daemon")]
    pub no_docker: bool,

    #[arg(
        short = 'o',
        long,
        value_enum,
        default_value = "yaml",
        help = "Output format"
    )]
    pub output: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct NewAppArgs {
    #[command(flatten)]
    pub common: ComponentArgs,

    #[arg(long = "template", value_name = "TEMPLATE", help = "Template to process")]
    pub templates: Vec<String>,

    #[arg(short = 'f', long = "file", value_name = "FILE", help = "Template file to process")]
    pub template_files: Vec<String>,

    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", help = "Template parameter value")]
    pub template_parameters: Vec<String>,

    #[arg(long = "ignore-unknown-parameters", help = "Ignore parameters the template does not define")]
    pub ignore_unknown_parameters: bool,

    #[arg(short = 'S', long, help = "Search for components instead of creating them")]
    pub search: bool,

    #[arg(short = 'L', long, conflicts_with = "search", help = "List every available component")]
    pub list: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct NewBuildArgs {
    #[command(flatten)]
    pub common: ComponentArgs,

    #[arg(long, value_name = "IMAGE", help = "Image stream tag or pull spec to push the build output to")]
    pub to: Option<String>,

    #[arg(long = "to-docker", help = "Push the build output to a Docker registry")]
    pub to_docker: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Source,
    Docker,
}

impl From<StrategyArg> for crate::app::Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Source => crate::app::Strategy::Source,
            StrategyArg::Docker => crate::app::Strategy::Docker,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormatArg {
    #[default]
    Yaml,
    Json,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Json => super::output::OutputFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_new_app_args() {
        let args = CliArgs::parse_from(["appgen", "new-app", "mysql"]);
        match args.command {
            Commands::NewApp(new_app) => {
                assert_eq!(new_app.common.arguments, vec!["mysql".to_string()]);
                assert_eq!(new_app.common.output, OutputFormatArg::Yaml);
                assert!(new_app.common.strategy.is_none());
                assert!(!new_app.search);
                assert!(!new_app.list);
            }
            _ => panic!("Expected NewApp command"),
        }
    }

    #[test]
    fn test_new_app_with_options() {
        let args = CliArgs::parse_from([
            "appgen",
            "new-app",
            "ruby~./app",
            "--image",
            "mysql",
            "--docker-image",
            "redis",
            "-e",
            "A=1",
            "--param",
            "DB=x",
            "--strategy",
            "docker",
            "--name",
            "web",
            "-o",
            "json",
        ]);

        match args.command {
            Commands::NewApp(new_app) => {
                assert_eq!(new_app.common.docker_images, vec!["mysql", "redis"]);
                assert_eq!(new_app.common.environment, vec!["A=1"]);
                assert_eq!(new_app.template_parameters, vec!["DB=x"]);
                assert_eq!(new_app.common.strategy, Some(StrategyArg::Docker));
                assert_eq!(new_app.common.name.as_deref(), Some("web"));
                assert_eq!(new_app.common.output, OutputFormatArg::Json);
            }
            _ => panic!("Expected NewApp command"),
        }
    }

    #[test]
    fn test_search_and_list_conflict() {
        assert!(CliArgs::try_parse_from(["appgen", "new-app", "--search", "--list"]).is_err());
    }

    #[test]
    fn test_new_build_to_docker() {
        let args = CliArgs::parse_from([
            "appgen",
            "new-build",
            "./app",
            "--to",
            "registry.example.com/team/app",
            "--to-docker",
        ]);
        match args.command {
            Commands::NewBuild(new_build) => {
                assert_eq!(new_build.to.as_deref(), Some("registry.example.com/team/app"));
                assert!(new_build.to_docker);
            }
            _ => panic!("Expected NewBuild command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["appgen", "-v", "new-app", "mysql"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["appgen", "--log-level", "debug", "new-build", "./app"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
    }
}
