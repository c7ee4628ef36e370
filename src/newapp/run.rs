//! Generating objects from resolved components

use super::templates::process_template;
use super::{AppConfig, AppResult, NewAppError, QueryResult, ResolvedComponents};
use crate::api::{
    BuildConfig, DockerImageReference, ImageStream, Object, ObjectList, ObjectReference,
    DEFAULT_IMAGE_TAG,
};
use crate::app::{
    add_services, pipeline_objects, strategy_and_source_for_repository, AcceptNew,
    AcceptNonExistentImageStream, AcceptUnique, Acceptor, Acceptors, ComponentId, Environment,
    ImageRef, Pipeline, PipelineBuilder, PipelineGroup, ResolveError, SourceError, Strategy,
};
use regex::Regex;
use std::rc::Rc;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Leaves room for the `-N` suffix deployments add to the name
const MAX_ENFORCED_NAME_LENGTH: usize = 58;

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"))
}

/// Checks a `--name` value
pub fn validate_enforced_name(name: &str) -> Result<(), NewAppError> {
    if name.len() > MAX_ENFORCED_NAME_LENGTH || !name_regex().is_match(name) {
        return Err(NewAppError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Checks a `--to` value
pub fn validate_output_image_reference(reference: &str) -> Result<(), NewAppError> {
    DockerImageReference::parse(reference)
        .map(|_| ())
        .map_err(|_| NewAppError::InvalidOutputReference(reference.to_string()))
}

/// A pull spec with the default tag filled in, for comparisons
fn normalize_pull_spec(spec: &str) -> String {
    match DockerImageReference::parse(spec) {
        Ok(mut reference) => {
            if reference.tag.is_empty() && reference.id.is_empty() {
                reference.tag = DEFAULT_IMAGE_TAG.to_string();
            }
            reference.exact()
        }
        Err(_) => spec.to_string(),
    }
}

fn build_configs(objects: &[Object]) -> Vec<BuildConfig> {
    objects
        .iter()
        .filter_map(|object| match object {
            Object::BuildConfig(bc) => Some(bc.clone()),
            Object::Raw(value) if object.kind() == "BuildConfig" => {
                serde_json::from_value(value.clone()).ok()
            }
            _ => None,
        })
        .collect()
}

impl AppConfig {
    fn environments(&self) -> Result<(Environment, Environment, Environment), NewAppError> {
        let g = &self.generation;
        Ok((
            Environment::parse(&g.environment)?,
            Environment::parse(&g.build_environment)?,
            Environment::parse(&g.template_parameters)?,
        ))
    }

    /// Components that build with the source strategy must use a builder
    /// image unless the user chose the strategy
    fn validate_builders(&self, resolved: &ResolvedComponents) -> Result<(), NewAppError> {
        if self.generation.strategy != Strategy::Unspecified {
            return Ok(());
        }
        let b = &resolved.builder;
        let mut errors = Vec::new();
        for (_, component) in b.components() {
            let (Some(m), Some(repo)) = (&component.resolved_match, component.uses()) else {
                continue;
            };
            let repo = b.repository(repo);
            if component.expect_to_build && !m.builder && repo.strategy() == Strategy::Source {
                errors.push(NewAppError::NotABuilder {
                    image: m.name.clone(),
                    repository: repo.location().to_string(),
                });
            }
        }
        NewAppError::aggregate(errors)
    }

    fn pipeline_for(
        &self,
        resolved: &mut ResolvedComponents,
        builder: &mut PipelineBuilder,
        id: ComponentId,
    ) -> Result<Pipeline, NewAppError> {
        let component = resolved.builder.component(id);
        let from = component.to_string();
        let resolved_match = component.resolved_match.clone();

        if !component.expect_to_build {
            let m = resolved_match.ok_or_else(|| ResolveError::no_match(&from))?;
            let image = ImageRef::from_match(&m)?;
            if !image.as_image_stream {
                warn!(
                    image = %from,
                    "Could not find an image stream match. Make sure that a Docker image with that tag is available on the node for the deployment to succeed."
                );
            }
            debug!(component = %from, "including image");
            return Ok(builder.new_image_pipeline(&from, image)?);
        }

        let repo_id = component.uses().ok_or_else(|| SourceError::NoSourceProvided {
            components: vec![from.clone()],
        })?;
        let input = match &resolved_match {
            Some(m) => {
                let image = ImageRef::from_match(m)?;
                if !image.as_image_stream && from != "scratch" {
                    warn!(
                        image = %from,
                        "Could not find an image stream match. Make sure that a Docker image with that tag is available on the node for the build to succeed."
                    );
                }
                Some(image)
            }
            None => None,
        };
        let repo = resolved.builder.repository_mut(repo_id);
        let (strategy, source) =
            strategy_and_source_for_repository(repo, self.resolvers.git.as_ref())?;
        debug!(component = %from, source = %repo.location(), "building from source");
        Ok(builder.new_build_pipeline(&from, input, Some(strategy), Some(source))?)
    }

    /// One pipeline per image component; each group shares one deployment
    fn build_pipelines(
        &self,
        resolved: &mut ResolvedComponents,
        env: &Environment,
        build_env: &Environment,
    ) -> Result<PipelineGroup, NewAppError> {
        let g = &self.generation;
        let mut builder = PipelineBuilder::new(&g.name, build_env.clone(), g.output_docker).to(&g.to);
        let mut pipelines = PipelineGroup::default();
        for group in resolved.image_groups() {
            debug!(group = ?group, "found group");
            let mut common = PipelineGroup::default();
            for id in group {
                let mut pipeline = self.pipeline_for(resolved, &mut builder, id)?;
                if g.deploy {
                    pipeline.needs_deployment(env, &g.labels);
                }
                common.0.push(pipeline);
            }
            common.reduce();
            pipelines.0.extend(common.0);
        }
        Ok(pipelines)
    }

    /// Processes template components, returning the last template's name
    fn build_templates(
        &self,
        resolved: &ResolvedComponents,
        params: &Environment,
        env: &Environment,
    ) -> Result<(String, Vec<Object>), NewAppError> {
        let mut name = String::new();
        let mut objects = Vec::new();
        for id in resolved.template_components() {
            let component = resolved.builder.component(id);
            let Some(template) = component.resolved_match.as_ref().and_then(|m| m.template()) else {
                continue;
            };
            debug!(template = template.name(), namespace = %self.origin_namespace, "processing template");
            let processed = process_template(
                template,
                params,
                &self.generation.labels,
                env,
                self.generation.ignore_unknown_parameters,
            )?;
            objects.extend(processed.into_iter().map(Object::Raw));
            name = template.name().to_string();
        }
        Ok((name, objects))
    }

    fn acceptors(&self) -> Acceptors {
        let mut acceptors: Vec<Box<dyn Acceptor>> = vec![Box::new(AcceptUnique::new()), Box::new(AcceptNew)];
        if let Some(client) = &self.image_client {
            acceptors.push(Box::new(AcceptNonExistentImageStream::new(
                Rc::clone(client),
                self.origin_namespace.clone(),
            )));
        }
        Acceptors(acceptors)
    }

    fn find_image_stream(&self, objects: &[Object], name: &str, namespace: &str) -> Option<ImageStream> {
        let generated = objects.iter().find_map(|object| match object {
            Object::ImageStream(stream)
                if stream.name() == name
                    && (stream.namespace().is_empty() || stream.namespace() == namespace) =>
            {
                Some(stream.clone())
            }
            _ => None,
        });
        generated.or_else(|| {
            self.image_client
                .as_ref()
                .and_then(|client| client.get_image_stream(namespace, name).ok())
        })
    }

    /// The Docker image a reference ends up pulling, when it can be known
    fn follow_to_docker_image(&self, reference: &ObjectReference, objects: &[Object]) -> Option<String> {
        match reference.kind.as_str() {
            "DockerImage" => Some(normalize_pull_spec(&reference.name)),
            "ImageStreamTag" => {
                let (name, tag) = reference.name.split_once(':')?;
                let namespace = if reference.namespace.is_empty() {
                    self.origin_namespace.as_str()
                } else {
                    reference.namespace.as_str()
                };
                let stream = self.find_image_stream(objects, name, namespace)?;
                if let Some(from) = stream.spec_tag(tag).and_then(|t| t.from.as_ref()) {
                    if from.kind == "DockerImage" {
                        return Some(normalize_pull_spec(&from.name));
                    }
                }
                let repository = &stream.spec.docker_image_repository;
                (!repository.is_empty()).then(|| normalize_pull_spec(&format!("{}:{}", repository, tag)))
            }
            _ => None,
        }
    }

    /// The input of the first build that outputs its own input
    fn circular_reference(&self, objects: &[Object]) -> Option<String> {
        for bc in build_configs(objects) {
            let (Some(input), Some(output)) = (bc.spec.strategy.input_reference(), bc.spec.output.to.as_ref())
            else {
                continue;
            };
            let docker_input = self.follow_to_docker_image(input, objects);
            let docker_output = self.follow_to_docker_image(output, objects);
            if let (Some(i), Some(o)) = (&docker_input, &docker_output) {
                if i == o {
                    return Some(i.clone());
                }
            }

            let namespaced = |r: &ObjectReference| {
                let namespace = if r.namespace.is_empty() {
                    self.origin_namespace.clone()
                } else {
                    r.namespace.clone()
                };
                (r.kind.clone(), namespace, r.name.clone())
            };
            let (input, output) = (namespaced(input), namespaced(output));
            if input == output {
                return Some(format!("{}/{}", input.1, input.2));
            }
        }
        None
    }

    /// Resolves all inputs and generates the objects of the application
    pub fn run(&self) -> Result<AppResult, NewAppError> {
        let (env, build_env, params) = self.environments()?;
        let g = &self.generation;

        let mut resolved = self.resolve()?;
        let repositories = resolved.repositories();
        if repositories.is_empty() && resolved.components().is_empty() {
            return Err(NewAppError::NoInputs);
        }

        self.validate_builders(&resolved)?;
        if !g.name.is_empty() {
            validate_enforced_name(&g.name)?;
        }
        if !g.to.is_empty() {
            validate_output_image_reference(&g.to)?;
        }
        if resolved.image_groups().len() > 1 && !g.name.is_empty() {
            return Err(NewAppError::InvalidArguments(
                "only one component or source repository can be used when specifying a name".to_string(),
            ));
        }
        if resolved.with_source().len() > 1 && !g.to.is_empty() {
            return Err(NewAppError::InvalidArguments(
                "only one component with source can be used when specifying an output image reference"
                    .to_string(),
            ));
        }

        let pipelines = self.build_pipelines(&mut resolved, &env, &build_env)?;
        let mut objects = pipeline_objects(&pipelines, &self.acceptors())?;
        add_services(&mut objects, false);

        let (template_name, template_objects) = self.build_templates(&resolved, &params, &env)?;
        if let Some(reference) = self.circular_reference(&template_objects) {
            let hint = if g.name.is_empty() {
                ", override artifact names with --name"
            } else {
                ""
            };
            warn!(reference = %reference, "output image should be different than input{}", hint);
        }
        if let Some(reference) = self.circular_reference(&objects) {
            let (enforced, hint) = if g.expect_to_build {
                (g.to.is_empty(), ", set a different tag with --to")
            } else {
                (g.name.is_empty(), ", override artifact names with --name")
            };
            if enforced {
                return Err(NewAppError::CircularOutput { reference, hint });
            }
            warn!(reference = %reference, "output image should be different than input");
        }
        objects.extend(template_objects);

        let name = [g.name.clone(), template_name]
            .into_iter()
            .find(|n| !n.is_empty())
            .or_else(|| {
                pipelines
                    .pipelines()
                    .iter()
                    .find_map(|p| p.deployment.as_ref().map(|d| d.borrow().name.clone()))
            })
            .or_else(|| {
                objects.iter().find_map(|o| match o {
                    Object::BuildConfig(bc) => Some(bc.metadata.name.clone()),
                    _ => None,
                })
            })
            .unwrap_or_default();

        info!(name = %name, objects = objects.len(), "generated application");
        Ok(AppResult {
            list: ObjectList::new(objects),
            name,
            has_source: !repositories.is_empty(),
            namespace: self.origin_namespace.clone(),
        })
    }

    /// Searches for every component without resolving it
    pub fn run_query(&mut self) -> Result<QueryResult, NewAppError> {
        let (env, build_env, params) = self.environments()?;

        if self.as_list {
            if self.as_search {
                return Err(NewAppError::InvalidArguments(
                    "--list and --search can't be used together".to_string(),
                ));
            }
            if self.inputs.has_arguments() {
                return Err(NewAppError::InvalidArguments(
                    "--list can't be used with arguments".to_string(),
                ));
            }
            self.inputs.components.push("*".to_string());
        }

        let mut b = self.component_builder()?;
        if b.component_ids().is_empty() && !self.as_list {
            return Err(NewAppError::NoInputs);
        }

        let mut conflicts = Vec::new();
        if !b.repository_ids().is_empty() {
            conflicts.push("--search can't be used with source code");
        }
        if !env.is_empty() {
            conflicts.push("--search can't be used with --env");
        }
        if !build_env.is_empty() {
            conflicts.push("--search can't be used with --build-env");
        }
        if !params.is_empty() {
            conflicts.push("--search can't be used with --param");
        }
        NewAppError::aggregate(
            conflicts
                .into_iter()
                .map(|c| NewAppError::InvalidArguments(c.to_string()))
                .collect(),
        )?;

        let mut errors = Vec::new();
        for id in b.component_ids() {
            if let Err(err) = b.component_mut(id).search() {
                errors.push(err);
            }
        }
        NewAppError::aggregate(errors)?;

        let mut matches = Vec::new();
        let mut objects = Vec::new();
        for (_, component) in b.components() {
            for m in component.search_matches.iter() {
                if let Some(template) = m.template() {
                    objects.push(Object::Template(template.clone()));
                } else if let Some(stream) = m.image_stream() {
                    objects.push(Object::ImageStream(stream.clone()));
                }
                matches.push(m.clone());
            }
        }
        Ok(QueryResult {
            matches,
            list: ObjectList::new(objects),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BuildConfigSpec, BuildOutput, BuildStrategy, ObjectMeta, SourceBuildStrategy};
    use crate::client::GitCli;
    use crate::fs::MockFileSystem;
    use std::sync::Arc;
    use yare::parameterized;

    #[parameterized(
        simple = { "frontend", true },
        dashes = { "my-app-2", true },
        uppercase = { "Frontend", false },
        leading_digit = { "2app", false },
        trailing_dash = { "app-", false },
        too_long = { "a23456789012345678901234567890123456789012345678901234567890", false },
    )]
    fn test_enforced_names(name: &str, valid: bool) {
        assert_eq!(validate_enforced_name(name).is_ok(), valid);
    }

    #[test]
    fn test_output_reference() {
        assert!(validate_output_image_reference("registry.example.com/team/app:v1").is_ok());
        assert!(validate_output_image_reference("Not Valid").is_err());
    }

    fn build(input: ObjectReference, output: ObjectReference) -> Object {
        Object::BuildConfig(BuildConfig::new(
            ObjectMeta::named("app"),
            BuildConfigSpec {
                strategy: BuildStrategy {
                    strategy_type: "Source".to_string(),
                    source_strategy: Some(SourceBuildStrategy {
                        from: input,
                        env: Vec::new(),
                    }),
                    ..Default::default()
                },
                output: BuildOutput { to: Some(output) },
                ..Default::default()
            },
        ))
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::new(Arc::new(MockFileSystem::new()), Rc::new(GitCli));
        config.origin_namespace = "demo".to_string();
        config
    }

    #[test]
    fn test_build_into_its_own_input_is_circular() {
        let config = config();
        let objects = vec![build(
            ObjectReference::image_stream_tag("ruby:latest", "demo"),
            ObjectReference::image_stream_tag("ruby:latest", ""),
        )];
        assert_eq!(config.circular_reference(&objects).as_deref(), Some("demo/ruby:latest"));

        let objects = vec![build(
            ObjectReference::docker_image("centos"),
            ObjectReference::docker_image("centos:latest"),
        )];
        assert_eq!(config.circular_reference(&objects).as_deref(), Some("centos:latest"));

        let objects = vec![build(
            ObjectReference::image_stream_tag("ruby:latest", "openshift"),
            ObjectReference::image_stream_tag("app:latest", ""),
        )];
        assert_eq!(config.circular_reference(&objects), None);
    }

    #[test]
    fn test_stream_tracking_the_same_image_is_circular() {
        let config = config();
        let mut stream = ImageStream::new(ObjectMeta::named("app"));
        stream.spec.docker_image_repository = "centos".to_string();
        let objects = vec![
            Object::ImageStream(stream),
            build(
                ObjectReference::image_stream_tag("app:7", ""),
                ObjectReference::docker_image("centos:7"),
            ),
        ];
        assert_eq!(config.circular_reference(&objects).as_deref(), Some("centos:7"));
    }
}
