//! Local template processing

use super::NewAppError;
use crate::api::Template;
use crate::app::Environment;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

fn parameter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([a-zA-Z0-9_]+)\}").expect("valid regex"))
}

fn template_error(template: &Template, message: String) -> NewAppError {
    NewAppError::Template {
        name: template.name().to_string(),
        message,
    }
}

/// Parameter values from the user, falling back to the template defaults
fn parameter_values(
    template: &Template,
    params: &Environment,
    ignore_unknown: bool,
) -> Result<HashMap<String, String>, NewAppError> {
    if !ignore_unknown {
        let unknown: Vec<&str> = params
            .iter()
            .map(|(name, _)| name)
            .filter(|name| !template.parameters.iter().any(|p| p.name == *name))
            .collect();
        if !unknown.is_empty() {
            return Err(template_error(
                template,
                format!("unexpected parameter name(s): {}", unknown.join(", ")),
            ));
        }
    }

    let mut values = HashMap::new();
    for parameter in &template.parameters {
        let value = params
            .get(&parameter.name)
            .map(str::to_string)
            .or_else(|| parameter.value.clone())
            .unwrap_or_default();
        if parameter.required && value.is_empty() {
            return Err(template_error(
                template,
                format!("parameter {} is required and must be specified", parameter.name),
            ));
        }
        values.insert(parameter.name.clone(), value);
    }
    Ok(values)
}

fn substitute(value: &mut Value, values: &HashMap<String, String>) {
    match value {
        Value::String(s) => {
            let replaced = parameter_regex().replace_all(s, |caps: &regex::Captures<'_>| {
                values
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            });
            *s = replaced.into_owned();
        }
        Value::Array(items) => items.iter_mut().for_each(|item| substitute(item, values)),
        Value::Object(map) => map.values_mut().for_each(|item| substitute(item, values)),
        _ => {}
    }
}

/// The object at `field`, created when missing
fn object_field<'a>(map: &'a mut Map<String, Value>, field: &str) -> Option<&'a mut Map<String, Value>> {
    map.entry(field.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
}

fn add_labels(object: &mut Value, labels: &BTreeMap<String, String>) {
    if labels.is_empty() {
        return;
    }
    let Some(existing) = object
        .as_object_mut()
        .and_then(|map| object_field(map, "metadata"))
        .and_then(|metadata| object_field(metadata, "labels"))
    else {
        return;
    };
    for (key, value) in labels {
        existing.insert(key.clone(), Value::String(value.clone()));
    }
}

/// Sets `env` on every container of a pod template, replacing values of the
/// same name
fn add_environment(object: &mut Value, env: &Environment) {
    if env.is_empty() {
        return;
    }
    let Some(containers) = object
        .pointer_mut("/spec/template/spec/containers")
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    for container in containers {
        let Some(container) = container.as_object_mut() else {
            continue;
        };
        let list = container
            .entry("env".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Some(list) = list.as_array_mut() else {
            continue;
        };
        for var in env.list() {
            list.retain(|existing| existing.get("name").and_then(Value::as_str) != Some(var.name.as_str()));
            list.push(serde_json::json!({"name": var.name, "value": var.value}));
        }
    }
}

/// Produces the objects of a template with parameters substituted, labels
/// applied and `env` set in every container
pub fn process_template(
    template: &Template,
    params: &Environment,
    labels: &BTreeMap<String, String>,
    env: &Environment,
    ignore_unknown: bool,
) -> Result<Vec<Value>, NewAppError> {
    let values = parameter_values(template, params, ignore_unknown)?;
    let mut all_labels = template.labels.clone();
    all_labels.extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut objects = template.objects.clone();
    for object in &mut objects {
        substitute(object, &values);
        add_labels(object, &all_labels);
        add_environment(object, env);
    }
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ObjectMeta, TemplateParameter};
    use serde_json::json;

    fn template() -> Template {
        let mut template = Template::new(ObjectMeta::named("sample"));
        template.parameters = vec![
            TemplateParameter {
                name: "NAME".to_string(),
                value: Some("frontend".to_string()),
                ..Default::default()
            },
            TemplateParameter {
                name: "PASSWORD".to_string(),
                required: true,
                ..Default::default()
            },
        ];
        template.labels.insert("template".to_string(), "sample".to_string());
        template.objects = vec![json!({
            "kind": "DeploymentConfig",
            "metadata": {"name": "${NAME}"},
            "spec": {"template": {"spec": {"containers": [
                {"name": "web", "env": [{"name": "PASSWORD", "value": "${PASSWORD}"}, {"name": "MODE", "value": "dev"}]}
            ]}}}
        })];
        template
    }

    #[test]
    fn test_parameters_labels_and_env_are_applied() {
        let params = Environment::parse(&["PASSWORD=secret"]).unwrap();
        let env = Environment::parse(&["MODE=prod"]).unwrap();
        let labels = BTreeMap::from([("app".to_string(), "demo".to_string())]);

        let objects = process_template(&template(), &params, &labels, &env, false).unwrap();

        let object = &objects[0];
        assert_eq!(object["metadata"]["name"], "frontend");
        assert_eq!(object["metadata"]["labels"]["template"], "sample");
        assert_eq!(object["metadata"]["labels"]["app"], "demo");
        let env = &object["spec"]["template"]["spec"]["containers"][0]["env"];
        assert_eq!(env[0], json!({"name": "PASSWORD", "value": "secret"}));
        assert_eq!(env[1], json!({"name": "MODE", "value": "prod"}));
    }

    #[test]
    fn test_required_parameter_must_be_given() {
        let err = process_template(
            &template(),
            &Environment::new(),
            &BTreeMap::new(),
            &Environment::new(),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("PASSWORD is required"));
    }

    #[test]
    fn test_unknown_parameters() {
        let params = Environment::parse(&["PASSWORD=x", "COLOR=blue"]).unwrap();
        let err = process_template(&template(), &params, &BTreeMap::new(), &Environment::new(), false)
            .unwrap_err();
        assert!(err.to_string().contains("COLOR"));

        assert!(
            process_template(&template(), &params, &BTreeMap::new(), &Environment::new(), true).is_ok()
        );
    }
}
