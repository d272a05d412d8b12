//! Template cloning.
//!
//! A template is a container that was created but never started. Its declared
//! configuration (network, IP, aliases, ports, host config, entrypoint, health
//! check, env) seeds a new container named `<template>-clone` that takes over
//! the template's network identity.

use std::sync::Arc;

use qnet_core::metrics as m;
use tracing::{debug, info};

use crate::attributes::NodeAttributes;
use crate::docker::DockerClient;
use crate::error::OrchestratorError;
use crate::health::{WaitPolicy, wait_until_usable};
use crate::types::{
    CLONED_FROM_ID_LABEL, CLONED_FROM_NAME_LABEL, ContainerDetails, ContainerSpec, short_id,
};

/// Set when the node should discard its datadir and start from genesis.
pub const ALWAYS_REFRESH_ENV: &str = "ALWAYS_REFRESH";

/// Extra geth arguments picked up by the container entrypoint.
pub const ADDITIONAL_GETH_ARGS_ENV: &str = "ADDITIONAL_GETH_ARGS";

const CLONE_SUFFIX: &str = "-clone";

/// Called with the id of every container created, before it is started.
pub type OnCreate = Arc<dyn Fn(&str) + Send + Sync>;

/// Template environment followed by the variables `attrs` asks for.
pub fn effective_env(template_env: &[String], attrs: &NodeAttributes) -> Vec<String> {
    let mut env = template_env.to_vec();
    if attrs.fresh_start() {
        env.push(format!("{ALWAYS_REFRESH_ENV}=true"));
    }
    if let Some(args) = attrs.additional_geth_args() {
        let rendered = args.to_string();
        if !rendered.trim().is_empty() {
            env.push(format!("{ADDITIONAL_GETH_ARGS_ENV}={rendered}"));
        }
    }
    env
}

/// Derives the clone's creation spec from an inspected template.
///
/// # Errors
///
/// `OrchestratorError::InvalidTemplate` if the template is not in `created`
/// state or has no network.
pub fn build_clone_spec(
    template_id: &str,
    template: &ContainerDetails,
    attrs: &NodeAttributes,
    image: &str,
) -> Result<ContainerSpec, OrchestratorError> {
    if !template.status.eq_ignore_ascii_case("created") {
        return Err(OrchestratorError::InvalidTemplate {
            container: template.name.clone(),
            reason: format!("status must be 'created', found '{}'", template.status),
        });
    }

    let network = template
        .primary_network()
        .cloned()
        .ok_or_else(|| OrchestratorError::InvalidTemplate {
            container: template.name.clone(),
            reason: "template is not attached to any network".to_owned(),
        })?;

    let image = if image.trim().is_empty() {
        template.image.clone()
    } else {
        image.to_owned()
    };

    let mut labels = template.labels.clone();
    labels.insert(CLONED_FROM_ID_LABEL.to_owned(), template_id.to_owned());
    labels.insert(CLONED_FROM_NAME_LABEL.to_owned(), template.name.clone());

    Ok(ContainerSpec {
        name: format!("{}{CLONE_SUFFIX}", template.name),
        image,
        hostname: template.hostname.clone(),
        domainname: template.domainname.clone(),
        exposed_ports: template.exposed_ports.clone(),
        env: effective_env(&template.env, attrs),
        healthcheck: template.healthcheck.clone(),
        entrypoint: template.entrypoint.clone(),
        host_config: template.host_config.clone(),
        network: Some(network),
        labels,
    })
}

/// Realizes running containers from templates.
pub struct TemplateCloner<D: DockerClient> {
    client: Arc<D>,
    wait_policy: WaitPolicy,
}

impl<D: DockerClient> TemplateCloner<D> {
    pub fn new(client: Arc<D>, wait_policy: WaitPolicy) -> Self {
        Self {
            client,
            wait_policy,
        }
    }

    /// Clones `template_id`, starts the clone and waits for it.
    ///
    /// `on_create` fires right after creation so that a clone which then fails
    /// to start is still recorded for teardown.
    ///
    /// Returns `Ok(false)` if the clone started but never became usable.
    pub async fn clone_and_start(
        &self,
        template_id: &str,
        attrs: &NodeAttributes,
        image: &str,
        on_create: &OnCreate,
    ) -> Result<bool, OrchestratorError> {
        let template = self.client.inspect_container(template_id).await?;
        let spec = build_clone_spec(template_id, &template, attrs, image)?;

        let new_id = self.client.create_container(&spec).await?;
        debug!(
            node = attrs.node(),
            template = %template.name,
            container_id = short_id(&new_id),
            image = %spec.image,
            "created container"
        );
        on_create(&new_id);

        self.client.start_container(&new_id).await?;
        metrics::counter!(m::ORCHESTRATOR_CONTAINERS_STARTED_TOTAL, m::LABEL_NODE => attrs.node().to_owned())
            .increment(1);
        info!(
            node = attrs.node(),
            container_id = short_id(&new_id),
            name = %spec.name,
            "started container"
        );

        let outcome = wait_until_usable(self.client.as_ref(), &new_id, self.wait_policy).await?;
        Ok(outcome.is_healthy())
    }
}
