use std::collections::BTreeMap;
use std::time::Duration;

use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::types::{Capability, OnFailure, Output, Parameter, Stack, StackStatus};
use sitestack_lib::Template;
use thiserror::Error;
use tracing::{debug, info, warn};

pub type StackOutputs = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Failed to describe stack {stack}\n{message}")]
    Describe { stack: String, message: String },
    #[error("Stack {0} not found")]
    NotFound(String),
    #[error("Failed to create stack {stack}\n{message}")]
    Create { stack: String, message: String },
    #[error("Failed to update stack {stack}\n{message}")]
    Update { stack: String, message: String },
    #[error("Failed to delete stack {stack}\n{message}")]
    Delete { stack: String, message: String },
    #[error("Stack {stack} ended in {status}\n{reason}")]
    Failed { stack: String, status: String, reason: String },
    #[error("Stack {stack} is in {status} and cannot be updated. Destroy it and deploy again")]
    Unrecoverable { stack: String, status: String },
    #[error("Failed to read the deployed template of {stack}\n{message}")]
    Template { stack: String, message: String },
    #[error("Gave up waiting on stack {stack} after {} seconds", .waited.as_secs())]
    Timeout { stack: String, waited: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Complete,
    InProgress,
    Failed,
}

/// a stack that rolled back did not end up with the requested
/// template, so rollbacks count as failures.
pub fn classify_status(status: &StackStatus) -> StatusClass {
    match status {
        StackStatus::CreateComplete |
        StackStatus::UpdateComplete |
        StackStatus::DeleteComplete |
        StackStatus::ImportComplete => StatusClass::Complete,

        StackStatus::CreateInProgress |
        StackStatus::DeleteInProgress |
        StackStatus::ImportInProgress |
        StackStatus::ImportRollbackInProgress |
        StackStatus::ReviewInProgress |
        StackStatus::RollbackInProgress |
        StackStatus::UpdateCompleteCleanupInProgress |
        StackStatus::UpdateInProgress |
        StackStatus::UpdateRollbackCompleteCleanupInProgress |
        StackStatus::UpdateRollbackInProgress => StatusClass::InProgress,

        _ => StatusClass::Failed,
    }
}

/// the only way to update a stack that failed its first creation is to delete it.
fn is_unrecoverable(status: &StackStatus) -> bool {
    matches!(status, StackStatus::RollbackComplete | StackStatus::RollbackFailed | StackStatus::DeleteFailed)
}

fn is_missing_stack_error(message: &str) -> bool {
    message.contains("does not exist")
}

fn is_no_op_update(message: &str) -> bool {
    message.contains("No updates are to be performed")
}

fn collect_outputs(outputs: &[Output]) -> StackOutputs {
    outputs.iter()
        .filter_map(|o| match (o.output_key(), o.output_value()) {
            (Some(key), Some(val)) => Some((key.to_string(), val.to_string())),
            _ => None,
        })
        .collect()
}

fn to_parameters(parameters: &BTreeMap<String, String>) -> Vec<Parameter> {
    parameters.iter()
        .map(|(key, value)| Parameter::builder().parameter_key(key).parameter_value(value).build())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    /// the deployed template and parameters already match.
    Unchanged,
}

pub struct StackDeployer {
    client: aws_sdk_cloudformation::Client,
    pub poll_interval: Duration,
    /// distributions routinely take 15+ minutes to create.
    pub max_wait: Duration,
}

impl StackDeployer {
    pub fn new(client: aws_sdk_cloudformation::Client) -> Self {
        Self {
            client,
            poll_interval: Duration::from_millis(700),
            max_wait: Duration::from_secs(60 * 60),
        }
    }

    /// `None` if the stack does not exist.
    pub async fn find_stack(&self, name: &str) -> Result<Option<Stack>, DeployError> {
        match self.client.describe_stacks().stack_name(name).send().await {
            Ok(d) => Ok(d.stacks().first().cloned()),
            Err(e) => {
                let message = DisplayErrorContext(&e).to_string();
                if is_missing_stack_error(&message) {
                    return Ok(None);
                }
                Err(DeployError::Describe { stack: name.to_string(), message })
            }
        }
    }

    pub async fn does_stack_exist(&self, name: &str) -> Result<bool, DeployError> {
        Ok(self.find_stack(name).await?.is_some())
    }

    /// `Some` once the stack has settled successfully, `None` while it is still in progress.
    pub async fn describe_stack(&self, name: &str) -> Result<Option<Stack>, DeployError> {
        let stack = self.find_stack(name).await?
            .ok_or_else(|| DeployError::NotFound(name.to_string()))?;
        let status = stack.stack_status()
            .ok_or_else(|| DeployError::NotFound(name.to_string()))?;
        match classify_status(status) {
            StatusClass::Complete => Ok(Some(stack)),
            StatusClass::InProgress => Ok(None),
            StatusClass::Failed => Err(DeployError::Failed {
                stack: name.to_string(),
                status: status.as_str().to_string(),
                reason: stack.stack_status_reason().unwrap_or("Failed to get stack failure reason").to_string(),
            }),
        }
    }

    pub async fn wait_for_output(&self, name: &str) -> Result<StackOutputs, DeployError> {
        let mut waited = Duration::ZERO;
        loop {
            tokio::time::sleep(self.poll_interval).await;
            waited += self.poll_interval;
            if let Some(stack) = self.describe_stack(name).await? {
                return Ok(collect_outputs(stack.outputs()));
            }
            if waited >= self.max_wait {
                return Err(DeployError::Timeout { stack: name.to_string(), waited });
            }
            debug!(stack = name, waited_secs = waited.as_secs(), "still waiting");
        }
    }

    pub async fn create_or_update_stack(
        &self,
        name: &str,
        body: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<ApplyOutcome, DeployError> {
        let parameters = to_parameters(parameters);
        match self.find_stack(name).await? {
            Some(existing) => {
                if let Some(status) = existing.stack_status() {
                    if is_unrecoverable(status) {
                        return Err(DeployError::Unrecoverable {
                            stack: name.to_string(),
                            status: status.as_str().to_string(),
                        });
                    }
                }
                info!(stack = name, "updating stack");
                let res = self.client.update_stack()
                    .capabilities(Capability::CapabilityNamedIam)
                    .stack_name(name)
                    .template_body(body)
                    .set_parameters(Some(parameters))
                    .send()
                    .await;
                if let Err(e) = res {
                    let message = DisplayErrorContext(&e).to_string();
                    if is_no_op_update(&message) {
                        info!(stack = name, "no changes to apply");
                        return Ok(ApplyOutcome::Unchanged);
                    }
                    return Err(DeployError::Update { stack: name.to_string(), message });
                }
                Ok(ApplyOutcome::Updated)
            }
            None => {
                info!(stack = name, "creating stack");
                self.client.create_stack()
                    .on_failure(OnFailure::Delete)
                    .capabilities(Capability::CapabilityNamedIam)
                    .stack_name(name)
                    .template_body(body)
                    .set_parameters(Some(parameters))
                    .send()
                    .await
                    .map_err(|e| DeployError::Create {
                        stack: name.to_string(),
                        message: DisplayErrorContext(&e).to_string(),
                    })?;
                Ok(ApplyOutcome::Created)
            }
        }
    }

    /// applies the template and blocks until the stack settles. Returns the stack outputs.
    pub async fn deploy(
        &self,
        name: &str,
        body: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<StackOutputs, DeployError> {
        let outcome = self.create_or_update_stack(name, body, parameters).await?;
        if outcome == ApplyOutcome::Unchanged {
            let stack = self.find_stack(name).await?
                .ok_or_else(|| DeployError::NotFound(name.to_string()))?;
            return Ok(collect_outputs(stack.outputs()));
        }
        let outputs = self.wait_for_output(name).await?;
        info!(stack = name, ?outcome, "stack is ready");
        Ok(outputs)
    }

    pub async fn stack_outputs(&self, name: &str) -> Result<StackOutputs, DeployError> {
        let stack = self.describe_stack(name).await?
            .ok_or_else(|| DeployError::Describe {
                stack: name.to_string(),
                message: "stack is still being updated".to_string(),
            })?;
        Ok(collect_outputs(stack.outputs()))
    }

    /// the template the stack was last deployed with, `None` if there is no stack.
    pub async fn deployed_template(&self, name: &str) -> Result<Option<Template>, DeployError> {
        if !self.does_stack_exist(name).await? {
            return Ok(None);
        }
        let out = self.client.get_template().stack_name(name).send().await
            .map_err(|e| DeployError::Template {
                stack: name.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        let body = out.template_body().unwrap_or("{}");
        let template = Template::from_json(body).map_err(|e| DeployError::Template {
            stack: name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(template))
    }

    /// deletes the stack and waits until it is gone. Resources with a
    /// Retain deletion policy are left behind.
    pub async fn delete_stack(&self, name: &str) -> Result<(), DeployError> {
        if !self.does_stack_exist(name).await? {
            warn!(stack = name, "stack does not exist, nothing to delete");
            return Ok(());
        }
        info!(stack = name, "deleting stack");
        self.client.delete_stack().stack_name(name).send().await
            .map_err(|e| DeployError::Delete {
                stack: name.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let mut waited = Duration::ZERO;
        loop {
            tokio::time::sleep(self.poll_interval).await;
            waited += self.poll_interval;
            let stack = match self.find_stack(name).await? {
                Some(s) => s,
                None => break,
            };
            match stack.stack_status() {
                Some(StackStatus::DeleteComplete) | None => break,
                Some(StackStatus::DeleteFailed) => {
                    return Err(DeployError::Delete {
                        stack: name.to_string(),
                        message: stack.stack_status_reason().unwrap_or("Failed to get stack failure reason").to_string(),
                    });
                }
                _ => {}
            }
            if waited >= self.max_wait {
                return Err(DeployError::Timeout { stack: name.to_string(), waited });
            }
        }
        info!(stack = name, "stack deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_classified() {
        assert_eq!(classify_status(&StackStatus::CreateComplete), StatusClass::Complete);
        assert_eq!(classify_status(&StackStatus::UpdateComplete), StatusClass::Complete);
        assert_eq!(classify_status(&StackStatus::UpdateInProgress), StatusClass::InProgress);
        assert_eq!(classify_status(&StackStatus::UpdateRollbackInProgress), StatusClass::InProgress);
        assert_eq!(classify_status(&StackStatus::RollbackComplete), StatusClass::Failed);
        assert_eq!(classify_status(&StackStatus::UpdateRollbackComplete), StatusClass::Failed);
        assert_eq!(classify_status(&StackStatus::CreateFailed), StatusClass::Failed);
    }

    #[test]
    fn error_messages_are_recognized() {
        assert!(is_missing_stack_error("ValidationError: Stack with id site-iacstack does not exist"));
        assert!(!is_missing_stack_error("AccessDenied"));
        assert!(is_no_op_update("ValidationError: No updates are to be performed."));
    }

    #[test]
    fn outputs_skip_incomplete_entries() {
        let outputs = collect_outputs(&[
            Output::builder().output_key("BucketName").output_value("static-site-x").build(),
            Output::builder().output_key("Missing").build(),
        ]);
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs["BucketName"], "static-site-x");
    }

    #[test]
    fn parameters_are_passed_by_key() {
        let mut params = BTreeMap::new();
        params.insert("HostedZoneId".to_string(), "Z123".to_string());
        let out = to_parameters(&params);
        assert_eq!(out[0].parameter_key(), Some("HostedZoneId"));
        assert_eq!(out[0].parameter_value(), Some("Z123"));
    }
}
