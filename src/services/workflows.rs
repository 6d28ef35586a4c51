use super::{segment, with_options, Backend};
use crate::client::ApiRequest;
use crate::types::{
    ExecutionFilter, Metadata, PaginatedResponse, QueryOptions, Workflow, WorkflowExecution,
    WorkflowStep, WorkflowUpdate,
};
use serde_json::{json, Value};

/// Workflows and their executions.
pub struct WorkflowService<'a, B: Backend> {
    backend: &'a B,
}

impl<'a, B: Backend> WorkflowService<'a, B> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    pub fn list_workflows(&self, options: Option<&QueryOptions>) -> B::Call<'a, PaginatedResponse<Workflow>> {
        self.backend
            .call(with_options(ApiRequest::get("/workflows"), options))
    }

    pub fn get_workflow(&self, workflow_id: &str) -> B::Call<'a, Workflow> {
        self.backend.call(ApiRequest::get(workflow_path(workflow_id)))
    }

    pub fn create_workflow(
        &self,
        name: &str,
        steps: &[WorkflowStep],
        description: Option<&str>,
    ) -> B::Call<'a, Workflow> {
        self.backend.call(ApiRequest::post("/workflows").json_body(json!({
            "name": name,
            "steps": steps,
            "description": description,
            "metadata": {},
        })))
    }

    pub fn update_workflow(&self, workflow_id: &str, update: &WorkflowUpdate) -> B::Call<'a, Workflow> {
        self.backend
            .call(ApiRequest::patch(workflow_path(workflow_id)).json_body(json!(update)))
    }

    pub fn delete_workflow(&self, workflow_id: &str) -> B::Call<'a, ()> {
        self.backend
            .call_unit(ApiRequest::delete(workflow_path(workflow_id)))
    }

    /// Starts an execution with the given input.
    pub fn execute_workflow(
        &self,
        workflow_id: &str,
        input_data: Option<Metadata>,
    ) -> B::Call<'a, WorkflowExecution> {
        let path = format!("{}/execute", workflow_path(workflow_id));
        self.backend.call(ApiRequest::post(path).json_body(json!({
            "input_data": input_data.unwrap_or_default(),
            "metadata": {},
        })))
    }

    pub fn list_executions(
        &self,
        filter: &ExecutionFilter,
        options: Option<&QueryOptions>,
    ) -> B::Call<'a, PaginatedResponse<WorkflowExecution>> {
        let request = ApiRequest::get("/workflow-executions")
            .query_opt("workflow_id", filter.workflow_id.as_deref())
            .query_opt("status", filter.status.map(|s| s.as_str()));
        self.backend.call(with_options(request, options))
    }

    pub fn get_execution(&self, execution_id: &str) -> B::Call<'a, WorkflowExecution> {
        self.backend
            .call(ApiRequest::get(execution_path(execution_id)))
    }

    pub fn cancel_execution(&self, execution_id: &str) -> B::Call<'a, WorkflowExecution> {
        let path = format!("{}/cancel", execution_path(execution_id));
        self.backend.call(ApiRequest::post(path))
    }

    /// Retries a failed execution, optionally from a specific step.
    pub fn retry_execution(
        &self,
        execution_id: &str,
        from_step: Option<&str>,
    ) -> B::Call<'a, WorkflowExecution> {
        let path = format!("{}/retry", execution_path(execution_id));
        let body = match from_step {
            Some(step) => json!({ "from_step": step }),
            None => json!({}),
        };
        self.backend.call(ApiRequest::post(path).json_body(body))
    }

    pub fn get_execution_logs(
        &self,
        execution_id: &str,
        step_id: Option<&str>,
        options: Option<&QueryOptions>,
    ) -> B::Call<'a, Value> {
        let request = ApiRequest::get(format!("{}/logs", execution_path(execution_id)))
            .query_opt("step_id", step_id);
        self.backend.call(with_options(request, options))
    }

    pub fn list_templates(&self, options: Option<&QueryOptions>) -> B::Call<'a, PaginatedResponse<Value>> {
        self.backend
            .call(with_options(ApiRequest::get("/workflow-templates"), options))
    }

    /// Instantiates a template as a new workflow named `name`.
    pub fn create_from_template(
        &self,
        template_id: &str,
        name: &str,
        parameters: Option<Metadata>,
        metadata: Option<Metadata>,
    ) -> B::Call<'a, Workflow> {
        let path = format!("/workflow-templates/{}/create", segment(template_id));
        self.backend.call(ApiRequest::post(path).json_body(json!({
            "name": name,
            "parameters": parameters.unwrap_or_default(),
            "metadata": metadata.unwrap_or_default(),
        })))
    }

    /// Server-side validation of a workflow definition.
    pub fn validate_workflow(&self, definition: &Value) -> B::Call<'a, Value> {
        self.backend
            .call(ApiRequest::post("/workflows/validate").json_body(definition.clone()))
    }
}

fn workflow_path(workflow_id: &str) -> String {
    format!("/workflows/{}", segment(workflow_id))
}

fn execution_path(execution_id: &str) -> String {
    format!("/workflow-executions/{}", segment(execution_id))
}
