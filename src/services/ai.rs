use super::{segment, with_options, Backend};
use crate::client::ApiRequest;
use crate::types::{
    AiModel, AiProvider, AiResponse, BatchGeneration, ChatMessage, GenerationParams, Metadata,
    PaginatedResponse, QueryOptions, UsageQuery,
};
use serde_json::{json, Value};

/// AI models, text generation and embeddings.
pub struct AiService<'a, B: Backend> {
    backend: &'a B,
}

impl<'a, B: Backend> AiService<'a, B> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    pub fn list_models(&self, options: Option<&QueryOptions>) -> B::Call<'a, PaginatedResponse<AiModel>> {
        self.backend
            .call(with_options(ApiRequest::get("/ai/models"), options))
    }

    pub fn list_models_by_provider(
        &self,
        provider: AiProvider,
        options: Option<&QueryOptions>,
    ) -> B::Call<'a, PaginatedResponse<AiModel>> {
        let request = ApiRequest::get("/ai/models").query("provider", provider.as_str());
        self.backend.call(with_options(request, options))
    }

    pub fn get_model(&self, model_id: &str) -> B::Call<'a, AiModel> {
        self.backend
            .call(ApiRequest::get(format!("/ai/models/{}", segment(model_id))))
    }

    pub fn generate_text(
        &self,
        model_id: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> B::Call<'a, AiResponse> {
        let body = merge(json!({ "model_id": model_id, "prompt": prompt }), params);
        self.backend
            .call(ApiRequest::post("/ai/generate/text").json_body(body))
    }

    pub fn chat_completion(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> B::Call<'a, AiResponse> {
        let body = merge(json!({ "model_id": model_id, "messages": messages }), params);
        self.backend
            .call(ApiRequest::post("/ai/chat/completions").json_body(body))
    }

    /// Runs several generation requests in one call. Each entry is a request
    /// body as accepted by [`generate_text`](Self::generate_text).
    pub fn batch_generate_text(
        &self,
        requests: &[Value],
        metadata: Option<Metadata>,
    ) -> B::Call<'a, BatchGeneration> {
        let mut body = json!({ "requests": requests });
        if let Some(metadata) = metadata {
            body["metadata"] = Value::Object(metadata);
        }
        self.backend
            .call(ApiRequest::post("/ai/batch/generate/text").json_body(body))
    }

    /// Past generations, newest first.
    pub fn list_responses(
        &self,
        options: Option<&QueryOptions>,
    ) -> B::Call<'a, PaginatedResponse<AiResponse>> {
        self.backend
            .call(with_options(ApiRequest::get("/ai/responses"), options))
    }

    pub fn get_response(&self, response_id: &str) -> B::Call<'a, AiResponse> {
        self.backend.call(ApiRequest::get(response_path(response_id)))
    }

    pub fn delete_response(&self, response_id: &str) -> B::Call<'a, ()> {
        self.backend
            .call_unit(ApiRequest::delete(response_path(response_id)))
    }

    pub fn create_embeddings(&self, model_id: &str, texts: &[String]) -> B::Call<'a, Value> {
        self.backend.call(
            ApiRequest::post("/ai/embeddings").json_body(json!({ "model_id": model_id, "texts": texts })),
        )
    }

    pub fn get_usage(&self, query: &UsageQuery) -> B::Call<'a, Value> {
        let request = ApiRequest::get("/ai/usage")
            .query_opt("start_date", query.start_date.as_deref())
            .query_opt("end_date", query.end_date.as_deref())
            .query_opt("model_id", query.model_id.as_deref());
        self.backend.call(request)
    }
}

fn response_path(response_id: &str) -> String {
    format!("/ai/responses/{}", segment(response_id))
}

// Sampling parameters sit next to the required fields in the request body.
fn merge(mut base: Value, params: &GenerationParams) -> Value {
    if let (Some(target), Value::Object(extra)) = (base.as_object_mut(), json!(params)) {
        target.extend(extra);
    }
    base
}
