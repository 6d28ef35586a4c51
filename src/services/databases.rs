use super::{segment, with_options, Backend};
use crate::client::ApiRequest;
use crate::types::{
    ColumnDefinition, Database, DatabaseUpdate, Metadata, PaginatedResponse, QueryOptions, Record,
    Table, TableUpdate,
};
use serde_json::json;

/// Databases, tables and records.
pub struct DatabaseService<'a, B: Backend> {
    backend: &'a B,
}

impl<'a, B: Backend> DatabaseService<'a, B> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    pub fn list_databases(
        &self,
        options: Option<&QueryOptions>,
    ) -> B::Call<'a, PaginatedResponse<Database>> {
        self.backend
            .call(with_options(ApiRequest::get("/databases"), options))
    }

    pub fn get_database(&self, database_id: &str) -> B::Call<'a, Database> {
        self.backend
            .call(ApiRequest::get(format!("/databases/{}", segment(database_id))))
    }

    pub fn create_database(
        &self,
        name: &str,
        description: Option<&str>,
        metadata: Option<Metadata>,
    ) -> B::Call<'a, Database> {
        self.backend.call(ApiRequest::post("/databases").json_body(json!({
            "name": name,
            "description": description,
            "metadata": metadata.unwrap_or_default(),
        })))
    }

    pub fn update_database(
        &self,
        database_id: &str,
        update: &DatabaseUpdate,
    ) -> B::Call<'a, Database> {
        self.backend.call(
            ApiRequest::patch(format!("/databases/{}", segment(database_id)))
                .json_body(json!(update)),
        )
    }

    pub fn delete_database(&self, database_id: &str) -> B::Call<'a, ()> {
        self.backend
            .call_unit(ApiRequest::delete(format!("/databases/{}", segment(database_id))))
    }

    pub fn list_tables(
        &self,
        database_id: &str,
        options: Option<&QueryOptions>,
    ) -> B::Call<'a, PaginatedResponse<Table>> {
        let path = format!("/databases/{}/tables", segment(database_id));
        self.backend.call(with_options(ApiRequest::get(path), options))
    }

    pub fn get_table(&self, database_id: &str, table_id: &str) -> B::Call<'a, Table> {
        self.backend.call(ApiRequest::get(table_path(database_id, table_id)))
    }

    pub fn create_table(
        &self,
        database_id: &str,
        name: &str,
        schema: &[ColumnDefinition],
        description: Option<&str>,
    ) -> B::Call<'a, Table> {
        let path = format!("/databases/{}/tables", segment(database_id));
        self.backend.call(ApiRequest::post(path).json_body(json!({
            "name": name,
            "schema": schema,
            "description": description,
            "metadata": {},
        })))
    }

    pub fn update_table(
        &self,
        database_id: &str,
        table_id: &str,
        update: &TableUpdate,
    ) -> B::Call<'a, Table> {
        self.backend.call(
            ApiRequest::patch(table_path(database_id, table_id)).json_body(json!(update)),
        )
    }

    pub fn delete_table(&self, database_id: &str, table_id: &str) -> B::Call<'a, ()> {
        self.backend
            .call_unit(ApiRequest::delete(table_path(database_id, table_id)))
    }

    pub fn list_records(
        &self,
        database_id: &str,
        table_id: &str,
        options: Option<&QueryOptions>,
    ) -> B::Call<'a, PaginatedResponse<Record>> {
        let path = format!("{}/records", table_path(database_id, table_id));
        self.backend.call(with_options(ApiRequest::get(path), options))
    }

    pub fn get_record(
        &self,
        database_id: &str,
        table_id: &str,
        record_id: &str,
    ) -> B::Call<'a, Record> {
        self.backend
            .call(ApiRequest::get(record_path(database_id, table_id, record_id)))
    }

    pub fn create_record(
        &self,
        database_id: &str,
        table_id: &str,
        data: Metadata,
    ) -> B::Call<'a, Record> {
        let path = format!("{}/records", table_path(database_id, table_id));
        self.backend
            .call(ApiRequest::post(path).json_body(json!({ "data": data })))
    }

    /// Replaces the record data. Pass the last seen `version` for optimistic
    /// locking; a stale version fails with a conflict.
    pub fn update_record(
        &self,
        database_id: &str,
        table_id: &str,
        record_id: &str,
        data: Metadata,
        version: Option<u64>,
    ) -> B::Call<'a, Record> {
        let mut body = json!({ "data": data });
        if let Some(version) = version {
            body["version"] = json!(version);
        }
        self.backend.call(
            ApiRequest::patch(record_path(database_id, table_id, record_id)).json_body(body),
        )
    }

    pub fn delete_record(
        &self,
        database_id: &str,
        table_id: &str,
        record_id: &str,
    ) -> B::Call<'a, ()> {
        self.backend
            .call_unit(ApiRequest::delete(record_path(database_id, table_id, record_id)))
    }
}

fn table_path(database_id: &str, table_id: &str) -> String {
    format!(
        "/databases/{}/tables/{}",
        segment(database_id),
        segment(table_id)
    )
}

fn record_path(database_id: &str, table_id: &str, record_id: &str) -> String {
    format!(
        "{}/records/{}",
        table_path(database_id, table_id),
        segment(record_id)
    )
}
