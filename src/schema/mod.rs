//! Bundled GraphQL schema served by the binary.
//!
//! Small on purpose: enough to exercise queries, mutations, uploads and the
//! transport context from resolvers.

use async_graphql::extensions::Tracing;
use async_graphql::{Context, EmptySubscription, Object, Result, Schema, Upload};

use crate::engine::ContextBag;

pub type AppSchema = Schema<Query, Mutation, EmptySubscription>;

pub fn create_schema() -> AppSchema {
    Schema::build(Query, Mutation, EmptySubscription)
        .extension(Tracing)
        .finish()
}

pub struct Query;

#[Object]
impl Query {
    async fn hello(&self) -> &'static str {
        "world"
    }

    /// Whether the transport request and reply reached this resolver.
    async fn has_transport_context(&self, ctx: &Context<'_>) -> bool {
        ctx.data_opt::<ContextBag>().is_some()
    }

    /// The `x-request-id` of the HTTP request carrying this operation.
    async fn request_id(&self, ctx: &Context<'_>) -> Option<String> {
        ctx.data_opt::<ContextBag>()
            .and_then(|bag| bag.request().request_id.clone())
    }
}

pub struct Mutation;

#[Object]
impl Mutation {
    async fn hello(&self) -> &'static str {
        "world"
    }

    /// Name of an uploaded file.
    async fn get_file_name(&self, ctx: &Context<'_>, file: Upload) -> Result<String> {
        Ok(file.value(ctx)?.filename)
    }

    /// Store a preference in a cookie on the HTTP response.
    async fn set_preference(&self, ctx: &Context<'_>, name: String, value: String) -> String {
        ctx.append_http_header("set-cookie", format!("{name}={value}; Path=/; HttpOnly"));
        name
    }
}
