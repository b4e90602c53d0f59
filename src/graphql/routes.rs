use actix_web::{get, http::header, post, web, HttpRequest, HttpResponse};
use async_graphql::http::GraphiQLSource;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use super::AppState;

// Handles POST /graphql requests for executing GraphQL queries and mutations
#[post("/graphql")]
pub async fn graphql(
    state: web::Data<AppState>,
    req: HttpRequest,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    state.execute(request.into_inner(), authorization).await.into()
}

// Handles GET /graphql requests to serve the GraphiQL UI
#[get("/graphql")]
pub async fn graphiql() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint("/graphql").finish())
}
