use std::sync::Arc;

use async_graphql::{Request, Response};
use serde_json::{json, Value};

use linkfeed::auth::Auth;
use linkfeed::database::MemoryStore;
use linkfeed::AppState;

fn app() -> AppState {
    AppState::with_auth(Arc::new(MemoryStore::new()), Auth::new("api-test-secret", None, 4))
}

async fn run(state: &AppState, query: &str, token: Option<&str>) -> Response {
    let header = token.map(|t| format!("Bearer {t}"));
    state.execute(Request::new(query), header.as_deref()).await
}

fn data(response: Response) -> Value {
    assert!(response.errors.is_empty(), "unexpected errors: {:?}", response.errors);
    response.data.into_json().unwrap()
}

fn error_code(response: &Response) -> String {
    assert!(!response.errors.is_empty(), "expected an error");
    let error = serde_json::to_value(&response.errors[0]).unwrap();
    error["extensions"]["code"].as_str().unwrap_or_default().to_string()
}

async fn signup(state: &AppState, name: &str) -> (i64, String) {
    let query = format!(
        r#"mutation {{ signup(email: "{name}@example.com", password: "pw-{name}", name: "{name}") {{ token user {{ id }} }} }}"#
    );
    let body = data(run(state, &query, None).await);
    let id = body["signup"]["user"]["id"].as_i64().unwrap();
    let token = body["signup"]["token"].as_str().unwrap().to_string();
    (id, token)
}

async fn post(state: &AppState, token: &str, description: &str, url: &str) -> i64 {
    let query = format!(r#"mutation {{ post(description: "{description}", url: "{url}") {{ id }} }}"#);
    data(run(state, &query, Some(token)).await)["post"]["id"].as_i64().unwrap()
}

// The two links from the tutorial: ids 1 and 2, posted by one user
async fn seeded() -> (AppState, String) {
    let state = app();
    let (_, token) = signup(&state, "alice").await;
    post(&state, &token, "Fullstack tutorial", "www.google.es").await;
    post(&state, &token, "Graphql official website", "https://www.google.es").await;
    (state, token)
}

#[tokio::test]
async fn post_without_login_is_rejected() {
    let state = app();
    let query = r#"mutation { post(description: "d", url: "u") { id } }"#;

    let response = run(&state, query, None).await;
    assert_eq!(error_code(&response), "UNAUTHENTICATED");
    assert_eq!(response.errors[0].message, "Cannot post without logging in");

    let response = run(&state, query, Some("not-a-token")).await;
    assert_eq!(error_code(&response), "UNAUTHENTICATED");
}

#[tokio::test]
async fn post_is_attributed_to_the_caller() {
    let state = app();
    let (user_id, token) = signup(&state, "bob").await;
    let body = data(
        run(
            &state,
            r#"mutation { post(description: "Rust book", url: "https://doc.rust-lang.org") { id description postedBy { id name } } }"#,
            Some(&token),
        )
        .await,
    );
    assert_eq!(body["post"]["description"], "Rust book");
    assert_eq!(body["post"]["postedBy"]["id"].as_i64(), Some(user_id));
    assert_eq!(body["post"]["postedBy"]["name"], "bob");
}

#[tokio::test]
async fn link_ids_increase_in_insert_order() {
    let state = app();
    let (_, token) = signup(&state, "carol").await;
    let mut last = 0;
    for n in 0..5 {
        let id = post(&state, &token, &format!("link {n}"), "https://example.com").await;
        assert!(id > last);
        last = id;
    }
}

#[tokio::test]
async fn feed_filter_matches_description_or_url() {
    let (state, _) = seeded().await;
    let body = data(
        run(&state, r#"{ feed(filter: "tutorial") { id count links { id description } } }"#, None).await,
    );
    assert_eq!(body["feed"]["count"], 1);
    assert_eq!(
        body["feed"]["links"],
        json!([{ "id": 1, "description": "Fullstack tutorial" }])
    );
    assert_eq!(body["feed"]["id"], r#"main-feed:{"filter":"tutorial"}"#);

    let body = data(run(&state, r#"{ feed(filter: "https") { count } }"#, None).await);
    assert_eq!(body["feed"]["count"], 1);
}

#[tokio::test]
async fn feed_filter_is_case_sensitive() {
    let (state, token) = seeded().await;
    let body = data(run(&state, r#"{ feed(filter: "graphql") { count links { id } } }"#, None).await);
    assert_eq!(body["feed"]["count"], 0);

    let id = post(&state, &token, "Docs", "https://graphql.org").await;
    let body = data(run(&state, r#"{ feed(filter: "graphql") { count links { id url } } }"#, None).await);
    assert_eq!(body["feed"]["count"], 1);
    assert_eq!(body["feed"]["links"][0]["id"].as_i64(), Some(id));
}

#[tokio::test]
async fn feed_orders_and_paginates() {
    let (state, token) = seeded().await;
    post(&state, &token, "A first look", "https://example.com").await;

    let body = data(
        run(&state, r#"{ feed(orderBy: [{ description: asc }]) { links { description } } }"#, None).await,
    );
    assert_eq!(
        body["feed"]["links"],
        json!([
            { "description": "A first look" },
            { "description": "Fullstack tutorial" },
            { "description": "Graphql official website" }
        ])
    );

    let body = data(
        run(
            &state,
            r#"{ feed(skip: 1, take: 1, orderBy: [{ description: desc }]) { count links { description } } }"#,
            None,
        )
        .await,
    );
    assert_eq!(body["feed"]["count"], 3);
    assert_eq!(body["feed"]["links"], json!([{ "description": "Fullstack tutorial" }]));

    let response = run(&state, r#"{ feed(take: -1) { count } }"#, None).await;
    assert_eq!(error_code(&response), "BAD_USER_INPUT");
}

#[tokio::test]
async fn feed_ties_fall_through_to_later_keys_then_id() {
    let state = app();
    let (_, token) = signup(&state, "carol").await;
    post(&state, &token, "same", "b").await;
    post(&state, &token, "same", "a").await;
    post(&state, &token, "other", "a").await;
    post(&state, &token, "same", "b").await;

    let ids = |body: Value| -> Vec<i64> {
        body["feed"]["links"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_i64().unwrap())
            .collect()
    };

    let body = data(
        run(&state, r#"{ feed(orderBy: [{ description: desc }, { url: asc }]) { links { id } } }"#, None).await,
    );
    assert_eq!(ids(body), [2, 1, 4, 3]);

    let body = data(run(&state, r#"{ feed(orderBy: [{ url: desc }]) { links { id } } }"#, None).await);
    assert_eq!(ids(body), [1, 4, 2, 3]);
}

#[tokio::test]
async fn feed_orders_by_creation_time() {
    let state = app();
    let (_, token) = signup(&state, "dave").await;
    for n in 1..=4 {
        post(&state, &token, &format!("link {n}"), "https://example.com").await;
        // Distinct timestamps, so id order cannot decide the result
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let body = data(run(&state, r#"{ feed(orderBy: [{ createdAt: desc }]) { links { id } } }"#, None).await);
    assert_eq!(body["feed"]["links"], json!([{ "id": 4 }, { "id": 3 }, { "id": 2 }, { "id": 1 }]));

    let body = data(run(&state, r#"{ feed(orderBy: [{ createdAt: asc }]) { links { id } } }"#, None).await);
    assert_eq!(body["feed"]["links"], json!([{ "id": 1 }, { "id": 2 }, { "id": 3 }, { "id": 4 }]));
}

#[tokio::test]
async fn feed_id_keeps_explicit_nulls() {
    let (state, _) = seeded().await;
    let body = data(run(&state, r#"{ feed(filter: null, skip: 0) { id count } }"#, None).await);
    assert_eq!(body["feed"]["id"], r#"main-feed:{"filter":null,"skip":0}"#);
    assert_eq!(body["feed"]["count"], 2);

    let body = data(run(&state, r#"{ feed(take: 1) { id } }"#, None).await);
    assert_eq!(body["feed"]["id"], r#"main-feed:{"take":1}"#);
}

#[tokio::test]
async fn single_link_lookup() {
    let (state, _) = seeded().await;
    let body = data(run(&state, r#"{ link(id: "2") { id url createdAt } }"#, None).await);
    assert_eq!(body["link"]["url"], "https://www.google.es");
    assert!(body["link"]["createdAt"].is_string());

    let body = data(run(&state, r#"{ link(id: "99") { id } }"#, None).await);
    assert!(body["link"].is_null());

    let response = run(&state, r#"{ link(id: "abc") { id } }"#, None).await;
    assert_eq!(error_code(&response), "BAD_USER_INPUT");
}

#[tokio::test]
async fn update_changes_an_existing_link() {
    let (state, token) = seeded().await;

    let response = run(
        &state,
        r#"mutation { update(id: "42", description: "x", url: "y") { id } }"#,
        Some(&token),
    )
    .await;
    assert_eq!(error_code(&response), "NOT_FOUND");

    data(
        run(
            &state,
            r#"mutation { update(id: "1", description: "Updated", url: "https://new.example") { id } }"#,
            Some(&token),
        )
        .await,
    );
    let body = data(run(&state, r#"{ link(id: "1") { description url } }"#, None).await);
    assert_eq!(body["link"], json!({ "description": "Updated", "url": "https://new.example" }));
}

#[tokio::test]
async fn writes_require_the_poster() {
    let (state, _) = seeded().await;
    let (_, intruder) = signup(&state, "mallory").await;

    let update = r#"mutation { update(id: "1", description: "pwned", url: "x") { id } }"#;
    assert_eq!(error_code(&run(&state, update, None).await), "UNAUTHENTICATED");
    assert_eq!(error_code(&run(&state, update, Some(&intruder)).await), "FORBIDDEN");

    let delete = r#"mutation { delete(id: "1") { id } }"#;
    assert_eq!(error_code(&run(&state, delete, None).await), "UNAUTHENTICATED");
    assert_eq!(error_code(&run(&state, delete, Some(&intruder)).await), "FORBIDDEN");

    let body = data(run(&state, r#"{ link(id: "1") { description } }"#, None).await);
    assert_eq!(body["link"]["description"], "Fullstack tutorial");
}

#[tokio::test]
async fn delete_removes_the_link() {
    let (state, token) = seeded().await;
    let body = data(run(&state, r#"mutation { delete(id: "1") { id description } }"#, Some(&token)).await);
    assert_eq!(body["delete"]["description"], "Fullstack tutorial");

    let body = data(run(&state, r#"{ link(id: "1") { id } }"#, None).await);
    assert!(body["link"].is_null());

    let response = run(&state, r#"mutation { delete(id: "1") { id } }"#, Some(&token)).await;
    assert_eq!(error_code(&response), "NOT_FOUND");
}

#[tokio::test]
async fn votes_are_listed_once_per_voter() {
    let (state, _) = seeded().await;
    let (bob_id, bob) = signup(&state, "bob").await;
    let (carol_id, carol) = signup(&state, "carol").await;

    let vote = r#"mutation { vote(linkId: "2") { id link { id } user { name } } }"#;
    let body = data(run(&state, vote, Some(&bob)).await);
    assert_eq!(body["vote"]["link"]["id"], 2);
    assert_eq!(body["vote"]["user"]["name"], "bob");
    data(run(&state, vote, Some(&carol)).await);

    assert_eq!(error_code(&run(&state, vote, Some(&bob)).await), "CONFLICT");
    assert_eq!(error_code(&run(&state, vote, None).await), "UNAUTHENTICATED");
    let missing = r#"mutation { vote(linkId: "77") { id } }"#;
    assert_eq!(error_code(&run(&state, missing, Some(&bob)).await), "NOT_FOUND");

    let body = data(run(&state, r#"{ feed { links { id voters { id } } } }"#, None).await);
    assert_eq!(
        body["feed"]["links"],
        json!([
            { "id": 1, "voters": [] },
            { "id": 2, "voters": [{ "id": bob_id }, { "id": carol_id }] }
        ])
    );
}

#[tokio::test]
async fn users_expose_their_links() {
    let (state, token) = seeded().await;
    let (_, other) = signup(&state, "dave").await;
    post(&state, &other, "Dave's link", "https://dave.example").await;
    post(&state, &token, "Third", "https://third.example").await;

    let body = data(run(&state, r#"{ link(id: "1") { postedBy { name links { id } } } }"#, None).await);
    assert_eq!(
        body["link"]["postedBy"],
        json!({ "name": "alice", "links": [{ "id": 1 }, { "id": 2 }, { "id": 4 }] })
    );
}

#[tokio::test]
async fn signup_and_login_issue_working_tokens() {
    let state = app();
    let (user_id, _) = signup(&state, "erin").await;

    let response = run(
        &state,
        r#"mutation { signup(email: "erin@example.com", password: "x", name: "again") { token } }"#,
        None,
    )
    .await;
    assert_eq!(error_code(&response), "CONFLICT");

    let response = run(
        &state,
        r#"mutation { login(email: "erin@example.com", password: "wrong") { token } }"#,
        None,
    )
    .await;
    assert_eq!(error_code(&response), "UNAUTHENTICATED");

    let response = run(
        &state,
        r#"mutation { login(email: "nobody@example.com", password: "pw") { token } }"#,
        None,
    )
    .await;
    assert_eq!(error_code(&response), "UNAUTHENTICATED");

    let body = data(
        run(
            &state,
            r#"mutation { login(email: "erin@example.com", password: "pw-erin") { token user { id email } } }"#,
            None,
        )
        .await,
    );
    assert_eq!(body["login"]["user"]["id"].as_i64(), Some(user_id));
    assert_eq!(body["login"]["user"]["email"], "erin@example.com");

    let token = body["login"]["token"].as_str().unwrap();
    let id = post(&state, token, "Logged in", "https://example.com").await;
    let body = data(run(&state, &format!(r#"{{ link(id: "{id}") {{ postedBy {{ id }} }} }}"#), None).await);
    assert_eq!(body["link"]["postedBy"]["id"].as_i64(), Some(user_id));
}
