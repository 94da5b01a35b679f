use presentation::web::{router, AppState, PageConfig, SESSION_COOKIE};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::StatusCode;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tests::{spawn_server, ScriptedModel};

fn page() -> PageConfig {
    PageConfig {
        title: "Interview with Jada Smith".to_string(),
        subheading: "Ask about her projects.".to_string(),
        preamble: "You are Jada Smith.".to_string(),
    }
}

async fn start(model: ScriptedModel) -> SocketAddr {
    spawn_server(router(AppState::new(Arc::new(model), page()))).await
}

async fn session_cookie(client: &reqwest::Client, addr: SocketAddr) -> String {
    let response = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with(SESSION_COOKIE));
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn page_shows_title_and_subheading() {
    let addr = start(ScriptedModel::new()).await;
    let body = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("<h1>Interview with Jada Smith</h1>"));
    assert!(body.contains("Ask about her projects."));
    assert!(!body.contains("You are Jada Smith."));
}

#[tokio::test]
async fn blank_message_is_a_no_op() {
    let model = ScriptedModel::new();
    let addr = start(model.clone()).await;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/chat"))
        .form(&[("message", "   ")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn exchange_streams_then_persists() {
    let model = ScriptedModel::new();
    model.push_reply(&["I led ", "the **payments** migration."]);
    let addr = start(model.clone()).await;
    let client = reqwest::Client::new();
    let cookie = session_cookie(&client, addr).await;

    let body = client
        .post(format!("http://{addr}/chat"))
        .header(COOKIE, &cookie)
        .form(&[("message", "Tell me about a project")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let body = body.replace("event: ", "event:");

    let user_at = body.find("event:user").unwrap();
    let first_at = body.find("I led ").unwrap();
    let done_at = body.find("event:done").unwrap();
    assert!(user_at < first_at && first_at < done_at);
    assert!(body.contains("data-role=\\\"user\\\""));

    let prompt = &model.prompts()[0];
    assert_eq!(prompt.len(), 2);
    assert_eq!(prompt[0].content(), "You are Jada Smith.");
    assert_eq!(prompt[1].content(), "Tell me about a project");

    let page = client
        .get(format!("http://{addr}/"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let question_at = page.find("Tell me about a project").unwrap();
    let answer_at = page.find("I led the **payments** migration.").unwrap();
    assert!(question_at < answer_at);
}

#[tokio::test]
async fn failed_reply_reports_error_and_records_nothing() {
    // No reply is queued, so the model call fails.
    let model = ScriptedModel::new();
    let addr = start(model.clone()).await;
    let client = reqwest::Client::new();
    let cookie = session_cookie(&client, addr).await;

    let body = client
        .post(format!("http://{addr}/chat"))
        .header(COOKIE, &cookie)
        .form(&[("message", "Hello?")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.replace("event: ", "event:").contains("event:error"));
    assert!(body.contains("no scripted reply left"));

    let page = client
        .get(format!("http://{addr}/"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!page.contains("Hello?"));
}

#[tokio::test]
async fn sessions_do_not_share_history() {
    let model = ScriptedModel::new();
    model.push_reply(&["Hi Alice."]);
    let addr = start(model).await;
    let client = reqwest::Client::new();
    let alice = session_cookie(&client, addr).await;
    let bob = session_cookie(&client, addr).await;
    assert_ne!(alice, bob);

    client
        .post(format!("http://{addr}/chat"))
        .header(COOKIE, &alice)
        .form(&[("message", "I am Alice")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let bob_page = client
        .get(format!("http://{addr}/"))
        .header(COOKIE, &bob)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!bob_page.contains("I am Alice"));
}

#[tokio::test]
async fn cookieless_visits_do_not_accumulate_sessions() {
    let state = AppState::new(Arc::new(ScriptedModel::new()), page())
        .with_idle_ttl(Duration::from_millis(500));
    let addr = spawn_server(router(state.clone())).await;

    for _ in 0..10 {
        let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(state.sessions().len().await, 10);

    tokio::time::sleep(Duration::from_millis(800)).await;
    reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(state.sessions().len().await, 1);
}
