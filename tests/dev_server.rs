// tests/dev_server.rs
//
// The dev server's router bound to an ephemeral port and queried over raw
// HTTP/1.1.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use assetdag::context::BuildContext;
use assetdag::server::{STATUS_PATH, ServerProfile, router};
use assetdag::types::BuildMode;
use assetdag_test_utils::builders::TestProject;
use assetdag_test_utils::{init_tracing, with_timeout};

const RELOAD_PORT: u16 = 35729;

struct Reply {
    status: u16,
    head: String,
    body: String,
}

async fn serve(profile: ServerProfile, ctx: &BuildContext, reload: Option<u16>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(&profile, ctx, reload);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn get(addr: SocketAddr, path: &str) -> Reply {
    with_timeout(async {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let text = String::from_utf8_lossy(&raw).into_owned();
        let (head, body) = text.split_once("\r\n\r\n").unwrap_or((&text, ""));
        let status = head
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        Reply {
            status,
            head: head.to_ascii_lowercase(),
            body: body.to_string(),
        }
    })
    .await
}

fn dev_project() -> TestProject {
    TestProject::new()
        .file(".tmp/index.html", "<html><body><h1>built</h1></body></html>")
        .file("app/index.html", "<html><body><h1>source</h1></body></html>")
        .file("app/scripts/main.js", "console.log(1);")
        .file(".tmp/styles/main.css", "body{}")
        .file("bower_components/a/a.js", "var a;")
}

#[tokio::test]
async fn intermediate_tree_wins_over_sources() {
    init_tracing();
    let project = dev_project();
    let ctx = project.ctx(BuildMode::Development);
    let addr = serve(ServerProfile::development(&ctx), &ctx, None).await;

    let page = get(addr, "/index.html").await;
    assert_eq!(page.status, 200);
    assert!(page.body.contains("built"), "{}", page.body);

    let script = get(addr, "/scripts/main.js").await;
    assert_eq!(script.status, 200);
    assert_eq!(script.body, "console.log(1);");

    assert_eq!(get(addr, "/styles/main.css").await.body, "body{}");
    assert_eq!(get(addr, "/nope.txt").await.status, 404);
}

#[tokio::test]
async fn components_are_served_under_their_alias() {
    init_tracing();
    let project = dev_project();
    let ctx = project.ctx(BuildMode::Development);
    let addr = serve(ServerProfile::development(&ctx), &ctx, None).await;

    let reply = get(addr, "/bower_components/a/a.js").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "var a;");
}

#[tokio::test]
async fn pages_get_the_reload_client_before_body_end() {
    init_tracing();
    let project = dev_project();
    let ctx = project.ctx(BuildMode::Development);
    let addr = serve(ServerProfile::development(&ctx), &ctx, Some(RELOAD_PORT)).await;

    let page = get(addr, "/").await;
    assert_eq!(page.status, 200);
    let script_at = page.body.find("new WebSocket").expect("client injected");
    let body_end = page.body.find("</body>").unwrap();
    assert!(script_at < body_end);
    assert!(page.body.contains(&format!(":{RELOAD_PORT}\"")));

    let script = get(addr, "/scripts/main.js").await;
    assert!(!script.body.contains("WebSocket"));
}

#[tokio::test]
async fn distribution_profile_serves_the_output_tree_untouched() {
    init_tracing();
    let project = TestProject::new()
        .file("dist/index.html", "<html><body>dist</body></html>")
        .file("app/index.html", "<html><body>app</body></html>");
    let ctx = project.ctx(BuildMode::Production);
    let addr = serve(ServerProfile::distribution(&ctx), &ctx, None).await;

    let page = get(addr, "/index.html").await;
    assert_eq!(page.body, "<html><body>dist</body></html>");
    assert!(page.head.contains("content-type: text/html"));

    let status = get(addr, STATUS_PATH).await;
    assert_eq!(status.status, 200);
    assert!(status.body.contains("profile: serve:dist"), "{}", status.body);
    assert!(status.body.contains("reload: off"));
}

#[tokio::test]
async fn test_harness_aliases_compiled_scripts() {
    init_tracing();
    let project = TestProject::new()
        .file("test/index.html", "<html><body>specs</body></html>")
        .file(".tmp/scripts/main.js", "compiled();");
    let ctx = project.ctx(BuildMode::Development);
    let addr = serve(ServerProfile::test_harness(&ctx), &ctx, Some(RELOAD_PORT)).await;

    assert!(get(addr, "/index.html").await.body.contains("specs"));
    assert_eq!(get(addr, "/scripts/main.js").await.body, "compiled();");
    // No status page for the harness.
    assert_eq!(get(addr, STATUS_PATH).await.status, 404);
}
