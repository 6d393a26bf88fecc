// src/server/inject.rs

//! Reload client injected into served pages.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

const CLIENT: &str = r#"(function () {
  var socket = new WebSocket("ws://" + (location.hostname || "localhost") + ":__PORT__");
  socket.addEventListener("open", function () {
    if (__NOTIFY__) {
      var note = document.createElement("div");
      note.textContent = "Connected to assetdag";
      note.style.cssText = "position:fixed;top:0;right:0;padding:6px 10px;background:#222;color:#fff;font:12px sans-serif;z-index:9999";
      document.body.appendChild(note);
      setTimeout(function () { note.remove(); }, 1500);
    }
  });
  socket.addEventListener("message", function (event) {
    var msg;
    try { msg = JSON.parse(event.data); } catch (e) { msg = { command: "reload" }; }
    if (msg.command === "css") {
      document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {
        var url = new URL(link.href);
        url.searchParams.set("livereload", Date.now());
        link.href = url.toString();
      });
    } else {
      window.location.reload();
    }
  });
})();"#;

/// The `<script>` element pages receive.
pub fn client_snippet(port: u16, notify: bool) -> String {
    let js = CLIENT
        .replace("__PORT__", &port.to_string())
        .replace("__NOTIFY__", if notify { "true" } else { "false" });
    format!("<script>\n{js}\n</script>\n")
}

/// Insert `snippet` before the last `</body>`, or append it when the page
/// has none.
pub fn inject_script(html: &str, snippet: &str) -> String {
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + snippet.len());
            out.push_str(&html[..at]);
            out.push_str(snippet);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{html}{snippet}"),
    }
}

/// Middleware adding the reload client to successful HTML responses.
pub async fn inject_reload_client(
    State(snippet): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    if response.status() != StatusCode::OK || !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "could not buffer page for injection");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let page = inject_script(&String::from_utf8_lossy(&bytes), &snippet);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_goes_before_closing_body() {
        let page = inject_script("<html><body><p>x</p></BODY></html>", "<script></script>");
        assert_eq!(page, "<html><body><p>x</p><script></script></BODY></html>");
    }

    #[test]
    fn snippet_is_appended_without_body() {
        assert_eq!(inject_script("<p>x</p>", "<s/>"), "<p>x</p><s/>");
    }

    #[test]
    fn client_targets_the_reload_port() {
        let snippet = client_snippet(4242, false);
        assert!(snippet.contains(":4242\""));
        assert!(snippet.contains("if (false)"));
    }
}
