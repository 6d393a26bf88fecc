// src/server/mod.rs

//! Development server front.
//!
//! - [`ServerProfile`] names the directories and route aliases to serve.
//! - [`router`] folds them into an axum router: roots are tried in order and
//!   HTML responses get the reload client.
//! - [`reload`] is the WebSocket side of live reload.
//! - [`inject`] builds and injects the reload client.

pub mod inject;
pub mod reload;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::context::BuildContext;
use crate::errors::Result;
use crate::paths::AssetClass;

pub use reload::{ReloadHandle, ReloadMessage, start_reload_server};

/// Path of the plain-text status page.
pub const STATUS_PATH: &str = "/__assetdag";

/// What one server instance serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerProfile {
    pub name: &'static str,
    /// Directories tried in order for every request.
    pub roots: Vec<PathBuf>,
    /// URL prefix to directory aliases, checked before the roots.
    pub routes: Vec<(String, PathBuf)>,
    /// Serve the status page.
    pub ui: bool,
}

impl ServerProfile {
    /// Intermediate tree over the sources, with components aliased.
    pub fn development(ctx: &BuildContext) -> Self {
        let project = &ctx.config.project;
        Self {
            name: "serve",
            roots: vec![project.tmp_dir.clone(), project.app_dir.clone()],
            routes: vec![components_route(ctx)],
            ui: true,
        }
    }

    /// The output tree only.
    pub fn distribution(ctx: &BuildContext) -> Self {
        Self {
            name: "serve:dist",
            roots: vec![ctx.config.project.dist_dir.clone()],
            routes: Vec::new(),
            ui: true,
        }
    }

    /// The test harness, with compiled scripts and components aliased.
    pub fn test_harness(ctx: &BuildContext) -> Self {
        Self {
            name: "serve:test",
            roots: vec![ctx.config.project.test_dir.clone()],
            routes: vec![
                ("/scripts".to_string(), ctx.class(AssetClass::Scripts).tmp.clone()),
                components_route(ctx),
            ],
            ui: false,
        }
    }
}

fn components_route(ctx: &BuildContext) -> (String, PathBuf) {
    let dir = &ctx.config.project.components_dir;
    (
        format!("/{}", dir.to_string_lossy().replace('\\', "/")),
        dir.clone(),
    )
}

/// Build the router for `profile`. With a reload port, HTML responses get
/// the reload client.
pub fn router(profile: &ServerProfile, ctx: &BuildContext, reload_port: Option<u16>) -> Router {
    let mut app = profile
        .roots
        .iter()
        .rev()
        .fold(None::<Router>, |next, root| {
            let dir = ServeDir::new(ctx.resolve(root));
            Some(match next {
                None => Router::new().fallback_service(dir),
                Some(next) => Router::new().fallback_service(dir.fallback(next)),
            })
        })
        .unwrap_or_default();

    for (prefix, dir) in &profile.routes {
        app = app.nest_service(prefix, ServeDir::new(ctx.resolve(dir)));
    }

    if profile.ui {
        let status = status_text(profile, ctx, reload_port);
        app = app.route(STATUS_PATH, get(move || async move { status }));
    }

    if let Some(port) = reload_port {
        let snippet: Arc<str> = inject::client_snippet(port, ctx.config.server.notify).into();
        app = app.layer(middleware::from_fn_with_state(
            snippet,
            inject::inject_reload_client,
        ));
    }

    app
}

fn status_text(profile: &ServerProfile, ctx: &BuildContext, reload_port: Option<u16>) -> String {
    let mut text = format!("assetdag {}\nprofile: {}\nmode: {}\n", env!("CARGO_PKG_VERSION"), profile.name, ctx.mode);
    for root in &profile.roots {
        text.push_str(&format!("root: {}\n", root.display()));
    }
    for (prefix, dir) in &profile.routes {
        text.push_str(&format!("route: {prefix} -> {}\n", dir.display()));
    }
    match reload_port {
        Some(port) => text.push_str(&format!("reload: ws://localhost:{port}\n")),
        None => text.push_str("reload: off\n"),
    }
    text
}

/// Bind the configured host and port and serve `profile` in the background.
pub async fn start(
    profile: &ServerProfile,
    ctx: &BuildContext,
    reload_port: Option<u16>,
) -> Result<JoinHandle<()>> {
    let host = ctx.config.server.host.clone();
    let port = ctx.config.server.port;

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    let app = router(profile, ctx, reload_port);

    info!(url = %format!("http://{host}:{port}/"), profile = profile.name, "serving");

    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "server stopped");
        }
    }))
}
