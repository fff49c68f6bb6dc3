//! Upload page and the generation endpoint

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use tower_http::limit::RequestBodyLimitLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing::{error, info};

use crate::adapters::{CaptionAdapter, ImageAdapter};
use crate::compose::{Compositor, TextRenderer};
use crate::config::AppConfig;
use crate::error::MorpherError;

mod flash;
mod generate;
pub(crate) mod prelude;
mod views;

use generate::generate_handler;
use views::index_handler;

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    config: Arc<AppConfig>,
    compositor: Arc<Compositor>,
    captions: CaptionAdapter,
    images: ImageAdapter,
}

impl AppState {
    pub(crate) fn new(config: AppConfig, text: TextRenderer) -> Result<Self, MorpherError> {
        Ok(Self {
            captions: CaptionAdapter::new(&config.genai)?,
            images: ImageAdapter::new(&config.genai, text.clone())?,
            compositor: Arc::new(Compositor::new(text)),
            config: Arc::new(config),
        })
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(index_handler))
        .route("/static/styles.css", axum::routing::get(styles_handler))
        .route("/generate", axum::routing::post(generate_handler))
}

/// The router with its state and layers applied.
fn build_app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    let sessions = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
    create_router()
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(sessions)
        .with_state(state)
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
    info!("Shutting down");
}

/// Binds the listener and serves until interrupted.
pub async fn setup_server(config: AppConfig, text: TextRenderer) -> Result<(), anyhow::Error> {
    let addr = format!("{}:{}", config.listen_address, config.port);
    info!(
        "Runs stored in {}, image API {}, caption API {}, credential {}",
        config.runs_dir.display(),
        config.use_image_api,
        config.use_llm,
        if config.genai.has_credential() { "present" } else { "absent" }
    );
    let app = build_app(AppState::new(config, text)?);

    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;
    use std::path::Path;

    use axum::body::Body;
    use axum::http::header::{CONTENT_DISPOSITION, COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use image::{Rgba, RgbaImage};
    use tower::ServiceExt;

    const BOUNDARY: &str = "brandmorpher-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, Vec<u8>),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                        )
                        .as_bytes(),
                    );
                }
                Part::File(name, filename, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; \
                             filename=\"{filename}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn generate_request(parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/generate")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .expect("build request")
    }

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    fn logo_png() -> Vec<u8> {
        png_bytes(&RgbaImage::from_pixel(30, 15, Rgba([220, 30, 30, 255])))
    }

    fn product_png() -> Vec<u8> {
        let mut img = RgbaImage::new(40, 40);
        for y in 5..35 {
            for x in 10..30 {
                img.put_pixel(x, y, Rgba([30, 30, 200, 255]));
            }
        }
        png_bytes(&img)
    }

    fn test_app(runs_dir: &Path) -> Router {
        let config = AppConfig {
            runs_dir: runs_dir.to_path_buf(),
            creative_count: 2,
            canvas_size: 96,
            ..AppConfig::default()
        };
        let state = AppState::new(config, TextRenderer::without_font()).expect("state");
        build_app(state)
    }

    async fn read_body(response: axum::response::Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes()
            .to_vec()
    }

    fn session_cookie(response: &axum::response::Response) -> String {
        response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .expect("session cookie")
            .to_string()
    }

    #[tokio::test]
    async fn index_renders_upload_form() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());
        let request = Request::builder()
            .uri("/")
            .body(Body::empty())
            .expect("build request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8(read_body(response).await).expect("utf8");
        assert!(body.contains("action=\"/generate\""));
        assert!(body.contains("name=\"logo\""));
    }

    #[tokio::test]
    async fn stylesheet_is_served() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = Request::builder()
            .uri("/static/styles.css")
            .body(Body::empty())
            .expect("build request");
        let response = test_app(dir.path()).oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("text/css")
        );
    }

    #[tokio::test]
    async fn missing_upload_redirects_with_flash() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());
        let request = generate_request(&[
            Part::Text("brand", "Acme"),
            Part::File("logo", "logo.png", logo_png()),
        ]);
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/")
        );
        let cookie = session_cookie(&response);

        let follow = Request::builder()
            .uri("/")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .expect("build request");
        let page = app.clone().oneshot(follow).await.expect("response");
        let body = String::from_utf8(read_body(page).await).expect("utf8");
        assert!(body.contains("Please upload both logo and product images."));

        // the message is shown once
        let again = Request::builder()
            .uri("/")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .expect("build request");
        let page = app.oneshot(again).await.expect("response");
        let body = String::from_utf8(read_body(page).await).expect("utf8");
        assert!(!body.contains("Please upload both"));
    }

    #[tokio::test]
    async fn wrong_extension_redirects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = generate_request(&[
            Part::File("logo", "logo.gif", logo_png()),
            Part::File("product", "boots.png", product_png()),
        ]);
        let response = test_app(dir.path()).oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        // nothing was created for a rejected request
        assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
    }

    #[tokio::test]
    async fn undecodable_upload_redirects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = generate_request(&[
            Part::File("logo", "logo.png", b"definitely not a png".to_vec()),
            Part::File("product", "boots.png", product_png()),
        ]);
        let response = test_app(dir.path()).oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn generate_returns_zip_of_the_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = generate_request(&[
            Part::Text("brand", "Acme Co"),
            Part::Text("product_name", "Trail Boots"),
            Part::File("logo", "my logo.PNG", logo_png()),
            Part::File("product", "boots.jpg", product_png()),
        ]);
        let response = test_app(dir.path()).oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/zip")
        );
        assert_eq!(
            response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"Acme_Co_Trail_Boots_creatives.zip\"")
        );

        let bytes = read_body(response).await;
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("zip archive");
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "captions.txt",
                "creative_01.jpg",
                "creative_01.png",
                "creative_02.jpg",
                "creative_02.png",
                "logo_my_logo.PNG",
                "product_boots.jpg",
            ]
        );
    }
}
