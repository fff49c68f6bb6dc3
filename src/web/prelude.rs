pub(crate) use crate::{error::MorpherError, web::AppState};
pub(crate) use askama::Template;
pub(crate) use askama_web::WebTemplate;
pub(crate) use axum::extract::State;
pub(crate) use std::sync::Arc;
pub(crate) use tower_sessions::Session;
pub(crate) use tracing::{debug, error, info, warn};
