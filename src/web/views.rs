use super::flash;
use super::prelude::*;

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    creative_count: usize,
    max_upload_mb: usize,
    has_flash: bool,
    flash_message: String,
    flash_class: String,
}

/// handles the / GET
pub(crate) async fn index_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<IndexTemplate, MorpherError> {
    let flash = flash::take_flash_message(&session).await?;
    let (has_flash, flash_message, flash_class) = match flash {
        Some(message) => (true, message.text.to_string(), message.class.to_string()),
        None => (false, String::new(), String::new()),
    };
    Ok(IndexTemplate {
        creative_count: state.config.creative_count,
        max_upload_mb: state.config.max_upload_bytes / (1024 * 1024),
        has_flash,
        flash_message,
        flash_class,
    })
}
