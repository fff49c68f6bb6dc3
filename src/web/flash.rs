use tower_sessions::Session;

use crate::error::MorpherError;

const FLASH_FLAG_KEY: &str = "flash_flag";

pub(crate) const FLASH_MISSING_UPLOADS: u16 = 1;
pub(crate) const FLASH_BAD_EXTENSION: u16 = 2;
pub(crate) const FLASH_UNREADABLE_UPLOAD: u16 = 3;
pub(crate) const FLASH_GENERATION_FAILED: u16 = 4;
pub(crate) const FLASH_PACKAGING_FAILED: u16 = 5;

#[derive(Clone, Debug)]
pub(crate) struct FlashMessage {
    pub(crate) text: &'static str,
    pub(crate) class: &'static str,
}

pub(crate) async fn set_flash(session: &Session, flag: u16) -> Result<(), MorpherError> {
    session
        .insert(FLASH_FLAG_KEY, flag)
        .await
        .map_err(|err| MorpherError::InternalServerError(err.to_string()))?;
    Ok(())
}

pub(crate) async fn take_flash_message(
    session: &Session,
) -> Result<Option<FlashMessage>, MorpherError> {
    let flag = session
        .get::<u16>(FLASH_FLAG_KEY)
        .await
        .map_err(|err| MorpherError::InternalServerError(err.to_string()))?
        .filter(|flag| *flag != 0);
    if flag.is_some() {
        session
            .insert(FLASH_FLAG_KEY, 0u16)
            .await
            .map_err(|err| MorpherError::InternalServerError(err.to_string()))?;
    }
    Ok(flag.and_then(message_for))
}

fn message_for(flag: u16) -> Option<FlashMessage> {
    match flag {
        FLASH_MISSING_UPLOADS => Some(FlashMessage {
            text: "Please upload both logo and product images.",
            class: "warning",
        }),
        FLASH_BAD_EXTENSION => Some(FlashMessage {
            text: "Allowed file types: png, jpg, jpeg",
            class: "warning",
        }),
        FLASH_UNREADABLE_UPLOAD => Some(FlashMessage {
            text: "One of the uploads could not be read as an image.",
            class: "warning",
        }),
        FLASH_GENERATION_FAILED => Some(FlashMessage {
            text: "Generation failed on server. Check server logs.",
            class: "error",
        }),
        FLASH_PACKAGING_FAILED => Some(FlashMessage {
            text: "Packaging failed on server.",
            class: "error",
        }),
        _ => None,
    }
}
