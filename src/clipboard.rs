use log::debug;

use crate::pdf::{Clipboard, ClipboardError};

/// The desktop clipboard, opened per copy
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: String) -> Result<(), ClipboardError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| ClipboardError(format!("Failed to access clipboard: {e}")))?;
        clipboard
            .set_text(text)
            .map_err(|e| ClipboardError(format!("Failed to copy to clipboard: {e}")))?;
        debug!("Copied selection to clipboard");
        Ok(())
    }
}
