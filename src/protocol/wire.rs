//! # Wire Constants
//!
//! Line-oriented ASCII framing shared by the remote and its receiver.

/// Drive command tag (first field of every transmit-tick command)
pub const DRIVE_TAG: &str = "D";

/// Identification tag, sent once on activation when announcing
pub const IDENT_TAG: &str = "I";

/// Field separator within a frame
pub const FIELD_DELIMITER: char = '|';

/// Frame terminator on the serial link
pub const LINE_TERMINATOR: u8 = b'\n';

/// Longest inbound line accepted before the buffer is discarded
pub const MAX_FRAME_LEN: usize = 256;

/// Builds the identification frame `I|<id>|<partner_id>`.
#[must_use]
pub fn ident_frame(id: &str, partner_id: &str) -> String {
    format!(
        "{tag}{d}{id}{d}{partner_id}",
        tag = IDENT_TAG,
        d = FIELD_DELIMITER
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_frame() {
        assert_eq!(ident_frame("OM1", "OC1"), "I|OM1|OC1");
    }

    #[test]
    fn test_delimiters_are_ascii() {
        assert!(FIELD_DELIMITER.is_ascii());
        assert!(LINE_TERMINATOR.is_ascii());
        assert!(DRIVE_TAG.is_ascii() && IDENT_TAG.is_ascii());
    }
}
