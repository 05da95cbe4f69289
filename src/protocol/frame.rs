//! # Inbound Frames
//!
//! Frames received from the partner are only logged, never interpreted.

use std::fmt;

use super::wire::FIELD_DELIMITER;

/// One received line split into its `|`-delimited fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioFrame {
    fields: Vec<String>,
}

impl RadioFrame {
    /// Parses a received line (without terminator).
    ///
    /// Trailing `\r` is stripped and invalid UTF-8 is replaced.
    ///
    /// # Examples
    ///
    /// ```
    /// use omnimote::protocol::frame::RadioFrame;
    ///
    /// let frame = RadioFrame::parse(b"S|OC1|ok\r");
    /// assert_eq!(frame.fields(), ["S", "OC1", "ok"]);
    /// ```
    #[must_use]
    pub fn parse(line: &[u8]) -> Self {
        let text = String::from_utf8_lossy(line);
        let text = text.trim_end_matches('\r');
        Self {
            fields: text.split(FIELD_DELIMITER).map(str::to_string).collect(),
        }
    }

    /// Returns the fields in order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns the leading tag field.
    #[must_use]
    pub fn tag(&self) -> &str {
        self.fields.first().map_or("", String::as_str)
    }
}

impl fmt::Display for RadioFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", FIELD_DELIMITER)?;
            }
            f.write_str(field)?;
        }
        Ok(())
    }
}
