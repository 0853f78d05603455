//! Pagination cursors.
//!
//! An [`After`] records where the previous page ended: the sort value of its
//! last descriptor plus that descriptor's repository and snapshot name.
//!
//! # Wire formats
//!
//! - **Token**: base64url of `"<value>,<repo_name>,<snapshot_name>"`. The
//!   fields are not escaped, so a comma inside any of them cannot be
//!   encoded and [`After::to_token`] rejects it.
//! - **Binary**: three length-prefixed UTF-8 strings in the order
//!   `(value, repo_name, snapshot_name)`; each length is an unsigned LEB128
//!   varint.

use crate::error::ListingError;
use crate::model::SnapshotInfo;
use crate::sort::SortKey;
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE};
use base64::engine::DecodePaddingMode;
use serde::{Deserialize, Serialize};

const FIELD_DELIMITER: char = ',';

/// Accepts tokens with or without trailing `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Resumable position in a sorted listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct After {
    pub value: String,
    pub repo_name: String,
    pub snapshot_name: String,
}

impl After {
    #[must_use]
    pub fn new(
        value: impl Into<String>,
        repo_name: impl Into<String>,
        snapshot_name: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            repo_name: repo_name.into(),
            snapshot_name: snapshot_name.into(),
        }
    }

    /// Cursor pointing just past `info` in a listing sorted by `key`.
    #[must_use]
    pub fn encode(info: &SnapshotInfo, key: SortKey) -> Self {
        Self::new(key.render_value(info), &info.repository, info.name())
    }

    /// Render the opaque base64url token.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidArgument`] if any field contains a comma.
    pub fn to_token(&self) -> Result<String, ListingError> {
        let fields = [&self.value, &self.repo_name, &self.snapshot_name];
        if let Some(field) = fields.iter().find(|f| f.contains(FIELD_DELIMITER)) {
            return Err(ListingError::invalid_argument(format!(
                "cursor field '{field}' contains a ',' and cannot be encoded"
            )));
        }
        let raw = format!(
            "{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}",
            self.value, self.repo_name, self.snapshot_name
        );
        Ok(URL_SAFE.encode(raw.as_bytes()))
    }

    /// Parse a token produced by [`After::to_token`].
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidCursor`] if the token is not base64url,
    /// not UTF-8, or does not hold exactly three comma-separated fields.
    pub fn from_token(token: &str) -> Result<Self, ListingError> {
        let bytes = URL_SAFE_LENIENT
            .decode(token.trim())
            .map_err(|e| ListingError::invalid_cursor(format!("'{token}' is not base64url: {e}")))?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| ListingError::invalid_cursor(format!("'{token}' is not UTF-8")))?;

        let parts: Vec<&str> = raw.split(FIELD_DELIMITER).collect();
        let [value, repo_name, snapshot_name] = parts.as_slice() else {
            return Err(ListingError::invalid_cursor(format!(
                "'{token}' decodes to {} fields, expected 3",
                parts.len()
            )));
        };
        Ok(Self::new(*value, *repo_name, *snapshot_name))
    }

    /// Append the binary form to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        for field in [&self.value, &self.repo_name, &self.snapshot_name] {
            encode_varint(field.len() as u64, buf);
            buf.extend_from_slice(field.as_bytes());
        }
    }

    /// Read the binary form from the front of `data`.
    ///
    /// Returns the cursor and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidCursor`] on truncated data or
    /// non-UTF-8 fields.
    pub fn read_from(data: &[u8]) -> Result<(Self, usize), ListingError> {
        let mut pos = 0;
        let mut fields: [String; 3] = Default::default();
        for field in &mut fields {
            let (len, used) = decode_varint(&data[pos..])?;
            pos += used;
            let len = usize::try_from(len)
                .map_err(|_| ListingError::invalid_cursor("binary cursor field too long"))?;
            let end = pos
                .checked_add(len)
                .filter(|end| *end <= data.len())
                .ok_or_else(|| ListingError::invalid_cursor("binary cursor truncated"))?;
            *field = std::str::from_utf8(&data[pos..end])
                .map_err(|_| ListingError::invalid_cursor("binary cursor field is not UTF-8"))?
                .to_string();
            pos = end;
        }
        let [value, repo_name, snapshot_name] = fields;
        Ok((
            Self {
                value,
                repo_name,
                snapshot_name,
            },
            pos,
        ))
    }
}

fn encode_varint(value: u64, buf: &mut Vec<u8>) {
    let mut v = value;
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

fn decode_varint(data: &[u8]) -> Result<(u64, usize), ListingError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in data.iter().enumerate() {
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
        if shift >= 64 {
            return Err(ListingError::invalid_cursor(
                "binary cursor length prefix overflows",
            ));
        }
    }
    Err(ListingError::invalid_cursor("binary cursor truncated"))
}
