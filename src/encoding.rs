//! Conversion between legacy code pages and canonical (UTF-8) text.
//!
//! Legacy names travel through the crate in two forms: as canonical `String`s
//! for display, and as *byte-preserving* strings where every `char` in
//! `U+0000..=U+00FF` stands for exactly one raw byte. The latter is what
//! [`convert`] expects on the legacy side of a conversion.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use encoding_rs::{BIG5, EUC_KR, Encoding as RsEncoding, GBK, SHIFT_JIS, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DspTreeError, Outcome};

/// Encodings a project description or a directory listing may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf8", alias = "utf-8")]
    Utf8,
    #[serde(rename = "cp949", alias = "windows-949")]
    Cp949,
    #[serde(rename = "euc-kr")]
    EucKr,
    #[serde(rename = "shift-jis", alias = "shift_jis")]
    ShiftJis,
    #[serde(rename = "gbk")]
    Gbk,
    #[serde(rename = "big5")]
    Big5,
    #[serde(rename = "windows-1252", alias = "cp1252")]
    Windows1252,
}

impl TextEncoding {
    pub const ALL: [TextEncoding; 7] = [
        TextEncoding::Utf8,
        TextEncoding::Cp949,
        TextEncoding::EucKr,
        TextEncoding::ShiftJis,
        TextEncoding::Gbk,
        TextEncoding::Big5,
        TextEncoding::Windows1252,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf8",
            TextEncoding::Cp949 => "cp949",
            TextEncoding::EucKr => "euc-kr",
            TextEncoding::ShiftJis => "shift-jis",
            TextEncoding::Gbk => "gbk",
            TextEncoding::Big5 => "big5",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }

    /// True for the internal representation, where no conversion is needed.
    pub fn is_canonical(self) -> bool {
        matches!(self, TextEncoding::Utf8)
    }

    // encoding_rs implements the WHATWG "euc-kr" encoding, which is windows-949.
    fn to_rs(self) -> &'static RsEncoding {
        match self {
            TextEncoding::Utf8 => UTF_8,
            TextEncoding::Cp949 | TextEncoding::EucKr => EUC_KR,
            TextEncoding::ShiftJis => SHIFT_JIS,
            TextEncoding::Gbk => GBK,
            TextEncoding::Big5 => BIG5,
            TextEncoding::Windows1252 => WINDOWS_1252,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = DspTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(TextEncoding::Utf8),
            "cp949" | "windows-949" | "uhc" => Ok(TextEncoding::Cp949),
            "euc-kr" | "euckr" => Ok(TextEncoding::EucKr),
            "shift-jis" | "shift_jis" | "sjis" | "cp932" => Ok(TextEncoding::ShiftJis),
            "gbk" | "cp936" => Ok(TextEncoding::Gbk),
            "big5" | "cp950" => Ok(TextEncoding::Big5),
            "windows-1252" | "cp1252" => Ok(TextEncoding::Windows1252),
            _ => Err(DspTreeError::UnknownEncoding(s.to_string())),
        }
    }
}

/// Reinterprets raw bytes as a byte-preserving string.
pub fn bytes_to_binary(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`bytes_to_binary`]; `None` if any char lies above `U+00FF`.
pub fn binary_to_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(c).ok()).collect()
}

/// Converts `text` from one encoding to another.
///
/// * `from == to` is the identity.
/// * legacy to canonical: `text` is a byte-preserving string whose bytes are
///   decoded as `from`.
/// * canonical to legacy: `text` is encoded as `to` and returned as a
///   byte-preserving string, ready to be turned back into raw bytes.
/// * legacy to legacy: `text` is encoded as `from` and decoded as `to`.
///
/// On failure the original text is returned along with an
/// [`DspTreeError::EncodingConversion`] diagnostic.
pub fn convert(text: &str, from: TextEncoding, to: TextEncoding) -> Outcome<String> {
    if from == to {
        return Outcome::clean(text.to_string());
    }
    match try_convert(text, from, to) {
        Ok(converted) => Outcome::clean(converted),
        Err(reason) => {
            warn!(
                from = from.name(),
                to = to.name(),
                %reason,
                "encoding conversion failed, keeping original text"
            );
            Outcome::degraded(
                text.to_string(),
                DspTreeError::EncodingConversion {
                    from: from.name(),
                    to: to.name(),
                    reason,
                },
            )
        }
    }
}

fn try_convert(text: &str, from: TextEncoding, to: TextEncoding) -> Result<String, String> {
    if to.is_canonical() {
        let bytes = binary_to_bytes(text)
            .ok_or_else(|| "input is not a byte-preserving string".to_string())?;
        decode_with(&bytes, from)
    } else if from.is_canonical() {
        encode_with(text, to).map(|bytes| bytes_to_binary(&bytes))
    } else {
        let bytes = encode_with(text, from)?;
        decode_with(&bytes, to)
    }
}

fn decode_with(bytes: &[u8], encoding: TextEncoding) -> Result<String, String> {
    encoding
        .to_rs()
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| format!("invalid byte sequence for {}", encoding.name()))
}

fn encode_with(text: &str, encoding: TextEncoding) -> Result<Vec<u8>, String> {
    let (bytes, _, had_errors) = encoding.to_rs().encode(text);
    if had_errors {
        return Err(format!("text is not representable in {}", encoding.name()));
    }
    Ok(bytes.into_owned())
}

/// Decodes a whole file's bytes into canonical text.
///
/// Falls back to the byte-preserving form of `bytes` when they are not valid
/// in `encoding`.
pub fn decode_bytes(bytes: &[u8], encoding: TextEncoding) -> Outcome<String> {
    match decode_with(bytes, encoding) {
        Ok(text) => Outcome::clean(text),
        Err(reason) => {
            warn!(encoding = encoding.name(), %reason, "cannot decode text, using raw bytes");
            Outcome::degraded(
                bytes_to_binary(bytes),
                DspTreeError::EncodingConversion {
                    from: encoding.name(),
                    to: TextEncoding::Utf8.name(),
                    reason,
                },
            )
        }
    }
}

/// Display form of a single on-disk path segment (folder or file name).
///
/// The same rule applies to every non-canonical encoding: the segment's raw
/// bytes are decoded in `encoding`. A segment that does not decode is shown
/// lossily.
pub fn display_name(segment: &OsStr, encoding: TextEncoding) -> Outcome<String> {
    if encoding.is_canonical() {
        return Outcome::clean(segment.to_string_lossy().into_owned());
    }
    decode_os_name(segment, encoding)
}

#[cfg(unix)]
fn decode_os_name(segment: &OsStr, encoding: TextEncoding) -> Outcome<String> {
    use std::os::unix::ffi::OsStrExt;

    let mut outcome = convert(
        &bytes_to_binary(segment.as_bytes()),
        encoding,
        TextEncoding::Utf8,
    );
    if outcome.is_degraded() {
        outcome.value = segment.to_string_lossy().into_owned();
    }
    outcome
}

// Non-Unix hosts hand out Unicode names; there are no raw bytes to decode.
#[cfg(not(unix))]
fn decode_os_name(segment: &OsStr, _encoding: TextEncoding) -> Outcome<String> {
    Outcome::clean(segment.to_string_lossy().into_owned())
}

/// On-disk form of a canonical relative path, for filesystems that store
/// names as legacy-encoded bytes.
pub fn native_path(text: &str, encoding: TextEncoding) -> Outcome<PathBuf> {
    if encoding.is_canonical() {
        return Outcome::clean(PathBuf::from(text));
    }
    encode_os_path(text, encoding)
}

#[cfg(unix)]
fn encode_os_path(text: &str, encoding: TextEncoding) -> Outcome<PathBuf> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    let outcome = convert(text, TextEncoding::Utf8, encoding);
    if outcome.is_degraded() {
        return outcome.map(PathBuf::from);
    }
    outcome.map(|raw| match binary_to_bytes(&raw) {
        Some(bytes) => PathBuf::from(OsString::from_vec(bytes)),
        None => PathBuf::from(raw),
    })
}

#[cfg(not(unix))]
fn encode_os_path(text: &str, _encoding: TextEncoding) -> Outcome<PathBuf> {
    Outcome::clean(PathBuf::from(text))
}

/// On-disk form of a byte-preserving path string, bytes kept verbatim.
///
/// Used for text that could not be decoded in the first place, where a
/// round trip through an encoder would lose the original bytes.
#[cfg(unix)]
pub fn binary_path(binary: &str) -> PathBuf {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    match binary_to_bytes(binary) {
        Some(bytes) => PathBuf::from(OsString::from_vec(bytes)),
        None => PathBuf::from(binary),
    }
}

#[cfg(not(unix))]
pub fn binary_path(binary: &str) -> PathBuf {
    match binary_to_bytes(binary) {
        Some(bytes) => PathBuf::from(String::from_utf8_lossy(&bytes).into_owned()),
        None => PathBuf::from(binary),
    }
}
