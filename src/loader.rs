//! Content loader: reads one file and decodes it without ever failing on bad bytes.

use crate::{
    error::{Error, Result},
    file::{CandidateFile, FileContent},
};
use std::{fmt, fs, str::FromStr};
use tracing::{trace, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Name reported for a lossy UTF-8 decode.
pub const DEGRADED_ENCODING: &str = "utf-8 (with errors)";

/// Text encodings tried by the loader, in configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// Strict UTF-8. Input starting with a byte order mark is left to `Utf8Sig`.
    Utf8,
    /// UTF-8 with an optional byte order mark, which is stripped.
    Utf8Sig,
    /// Korean code page 949 (a superset of EUC-KR).
    Cp949,
    /// ISO-8859-1; every byte maps to one code point, so it never fails.
    Latin1,
}

impl TextEncoding {
    /// Order used when nothing else is configured.
    pub const DEFAULT_ORDER: [Self; 4] = [Self::Utf8, Self::Utf8Sig, Self::Cp949, Self::Latin1];

    /// Canonical name of this encoding.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Sig => "utf-8-sig",
            Self::Cp949 => "cp949",
            Self::Latin1 => "latin-1",
        }
    }

    /// Decodes `bytes` strictly, returning `None` on any malformed sequence.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => {
                if bytes.starts_with(UTF8_BOM) {
                    return None;
                }
                std::str::from_utf8(bytes).ok().map(str::to_owned)
            }
            Self::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_owned)
            }
            Self::Cp949 => encoding_rs::EUC_KR
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(std::borrow::Cow::into_owned),
            Self::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-8-sig" | "utf8-sig" => Ok(Self::Utf8Sig),
            "cp949" | "euc-kr" | "euckr" | "uhc" | "windows-949" => Ok(Self::Cp949),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            other => Err(Error::config(format!("Unknown encoding '{other}'"))),
        }
    }
}

/// Reads candidate files and decodes them with a fallback chain.
#[derive(Debug, Clone)]
pub struct ContentLoader {
    encodings: Vec<TextEncoding>,
}

impl Default for ContentLoader {
    fn default() -> Self {
        Self::new(TextEncoding::DEFAULT_ORDER.to_vec())
    }
}

impl ContentLoader {
    /// Creates a loader trying `encodings` in order.
    #[must_use]
    pub fn new(encodings: Vec<TextEncoding>) -> Self {
        Self { encodings }
    }

    /// Reads and decodes one file.
    ///
    /// # Errors
    ///
    /// Returns an IO error only if the file cannot be read. Undecodable
    /// content is never an error; it comes back flagged as degraded.
    pub fn load(&self, file: &CandidateFile) -> Result<FileContent> {
        let bytes = fs::read(&file.absolute_path).map_err(|e| Error::io(&file.absolute_path, e))?;
        let content = self.decode(&bytes);

        if content.degraded {
            warn!(
                path = %file.relative_path.display(),
                "No configured encoding fits, decoded with replacement characters"
            );
        } else {
            trace!(
                path = %file.relative_path.display(),
                encoding = content.encoding,
                "Decoded file"
            );
        }

        Ok(content)
    }

    /// Decodes raw bytes with the configured fallback chain.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> FileContent {
        let decoded = self
            .encodings
            .iter()
            .find_map(|encoding| encoding.decode(bytes).map(|text| (text, encoding.name())));

        match decoded {
            Some((text, name)) => FileContent::new(normalize_newlines(text), name),
            None => FileContent::degraded(
                normalize_newlines(String::from_utf8_lossy(bytes).into_owned()),
                DEGRADED_ENCODING,
            ),
        }
    }
}

fn normalize_newlines(text: String) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    // "한글" in code page 949
    const HANGUL_CP949: &[u8] = &[0xC7, 0xD1, 0xB1, 0xDB];

    #[test]
    fn test_utf8_first() {
        let content = ContentLoader::default().decode("fn main() {}\n".as_bytes());
        assert_eq!(content.text, "fn main() {}\n");
        assert_eq!(content.encoding, "utf-8");
        assert!(!content.degraded);
    }

    // Strict utf-8 refuses a leading BOM on purpose, so the BOM is stripped
    // and reported as utf-8-sig instead of surviving as U+FEFF.
    #[test]
    fn test_bom_goes_to_utf8_sig() {
        let content = ContentLoader::default().decode(b"\xEF\xBB\xBFname = 1");
        assert_eq!(content.text, "name = 1");
        assert_eq!(content.encoding, "utf-8-sig");
    }

    #[test]
    fn test_cp949_fallback() {
        let content = ContentLoader::default().decode(HANGUL_CP949);
        assert_eq!(content.text, "한글");
        assert_eq!(content.encoding, "cp949");
    }

    #[test]
    fn test_latin1_never_fails() {
        let loader = ContentLoader::new(vec![TextEncoding::Utf8, TextEncoding::Latin1]);
        let content = loader.decode(&[b'c', b'a', b'f', 0xE9]);
        assert_eq!(content.text, "café");
        assert_eq!(content.encoding, "latin-1");
        assert!(!content.degraded);
    }

    #[test]
    fn test_degraded_decode() {
        let loader = ContentLoader::new(vec![TextEncoding::Utf8]);
        let content = loader.decode(&[0xFF, 0xFE, b'A']);

        assert!(content.degraded);
        assert_eq!(content.encoding, DEGRADED_ENCODING);
        assert!(content.text.contains('\u{FFFD}'));
        assert!(content.text.ends_with('A'));
    }

    #[test]
    fn test_newlines_are_normalized() {
        let content = ContentLoader::default().decode(b"a\r\nb\rc\n");
        assert_eq!(content.text, "a\nb\nc\n");
    }

    #[test]
    fn test_load_reads_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let child = temp.child("main.py");
        child.write_str("print('hi')\n").unwrap();

        let file = CandidateFile::new("main.py", child.path());
        let content = ContentLoader::default().load(&file).unwrap();
        assert_eq!(content.text, "print('hi')\n");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let file = CandidateFile::new("gone.rs", "/nonexistent/dir/gone.rs");
        let err = ContentLoader::default().load(&file).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_parse_encoding_names() {
        assert_eq!("UTF-8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("utf_8_sig".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8Sig);
        assert_eq!("euc-kr".parse::<TextEncoding>().unwrap(), TextEncoding::Cp949);
        assert_eq!("latin1".parse::<TextEncoding>().unwrap(), TextEncoding::Latin1);
        assert!("klingon".parse::<TextEncoding>().is_err());
    }
}
