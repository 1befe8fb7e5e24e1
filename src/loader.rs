//! Component A — PDF Loader.
//!
//! Opens a file path or byte buffer, optionally decrypting with a supplied
//! credential, and exposes a read-only object graph for the later stages to
//! traverse. Grounded on `AcroFormDocument::from_pdf`/`from_bytes` in the
//! teacher crate, built on `pdf::file::{CachedFile, FileOptions}`.

use std::path::Path;

use log::info;
use pdf::file::{CachedFile, FileOptions};
use pdf::object::Resolve;
use snafu::ResultExt;

use crate::error::{self, CoreError, Result};

const PDF_HEADER: &[u8] = b"%PDF-";

/// An opened, read-only PDF object graph.
pub struct LoadedDocument {
    pub(crate) file: CachedFile<Vec<u8>>,
    /// Normalized document version, e.g. `"1.7"`.
    pub version: String,
}

impl LoadedDocument {
    /// Open a PDF from disk, optionally with a decryption credential.
    pub fn open(path: impl AsRef<Path>, credential: Option<&[u8]>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return error::InputNotFoundSnafu {
                path: path.to_path_buf(),
            }
            .fail();
        }
        let bytes = std::fs::read(path).context(error::InputUnreadableSnafu)?;
        Self::load(bytes, credential)
    }

    /// Load a PDF already resident in memory.
    pub fn load(bytes: Vec<u8>, credential: Option<&[u8]>) -> Result<Self> {
        if bytes.len() < PDF_HEADER.len() || &bytes[..PDF_HEADER.len()] != PDF_HEADER {
            return error::InvalidPdfSnafu.fail();
        }
        let version = parse_version(&bytes);

        let options = FileOptions::cached();
        let file = if let Some(credential) = credential {
            options
                .password(credential.to_vec())
                .load(bytes.clone())
                .map_err(|_| error::BadCredentialSnafu.build())?
        } else {
            match options.load(bytes.clone()) {
                Ok(file) => file,
                Err(err) if is_encryption_error(&err) => {
                    return error::EncryptedNoCredentialSnafu.fail();
                }
                Err(err) => return Err(err.into()),
            }
        };

        let page_count = file.pages().count() as u32;
        if page_count == 0 {
            return error::EmptyDocumentSnafu.fail();
        }

        info!(
            "loaded PDF version {} with {} pages, interactive form: {}",
            version,
            page_count,
            file.get_root().forms.is_some()
        );

        Ok(LoadedDocument { file, version })
    }

    pub fn page_count(&self) -> u32 {
        self.file.pages().count() as u32
    }

    pub fn has_interactive_form(&self) -> bool {
        self.file.get_root().forms.is_some()
    }

    pub fn resolver(&self) -> impl Resolve + '_ {
        self.file.resolver()
    }
}

fn parse_version(bytes: &[u8]) -> String {
    let tail = &bytes[PDF_HEADER.len()..];
    let end = tail
        .iter()
        .position(|b| matches!(b, b'\r' | b'\n' | b' '))
        .unwrap_or_else(|| tail.len().min(8));
    String::from_utf8_lossy(&tail[..end]).trim().to_string()
}

fn is_encryption_error(err: &pdf::error::PdfError) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("encrypt") || message.contains("password")
}
