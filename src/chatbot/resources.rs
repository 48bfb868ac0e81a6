//! Keyed text and image resources.
//!
//! Layout under the resource root:
//! - `messages/<name>.txt`: texts shown to the user
//! - `prompts/<name>.txt`: system prompts for the model
//! - `images/<name>.jpg` (or `.png`): pictures sent on mode entry

use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub enum ResourceError {
    /// No file exists for the requested key.
    Missing { kind: &'static str, name: String },
    /// The file exists but could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { kind, name } => write!(f, "{kind} '{name}' not found"),
            Self::Io { path, source } => write!(f, "failed to read '{}': {}", path.display(), source),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Missing { .. } => None,
        }
    }
}

/// An image ready to upload.
pub struct Image {
    pub data: Vec<u8>,
    pub file_name: String,
}

pub struct Resources {
    root: PathBuf,
}

impl Resources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn load_message(&self, name: &str) -> Result<String, ResourceError> {
        self.load_text("messages", "message", name).await
    }

    pub async fn load_prompt(&self, name: &str) -> Result<String, ResourceError> {
        self.load_text("prompts", "prompt", name).await
    }

    pub async fn load_image(&self, name: &str) -> Result<Image, ResourceError> {
        check_name("image", name)?;
        for ext in ["jpg", "png"] {
            let file_name = format!("{name}.{ext}");
            let path = self.root.join("images").join(&file_name);
            if let Some(data) = read_optional(&path).await? {
                return Ok(Image { data, file_name });
            }
        }
        Err(ResourceError::Missing {
            kind: "image",
            name: name.to_string(),
        })
    }

    async fn load_text(&self, dir: &str, kind: &'static str, name: &str) -> Result<String, ResourceError> {
        check_name(kind, name)?;
        let path = self.root.join(dir).join(format!("{name}.txt"));
        match read_optional(&path).await? {
            Some(bytes) => Ok(decode(&bytes)),
            None => Err(ResourceError::Missing {
                kind,
                name: name.to_string(),
            }),
        }
    }
}

/// Keys come from callback data, so keep them inside the resource root.
fn check_name(kind: &'static str, name: &str) -> Result<(), ResourceError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ResourceError::Missing {
            kind,
            name: name.to_string(),
        })
    }
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, ResourceError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ResourceError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Decode resource bytes: BOM first, then UTF-8, then windows-1251.
pub fn decode(bytes: &[u8]) -> String {
    let encoding: &'static Encoding = match Encoding::for_bom(bytes) {
        Some((encoding, _)) => encoding,
        None if std::str::from_utf8(bytes).is_ok() => UTF_8,
        None => WINDOWS_1251,
    };
    debug!("Decoding resource as {}", encoding.name());
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
