use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

/// What WeasyPrint should render.
///
/// Only [`Html`](Self::Html) is piped through stdin; URLs and files are handed
/// to WeasyPrint as a positional argument and fetched/read by the process
/// itself. Markup is kept as raw bytes so documents in any encoding reach
/// WeasyPrint unchanged (it honours `<meta charset>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
    Html(Vec<u8>),
}

impl Source {
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    pub fn is_html(&self) -> bool {
        matches!(self, Self::Html(_))
    }

    /// The positional argument WeasyPrint receives for this source.
    pub(crate) fn argument(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(path) => path.display().to_string(),
            Self::Html(_) => "-".to_string(),
        }
    }
}

/// Text starting with `http` is a URL; anything else is HTML markup.
impl From<String> for Source {
    fn from(value: String) -> Self {
        if value.starts_with("http") { Self::Url(value) } else { Self::Html(value.into_bytes()) }
    }
}
impl From<&str> for Source {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}
/// Raw markup, in whatever encoding the document declares.
impl From<Vec<u8>> for Source {
    fn from(value: Vec<u8>) -> Self {
        Self::Html(value)
    }
}
impl From<PathBuf> for Source {
    fn from(value: PathBuf) -> Self {
        Self::File(value)
    }
}
impl From<&Path> for Source {
    fn from(value: &Path) -> Self {
        Self::File(value.to_path_buf())
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Html(html) => f.write_str(&String::from_utf8_lossy(html)),
        }
    }
}
