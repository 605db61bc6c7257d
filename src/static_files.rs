// Static asset serving

use daybook_core::logging::debug;
use daybook_core::{Error, HttpRequest, HttpResponse};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Serves files below a root directory for `/static/*filepath`.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root_dir: PathBuf,
}

impl StaticFiles {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub async fn serve(&self, req: &HttpRequest) -> Result<HttpResponse, Error> {
        let requested = req.param("filepath").map(String::as_str).unwrap_or_default();
        let relative = sanitize_path(requested)?;
        let full_path = self.root_dir.join(&relative);

        let content = match fs::read(&full_path).await {
            Ok(content) => content,
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                return Err(Error::NotFound(requested.to_string()));
            }
            Err(err) => {
                // Reading a directory fails with a different kind on some platforms.
                if full_path.is_dir() {
                    return Err(Error::NotFound(requested.to_string()));
                }
                return Err(err.into());
            }
        };

        Ok(HttpResponse::ok()
            .with_header("Content-Type", content_type(&relative))
            .with_body(content))
    }
}

pub fn content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

/// Turn the requested path into a relative path that cannot leave the root.
fn sanitize_path(path: &str) -> Result<PathBuf, Error> {
    let decoded = percent_encoding::percent_decode_str(path.trim_start_matches('/'))
        .decode_utf8()
        .map_err(|_| Error::NotFound("invalid UTF-8 in path".to_string()))?;

    let mut clean = PathBuf::new();
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                debug!(path = %path, "rejected static path");
                return Err(Error::NotFound(path.to_string()));
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(Error::NotFound(path.to_string()));
    }
    Ok(clean)
}
