//! Upload area for fetched attachment binaries
//!
//! Files land in `<root>/<YYYY>/<MM>/<name>` where the month comes from the
//! owning post's date. Names are sanitized and made unique with `-1`, `-2`, ...
//! suffixes; the placeholder file is created empty so concurrent reservations
//! never share a path.

use chrono::{Datelike, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use wxr_common::{Error, Result};

/// A reserved (empty) file and the public URL it will be served under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSlot {
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct UploadArea {
    root: PathBuf,
    base_url: String,
}

impl UploadArea {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reserve a unique file for `file_name` in the month of `post_date`
    pub async fn reserve(&self, file_name: &str, post_date: &str) -> Result<UploadSlot> {
        let subdir = month_subdir(post_date);
        let dir = self.root.join(&subdir);
        tokio::fs::create_dir_all(&dir).await?;

        let name = sanitize_file_name(file_name);
        let (stem, ext) = split_extension(&name);

        for attempt in 0..10_000u32 {
            let candidate = if attempt == 0 {
                name.clone()
            } else if ext.is_empty() {
                format!("{}-{}", stem, attempt)
            } else {
                format!("{}-{}.{}", stem, attempt, ext)
            };
            let path = dir.join(&candidate);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(_) => {
                    return Ok(UploadSlot {
                        url: format!("{}/{}/{}", self.base_url, subdir, candidate),
                        path,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        Err(Error::Internal(format!(
            "no free file name for {} in {}",
            name,
            dir.display()
        )))
    }

    /// Path relative to the upload root, with forward slashes
    pub fn relative_path(&self, file: &Path) -> String {
        let relative = file.strip_prefix(&self.root).unwrap_or(file);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Public URL of a file inside the upload area
    pub fn url_for(&self, file: &Path) -> String {
        format!("{}/{}", self.base_url, self.relative_path(file))
    }
}

/// `YYYY/MM` from an export date (`YYYY-MM-DD HH:MM:SS`), current month otherwise
fn month_subdir(post_date: &str) -> String {
    let parsed = NaiveDateTime::parse_from_str(post_date.trim(), "%Y-%m-%d %H:%M:%S")
        .map(|dt| (dt.year(), dt.month()));
    let (year, month) = match parsed {
        Ok(ym) if ym.0 > 0 => ym,
        _ => {
            let now = Utc::now();
            (now.year(), now.month())
        }
    };
    format!("{:04}/{:02}", year, month)
}

/// Last path segment of a URL, query and fragment removed
pub fn file_name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Keep `[A-Za-z0-9._-]`, spaces become dashes; never empty, never hidden
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => Some(c),
            ' ' => Some('-'),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx + 1..]),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(file_name_from_url("http://a.example/x/img.jpg"), "img.jpg");
        assert_eq!(file_name_from_url("http://a.example/x/img.jpg?resize=1"), "img.jpg");
        assert_eq!(file_name_from_url("/x/doc.pdf#page=2"), "doc.pdf");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my-photo-1.jpg");
        assert_eq!(sanitize_file_name("..."), "file");
        assert_eq!(sanitize_file_name(".htaccess"), "htaccess");
    }

    #[test]
    fn test_month_subdir() {
        assert_eq!(month_subdir("2009-03-17 08:15:00"), "2009/03");
        let fallback = month_subdir("not a date");
        assert_eq!(fallback.len(), 7);
    }

    #[tokio::test]
    async fn test_reserve_makes_names_unique() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path(), "http://new.example/uploads/");

        let first = area.reserve("img.jpg", "2010-05-01 10:00:00").await.unwrap();
        let second = area.reserve("img.jpg", "2010-05-01 10:00:00").await.unwrap();

        assert_eq!(first.url, "http://new.example/uploads/2010/05/img.jpg");
        assert_eq!(second.url, "http://new.example/uploads/2010/05/img-1.jpg");
        assert!(first.path.exists());
        assert!(second.path.exists());
        assert_eq!(area.relative_path(&second.path), "2010/05/img-1.jpg");
        assert_eq!(area.url_for(&second.path), second.url);
    }
}
