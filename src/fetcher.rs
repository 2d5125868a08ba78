use anyhow::{anyhow, Result};
use colored::*;
use futures_util::StreamExt;
use reqwest::{Response, StatusCode};
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::api::{ApiClient, Project};

/// Discovers the EPUB, HTMLZip, and PDF artifacts of projects, probes their
/// URLs, and optionally streams one format per project to disk.
pub struct DocFetcher {
    api: ApiClient,
    save_format: Option<String>,
    destination_dir: PathBuf,
    no_comments: bool,
}

impl DocFetcher {
    pub fn new(
        api: ApiClient,
        save_format: Option<String>,
        destination_dir: PathBuf,
        no_comments: bool,
    ) -> Self {
        Self {
            api,
            save_format,
            destination_dir,
            no_comments,
        }
    }

    /// Process the given project slugs one at a time, reporting to stdout.
    /// A failed lookup is fatal for the run; an unavailable download URL is
    /// not.
    pub async fn run(&self, slugs: &[String]) -> Result<()> {
        self.run_with_output(slugs, &mut io::stdout()).await
    }

    /// Like [`DocFetcher::run`], but with the report lines written to `out`.
    pub async fn run_with_output(
        &self,
        slugs: &[String],
        out: &mut (dyn Write + Send),
    ) -> Result<()> {
        for slug in slugs {
            self.process_project(slug, out).await?;
        }
        Ok(())
    }

    async fn process_project(&self, slug: &str, out: &mut (dyn Write + Send)) -> Result<()> {
        debug!("Looking up project \"{}\"", slug.green());

        let lookup = self.api.get_project(slug).await?;

        for project in lookup.objects.unwrap_or_default() {
            if !self.no_comments {
                for (label, value) in comment_lines(&project) {
                    writeln!(out, "{}: {}: {}", slug, label, value)?;
                }
            }

            for (format, url) in &project.downloads {
                let url = normalize_download_url(url);
                self.process_download(slug, format, &url, out).await?;
            }
        }

        Ok(())
    }

    /// Probe one download URL, print its status line, and stream it to disk
    /// when it is the requested save target.
    async fn process_download(
        &self,
        slug: &str,
        format: &str,
        url: &str,
        out: &mut (dyn Write + Send),
    ) -> Result<()> {
        let save = self
            .save_format
            .as_deref()
            .is_some_and(|requested| is_save_target(format, requested));

        let http = self.api.http();
        let response = if save {
            http.get(url).send().await
        } else {
            http.head(url).send().await
        }
        .map_err(|e| anyhow!("Request for {} failed: {}", url, e))?;

        let exists = response.status() == StatusCode::OK;
        if exists {
            writeln!(out, "{}: {}: {}", slug, format, url)?;
            if save {
                self.save_document(slug, response).await?;
            }
        } else {
            writeln!(out, "{}: {}: {} [{}]", slug, format, url, exists)?;
        }

        Ok(())
    }

    /// Stream the response body to `<destination_dir>/<slug>.<save_format>`,
    /// overwriting any existing file. A mid-stream error leaves the partial
    /// file behind.
    async fn save_document(&self, slug: &str, response: Response) -> Result<()> {
        // Only reachable with a save format requested.
        let extension = self.save_format.as_deref().unwrap_or_default();
        let dest_path = self.destination_dir.join(format!("{}.{}", slug, extension));

        let mut dest_file = fs::File::create(&dest_path)
            .await
            .map_err(|e| anyhow!("Failed to create {}: {}", dest_path.display(), e))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| anyhow!("Download of {} failed: {}", slug, e))?;
            dest_file
                .write_all(&chunk)
                .await
                .map_err(|e| anyhow!("Failed to write {}: {}", dest_path.display(), e))?;
        }

        dest_file
            .flush()
            .await
            .map_err(|e| anyhow!("Failed to write {}: {}", dest_path.display(), e))?;

        info!("Saved {}", dest_path.display().to_string().blue());

        Ok(())
    }
}

/// Does a downloads entry of format `format` match the requested save format?
/// The API names the zipped-HTML artifact `htmlzip`, while callers request it
/// as `zip`; the two are equivalent for matching.
fn is_save_target(format: &str, requested: &str) -> bool {
    if requested == "zip" {
        format == "htmlzip"
    } else {
        format == requested
    }
}

/// The API hands out protocol-relative download URLs (`//media.readthedocs...`).
fn normalize_download_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url.to_string()
    }
}

/// The `(label, value)` metadata lines to print for a project. Fields that
/// are absent, empty, or `false` are skipped; the order is fixed.
fn comment_lines(project: &Project) -> Vec<(&'static str, String)> {
    let mut lines = Vec::new();

    let text_fields = [
        ("Project URL", &project.project_url),
        ("Code repository", &project.repo),
        ("Doc last modification", &project.modified_date),
    ];
    for (label, value) in text_fields {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            lines.push((label, value.to_string()));
        }
    }

    let flag_fields = [
        ("Doc available as EPUB", project.enable_epub_build),
        ("Doc available as PDF", project.enable_pdf_build),
    ];
    for (label, enabled) in flag_fields {
        if enabled == Some(true) {
            lines.push((label, true.to_string()));
        }
    }

    lines
}
