//! Registry tag listing (`list-tags`).
//!
//! Fetches the first page of the Docker Hub style tag API through `curl` and
//! prints `tag [ arch arch ... ]` per tag.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::runner::{argv, CommandRunner};

pub const DEFAULT_REGISTRY_API: &str = "https://hub.docker.com";

#[derive(Debug, Deserialize)]
struct TagPage {
    #[serde(default)]
    results: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
    #[serde(default)]
    images: Vec<TagImage>,
}

#[derive(Debug, Deserialize)]
struct TagImage {
    #[serde(default)]
    architecture: Option<String>,
}

/// `nginx` -> `library/nginx`; a `:tag` suffix is ignored.
pub fn repository_path(image: &str) -> String {
    let repo = match image.rsplit_once(':') {
        Some((r, tag)) if !tag.contains('/') => r,
        _ => image,
    };
    if repo.contains('/') {
        repo.to_string()
    } else {
        format!("library/{repo}")
    }
}

pub fn tags_url(api_base: &str, image: &str) -> String {
    format!(
        "{}/v2/repositories/{}/tags?page_size=100",
        api_base.trim_end_matches('/'),
        repository_path(image)
    )
}

/// Render a tag-listing JSON page.
pub fn render_tag_lines(json: &str) -> Result<Vec<String>> {
    let page: TagPage = serde_json::from_str(json).context("unexpected registry response")?;
    Ok(page
        .results
        .into_iter()
        .map(|t| {
            let mut line = format!("{} [", t.name);
            for arch in t.images.into_iter().filter_map(|i| i.architecture) {
                line.push(' ');
                line.push_str(&arch);
            }
            line.push_str(" ]");
            line
        })
        .collect())
}

pub fn list_tags(
    runner: &dyn CommandRunner,
    curl: &str,
    api_base: &str,
    image: &str,
) -> Result<Vec<String>> {
    let url = tags_url(api_base, image);
    let out = runner
        .run(curl, &argv(["-fsSL", url.as_str()]))
        .with_context(|| format!("failed to run {curl}"))?;
    if !out.success() {
        bail!(
            "tag listing for {} failed (curl exit {}): {}",
            image,
            out.exit_code,
            out.stderr.trim()
        );
    }
    render_tag_lines(&out.stdout)
}
