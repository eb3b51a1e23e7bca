//! Docker Hub repository pages via the Hub REST API.
//!
//! The page HTML is a client-rendered shell, so this cleaner ignores it and
//! reads `https://hub.docker.com/v2/repositories/<namespace>/<name>/`. The
//! repository overview is already Markdown and is returned as such.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::fetch::{FetchRequest, fetch_ok};
use crate::metadata::MetaData;
use crate::strategy::{CleanContext, CleanResult, CleaningStrategy};
use crate::{ExtractError, Result};

const API_BASE: &str = "https://hub.docker.com/v2/repositories";

/// Namespace used by Docker official images (`/_/<name>`).
const OFFICIAL_NAMESPACE: &str = "library";

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    full_description: Option<String>,
    #[serde(default)]
    star_count: u64,
    #[serde(default)]
    pull_count: u64,
    #[serde(default)]
    user: Option<String>,
}

/// A repository reference parsed from a hub URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub namespace: String,
    pub name: String,
}

impl RepoRef {
    pub fn is_official(&self) -> bool {
        self.namespace == OFFICIAL_NAMESPACE
    }

    /// `namespace/name`, or just `name` for official images.
    pub fn display_name(&self) -> String {
        if self.is_official() { self.name.clone() } else { format!("{}/{}", self.namespace, self.name) }
    }

    pub fn api_url(&self) -> String {
        format!("{}/{}/{}/", API_BASE, self.namespace, self.name)
    }
}

/// Parses `/r/<namespace>/<name>` and `/_/<name>` hub paths.
pub fn parse_repo(url: &Url) -> Option<RepoRef> {
    if url.host_str() != Some("hub.docker.com") {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["r", namespace, name, ..] => Some(RepoRef { namespace: namespace.to_string(), name: name.to_string() }),
        ["_", name, ..] => Some(RepoRef { namespace: OFFICIAL_NAMESPACE.to_string(), name: name.to_string() }),
        _ => None,
    }
}

/// Cleaner for Docker Hub repository pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerHubCleaner;

#[async_trait]
impl CleaningStrategy for DockerHubCleaner {
    fn name(&self) -> &'static str {
        "dockerhub"
    }

    fn matches(&self, url: &Url) -> bool {
        parse_repo(url).is_some()
    }

    async fn clean(&self, ctx: CleanContext<'_>) -> Result<CleanResult> {
        let repo = parse_repo(ctx.url)
            .ok_or_else(|| ExtractError::content_not_found(self.name(), "no repository in URL path"))?;

        let api_url = repo.api_url();
        tracing::debug!(url = %api_url, "fetching docker hub repository");

        let request = FetchRequest::get(&api_url).header("Accept", "application/json");
        let repository: Repository = fetch_ok(ctx.client, request).await?.json(&api_url)?;

        let content = repository
            .full_description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| repository.description.as_deref().map(str::trim).filter(|s| !s.is_empty()))
            .ok_or_else(|| ExtractError::content_not_found(self.name(), "repository has no description"))?
            .to_string();

        Ok(CleanResult::markdown(content, build_metadata(&repo, &repository, ctx.url)))
    }
}

fn build_metadata(repo: &RepoRef, repository: &Repository, page: &Url) -> MetaData {
    let name = RepoRef {
        namespace: repository.namespace.clone().unwrap_or_else(|| repo.namespace.clone()),
        name: repository.name.clone(),
    };

    let counts = format!("{} stars · {} pulls", repository.star_count, repository.pull_count);
    let description = match repository.description.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!("{} · {}", text, counts),
        _ => counts,
    };

    MetaData {
        title: Some(name.display_name()),
        description: Some(description),
        author: repository.user.clone().filter(|u| !u.is_empty()),
        canonical: Some(page.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_parse_repo() {
        assert_eq!(
            parse_repo(&url("https://hub.docker.com/r/oven/bun")),
            Some(RepoRef { namespace: "oven".into(), name: "bun".into() })
        );
        assert_eq!(
            parse_repo(&url("https://hub.docker.com/r/oven/bun/tags?page=1")),
            Some(RepoRef { namespace: "oven".into(), name: "bun".into() })
        );
        assert_eq!(
            parse_repo(&url("https://hub.docker.com/_/nginx")),
            Some(RepoRef { namespace: "library".into(), name: "nginx".into() })
        );
        assert_eq!(parse_repo(&url("https://hub.docker.com/search?q=bun")), None);
        assert_eq!(parse_repo(&url("https://hub.docker.com/r/oven")), None);
        assert_eq!(parse_repo(&url("https://example.com/r/oven/bun")), None);
    }

    #[test]
    fn test_display_name_and_api_url() {
        let official = parse_repo(&url("https://hub.docker.com/_/nginx")).unwrap();
        assert_eq!(official.display_name(), "nginx");
        assert_eq!(official.api_url(), "https://hub.docker.com/v2/repositories/library/nginx/");

        let user = parse_repo(&url("https://hub.docker.com/r/oven/bun")).unwrap();
        assert_eq!(user.display_name(), "oven/bun");
    }

    #[test]
    fn test_metadata_fields() {
        let page = url("https://hub.docker.com/r/oven/bun");
        let repo = parse_repo(&page).unwrap();
        let repository: Repository = serde_json::from_str(
            r##"{"name":"bun","namespace":"oven","description":"Incredibly fast JavaScript runtime",
                "full_description":"# Bun","star_count":120,"pull_count":50000000,"user":"oven"}"##,
        )
        .unwrap();

        let meta = build_metadata(&repo, &repository, &page);
        assert_eq!(meta.title.as_deref(), Some("oven/bun"));
        assert_eq!(
            meta.description.as_deref(),
            Some("Incredibly fast JavaScript runtime · 120 stars · 50000000 pulls")
        );
        assert_eq!(meta.author.as_deref(), Some("oven"));
        assert_eq!(meta.canonical.as_deref(), Some("https://hub.docker.com/r/oven/bun"));
    }

    #[test]
    fn test_nullable_fields_deserialize() {
        let repository: Repository =
            serde_json::from_str(r#"{"name":"x","description":null,"full_description":null,"user":null}"#).unwrap();
        assert_eq!(repository.star_count, 0);
        assert!(repository.full_description.is_none());
    }
}
