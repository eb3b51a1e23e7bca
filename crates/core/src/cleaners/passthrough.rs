use async_trait::async_trait;
use url::Url;

use crate::Result;
use crate::config::ExcludeList;
use crate::metadata::MetaData;
use crate::strategy::{CleanContext, CleanResult, CleaningStrategy};

/// Returns the page HTML unchanged for URLs on the exclusion list.
#[derive(Debug, Clone, Default)]
pub struct PassthroughCleaner {
    exclude: ExcludeList,
}

impl PassthroughCleaner {
    pub fn new(exclude: ExcludeList) -> Self {
        Self { exclude }
    }

    pub fn exclude_list(&self) -> &ExcludeList {
        &self.exclude
    }
}

#[async_trait]
impl CleaningStrategy for PassthroughCleaner {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn matches(&self, url: &Url) -> bool {
        self.exclude.is_excluded(url.as_str())
    }

    async fn clean(&self, ctx: CleanContext<'_>) -> Result<CleanResult> {
        Ok(CleanResult::html(ctx.html, MetaData::default()))
    }
}
