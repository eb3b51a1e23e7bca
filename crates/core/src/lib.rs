pub mod cleaners;
pub mod config;
pub mod encoding;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod markdown;
pub mod metadata;
pub mod parse;
pub mod plugins;
pub mod readability;
pub mod strategy;

pub use cleaners::{DockerHubCleaner, InfoQCleaner, PassthroughCleaner, ReadabilityCleaner, WechatCleaner};
pub use config::{ExcludeList, ReadabilityConfig, ReadabilityConfigBuilder};
pub use encoding::{DecodedText, decode_body};
pub use error::{ExtractError, Result};
pub use extractor::{ExtractInput, Extractor, ExtractorBuilder, FRONT_MATTER_SEPARATOR, render_output};
pub use fetch::{FetchConfig, FetchRequest, FetchResponse, HttpClient, Method, ReqwestClient};
pub use markdown::{HtmdConverter, MarkdownConverter};
pub use metadata::MetaData;
pub use parse::{Document, Edit, Element};
pub use plugins::{ATagClean, DeleteStyleTag, NpmPlugin, ReadabilityPlugin, WechatArticlePlugin, default_plugins};
#[doc(hidden)]
pub use readability::{ExtractedContent, extract_content, readable_content};
pub use strategy::{CleanContext, CleanResult, CleaningStrategy, StrategyRegistry};
