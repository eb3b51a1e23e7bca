//! Cleaning strategies.
//!
//! Site-specific cleaners handle pages whose content is not reachable through
//! the generic readability pass: InfoQ and Docker Hub serve their content
//! from APIs, WeChat hides it behind lazy-loading markup. The passthrough
//! cleaner returns excluded pages untouched and the readability cleaner
//! handles everything else.

pub mod dockerhub;
pub mod infoq;
pub mod passthrough;
pub mod readability;
pub mod wechat;

pub use dockerhub::DockerHubCleaner;
pub use infoq::InfoQCleaner;
pub use passthrough::PassthroughCleaner;
pub use readability::ReadabilityCleaner;
pub use wechat::WechatCleaner;
