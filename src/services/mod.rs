// Service exports
pub mod analysis;
pub mod endings;
pub mod fetcher;
pub mod site;

pub use analysis::{AnalysisError, Analyzer};
pub use endings::{EndingsResolver, ResolveError};
pub use fetcher::{FetchError, PageFetcher, RenderClient};
pub use site::SiteUrls;
