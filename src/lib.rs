pub mod config;
pub mod error;
pub mod tool;
pub mod logging;
pub mod prompt;
pub mod lang;
pub mod output;
pub mod dirtree;
pub mod combine;
pub mod html;
pub mod net;
pub mod scrape;
pub mod licenses;
pub mod imports;
pub mod git_history;
pub mod test_stubs;
pub mod edit;

pub use config::Config;
pub use error::ToolError;
pub use tool::ToolKind;
pub use dirtree::DirTree;
pub use combine::Combiner;
pub use net::Fetcher;
pub use scrape::Scraper;
pub use licenses::RegistryClient;
pub use imports::ImportFinder;
pub use git_history::GitHistory;
pub use test_stubs::StubGenerator;
pub use edit::LineEdit;

pub type Result<T> = anyhow::Result<T>;
