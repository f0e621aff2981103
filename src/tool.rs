use std::fmt;

/// Identity of each utility. The name drives log file and default output
/// file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    DirTree,
    Combine,
    Scrape,
    ScrapeList,
    ScrapeLinks,
    Links,
    Licenses,
    Imports,
    History,
    TestStubs,
    Edit,
    Config,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::DirTree => "dirtree",
            ToolKind::Combine => "combine",
            ToolKind::Scrape => "scrape",
            ToolKind::ScrapeList => "scrape-list",
            ToolKind::ScrapeLinks => "scrape-links",
            ToolKind::Links => "links",
            ToolKind::Licenses => "licenses",
            ToolKind::Imports => "imports",
            ToolKind::History => "history",
            ToolKind::TestStubs => "test-stubs",
            ToolKind::Edit => "edit",
            ToolKind::Config => "config",
        }
    }

    pub fn log_file_name(self) -> String {
        format!("{}.log", self.name())
    }

    /// `<tool>.txt`, the default output name for tools with a single report.
    pub fn default_output_name(self) -> String {
        format!("{}.txt", self.name())
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
