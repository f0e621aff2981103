use std::path::Path;

/// Lowercased extension without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Language name for a path, by extension or by well-known file name.
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let extension = extension_of(path);

    if extension.is_none() {
        if let Some(filename) = path.file_name() {
            let filename_lower = filename.to_string_lossy().to_lowercase();
            match filename_lower.as_str() {
                "makefile" | "gnumakefile" => return Some("makefile"),
                "dockerfile" => return Some("dockerfile"),
                "readme" | "license" | "changelog" | "authors" => return Some("text"),
                _ => {}
            }
        }
    }

    match extension.as_deref() {
        Some("rs") => Some("rust"),
        Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Some("javascript"),
        Some("ts") | Some("tsx") => Some("typescript"),
        Some("py") | Some("pyi") => Some("python"),
        Some("java") => Some("java"),
        Some("go") => Some("go"),
        Some("cpp") | Some("cc") | Some("cxx") | Some("hpp") | Some("hh") => Some("cpp"),
        Some("c") | Some("h") => Some("c"),
        Some("php") => Some("php"),
        Some("rb") => Some("ruby"),
        Some("cs") => Some("csharp"),
        Some("swift") => Some("swift"),
        Some("kt") => Some("kotlin"),
        Some("scala") => Some("scala"),
        Some("hs") => Some("haskell"),
        Some("lua") => Some("lua"),
        Some("pl") | Some("pm") => Some("perl"),
        Some("sh") | Some("bash") | Some("ksh") => Some("bash"),
        Some("ps1") => Some("powershell"),
        Some("bat") | Some("cmd") => Some("batch"),
        Some("sql") => Some("sql"),
        Some("html") | Some("htm") => Some("html"),
        Some("css") => Some("css"),
        Some("scss") | Some("sass") => Some("scss"),
        Some("xml") => Some("xml"),
        Some("json") => Some("json"),
        Some("yaml") | Some("yml") => Some("yaml"),
        Some("toml") => Some("toml"),
        Some("ini") | Some("cfg") => Some("ini"),
        Some("md") => Some("markdown"),
        Some("txt") | Some("log") => Some("text"),
        Some("tex") => Some("latex"),
        Some("diff") | Some("patch") => Some("diff"),
        _ => None,
    }
}

/// Info string for a fenced markdown code block. Plain text gets none.
pub fn fence_tag(path: &Path) -> &'static str {
    match detect_language(path) {
        Some("text") | None => "",
        Some(lang) => lang,
    }
}
