//! Per-language collection templates.
//!
//! Plain read-only tables: each template names the extensions worth
//! collecting for a stack plus the directories and generated-file
//! patterns that never belong in model context. Template defaults merge
//! under user overrides in the builder.

use std::fmt;
use std::str::FromStr;

/// A named set of collection defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Template {
    DotNet,
    Rust,
    Python,
    Node,
    Go,
    Java,
    Web,
    /// Every file (the `*` sentinel), with stack-agnostic excludes.
    #[default]
    All,
}

impl Template {
    pub fn all() -> &'static [Template] {
        &[
            Template::DotNet,
            Template::Rust,
            Template::Python,
            Template::Node,
            Template::Go,
            Template::Java,
            Template::Web,
            Template::All,
        ]
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Template::DotNet => &[
                "cs", "csproj", "sln", "props", "targets", "config", "json", "xml", "razor",
                "cshtml",
            ],
            Template::Rust => &["rs", "toml"],
            Template::Python => &["py", "pyi", "toml", "cfg", "ini"],
            Template::Node => &["js", "jsx", "mjs", "cjs", "ts", "tsx", "json"],
            Template::Go => &["go", "mod"],
            Template::Java => &["java", "kt", "kts", "gradle", "xml", "properties"],
            Template::Web => &["html", "htm", "css", "scss", "less", "js", "ts"],
            Template::All => &["*"],
        }
    }

    pub fn exclude_dirs(&self) -> &'static [&'static str] {
        match self {
            Template::DotNet => &["bin", "obj", "packages", ".vs", "TestResults"],
            Template::Rust => &["target"],
            Template::Python => &[
                "__pycache__",
                ".venv",
                "venv",
                ".tox",
                ".mypy_cache",
                ".pytest_cache",
                "dist",
            ],
            Template::Node => &["node_modules", "dist", "build", ".next", "coverage"],
            Template::Go => &["vendor", "bin"],
            Template::Java => &["build", "target", ".gradle", "out"],
            Template::Web => &["node_modules", "dist", "build"],
            Template::All => &[
                "node_modules",
                "target",
                "bin",
                "obj",
                "__pycache__",
                ".venv",
                "venv",
                "dist",
                "build",
                "vendor",
            ],
        }
    }

    pub fn exclude_patterns(&self) -> &'static [&'static str] {
        match self {
            Template::DotNet => &[
                "*.Designer.cs",
                "*.g.cs",
                "*.g.i.cs",
                "*.AssemblyInfo.cs",
                "*.min.js",
                "*.min.css",
            ],
            Template::Rust => &["Cargo.lock"],
            Template::Python => &["*.pyc"],
            Template::Node => &["package-lock.json", "*.min.js", "*.min.css", "*.map"],
            Template::Go => &["go.sum"],
            Template::Java => &[],
            Template::Web => &["*.min.js", "*.min.css", "*.map"],
            Template::All => &["*.min.js", "*.min.css", "*.lock", "*.map"],
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Template::DotNet => "dotnet",
            Template::Rust => "rust",
            Template::Python => "python",
            Template::Node => "node",
            Template::Go => "go",
            Template::Java => "java",
            Template::Web => "web",
            Template::All => "all",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Template {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dotnet" | "csharp" | "cs" => Ok(Template::DotNet),
            "rust" => Ok(Template::Rust),
            "python" | "py" => Ok(Template::Python),
            "node" | "javascript" | "typescript" => Ok(Template::Node),
            "go" | "golang" => Ok(Template::Go),
            "java" | "jvm" => Ok(Template::Java),
            "web" => Ok(Template::Web),
            "all" | "*" => Ok(Template::All),
            _ => Err(format!("unknown template: {}", s)),
        }
    }
}
