use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Only the crate's own sources are policed. Anything else in the checkout (vendored
// reference code, generated files) is left alone.
const SOURCE_ROOTS: [&str; 4] = ["merge", "src", "tests", "benches"];

// Collects every matching line of one file so a single error can list them all.
struct ViolationCollector {
    violations: Vec<String>,
    file_path: PathBuf,
    kind: PolicyKind,
}

#[derive(Clone, Copy)]
enum PolicyKind {
    UnderscorePrefix,
    ForbiddenComment,
    UppercaseComment,
    AllowDeadCode,
}

impl PolicyKind {
    fn describe(self) -> &'static str {
        match self {
            PolicyKind::UnderscorePrefix => "underscore-prefixed variables",
            PolicyKind::ForbiddenComment => "forbidden comment patterns",
            PolicyKind::UppercaseComment => "comments with all uppercase alphabetic characters",
            PolicyKind::AllowDeadCode => "#[allow(dead_code)] attributes",
        }
    }

    fn advice(self) -> &'static str {
        match self {
            PolicyKind::UnderscorePrefix => {
                "Either use the variable (removing the underscore) or remove it completely."
            }
            PolicyKind::ForbiddenComment => {
                "Comments narrating edits (fixed, changed, updated, new, ...) in capitals and '**' in regular comments are not allowed."
            }
            PolicyKind::UppercaseComment => "Strongly consider deleting the comment completely.",
            PolicyKind::AllowDeadCode => {
                "Either use the code (removing the attribute) or remove it completely."
            }
        }
    }
}

impl ViolationCollector {
    fn new(file_path: &Path, kind: PolicyKind) -> Self {
        Self {
            violations: Vec::new(),
            file_path: file_path.to_path_buf(),
            kind,
        }
    }

    // After searching, formats a detailed error message if anything matched.
    fn check_and_get_error_message(&self) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }

        let file_name = self.file_path.to_str().unwrap_or("?");
        let mut error_msg = format!(
            "\n❌ ERROR: Found {} {} in {}:\n",
            self.violations.len(),
            self.kind.describe(),
            file_name
        );
        for violation in &self.violations {
            error_msg.push_str(&format!("   {violation}\n"));
        }
        error_msg.push_str(&format!(
            "\n⚠️ These are not allowed in this project.\n   {}\n",
            self.kind.advice()
        ));
        Some(error_msg)
    }

    fn accepts(&self, line_text: &str) -> bool {
        match self.kind {
            PolicyKind::UnderscorePrefix => {
                !is_comment(line_text) && !underscore_only_in_string(line_text)
            }
            PolicyKind::ForbiddenComment => {
                if line_text.contains("**") && !has_forbidden_word(line_text) {
                    !is_doc_comment(line_text)
                } else {
                    true
                }
            }
            PolicyKind::UppercaseComment => match comment_text(line_text) {
                Some(text) => {
                    let alpha: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
                    !alpha.is_empty() && alpha.iter().all(|c| c.is_uppercase())
                }
                None => false,
            },
            PolicyKind::AllowDeadCode => true,
        }
    }
}

impl Sink for ViolationCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();

        if self.accepts(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }

        // Keep searching the same file.
        Ok(true)
    }
}

const FORBIDDEN_WORDS: [&str; 14] = [
    "FIXED", "CORRECTED", "FIX", "FIXES", "NEW", "CHANGED", "CHANGES", "CHANGE", "MODIFIED",
    "MODIFIES", "MODIFY", "UPDATED", "UPDATES", "UPDATE",
];

fn has_forbidden_word(line: &str) -> bool {
    FORBIDDEN_WORDS.iter().any(|word| line.contains(word))
}

fn is_doc_comment(line: &str) -> bool {
    line.trim_start().starts_with("///")
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("//") || line.contains("/*")
}

fn underscore_only_in_string(line: &str) -> bool {
    line.split('"')
        .enumerate()
        .any(|(index, part)| index % 2 == 1 && part.contains('_'))
}

fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("///") {
        Some(rest.trim())
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        Some(rest.trim())
    } else {
        let start = line.find("/*")? + 2;
        let body = &line[start..];
        Some(body.find("*/").map_or(body, |end| &body[..end]).trim())
    }
}

fn rust_sources() -> impl Iterator<Item = PathBuf> {
    SOURCE_ROOTS
        .iter()
        .flat_map(|root| WalkDir::new(root).into_iter().filter_map(|e| e.ok()))
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
}

fn scan(pattern: &str, kind: PolicyKind) -> Result<(), Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(pattern)?;
    let mut searcher = Searcher::new();

    for path in rust_sources() {
        let mut collector = ViolationCollector::new(&path, kind);
        searcher.search_path(&matcher, &path, &mut collector)?;
        if let Some(error_message) = collector.check_and_get_error_message() {
            return Err(error_message.into());
        }
    }
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for root in SOURCE_ROOTS {
        println!("cargo:rerun-if-changed={root}");
    }

    let checks = [
        (r"\b(_[a-zA-Z0-9_]+)\b", PolicyKind::UnderscorePrefix),
        (
            r"(//|/\*|///).*(?:FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFIES|MODIFY|UPDATED|UPDATES|UPDATE|\*\*)",
            PolicyKind::ForbiddenComment,
        ),
        (r"(//|/\*|///).*", PolicyKind::UppercaseComment),
        (
            r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]",
            PolicyKind::AllowDeadCode,
        ),
    ];

    for (pattern, kind) in checks {
        if let Err(e) = scan(pattern, kind) {
            // The eprintln is what shows the report in cargo's output.
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
