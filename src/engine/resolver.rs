use crate::store::SandboxedStore;
use std::path::PathBuf;

/// Sibling extensions tried when a requested script file is missing. One
/// shared list for the JS/TS family: a request for `component.ts` can land on
/// `component.tsx` in mixed codebases.
const SCRIPT_FAMILY: [&str; 8] = ["ts", "tsx", "js", "jsx", "mts", "cts", "mjs", "cjs"];
const STYLE_FAMILY: [&str; 4] = ["css", "scss", "sass", "less"];

/// Outcome of resolving one requested path. Exactly one of `content` and
/// `error` is set; `resolved_path` differs from `requested_path` when a
/// sibling extension satisfied the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub requested_path: String,
    pub resolved_path: String,
    pub content: Option<String>,
    pub error: Option<String>,
}

fn extension_family(ext: &str) -> &'static [&'static str] {
    if SCRIPT_FAMILY.contains(&ext) {
        &SCRIPT_FAMILY
    } else if STYLE_FAMILY.contains(&ext) {
        &STYLE_FAMILY
    } else {
        &[]
    }
}

/// Fallback candidates for a missing file: the same path with each sibling
/// extension from its family. Unknown extensions have no siblings.
pub fn sibling_candidates(path: &str) -> Vec<String> {
    let parsed = PathBuf::from(path);
    let Some(ext) = parsed.extension().and_then(|e| e.to_str()) else {
        return Vec::new();
    };

    extension_family(ext)
        .iter()
        .filter(|candidate| **candidate != ext)
        .map(|candidate| parsed.with_extension(candidate).to_string_lossy().into_owned())
        .collect()
}

async fn resolve_one(store: &SandboxedStore, requested: &str) -> ResolvedFile {
    match store.read_for_oracle(requested).await {
        Ok(content) => ResolvedFile {
            requested_path: requested.to_string(),
            resolved_path: requested.to_string(),
            content: Some(content),
            error: None,
        },
        Err(primary) => {
            let mut last_error = primary.to_string();
            for candidate in sibling_candidates(requested) {
                match store.read_for_oracle(&candidate).await {
                    Ok(content) => {
                        return ResolvedFile {
                            requested_path: requested.to_string(),
                            resolved_path: candidate,
                            content: Some(content),
                            error: None,
                        };
                    }
                    Err(err) => last_error = err.to_string(),
                }
            }
            ResolvedFile {
                requested_path: requested.to_string(),
                resolved_path: requested.to_string(),
                content: None,
                error: Some(last_error),
            }
        }
    }
}

/// Resolve every requested path independently. One unreadable file never
/// blocks its siblings; its error is carried into the context message
/// instead.
pub async fn resolve_requested_files(
    store: &SandboxedStore,
    requested: &[String],
) -> Vec<ResolvedFile> {
    let mut resolved = Vec::with_capacity(requested.len());
    for path in requested {
        resolved.push(resolve_one(store, path).await);
    }
    resolved
}

/// One user message enumerating every resolution result, fed back to the
/// oracle as the next turn.
pub fn render_context_message(resolved: &[ResolvedFile]) -> String {
    if resolved.is_empty() {
        return "No files were requested.".to_string();
    }

    let mut out = String::from("Requested file contents:\n");
    for file in resolved {
        out.push_str(&format!("\n### {}\n", file.requested_path));
        if file.resolved_path != file.requested_path {
            out.push_str(&format!("(resolved as {})\n", file.resolved_path));
        }

        if let Some(content) = &file.content {
            out.push_str("```\n");
            out.push_str(content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        } else {
            let reason = file.error.as_deref().unwrap_or("unknown error");
            out.push_str(&format!("ERROR: {reason}\n"));
        }
    }
    out
}
