// src/exec/script.rs

//! `[field]` placeholder substitution for script and notify templates.

use crate::engine::task::Task;

/// Substitute every known `[field]` placeholder with the task's value.
///
/// Supported placeholders: `[action]`, `[path]`, `[file]`, `[filename]`,
/// `[filename_urlsafe]`, `[dirname]`, `[hash]`, `[random]`. Unknown
/// bracketed text is left untouched so shell constructs like `[ -f x ]`
/// survive substitution.
pub fn substitute(template: &str, task: &Task) -> String {
    let mut out = template.to_string();
    for (name, value) in task.vars() {
        let token = format!("[{name}]");
        if out.contains(&token) {
            out = out.replace(&token, value);
        }
    }
    out
}
