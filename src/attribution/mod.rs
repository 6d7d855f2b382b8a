//! Task-to-URL attribution.
//!
//! A main-thread task carries every script URL that was on the stack while it
//! ran. Exactly one of them is charged for the task's cost: preferably one
//! that was actually fetched as a script.

use crate::models::{ExecutionTask, TransferRecord};
use std::collections::HashSet;

/// Label charged for work the browser does on its own behalf.
pub const BROWSER_LABEL: &str = "Browser";

/// Label charged for garbage collection.
pub const BROWSER_GC_LABEL: &str = "Browser GC";

const BROWSER_TASK_NAMES: &[&str] = &["CpuProfiler::StartProfiling"];

const BROWSER_GC_TASK_NAMES: &[&str] = &["V8.GCCompactor", "MajorGC", "MinorGC"];

/// URLs of all records that loaded JavaScript.
pub fn javascript_urls(records: &[TransferRecord]) -> HashSet<&str> {
    records
        .iter()
        .filter(|r| r.is_script())
        .map(|r| r.url.as_str())
        .collect()
}

/// Pick the URL a task's cost should be charged to.
///
/// Prefers the first candidate that is a known script URL, falling back to
/// the first candidate. Tasks with no usable candidate are charged to a
/// browser label when their name identifies browser-internal work, and to
/// nothing otherwise. Labels are not URLs.
pub fn attributable_url<'a>(
    task: &'a ExecutionTask,
    script_urls: &HashSet<&str>,
) -> Option<&'a str> {
    let candidates = &task.attributable_urls;
    let url = candidates
        .iter()
        .find(|url| script_urls.contains(url.as_str()))
        .or_else(|| candidates.first())
        .map(String::as_str)
        .filter(|url| !url.is_empty() && *url != "about:blank");

    url.or_else(|| browser_label(&task.name))
}

fn browser_label(task_name: &str) -> Option<&'static str> {
    if BROWSER_TASK_NAMES.contains(&task_name) {
        Some(BROWSER_LABEL)
    } else if BROWSER_GC_TASK_NAMES.contains(&task_name) {
        Some(BROWSER_GC_LABEL)
    } else {
        None
    }
}
