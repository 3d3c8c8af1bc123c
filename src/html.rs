//! HTML page rendering.
//!
//! The page embeds every category's chart specification into one template.
//! Placeholders look like `{{ name }}`; names without a value are left as-is.

use crate::chart::chart_path;
use crate::config::Config;
use crate::error::{Result, ResultExt};
use crate::model::Category;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Template compiled into the binary, used unless `paths.template` is set.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/index.html");

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid"));

/// Substitute `{{ name }}` placeholders.
#[must_use]
pub fn render_template(template: &str, values: &HashMap<&str, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            values
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Chart spec for a category, ready to sit inside a `<script>` block.
///
/// A missing spec renders as `null`.
fn embedded_spec(semantic_dir: &Path, category: Category) -> String {
    let path = chart_path(semantic_dir, category);
    match std::fs::read_to_string(&path) {
        // `</` inside post text would otherwise close the script element
        Ok(spec) => spec.trim().replace("</", "<\\/"),
        Err(e) => {
            warn!(%category, path = %path.display(), error = %e, "Chart spec unavailable");
            "null".to_string()
        }
    }
}

/// Render the page from the chart specs under `<output>/semantic/`.
///
/// # Errors
///
/// Returns an error if a custom template cannot be read or the page cannot
/// be written.
pub fn render_page(config: &Config, now: DateTime<Utc>) -> Result<PathBuf> {
    let template = match &config.paths.template {
        Some(path) => std::fs::read_to_string(path).with_path("read", path)?,
        None => DEFAULT_TEMPLATE.to_string(),
    };

    let semantic_dir = config.semantic_dir();
    let mut values: HashMap<&str, String> = Category::all()
        .into_iter()
        .map(|category| (category.template_slot(), embedded_spec(&semantic_dir, category)))
        .collect();
    values.insert("last_updated", now.format("%Y-%m-%d %H:%M UTC").to_string());
    values.insert("vega_version", config.chart.vega_version.clone());
    values.insert("vegalite_version", config.chart.vega_lite_version.clone());
    values.insert("vegaembed_version", config.chart.vega_embed_version.clone());

    let page = render_template(&template, &values);
    let output = config.html_path();
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_path("create", parent)?;
    }
    std::fs::write(&output, page).with_path("write", &output)?;
    info!(path = %output.display(), "HTML page written");
    Ok(output)
}
