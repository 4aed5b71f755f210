//! Render every template against one scheme and write the outputs.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::TemplateError;
use crate::scheme::ColorScheme;
use crate::storage::write_atomic;
use crate::template::Template;

/// One template written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub target: String,
    pub path: PathBuf,
    pub content: String,
}

/// Outcome of [`render_all`], sorted by target.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub rendered: Vec<RenderedOutput>,
    pub failures: Vec<TemplateError>,
}

/// Render `templates` in parallel into `out_dir/<target>`.
///
/// Each template writes only its own file. A template that fails leaves any
/// previous output at its path untouched. Returns once every worker is done.
pub fn render_all(scheme: &ColorScheme, templates: &[Template], out_dir: &Path) -> RenderReport {
    let results: Vec<Result<RenderedOutput, TemplateError>> = templates
        .par_iter()
        .map(|template| render_one(scheme, template, out_dir))
        .collect();

    let mut report = RenderReport::default();
    for result in results {
        match result {
            Ok(output) => {
                debug!(template = %output.target, path = %output.path.display(), "rendered");
                report.rendered.push(output);
            }
            Err(err) => {
                warn!("{err}");
                report.failures.push(err);
            }
        }
    }
    report.rendered.sort_by(|a, b| a.target.cmp(&b.target));
    report
        .failures
        .sort_by(|a, b| a.template().cmp(b.template()));
    report
}

fn render_one(
    scheme: &ColorScheme,
    template: &Template,
    out_dir: &Path,
) -> Result<RenderedOutput, TemplateError> {
    let content = template.render(scheme)?;
    let path = out_dir.join(template.target());
    write_atomic(&path, content.as_bytes()).map_err(|source| TemplateError::Io {
        template: template.target().to_string(),
        path: path.clone(),
        source,
    })?;
    Ok(RenderedOutput {
        target: template.target().to_string(),
        path,
        content,
    })
}
