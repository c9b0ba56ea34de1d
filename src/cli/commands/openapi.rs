use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use utoipa::OpenApi;

use crate::schemas::ApiDoc;

pub fn render_yaml() -> Result<String> {
    serde_yaml::to_string(&ApiDoc::openapi()).context("Failed to render OpenAPI document")
}

pub fn openapi(output: Option<&Path>) -> Result<()> {
    let yaml = render_yaml()?;
    match output {
        Some(path) => {
            std::fs::write(path, yaml)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("OpenAPI document written to {}", path.display());
        }
        None => print!("{yaml}"),
    }
    Ok(())
}
