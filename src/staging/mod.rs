//! Staging package assembly
//!
//! Builds the transient on-disk package that gets uploaded: the filter
//! binary, a rendered configuration, a generated landing page, and the
//! archive of all three. Everything lives inside one temp directory that is
//! removed on every exit path, so the run leaves no local trace.

use crate::core::request::{DeploymentRequest, BINARY_PLACEHOLDER};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;

/// Error types for package assembly
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("artifact path has no file name: {0}")]
    ArtifactName(PathBuf),

    #[error("cannot read artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read configuration template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("staging I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("archiving failed: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// The assembled staging package
///
/// Owns the staging directory; dropping the package removes the directory
/// and everything in it, archive included.
#[derive(Debug)]
pub struct StagingPackage {
    root: TempDir,

    /// File name of the binary inside the package
    pub binary_file_name: String,

    /// Rendered configuration inside the staging tree
    pub rendered_config_path: PathBuf,

    /// Archive handed to the upload stage
    pub archive_path: PathBuf,
}

impl StagingPackage {
    /// Path of the staging directory
    pub fn staging_path(&self) -> &Path {
        self.root.path()
    }

    /// Remove the staging directory, reporting any removal error
    ///
    /// Dropping the package removes the directory too; this explicit form
    /// lets the report stage log the release.
    pub fn close(self) -> io::Result<()> {
        let path = self.root.path().to_path_buf();
        let result = self.root.close();
        match &result {
            Ok(()) => info!("Removed staging directory {}", path.display()),
            Err(e) => warn!("Failed to remove staging directory {}: {}", path.display(), e),
        }
        result
    }
}

/// Assemble the staging package for a request
pub async fn assemble(request: &DeploymentRequest) -> Result<StagingPackage, PackagingError> {
    let request = request.clone();
    tokio::task::spawn_blocking(move || assemble_sync(&request))
        .await
        .map_err(|e| PackagingError::Io(e.into()))?
}

fn assemble_sync(request: &DeploymentRequest) -> Result<StagingPackage, PackagingError> {
    let binary_file_name = request
        .artifact_file_name()
        .ok_or_else(|| PackagingError::ArtifactName(request.artifact_path.clone()))?;

    let template =
        std::fs::read_to_string(&request.config_template_path).map_err(|source| {
            PackagingError::Template {
                path: request.config_template_path.clone(),
                source,
            }
        })?;

    let root = tempfile::Builder::new().prefix("dllift-stage-").tempdir()?;
    let site_dir = root.path().join("site");
    let bin_dir = site_dir.join("bin");
    std::fs::create_dir_all(&bin_dir)?;

    let binary_dest = bin_dir.join(&binary_file_name);
    std::fs::copy(&request.artifact_path, &binary_dest).map_err(|source| {
        PackagingError::Artifact {
            path: request.artifact_path.clone(),
            source,
        }
    })?;
    debug!("Copied {} into staging", binary_dest.display());

    let rendered_config_path = site_dir.join("web.config");
    std::fs::write(&rendered_config_path, render_config(&template, &binary_file_name))?;

    let landing_path = site_dir.join("index.html");
    std::fs::write(
        &landing_path,
        landing_page(
            &binary_file_name,
            &request.resource_group,
            &request.app_name,
            Utc::now(),
        ),
    )?;

    let archive_path = root.path().join("package.zip");
    zip_directory(&site_dir, &archive_path)?;

    info!(
        "Assembled package {} ({})",
        archive_path.display(),
        binary_file_name
    );

    Ok(StagingPackage {
        root,
        binary_file_name,
        rendered_config_path,
        archive_path,
    })
}

/// Render the configuration template for an artifact
///
/// Replaces every literal occurrence of the placeholder binary name with the
/// artifact's actual file name. Pure string substitution: the token must
/// match the template text exactly.
pub fn render_config(template: &str, binary_file_name: &str) -> String {
    template.replace(BINARY_PLACEHOLDER, binary_file_name)
}

/// Generate the static landing page embedded in the package
pub fn landing_page(
    binary_file_name: &str,
    resource_group: &str,
    app_name: &str,
    deployed_at: DateTime<Utc>,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{app_name}</title></head>
<body>
<h1>{app_name}</h1>
<p>Filter binary: <code>{binary_file_name}</code></p>
<p>Resource group: <code>{resource_group}</code></p>
<p>Deployed: {deployed_at}</p>
</body>
</html>
"#,
        app_name = app_name,
        binary_file_name = binary_file_name,
        resource_group = resource_group,
        deployed_at = deployed_at.to_rfc3339(),
    )
}

/// Zip a directory's contents into an archive
///
/// Entry names are relative to `src` with forward slashes, so the archive
/// unpacks to the same layout on the platform side.
fn zip_directory(src: &Path, archive_path: &Path) -> Result<(), PackagingError> {
    let file = File::create(archive_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for path in walkdir(src)? {
        let relative = path
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        let name = relative.to_string_lossy().replace('\\', "/");

        if path.is_dir() {
            writer.add_directory(format!("{}/", name), options)?;
        } else {
            writer.start_file(name, options)?;
            let mut reader = File::open(&path)?;
            io::copy(&mut reader, &mut writer)?;
        }
    }

    writer.finish()?;
    debug!("Wrote archive {}", archive_path.display());
    Ok(())
}

fn walkdir(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        paths.push(entry_path.clone());
        if entry_path.is_dir() {
            paths.extend(walkdir(&entry_path)?);
        }
    }
    Ok(paths)
}
