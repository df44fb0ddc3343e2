use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Write text to `path` through a buffered writer, creating parent directories
pub async fn save_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let file = fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(content.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer
        .flush()
        .await
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    tracing::info!("Saved {} ({} bytes)", path.display(), content.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_text_creates_directories() {
        let dir = std::env::temp_dir().join(format!("m3u-regroup-test-{}", std::process::id()));
        let path = dir.join("nested").join("out.m3u");

        save_text(&path, "#EXTM3U\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "#EXTM3U\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_save_text_reports_errors() {
        let path = Path::new("/proc/definitely/not/writable/out.txt");
        assert!(save_text(path, "x").await.is_err());
    }
}
