use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::icd_error;

/// 初始化日志系统
pub fn init_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// 验证输入文件
pub fn validate_input_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(icd_error!(file_op, path.display(), "读取", "输入文件不存在"));
    }

    if !path.is_file() {
        return Err(icd_error!(file_op, path.display(), "读取", "输入路径不是文件"));
    }

    if let Some(ext) = path.extension() {
        if ext != "json" {
            warn!("⚠️  文件扩展名不是JSON: {}", ext.to_string_lossy());
        }
    }

    Ok(())
}

/// 生成翻译输出文件路径
///
/// 未指定时在输入文件名后追加语言代码: `icd11_taxonomy.json` -> `icd11_taxonomy_da.json`
pub fn generate_output_path(input: &Path, output: &Option<PathBuf>, lang: &str) -> PathBuf {
    if let Some(output_path) = output {
        return output_path.clone();
    }

    let stem = input.file_stem().unwrap_or_default();
    let output_name = match input.extension() {
        Some(extension) => format!(
            "{}_{}.{}",
            stem.to_string_lossy(),
            lang,
            extension.to_string_lossy()
        ),
        None => format!("{}_{}.json", stem.to_string_lossy(), lang),
    };

    match input.parent() {
        Some(parent) => parent.join(output_name),
        None => PathBuf::from(output_name),
    }
}
