use crate::error::{AppResult, FileError};
use crate::models::request::EvaluationRequest;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载一次评估请求
pub async fn load_request(toml_file_path: &Path) -> AppResult<EvaluationRequest> {
    let path_str = toml_file_path.to_string_lossy().to_string();

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: path_str.clone(),
            source,
        })?;

    let mut request: EvaluationRequest =
        toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
            path: path_str.clone(),
            source,
        })?;

    // 没写 attempt_id 时用文件名兜底
    if request.attempt_id.trim().is_empty() {
        request.attempt_id = toml_file_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
    }

    // 设置文件路径
    request.file_path = Some(path_str);

    Ok(request)
}

/// 从文件夹中加载所有 TOML 请求
///
/// 单个文件加载失败只记录警告，不影响其它文件。结果按文件名排序。
pub async fn load_all_requests(folder_path: &str) -> AppResult<Vec<EvaluationRequest>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: folder_path.to_string(),
            source,
        })?;

    let mut toml_files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut requests = Vec::with_capacity(toml_files.len());
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_request(&path).await {
            Ok(request) => {
                tracing::info!(
                    "成功加载作文 {} ({} 字符)",
                    request.attempt_id,
                    request.raw_answer_text.chars().count()
                );
                requests.push(request);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(requests)
}
