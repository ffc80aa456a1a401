//! 按语言导出翻译库
//!
//! 每个语言生成一个 `{key: text}` 对象，只包含非空取值；
//! 没有任何非空取值的语言不生成文件。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{HarvestError, HarvestResult};
use crate::extraction::language::{Language, LanguageSet};
use crate::extraction::store::TranslationStore;

/// 一个待写出的导出文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFile {
    pub name: String,
    pub contents: String,
}

impl ExportFile {
    /// 以两个空格缩进的 JSON 创建导出文件
    pub fn json<T: Serialize + ?Sized>(name: impl Into<String>, value: &T) -> HarvestResult<Self> {
        Ok(Self {
            name: name.into(),
            contents: serde_json::to_string_pretty(value)?,
        })
    }
}

/// 单个语言的导出结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageExport {
    pub language: Language,
    pub entries: BTreeMap<String, String>,
}

impl LanguageExport {
    pub fn file_name(&self) -> String {
        format!("{}.json", self.language.code())
    }
}

/// 按语言拆分翻译库，顺序为 ko、en、ja
pub fn export_by_language(store: &TranslationStore, languages: LanguageSet) -> Vec<LanguageExport> {
    languages
        .iter()
        .filter_map(|language| {
            let entries: BTreeMap<String, String> = store
                .iter()
                .filter_map(|(key, entry)| {
                    entry
                        .get(language)
                        .filter(|text| !text.is_empty())
                        .map(|text| (key.clone(), text.to_string()))
                })
                .collect();

            if entries.is_empty() {
                debug!("语言 {} 没有可导出的内容", language);
                None
            } else {
                Some(LanguageExport { language, entries })
            }
        })
        .collect()
}

/// 生成 `<lang>.json` 导出文件
pub fn export_files(store: &TranslationStore, languages: LanguageSet) -> HarvestResult<Vec<ExportFile>> {
    export_by_language(store, languages)
        .iter()
        .map(|export| ExportFile::json(export.file_name(), &export.entries))
        .collect()
}

/// 把导出文件写入目录（目录不存在时创建），返回写出的路径
pub fn write_to_dir(dir: &Path, files: &[ExportFile]) -> HarvestResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .map_err(|e| HarvestError::Io(format!("无法创建导出目录 {}: {}", dir.display(), e)))?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.name);
        fs::write(&path, format!("{}\n", file.contents))
            .map_err(|e| HarvestError::Io(format!("无法写入 {}: {}", path.display(), e)))?;
        written.push(path);
    }

    info!("已导出 {} 个文件到 {}", written.len(), dir.display());
    Ok(written)
}
