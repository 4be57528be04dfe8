//! 検索結果フォルダのスキャン
//!
//! `{SOURCE}0{row}-{col}.csv` 形式のファイルを列挙し、
//! グリッドに対する不足ファイルや想定外のファイルを検出する。

use crate::error::{LitReviewError, Result};
use litreview_common::{grid_file_name, GRID_SIZE};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const KEYWORDS_FILE: &str = "keywords.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridFile {
    pub source: String,
    /// 0始まり
    pub row: usize,
    /// 0始まり
    pub col: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub found: Vec<GridFile>,
    /// 命名規則に合わない、または未定義ソースのCSV
    pub unexpected: Vec<PathBuf>,
    pub has_keywords: bool,
}

impl ScanReport {
    /// ソースについて、存在しないグリッドファイル名
    pub fn missing(&self, source: &str) -> Vec<String> {
        let present: BTreeSet<(usize, usize)> = self
            .found
            .iter()
            .filter(|f| f.source == source)
            .map(|f| (f.row, f.col))
            .collect();

        let mut missing = Vec::new();
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                if !present.contains(&(row, col)) {
                    missing.push(grid_file_name(source, row, col));
                }
            }
        }
        missing
    }

    /// 不足ファイルがあればまとめてエラーにする
    pub fn require_complete(&self, source: &str) -> Result<()> {
        let files = self.missing(source);
        if files.is_empty() {
            Ok(())
        } else {
            Err(LitReviewError::MissingGridFiles {
                source_id: source.to_string(),
                files,
            })
        }
    }
}

/// グリッドファイル名を解析して (source, row, col) を返す（row/colは0始まり）
pub fn parse_grid_file_name(name: &str) -> Option<(String, usize, usize)> {
    lazy_static::lazy_static! {
        static ref GRID_FILE_RE: Regex = Regex::new(r"^(.+?)0([1-4])-([1-4])\.csv$").unwrap();
    }

    let caps = GRID_FILE_RE.captures(name)?;
    let row: usize = caps[2].parse().ok()?;
    let col: usize = caps[3].parse().ok()?;
    Some((caps[1].to_string(), row - 1, col - 1))
}

/// 検索結果フォルダをスキャン（直下のみ）
pub fn scan_searches(folder: &Path, sources: &[&str]) -> Result<ScanReport> {
    if !folder.exists() {
        return Err(LitReviewError::FolderNotFound(folder.display().to_string()));
    }

    let mut report = ScanReport::default();

    for entry in WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if file_name == KEYWORDS_FILE {
            report.has_keywords = true;
            continue;
        }
        if !file_name.to_lowercase().ends_with(".csv") {
            continue;
        }

        match parse_grid_file_name(&file_name) {
            Some((source, row, col)) if sources.iter().any(|s| *s == source) => {
                report.found.push(GridFile {
                    source,
                    row,
                    col,
                    path: path.to_path_buf(),
                });
            }
            _ => report.unexpected.push(path.to_path_buf()),
        }
    }

    report
        .found
        .sort_by(|a, b| (&a.source, a.row, a.col).cmp(&(&b.source, b.row, b.col)));
    report.unexpected.sort();

    Ok(report)
}
