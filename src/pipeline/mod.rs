//! バッチ処理パイプライン
//!
//! - loader: 全キーワードの生データを連結してスナップショット出力
//! - formatter: カラム正規化とページ数フィルタ（キーワード別ファイルを上書き）
//! - aggregator: 重複除去と関連度上限を適用して統合結果を出力
//! - batch: 上記を original → format → combine の順に実行
//!
//! すべて同期・逐次処理。ステージ間の受け渡しはファイルのみ。

pub mod aggregator;
pub mod batch;
pub mod formatter;
pub mod loader;
pub mod summary;

pub use aggregator::{combine_csv, CombineReport};
pub use batch::{has_normalized_inputs, run_source, BatchReport};
pub use formatter::{format_searches, FormatReport};
pub use loader::combine_original;
pub use summary::{KeywordSummary, RunSummary};

use crate::error::{LitReviewError, Result};
use crate::scanner::KEYWORDS_FILE;
use litreview_common::{GridCell, KeywordGrid, ResultTable};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// 除外データの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovedKind {
    /// ページ数不足
    Short,
    /// ページ番号が数値でない
    Invalid,
    Duplicate,
    /// 関連度上限超過
    Relevant,
}

impl RemovedKind {
    fn suffix(&self) -> &'static str {
        match self {
            RemovedKind::Short => "short",
            RemovedKind::Invalid => "invalid",
            RemovedKind::Duplicate => "duplicate",
            RemovedKind::Relevant => "relevant",
        }
    }
}

/// 入出力ディレクトリの配置
#[derive(Debug, Clone)]
pub struct Workspace {
    pub searches_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Workspace {
    pub fn new(searches_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            searches_dir: searches_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn keywords_path(&self) -> PathBuf {
        self.searches_dir.join(KEYWORDS_FILE)
    }

    pub fn search_file(&self, source: &str, cell: &GridCell<'_>) -> PathBuf {
        self.searches_dir.join(cell.file_name(source))
    }

    /// `output/{SOURCE}.csv`
    pub fn combined_path(&self, source: &str) -> PathBuf {
        self.output_dir.join(format!("{}.csv", source))
    }

    /// `output/{SOURCE}-original.csv`
    pub fn original_path(&self, source: &str) -> PathBuf {
        self.output_dir.join(format!("{}-original.csv", source))
    }

    /// `output/{SOURCE}-summary.json`
    pub fn summary_path(&self, source: &str) -> PathBuf {
        self.output_dir.join(format!("{}-summary.json", source))
    }

    pub fn removed_dir(&self) -> PathBuf {
        self.output_dir.join("removed-data")
    }

    /// `output/removed-data/{SOURCE}-rm-{kind}.csv`
    pub fn removed_path(&self, source: &str, kind: RemovedKind) -> PathBuf {
        self.removed_dir()
            .join(format!("{}-rm-{}.csv", source, kind.suffix()))
    }
}

/// 読み込んだ検索結果ファイル
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub table: ResultTable,
    /// ファイル内容のSHA-256（16進）
    pub sha256: String,
    pub skipped_lines: usize,
}

pub fn load_keywords(workspace: &Workspace) -> Result<KeywordGrid> {
    let path = workspace.keywords_path();
    if !path.exists() {
        return Err(LitReviewError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(&path)?;
    let grid = KeywordGrid::from_csv_reader(&bytes[..])?;
    tracing::debug!(path = %path.display(), "キーワードグリッド読み込み");
    Ok(grid)
}

/// CSVを読み込む。壊れた行はスキップしてログに残す
pub fn read_table(path: &Path) -> Result<LoadedFile> {
    if !path.exists() {
        return Err(LitReviewError::FileNotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    let (table, report) = ResultTable::from_csv_reader(&bytes[..])?;

    for skipped in &report.skipped {
        tracing::warn!(
            path = %path.display(),
            line = skipped.line,
            reason = %skipped.reason,
            "不正な行をスキップ"
        );
    }
    tracing::debug!(path = %path.display(), rows = table.len(), skipped = report.skipped.len(), "CSV読み込み");

    Ok(LoadedFile {
        table,
        sha256,
        skipped_lines: report.skipped.len(),
    })
}

/// CSVを書き出す（親ディレクトリは自動作成）
pub fn write_table(path: &Path, table: &ResultTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    table.write_csv(BufWriter::new(file))?;
    tracing::debug!(path = %path.display(), rows = table.len(), "CSV書き出し");
    Ok(())
}

/// 一時ファイル経由で置き換える（入力ファイルの上書き用）
pub fn replace_table(path: &Path, table: &ResultTable) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    write_table(&tmp, table)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
