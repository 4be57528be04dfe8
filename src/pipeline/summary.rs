//! 実行サマリ（`{SOURCE}-summary.json`）
//!
//! 件数の内訳と入力ファイルのハッシュを残し、再実行時に入力が
//! 変わっていないかを確認できるようにする。

use crate::error::Result;
use litreview_common::{default_dedupe_key, CapPolicy, DuplicateAudit};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSummary {
    /// 1始まり（ファイル名と同じ）
    pub row: usize,
    pub col: usize,
    pub keyword: String,
    pub file: String,
    pub sha256: String,
    pub input_rows: usize,
    pub duplicates: usize,
    pub over_cap: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub source: String,
    /// RFC 3339
    pub generated_at: String,
    pub relevance_cap: usize,
    pub duplicate_audit: DuplicateAudit,
    pub cap_policy: CapPolicy,
    #[serde(default = "default_dedupe_key")]
    pub dedupe_key: Vec<String>,
    pub input_rows: usize,
    pub skipped_lines: usize,
    pub combined_rows: usize,
    /// 重複として削除した行数
    pub duplicate_rows: usize,
    /// 重複監査ファイルの行数（残存行を含む）
    pub duplicate_audit_rows: usize,
    pub over_cap_rows: usize,
    pub keywords: Vec<KeywordSummary>,
}

impl RunSummary {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// 入力ファイルが前回と同一か
    pub fn same_inputs(&self, other: &RunSummary) -> bool {
        self.keywords.len() == other.keywords.len()
            && self
                .keywords
                .iter()
                .zip(&other.keywords)
                .all(|(a, b)| a.file == b.file && a.sha256 == b.sha256)
    }
}
