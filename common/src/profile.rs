//! ソース別プロファイル
//!
//! デジタルライブラリごとの差分（カラム名・ページ数の求め方）を設定として持つ。
//! 新しいソースを追加する場合はプロファイルを1つ追加するだけでよい。

use crate::dedupe::default_dedupe_key;
use crate::error::Result;
use crate::table::ResultTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ページ数の算出ルール
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PageRule {
    /// 開始/終了ページから `end - start` を求める。両方とも数字のみであること
    StartEnd { start: String, end: String },
    /// 既存のカラムを整数として読む
    Column { name: String },
}

/// カラム位置を解決済みのページ数ルール
#[derive(Debug, Clone, Copy)]
pub enum PageCounter {
    StartEnd { start: usize, end: usize },
    Column { idx: usize },
}

impl PageRule {
    /// テーブルのカラム位置を解決する。必要なカラムが無ければエラー
    pub fn resolve(&self, table: &ResultTable) -> Result<PageCounter> {
        Ok(match self {
            PageRule::StartEnd { start, end } => PageCounter::StartEnd {
                start: table.require_column(start)?,
                end: table.require_column(end)?,
            },
            PageRule::Column { name } => PageCounter::Column {
                idx: table.require_column(name)?,
            },
        })
    }
}

impl PageCounter {
    /// 1行のページ数。求められない場合は `None`
    pub fn count(&self, row: &[String]) -> Option<i64> {
        match *self {
            PageCounter::StartEnd { start, end } => {
                let start = parse_page_number(&row[start])?;
                let end = parse_page_number(&row[end])?;
                end.checked_sub(start)
            }
            PageCounter::Column { idx } => parse_page_count(&row[idx]),
        }
    }
}

/// 数字のみで構成されたページ番号（符号・空白・小数点は不可）
fn parse_page_number(value: &str) -> Option<i64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// エクスポート済みのページ数。`12.0` のような整数値の小数表記も受け付ける
fn parse_page_count(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    let f = value.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// ソース定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProfile {
    /// ファイル名の接頭辞（`ACM`, `IEEE` など）
    pub id: String,
    /// ソース固有カラム名 → 標準カラム名
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
    pub pages: PageRule,
    /// 重複判定に使うカラム（リネーム後の名前）
    #[serde(default = "default_dedupe_key")]
    pub dedupe_key: Vec<String>,
}

impl SourceProfile {
    /// 組み込みプロファイルを取得
    pub fn from_preset(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "ACM" => Some(Self::acm()),
            "IEEE" => Some(Self::ieee()),
            _ => None,
        }
    }

    /// 組み込みプロファイル一覧（処理順）
    pub fn builtin() -> Vec<Self> {
        vec![Self::acm(), Self::ieee()]
    }

    /// ACM Digital Library: 標準カラム名と num_pages を既に持つ
    pub fn acm() -> Self {
        Self {
            id: "ACM".into(),
            columns: BTreeMap::new(),
            pages: PageRule::Column {
                name: crate::columns::NUM_PAGES.into(),
            },
            dedupe_key: default_dedupe_key(),
        }
    }

    /// IEEE Xplore
    pub fn ieee() -> Self {
        let mut columns = BTreeMap::new();
        columns.insert("Document Title".into(), crate::columns::TITLE.into());
        columns.insert("Authors".into(), crate::columns::AUTHOR.into());

        Self {
            id: "IEEE".into(),
            columns,
            pages: PageRule::StartEnd {
                start: "Start Page".into(),
                end: "End Page".into(),
            },
            dedupe_key: default_dedupe_key(),
        }
    }
}
