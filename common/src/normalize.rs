//! 検索結果の正規化
//!
//! 1ファイル分の検索結果に対して:
//! 1. キーワード列を付与
//! 2. ソース固有カラム名を標準名へ変更
//! 3. ページ数を算出し、フルテキスト未満の行を除外
//! 4. 正規化済みマーカー列を付与
//!
//! マーカー列を持つテーブルは処理済みとしてそのまま返すため、
//! 何度実行しても結果は変わらない。

use crate::columns;
use crate::error::Result;
use crate::profile::SourceProfile;
use crate::table::ResultTable;

/// フルテキスト論文とみなす最小ページ数
pub const DEFAULT_MIN_PAGES: i64 = 5;

/// 正規化結果
#[derive(Debug, Clone)]
pub struct FormatOutcome {
    /// 残った行（正規化済み）
    pub kept: ResultTable,
    /// ページ数不足で除外した行
    pub short: ResultTable,
    /// ページ数を求められず除外した行
    pub invalid: ResultTable,
    /// 入力が既に正規化済みだった
    pub already_normalized: bool,
}

pub fn is_normalized(table: &ResultTable) -> bool {
    table.has_column(columns::NORMALIZED)
}

/// 1ファイル分のテーブルを正規化する
pub fn normalize_table(
    mut table: ResultTable,
    keyword: &str,
    profile: &SourceProfile,
    min_pages: i64,
) -> Result<FormatOutcome> {
    if is_normalized(&table) {
        let short = table.empty_like();
        let invalid = table.empty_like();
        return Ok(FormatOutcome {
            kept: table,
            short,
            invalid,
            already_normalized: true,
        });
    }

    table.set_column(columns::KEYWORD, keyword);

    // ルールはソース固有のカラム名で解決する（位置はリネーム後も変わらない）
    let counter = profile.pages.resolve(&table)?;
    for (from, to) in &profile.columns {
        table.rename_column(from, to)?;
    }
    let pages_idx = table.ensure_column(columns::NUM_PAGES);

    let headers = table.headers().to_vec();
    let mut kept = ResultTable::new(headers.clone());
    let mut short = ResultTable::new(headers.clone());
    let mut invalid = ResultTable::new(headers);

    for mut row in table.into_rows() {
        match counter.count(&row) {
            None => invalid.push_row(row),
            Some(pages) => {
                row[pages_idx] = pages.to_string();
                if pages < min_pages {
                    short.push_row(row);
                } else {
                    kept.push_row(row);
                }
            }
        }
    }

    kept.set_column(columns::NORMALIZED, columns::NORMALIZED_MARK);

    Ok(FormatOutcome {
        kept,
        short,
        invalid,
        already_normalized: false,
    })
}
