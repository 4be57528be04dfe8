use super::{read_table, replace_table, write_table, RemovedKind, Workspace};
use crate::error::{LitReviewError, Result};
use litreview_common::{normalize_table, KeywordGrid, ResultTable, SourceProfile};
use serde::Serialize;

/// 正規化の集計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatReport {
    pub source: String,
    /// 今回正規化して上書きしたファイル数
    pub files_normalized: usize,
    /// 既に正規化済みでスキップしたファイル数
    pub files_skipped: usize,
    pub kept_rows: usize,
    pub short_rows: usize,
    pub invalid_rows: usize,
}

/// キーワード別ファイルを正規化して上書きする
///
/// 正規化済みマーカー列を持つファイルは読み飛ばすので、繰り返し実行しても安全。
/// 除外した行は `{SOURCE}-rm-short.csv` / `{SOURCE}-rm-invalid.csv` に出力する。
pub fn format_searches(
    workspace: &Workspace,
    profile: &SourceProfile,
    grid: &KeywordGrid,
    min_pages: i64,
) -> Result<FormatReport> {
    let source = profile.id.as_str();
    let mut report = FormatReport {
        source: source.to_string(),
        ..Default::default()
    };
    let mut short = ResultTable::default();
    let mut invalid = ResultTable::default();

    for cell in grid.cells() {
        let path = workspace.search_file(source, &cell);
        let loaded = read_table(&path)?;
        let outcome = normalize_table(loaded.table, cell.keyword, profile, min_pages)
            .map_err(LitReviewError::in_file(&path))?;

        if outcome.already_normalized {
            tracing::debug!(path = %path.display(), "正規化済みのためスキップ");
            report.files_skipped += 1;
            report.kept_rows += outcome.kept.len();
            continue;
        }

        tracing::debug!(
            path = %path.display(),
            keyword = cell.keyword,
            kept = outcome.kept.len(),
            short = outcome.short.len(),
            invalid = outcome.invalid.len(),
            "正規化"
        );
        if !outcome.invalid.is_empty() {
            tracing::warn!(
                path = %path.display(),
                rows = outcome.invalid.len(),
                "ページ番号が数値でない行を除外"
            );
        }

        replace_table(&path, &outcome.kept)?;
        report.files_normalized += 1;
        report.kept_rows += outcome.kept.len();
        report.short_rows += outcome.short.len();
        report.invalid_rows += outcome.invalid.len();
        short.append(outcome.short);
        invalid.append(outcome.invalid);
    }

    // 一部が処理済みだった場合、前回の除外記録を消さないよう追記する
    let merge = report.files_skipped > 0;
    write_audit(&workspace.removed_path(source, RemovedKind::Short), short, merge)?;
    write_audit(&workspace.removed_path(source, RemovedKind::Invalid), invalid, merge)?;

    tracing::info!(
        source,
        normalized = report.files_normalized,
        skipped = report.files_skipped,
        kept = report.kept_rows,
        short = report.short_rows,
        invalid = report.invalid_rows,
        "正規化完了"
    );

    Ok(report)
}

fn write_audit(path: &std::path::Path, rows: ResultTable, merge: bool) -> Result<()> {
    if !merge || !path.exists() {
        return write_table(path, &rows);
    }
    if rows.is_empty() {
        return Ok(());
    }

    let mut existing = read_table(path)?.table;
    existing.append(rows);
    write_table(path, &existing)
}
