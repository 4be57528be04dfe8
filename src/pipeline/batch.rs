use super::{combine_csv, combine_original, format_searches, read_table, CombineReport, FormatReport, Workspace};
use crate::error::Result;
use litreview_common::{is_normalized, AggregateOptions, KeywordGrid, SourceProfile};

/// 1ソース分の一括処理結果
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// 生データスナップショットの行数。既存のものを残した場合は `None`
    pub original_rows: Option<usize>,
    pub format: FormatReport,
    pub combine: CombineReport,
}

/// original → format → combine の順に実行する
///
/// 正規化はキーワード別ファイルを上書きするので、スナップショットは必ず先に取る。
/// 既に正規化済みのファイルがあり、スナップショットも存在する場合は上書きしない。
pub fn run_source(
    workspace: &Workspace,
    profile: &SourceProfile,
    grid: &KeywordGrid,
    min_pages: i64,
    options: &AggregateOptions,
) -> Result<BatchReport> {
    let source = profile.id.as_str();

    let original_rows = if has_normalized_inputs(workspace, source, grid)? {
        if workspace.original_path(source).exists() {
            tracing::info!(source, "正規化済みの入力があるため既存のスナップショットを保持");
            None
        } else {
            tracing::warn!(source, "正規化済みの入力からスナップショットを作成します");
            Some(combine_original(workspace, source, grid)?.len())
        }
    } else {
        Some(combine_original(workspace, source, grid)?.len())
    };

    let format = format_searches(workspace, profile, grid, min_pages)?;
    let combine = combine_csv(workspace, profile, grid, options)?;

    Ok(BatchReport {
        original_rows,
        format,
        combine,
    })
}

/// キーワード別ファイルに正規化済みのものが1つでもあるか
pub fn has_normalized_inputs(workspace: &Workspace, source: &str, grid: &KeywordGrid) -> Result<bool> {
    for cell in grid.cells() {
        let loaded = read_table(&workspace.search_file(source, &cell))?;
        if is_normalized(&loaded.table) {
            return Ok(true);
        }
    }
    Ok(false)
}
