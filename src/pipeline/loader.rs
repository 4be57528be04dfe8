use super::{read_table, write_table, Workspace};
use crate::error::Result;
use litreview_common::{columns, KeywordGrid, ResultTable};

/// 16ファイル分の検索結果をそのまま連結し、`{SOURCE}-original.csv` に保存する
///
/// 各行にはグリッド位置のキーワードを付与する。フィルタは一切しない。
pub fn combine_original(workspace: &Workspace, source: &str, grid: &KeywordGrid) -> Result<ResultTable> {
    let mut combined = ResultTable::default();
    let mut skipped = 0;

    for cell in grid.cells() {
        let path = workspace.search_file(source, &cell);
        let mut loaded = read_table(&path)?;
        loaded.table.set_column(columns::KEYWORD, cell.keyword);
        skipped += loaded.skipped_lines;
        combined.append(loaded.table);
    }

    let output = workspace.original_path(source);
    write_table(&output, &combined)?;
    tracing::info!(
        source,
        rows = combined.len(),
        skipped_lines = skipped,
        path = %output.display(),
        "生データのスナップショットを出力"
    );

    Ok(combined)
}
