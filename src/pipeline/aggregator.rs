use super::summary::{KeywordSummary, RunSummary};
use super::{read_table, write_table, RemovedKind, Workspace};
use crate::error::{LitReviewError, Result};
use litreview_common::{
    is_normalized, AggregateOptions, Aggregator, CapPolicy, DuplicateAudit, KeywordGrid, ResultTable,
    SourceProfile,
};

/// 統合処理の結果
#[derive(Debug, Clone)]
pub struct CombineReport {
    pub combined: ResultTable,
    pub summary: RunSummary,
}

/// 正規化済みのキーワード別ファイルを統合する
///
/// グリッドの (row, col) 順に読み込み、キーワードを追加するたびに
/// 重複除去と関連度上限を適用する。正規化マーカーの無いファイルはエラー。
/// 重複判定キーはプロファイルの `dedupe_key`。出力:
/// - `{SOURCE}.csv`: 統合結果
/// - `removed-data/{SOURCE}-rm-duplicate.csv`: 重複
/// - `removed-data/{SOURCE}-rm-relevant.csv`: 関連度上限超過
/// - `{SOURCE}-summary.json`: 実行サマリ
pub fn combine_csv(
    workspace: &Workspace,
    profile: &SourceProfile,
    grid: &KeywordGrid,
    options: &AggregateOptions,
) -> Result<CombineReport> {
    let source = profile.id.as_str();
    tracing::info!(
        source,
        relevance_cap = options.relevance_cap,
        duplicate_audit = %options.duplicate_audit,
        cap_policy = %options.cap_policy,
        "統合開始"
    );
    if options.duplicate_audit == DuplicateAudit::LastSnapshot
        || options.cap_policy == CapPolicy::Cumulative
    {
        tracing::warn!(source, "旧方式のポリシーが選択されています");
    }

    let mut aggregator = Aggregator::new(*options).with_dedupe_key(profile.dedupe_key.clone());
    let dedupe_key = aggregator.dedupe_key().to_vec();
    tracing::debug!(source, dedupe_key = ?dedupe_key, "重複判定キー");
    let mut keywords = Vec::new();
    let mut skipped_lines = 0;

    for cell in grid.cells() {
        let path = workspace.search_file(source, &cell);
        let loaded = read_table(&path)?;
        if !is_normalized(&loaded.table) {
            return Err(LitReviewError::NotNormalized {
                path: path.display().to_string(),
            });
        }
        skipped_lines += loaded.skipped_lines;

        let contribution = aggregator
            .push_keyword(cell.keyword, loaded.table)
            .map_err(LitReviewError::in_file(&path))?;

        tracing::debug!(
            keyword = cell.keyword,
            input = contribution.input_rows,
            kept = contribution.kept,
            duplicates = contribution.duplicates,
            over_cap = contribution.over_cap,
            total = aggregator.combined().len(),
            "キーワード追加"
        );

        keywords.push(KeywordSummary {
            row: cell.row + 1,
            col: cell.col + 1,
            keyword: contribution.keyword,
            file: cell.file_name(source),
            sha256: loaded.sha256,
            input_rows: contribution.input_rows,
            duplicates: contribution.duplicates,
            over_cap: contribution.over_cap,
            kept: contribution.kept,
        });
    }

    let outcome = aggregator.finish();

    write_table(&workspace.combined_path(source), &outcome.combined)?;
    write_table(&workspace.removed_path(source, RemovedKind::Duplicate), &outcome.duplicates)?;
    write_table(&workspace.removed_path(source, RemovedKind::Relevant), &outcome.over_cap)?;

    let summary = RunSummary {
        source: source.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        relevance_cap: options.relevance_cap,
        duplicate_audit: options.duplicate_audit,
        cap_policy: options.cap_policy,
        dedupe_key,
        input_rows: keywords.iter().map(|k| k.input_rows).sum(),
        skipped_lines,
        combined_rows: outcome.combined.len(),
        duplicate_rows: keywords.iter().map(|k| k.duplicates).sum(),
        duplicate_audit_rows: outcome.duplicates.len(),
        over_cap_rows: outcome.over_cap.len(),
        keywords,
    };

    let summary_path = workspace.summary_path(source);
    if summary_path.exists() {
        match RunSummary::load(&summary_path) {
            Ok(previous) if previous.same_inputs(&summary) => {
                tracing::debug!(source, "入力ファイルは前回実行から変更なし");
            }
            Ok(_) => tracing::info!(source, "入力ファイルが前回実行から変更されています"),
            Err(e) => tracing::debug!(
                source,
                path = %summary_path.display(),
                error = %e,
                "前回のサマリを読み込めません"
            ),
        }
    }
    summary.save(&summary_path)?;

    tracing::info!(
        source,
        combined = summary.combined_rows,
        duplicates = summary.duplicate_rows,
        over_cap = summary.over_cap_rows,
        "統合完了"
    );

    Ok(CombineReport {
        combined: outcome.combined,
        summary,
    })
}
