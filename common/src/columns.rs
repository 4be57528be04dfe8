//! 正規化後の標準カラム名

/// 論文タイトル
pub const TITLE: &str = "title";
/// 著者リスト
pub const AUTHOR: &str = "author";
/// ページ数（終了ページ − 開始ページ、またはエクスポート値）
pub const NUM_PAGES: &str = "num_pages";
/// 検索に使ったキーワード（読み込み時に付与）
pub const KEYWORD: &str = "keyword";
/// 正規化済みマーカー。値は常に [`NORMALIZED_MARK`]
pub const NORMALIZED: &str = "normalized";
pub const NORMALIZED_MARK: &str = "1";
/// 重複監査ファイルでの残存/削除区分
pub const DEDUPE_STATUS: &str = "dedupe_status";
