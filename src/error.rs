use thiserror::Error;

#[derive(Error, Debug)]
pub enum LitReviewError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("未定義のソースです: {0}（設定の sources に追加してください）")]
    UnknownSource(String),

    #[error("{source_id} の検索結果ファイルが不足しています: {}", .files.join(", "))]
    MissingGridFiles { source_id: String, files: Vec<String> },

    #[error("正規化されていないファイルです: {path}（先に format を実行してください）")]
    NotNormalized { path: String },

    #[error("{path}: {source}")]
    Table {
        path: String,
        source: litreview_common::Error,
    },

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] litreview_common::Error),
}

pub type Result<T> = std::result::Result<T, LitReviewError>;

impl LitReviewError {
    /// 共通ライブラリのエラーにファイルパスを付ける
    pub fn in_file(path: &std::path::Path) -> impl FnOnce(litreview_common::Error) -> Self + '_ {
        move |source| LitReviewError::Table {
            path: path.display().to_string(),
            source,
        }
    }
}
