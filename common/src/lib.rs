//! litreview 共通ライブラリ
//!
//! 検索結果テーブル、キーワードグリッド、ソース別正規化、重複除去のロジック。
//! ファイル配置やログ出力は持たず、CLI側から呼び出される。

pub mod columns;
pub mod dedupe;
pub mod error;
pub mod keywords;
pub mod normalize;
pub mod profile;
pub mod table;

pub use dedupe::{
    default_dedupe_key, AggregateOptions, AggregateOutcome, Aggregator, CapPolicy, DuplicateAudit,
    KeywordContribution,
};
pub use error::{Error, Result};
pub use keywords::{grid_file_name, GridCell, KeywordGrid, GRID_SIZE};
pub use normalize::{is_normalized, normalize_table, FormatOutcome, DEFAULT_MIN_PAGES};
pub use profile::{PageRule, SourceProfile};
pub use table::{ReadReport, ResultTable, Row, SkippedLine};
