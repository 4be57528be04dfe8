use clap::{Parser, Subcommand};
use litreview_common::{CapPolicy, DuplicateAudit};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "litreview")]
#[command(about = "ACM/IEEE文献検索結果の統合・重複除去ツール", long_about = None)]
pub struct Cli {
    /// 省略時は combine（全ソース）
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（省略時は ./litreview.json → ~/.config/litreview/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 検索結果フォルダ（設定より優先）
    #[arg(long, global = true)]
    pub searches: Option<PathBuf>,

    /// 出力フォルダ（設定より優先）
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,
}

/// 統合処理のオプション（設定より優先）
#[derive(clap::Args, Clone, Debug, Default)]
pub struct CombineArgs {
    /// 重複監査の範囲 (cumulative/last-snapshot)
    #[arg(long)]
    pub duplicate_audit: Option<DuplicateAudit>,

    /// 関連度上限の適用方法 (per-keyword/cumulative)
    #[arg(long)]
    pub cap_policy: Option<CapPolicy>,

    /// キーワードあたりの上限件数
    #[arg(long)]
    pub relevance_cap: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 正規化済みファイルを統合（重複除去・関連度上限）
    Combine {
        /// 対象ソース（複数指定可、省略時は全ソース）
        #[arg(short, long)]
        source: Vec<String>,

        #[command(flatten)]
        options: CombineArgs,
    },

    /// キーワード別ファイルを正規化して上書き（再実行しても安全）
    Format {
        /// 対象ソース（複数指定可、省略時は全ソース）
        #[arg(short, long)]
        source: Vec<String>,

        /// フルテキストとみなす最小ページ数
        #[arg(long)]
        min_pages: Option<i64>,
    },

    /// 生データを連結して {SOURCE}-original.csv を出力
    Original {
        /// 対象ソース（複数指定可、省略時は全ソース）
        #[arg(short, long)]
        source: Vec<String>,
    },

    /// original → format → combine を一括実行（生データのスナップショットは正規化前に取る）
    Run {
        /// 対象ソース（複数指定可、省略時は全ソース）
        #[arg(short, long)]
        source: Vec<String>,

        /// フルテキストとみなす最小ページ数
        #[arg(long)]
        min_pages: Option<i64>,

        #[command(flatten)]
        options: CombineArgs,
    },

    /// 入力ファイルの事前チェック（書き込みなし）
    Check {
        /// 対象ソース（複数指定可、省略時は全ソース）
        #[arg(short, long)]
        source: Vec<String>,
    },

    /// 設定を表示/初期化
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 既定の設定ファイルを書き出す（--config 指定時はそのパス）
        #[arg(long)]
        init: bool,
    },
}
