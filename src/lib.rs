//! litreview: デジタルライブラリ検索結果の統合ツール
//!
//! ACM / IEEE のCSVエクスポートを正規化し、フルテキスト以外と
//! 関連度の低い結果を除外、キーワード横断で重複を取り除いて
//! ソースごとの統合結果と除外データの監査ファイルを出力する。

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod scanner;
