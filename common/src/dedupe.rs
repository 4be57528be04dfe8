//! キーワード横断の重複除去と関連度上限
//!
//! キーワードごとの検索結果を固定順に追加していき、追加のたびに
//! 1. 重複キー（既定は (title, author)）の重複を検出して監査用に記録
//! 2. 先に現れた行を残して重複を削除
//! 3. 関連度上限を超えた行を削除
//! を行う。入力の行順を関連度順とみなし、並べ替えは一切しない。

use crate::columns;
use crate::error::Result;
use crate::table::{ResultTable, Row};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// キーワードあたりの上限件数
pub const DEFAULT_RELEVANCE_CAP: usize = 50;

/// 重複監査ファイルに残す範囲
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateAudit {
    /// 全キーワードで見つかった重複をすべて記録
    #[default]
    Cumulative,
    /// 最後のキーワード追加時に見つかった重複のみ（旧スクリプト互換）
    LastSnapshot,
}

/// 関連度上限の適用方法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapPolicy {
    /// 各キーワードの寄与を上限件数までに制限
    #[default]
    PerKeyword,
    /// 全体を `上限 × 処理済みキーワード数` で切り詰める（旧スクリプト互換）
    Cumulative,
}

impl std::str::FromStr for DuplicateAudit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "cumulative" | "all" => Ok(DuplicateAudit::Cumulative),
            "last_snapshot" | "last" => Ok(DuplicateAudit::LastSnapshot),
            _ => Err(format!("Unknown duplicate audit: {}. Use cumulative or last-snapshot", s)),
        }
    }
}

impl std::fmt::Display for DuplicateAudit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateAudit::Cumulative => write!(f, "cumulative"),
            DuplicateAudit::LastSnapshot => write!(f, "last-snapshot"),
        }
    }
}

impl std::str::FromStr for CapPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_keyword" | "keyword" => Ok(CapPolicy::PerKeyword),
            "cumulative" => Ok(CapPolicy::Cumulative),
            _ => Err(format!("Unknown cap policy: {}. Use per-keyword or cumulative", s)),
        }
    }
}

impl std::fmt::Display for CapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapPolicy::PerKeyword => write!(f, "per-keyword"),
            CapPolicy::Cumulative => write!(f, "cumulative"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    pub relevance_cap: usize,
    pub duplicate_audit: DuplicateAudit,
    pub cap_policy: CapPolicy,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            relevance_cap: DEFAULT_RELEVANCE_CAP,
            duplicate_audit: DuplicateAudit::default(),
            cap_policy: CapPolicy::default(),
        }
    }
}

/// 1キーワード分の処理結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordContribution {
    pub keyword: String,
    /// 入力行数
    pub input_rows: usize,
    /// 重複として削除した行数
    pub duplicates: usize,
    /// 関連度上限で削除した行数
    pub over_cap: usize,
    /// 統合結果に残った行数
    pub kept: usize,
}

/// 統合結果
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub combined: ResultTable,
    /// 重複監査（`dedupe_status` 列付き）
    pub duplicates: ResultTable,
    pub over_cap: ResultTable,
    pub contributions: Vec<KeywordContribution>,
}

type DedupeKey = Vec<String>;

/// 重複監査の `dedupe_status` の値
pub mod status {
    /// 統合結果に残った行
    pub const KEPT: &str = "kept";
    /// 重複として削除した行
    pub const DROPPED: &str = "dropped";
    /// 重複の残り側だったが関連度上限で削除された行
    pub const OVER_CAP: &str = "over_cap";
}

/// 1回の追加で見つかった重複グループ
struct DuplicateGroup {
    survivor: usize,
    dropped: Vec<Row>,
}

/// 監査に `kept` として書いた行。上限適用後に確定する
struct PendingSurvivor {
    audit_row: usize,
    main_row: usize,
    key: DedupeKey,
}

pub struct Aggregator {
    options: AggregateOptions,
    /// 重複判定に使うカラム
    key_columns: Vec<String>,
    main: ResultTable,
    /// 重複キー → main内の行位置
    seen: HashMap<DedupeKey, usize>,
    duplicates: ResultTable,
    /// 監査に `kept` として記録済みのキー
    audited_survivors: HashSet<DedupeKey>,
    over_cap: ResultTable,
    contributions: Vec<KeywordContribution>,
}

/// 既定の重複判定キー `(title, author)`
pub fn default_dedupe_key() -> Vec<String> {
    vec![columns::TITLE.to_string(), columns::AUTHOR.to_string()]
}

impl Aggregator {
    pub fn new(options: AggregateOptions) -> Self {
        Self {
            options,
            key_columns: default_dedupe_key(),
            main: ResultTable::default(),
            seen: HashMap::new(),
            duplicates: ResultTable::default(),
            audited_survivors: HashSet::new(),
            over_cap: ResultTable::default(),
            contributions: Vec::new(),
        }
    }

    /// 重複判定キーを差し替える。空なら既定のまま
    pub fn with_dedupe_key(mut self, key_columns: Vec<String>) -> Self {
        if !key_columns.is_empty() {
            self.key_columns = key_columns;
        }
        self
    }

    pub fn dedupe_key(&self) -> &[String] {
        &self.key_columns
    }

    pub fn combined(&self) -> &ResultTable {
        &self.main
    }

    /// 1キーワード分の検索結果を追加する
    ///
    /// `title` と `author` 列、および重複判定キーの列が必須。
    /// `keyword` 列は引数の値で上書きする。
    pub fn push_keyword(&mut self, keyword: &str, mut table: ResultTable) -> Result<KeywordContribution> {
        table.require_column(columns::TITLE)?;
        table.require_column(columns::AUTHOR)?;
        for column in &self.key_columns {
            table.require_column(column)?;
        }
        table.set_column(columns::KEYWORD, keyword);

        let input_rows = table.len();
        let offset = self.main.len();
        self.main.append(table);

        let key_idx = self
            .key_columns
            .iter()
            .map(|c| self.main.require_column(c))
            .collect::<Result<Vec<usize>>>()?;

        // 追加分を取り出し、初出の行だけを戻す
        let incoming = self.main.split_off(offset);
        let mut groups: Vec<DuplicateGroup> = Vec::new();
        let mut group_of: HashMap<usize, usize> = HashMap::new();
        let mut duplicates = 0;

        for row in incoming.into_rows() {
            let key = row_key(&row, &key_idx);
            match self.seen.get(&key) {
                Some(&survivor) => {
                    duplicates += 1;
                    let g = *group_of.entry(survivor).or_insert_with(|| {
                        groups.push(DuplicateGroup {
                            survivor,
                            dropped: Vec::new(),
                        });
                        groups.len() - 1
                    });
                    groups[g].dropped.push(row);
                }
                None => {
                    self.seen.insert(key, self.main.len());
                    self.main.push_row(row);
                }
            }
        }

        let pending = self.record_duplicates(groups, &key_idx);

        let over_cap = self.apply_cap(offset, &key_idx);
        self.settle_survivors(pending);
        let kept = self.main.len() - offset;

        let contribution = KeywordContribution {
            keyword: keyword.to_string(),
            input_rows,
            duplicates,
            over_cap,
            kept,
        };
        self.contributions.push(contribution.clone());
        Ok(contribution)
    }

    fn record_duplicates(&mut self, mut groups: Vec<DuplicateGroup>, key_idx: &[usize]) -> Vec<PendingSurvivor> {
        if self.options.duplicate_audit == DuplicateAudit::LastSnapshot {
            self.duplicates = ResultTable::default();
            self.audited_survivors.clear();
        }

        groups.sort_by_key(|g| g.survivor);

        let mut headers = self.main.headers().to_vec();
        headers.push(columns::DEDUPE_STATUS.to_string());
        let mut audit = ResultTable::new(headers);
        let audit_offset = self.duplicates.len();
        let mut pending = Vec::new();

        for group in groups {
            let survivor = &self.main.rows()[group.survivor];
            let key = row_key(survivor, key_idx);
            if self.audited_survivors.insert(key.clone()) {
                pending.push(PendingSurvivor {
                    audit_row: audit_offset + audit.len(),
                    main_row: group.survivor,
                    key,
                });
                audit.push_row(with_status(survivor.clone(), status::KEPT));
            }
            for row in group.dropped {
                audit.push_row(with_status(row, status::DROPPED));
            }
        }

        self.duplicates.append(audit);
        pending
    }

    /// 関連度上限を適用し、削除した件数を返す
    fn apply_cap(&mut self, offset: usize, key_idx: &[usize]) -> usize {
        let cap = self.options.relevance_cap;
        let limit = match self.options.cap_policy {
            CapPolicy::PerKeyword => offset + cap,
            CapPolicy::Cumulative => cap * (self.contributions.len() + 1),
        };
        if self.main.len() <= limit {
            return 0;
        }

        let excess = self.main.split_off(limit);
        for row in excess.rows() {
            let key = row_key(row, key_idx);
            self.seen.remove(&key);
            self.audited_survivors.remove(&key);
        }
        let removed = excess.len();
        self.over_cap.append(excess);
        removed
    }

    /// 上限で削除された重複の残り側を `over_cap` に付け替える
    fn settle_survivors(&mut self, pending: Vec<PendingSurvivor>) {
        for survivor in pending {
            if survivor.main_row >= self.main.len() {
                self.duplicates
                    .set(survivor.audit_row, columns::DEDUPE_STATUS, status::OVER_CAP);
                self.audited_survivors.remove(&survivor.key);
            }
        }
    }

    pub fn finish(self) -> AggregateOutcome {
        AggregateOutcome {
            combined: self.main,
            duplicates: self.duplicates,
            over_cap: self.over_cap,
            contributions: self.contributions,
        }
    }
}

fn row_key(row: &[String], key_idx: &[usize]) -> DedupeKey {
    key_idx.iter().map(|&i| row[i].clone()).collect()
}

fn with_status(mut row: Row, status: &str) -> Row {
    row.push(status.to_string());
    row
}
