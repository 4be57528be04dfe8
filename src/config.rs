use crate::error::{LitReviewError, Result};
use litreview_common::{
    AggregateOptions, CapPolicy, DuplicateAudit, SourceProfile, DEFAULT_MIN_PAGES,
};
use litreview_common::dedupe::DEFAULT_RELEVANCE_CAP;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// カレントディレクトリの設定ファイル名（ホームの設定より優先）
pub const LOCAL_CONFIG_FILE: &str = "litreview.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// keywords.csv と検索結果CSVの置き場所
    pub searches_dir: PathBuf,
    /// 出力先
    pub output_dir: PathBuf,
    /// フルテキストとみなす最小ページ数
    pub min_pages: i64,
    /// キーワードあたりの上限件数
    pub relevance_cap: usize,
    pub duplicate_audit: DuplicateAudit,
    pub cap_policy: CapPolicy,
    /// 処理するソース（この順に処理）
    pub sources: Vec<SourceProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            searches_dir: PathBuf::from("searches"),
            output_dir: PathBuf::from("output"),
            min_pages: DEFAULT_MIN_PAGES,
            relevance_cap: DEFAULT_RELEVANCE_CAP,
            duplicate_audit: DuplicateAudit::default(),
            cap_policy: CapPolicy::default(),
            sources: SourceProfile::builtin(),
        }
    }
}

impl Config {
    /// `./litreview.json` → `~/.config/litreview/config.json` → 既定値 の順で読み込む
    pub fn load() -> Result<Self> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Self::load_from(&local);
        }

        match Self::config_path() {
            Ok(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LitReviewError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| LitReviewError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("litreview").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.relevance_cap == 0 {
            return Err(LitReviewError::Config("relevance_cap は1以上にしてください".into()));
        }
        if self.sources.is_empty() {
            return Err(LitReviewError::Config("sources が空です".into()));
        }

        let mut ids = HashSet::new();
        for profile in &self.sources {
            if profile.id.trim().is_empty() {
                return Err(LitReviewError::Config("ソースIDが空です".into()));
            }
            if !ids.insert(profile.id.to_uppercase()) {
                return Err(LitReviewError::Config(format!("ソースIDが重複しています: {}", profile.id)));
            }
        }
        Ok(())
    }

    /// IDでソースを取得（大文字小文字は区別しない）
    pub fn source(&self, id: &str) -> Result<&SourceProfile> {
        self.sources
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| LitReviewError::UnknownSource(id.to_string()))
    }

    /// 指定されたソース。空なら設定の全ソース
    pub fn select_sources(&self, ids: &[String]) -> Result<Vec<&SourceProfile>> {
        if ids.is_empty() {
            return Ok(self.sources.iter().collect());
        }
        ids.iter().map(|id| self.source(id)).collect()
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            relevance_cap: self.relevance_cap,
            duplicate_audit: self.duplicate_audit,
            cap_policy: self.cap_policy,
        }
    }
}
