//! キーワードグリッド
//!
//! 検索に使った4×4のキーワード表。グリッド位置 (row, col) が
//! 検索結果ファイル `{SOURCE}0{row+1}-{col+1}.csv` に対応する。

use crate::error::{Error, Result};
use std::io::Read;

/// グリッドの一辺
pub const GRID_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordGrid {
    /// 行優先で GRID_SIZE × GRID_SIZE 個
    cells: Vec<String>,
}

/// グリッドの1セル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell<'a> {
    /// 0始まりの行
    pub row: usize,
    /// 0始まりの列
    pub col: usize,
    pub keyword: &'a str,
}

impl GridCell<'_> {
    /// このセルに対応する検索結果ファイル名
    pub fn file_name(&self, source: &str) -> String {
        grid_file_name(source, self.row, self.col)
    }
}

/// `{SOURCE}0{row+1}-{col+1}.csv`
pub fn grid_file_name(source: &str, row: usize, col: usize) -> String {
    format!("{}0{}-{}.csv", source, row + 1, col + 1)
}

impl KeywordGrid {
    /// 行ごとのキーワードから作成。余分な行・列は無視する
    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Result<Self> {
        if rows.len() < GRID_SIZE {
            return Err(Error::InvalidKeywordGrid(format!(
                "expected {} keyword rows, found {}",
                GRID_SIZE,
                rows.len()
            )));
        }

        let mut cells = Vec::with_capacity(GRID_SIZE * GRID_SIZE);
        for (r, row) in rows.iter().take(GRID_SIZE).enumerate() {
            for c in 0..GRID_SIZE {
                let keyword = row.get(c).map(|k| k.as_ref().trim()).unwrap_or("");
                if keyword.is_empty() {
                    return Err(Error::InvalidKeywordGrid(format!(
                        "missing keyword at row {}, column {}",
                        r + 1,
                        c + 1
                    )));
                }
                cells.push(keyword.to_string());
            }
        }

        Ok(Self { cells })
    }

    /// keywords.csv の内容から作成
    ///
    /// 1行目はヘッダ行でキーワードとしては扱わない。
    /// 5列目以降と5行目以降は読まずに無視する。
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut rows: Vec<Vec<String>> = Vec::with_capacity(GRID_SIZE);
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().take(GRID_SIZE).map(str::to_string).collect());
            if rows.len() == GRID_SIZE {
                break;
            }
        }
        Self::from_rows(&rows[..])
    }

    pub fn keyword(&self, row: usize, col: usize) -> &str {
        &self.cells[row * GRID_SIZE + col]
    }

    /// 全セルを (row, col) の固定順で返す
    pub fn cells(&self) -> impl Iterator<Item = GridCell<'_>> {
        self.cells.iter().enumerate().map(|(i, keyword)| GridCell {
            row: i / GRID_SIZE,
            col: i % GRID_SIZE,
            keyword: keyword.as_str(),
        })
    }
}
