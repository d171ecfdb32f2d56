//! 判定者IDの匿名化

use std::collections::HashMap;

/// 判定者ID → `judge{n}` の対応表。n は初出順（1 始まり）。
///
/// 変換 1 回ごとに新しく作り、実行をまたいで共有しない。
#[derive(Debug, Default)]
pub struct JudgeRegistry {
    aliases: HashMap<String, usize>,
    order: Vec<String>,
}

impl JudgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias_for(&mut self, judge_id: &str) -> String {
        let n = match self.aliases.get(judge_id) {
            Some(&n) => n,
            None => {
                self.order.push(judge_id.to_owned());
                let n = self.order.len();
                self.aliases.insert(judge_id.to_owned(), n);
                n
            }
        };
        format!("judge{n}")
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 登録順に (元ID, 別名) を返す
    pub fn iter(&self) -> impl Iterator<Item = (&str, String)> {
        self.order.iter().enumerate().map(|(i, id)| (id.as_str(), format!("judge{}", i + 1)))
    }
}
