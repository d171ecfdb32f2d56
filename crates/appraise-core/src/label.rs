//! 比較ラベル（`a>b`, `a<b`, `a+c=b`）の表現と正規化
//!
//! ラベルは 2 つのオペランド（[`SystemSet`]）と関係（[`Relation`]）の組で保持する。
//! 文字列表現は表示と [`normalize_label`] の入力にのみ使う。

use std::fmt;

use crate::error::LabelError;

/// タイ・グループの区切り文字
pub const TIE_GROUP_SEPARATOR: char = '+';

/// 関係記号の判定順。最初に見つかった記号で分割する。
const RELATION_CHECK_ORDER: [Relation; 3] =
    [Relation::GreaterThan, Relation::LessThan, Relation::Tie];

/// システムIDに含めてはならない文字
const RESERVED_CHARS: [char; 4] = ['>', '<', '=', TIE_GROUP_SEPARATOR];

/// 比較結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// 左が良い（順位の数値が小さい）
    GreaterThan,
    /// 左が悪い
    LessThan,
    /// 同順位
    Tie,
}

impl Relation {
    pub fn symbol(self) -> char {
        match self {
            Relation::GreaterThan => '>',
            Relation::LessThan => '<',
            Relation::Tie => '=',
        }
    }

    pub fn is_tie(self) -> bool {
        self == Relation::Tie
    }

    /// 順位（小さいほど良い）の比較から関係を求める
    pub fn from_ranks(left: i64, right: i64) -> Self {
        match left.cmp(&right) {
            std::cmp::Ordering::Less => Relation::GreaterThan,
            std::cmp::Ordering::Greater => Relation::LessThan,
            std::cmp::Ordering::Equal => Relation::Tie,
        }
    }
}

/// ラベルの片側オペランド。`+` で連結された 1 個以上のシステムID。
///
/// メンバーは書かれた順序のまま保持する（ラベル同一性の判定に使うため）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemSet {
    members: Vec<String>,
}

impl SystemSet {
    /// `a` や `a+b` を読み込む。空のメンバーや予約文字を含むメンバーはエラー。
    pub fn parse(text: &str) -> Result<Self, LabelError> {
        let mut members = Vec::new();
        for member in text.split(TIE_GROUP_SEPARATOR) {
            let member = member.trim();
            if member.is_empty() {
                return Err(LabelError::EmptySystem(text.to_owned()));
            }
            if let Some(ch) = member.chars().find(|c| RESERVED_CHARS.contains(c)) {
                return Err(LabelError::ReservedCharacter {
                    id: member.to_owned(),
                    ch,
                });
            }
            members.push(member.to_owned());
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// メンバーを辞書順に並べて `+` で連結した正規形
    pub fn normalized(&self) -> String {
        let mut sorted: Vec<&str> = self.members.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.join("+")
    }
}

impl fmt::Display for SystemSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.members.join("+"))
    }
}

/// ラベルの参加システム（方向を捨てた正規形、辞書順の 2 要素）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Participants([String; 2]);

impl Participants {
    fn from_operands(mut first: String, mut second: String) -> Self {
        if second < first {
            std::mem::swap(&mut first, &mut second);
        }
        Self([first, second])
    }

    pub fn first(&self) -> &str {
        &self.0[0]
    }

    pub fn second(&self) -> &str {
        &self.0[1]
    }
}

/// 1 件の三値比較ラベル
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub left: SystemSet,
    pub relation: Relation,
    pub right: SystemSet,
}

impl Label {
    pub fn new(left: SystemSet, relation: Relation, right: SystemSet) -> Self {
        Self {
            left,
            relation,
            right,
        }
    }

    /// 文字列表現を読み込む。記号は `>`, `<`, `=` の順に探す。
    pub fn parse(text: &str) -> Result<Self, LabelError> {
        let (relation, (left, right)) = RELATION_CHECK_ORDER
            .iter()
            .find_map(|rel| text.split_once(rel.symbol()).map(|parts| (*rel, parts)))
            .ok_or_else(|| LabelError::MissingRelation(text.to_owned()))?;
        Ok(Self::new(SystemSet::parse(left)?, relation, SystemSet::parse(right)?))
    }

    pub fn is_tie(&self) -> bool {
        self.relation.is_tie()
    }

    pub fn participants(&self) -> Participants {
        Participants::from_operands(self.left.normalized(), self.right.normalized())
    }

    /// 参加システムが一致するか（比較可能か）
    pub fn is_comparable_with(&self, other: &Label) -> bool {
        self.participants() == other.participants()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.left, self.relation.symbol(), self.right)
    }
}

/// ラベル文字列を参加システムの正規形に変換する
pub fn normalize_label(text: &str) -> Result<Participants, LabelError> {
    Label::parse(text).map(|label| label.participants())
}
