//! 評価値（Value）

use super::MAX_PLY;

/// 評価値
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Value(i32);

impl Value {
    /// ゼロ
    pub const ZERO: Value = Value(0);
    /// 引き分け
    pub const DRAW: Value = Value(0);
    /// 詰み（勝ち側の最大スコア）
    pub const MATE: Value = Value(32000);
    /// 無限大
    pub const INFINITE: Value = Value(32001);
    /// 無効値
    pub const NONE: Value = Value(32002);

    /// 最大探索深度内での詰みスコア
    pub const MATE_IN_MAX_PLY: Value = Value(Self::MATE.0 - MAX_PLY as i32);
    /// 最大探索深度内での詰まされスコア
    pub const MATED_IN_MAX_PLY: Value = Value(-Self::MATE_IN_MAX_PLY.0);

    /// 優等局面・連続王手の千日手による勝ち（詰みとは区別する）
    pub const WIN: Value = Value(30000);
    /// 勝ち扱いスコアの下限
    pub const WIN_IN_MAX_PLY: Value = Value(Self::WIN.0 - MAX_PLY as i32);

    #[inline]
    pub const fn new(v: i32) -> Value {
        Value(v)
    }

    /// ply手で詰ますスコア
    #[inline]
    pub const fn mate_in(ply: i32) -> Value {
        Value(Self::MATE.0 - ply)
    }

    /// ply手で詰まされるスコア
    #[inline]
    pub const fn mated_in(ply: i32) -> Value {
        Value(-Self::MATE.0 + ply)
    }

    /// ply 時点で確定した勝ち（詰み以外）
    #[inline]
    pub const fn win_in(ply: i32) -> Value {
        Value(Self::WIN.0 - ply)
    }

    /// ply 時点で確定した負け（詰み以外）
    #[inline]
    pub const fn lose_in(ply: i32) -> Value {
        Value(-Self::WIN.0 + ply)
    }

    /// 勝ちスコア（詰み）かどうか
    #[inline]
    pub const fn is_win(self) -> bool {
        self.0 >= Self::MATE_IN_MAX_PLY.0 && self.0 <= Self::MATE.0
    }

    /// 負けスコア（詰み）かどうか
    #[inline]
    pub const fn is_loss(self) -> bool {
        self.0 <= Self::MATED_IN_MAX_PLY.0 && self.0 >= -Self::MATE.0
    }

    /// 詰みスコア（勝ちまたは負け）かどうか
    #[inline]
    pub const fn is_mate_score(self) -> bool {
        self.is_win() || self.is_loss()
    }

    /// 詰み・優等局面を含む決着スコアかどうか
    #[inline]
    pub const fn is_decisive(self) -> bool {
        self.0 >= Self::WIN_IN_MAX_PLY.0 || self.0 <= -Self::WIN_IN_MAX_PLY.0
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// 詰み手数を取得（詰みスコアの場合のみ有効）
    #[inline]
    pub const fn mate_ply(self) -> i32 {
        if self.is_win() {
            Self::MATE.0 - self.0
        } else if self.is_loss() {
            self.0 + Self::MATE.0
        } else {
            0
        }
    }

    /// 置換表格納用に ply を補正（ルートからの距離 → そのノードからの距離）
    #[inline]
    pub const fn to_tt(self, ply: i32) -> Value {
        if self.is_win() {
            Value(self.0 + ply)
        } else if self.is_loss() {
            Value(self.0 - ply)
        } else {
            self
        }
    }

    /// 置換表からの読み出し時に ply を補正
    #[inline]
    pub const fn from_tt(self, ply: i32) -> Value {
        if self.is_win() {
            Value(self.0 - ply)
        } else if self.is_loss() {
            Value(self.0 + ply)
        } else {
            self
        }
    }
}

impl std::ops::Neg for Value {
    type Output = Value;

    #[inline]
    fn neg(self) -> Value {
        Value(-self.0)
    }
}

impl std::ops::Add<i32> for Value {
    type Output = Value;

    #[inline]
    fn add(self, rhs: i32) -> Value {
        Value(self.0 + rhs)
    }
}

impl std::ops::Sub<i32> for Value {
    type Output = Value;

    #[inline]
    fn sub(self, rhs: i32) -> Value {
        Value(self.0 - rhs)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_win() {
            write!(f, "mate {}", self.mate_ply())
        } else if self.is_loss() {
            write!(f, "mate -{}", self.mate_ply())
        } else {
            write!(f, "cp {}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mate_scores() {
        assert!(Value::mate_in(3).is_win());
        assert!(Value::mated_in(4).is_loss());
        assert_eq!(Value::mate_in(3).mate_ply(), 3);
        assert!(!Value::new(2000).is_mate_score());
        assert!(!Value::INFINITE.is_win());
    }

    #[test]
    fn test_win_is_not_mate() {
        let v = Value::win_in(5);
        assert!(!v.is_mate_score());
        assert!(v.is_decisive());
        assert!((-v).is_decisive());
        assert!(v < Value::MATE_IN_MAX_PLY);
    }

    #[test]
    fn test_tt_adjustment() {
        let v = Value::mate_in(7);
        assert_eq!(v.to_tt(4).from_tt(4), v);
        // 4手目で格納した「7手で詰み」は、そのノードからは3手詰み
        assert_eq!(v.to_tt(4), Value::mate_in(3));
        assert_eq!(Value::new(123).to_tt(9), Value::new(123));
    }
}
