//! 境界値種別（Bound）

use super::Value;

/// 境界値種別（置換表に格納する値の種類）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Bound {
    /// なし
    #[default]
    None = 0,
    /// 上界（fail-low: 真の値はこれ以下）
    Upper = 1,
    /// 下界（fail-high: 真の値はこれ以上）
    Lower = 2,
    /// 正確な値
    Exact = 3,
}

impl Bound {
    /// 探索窓に対して値を分類する
    #[inline]
    pub const fn classify(value: Value, alpha: Value, beta: Value) -> Bound {
        if value.raw() >= beta.raw() {
            Bound::Lower
        } else if value.raw() <= alpha.raw() {
            Bound::Upper
        } else {
            Bound::Exact
        }
    }

    /// 窓 [alpha, beta] に対してこの境界値で枝刈りできるか
    #[inline]
    pub const fn can_cutoff(self, value: Value, alpha: Value, beta: Value) -> bool {
        match self {
            Bound::Exact => true,
            Bound::Lower => value.raw() >= beta.raw(),
            Bound::Upper => value.raw() <= alpha.raw(),
            Bound::None => false,
        }
    }

    #[inline]
    pub const fn is_lower(self) -> bool {
        matches!(self, Bound::Lower | Bound::Exact)
    }

    #[inline]
    pub const fn is_upper(self) -> bool {
        matches!(self, Bound::Upper | Bound::Exact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_classify() {
        let (alpha, beta) = (Value::new(-50), Value::new(50));
        assert_eq!(Bound::classify(Value::new(60), alpha, beta), Bound::Lower);
        assert_eq!(Bound::classify(Value::new(-50), alpha, beta), Bound::Upper);
        assert_eq!(Bound::classify(Value::new(0), alpha, beta), Bound::Exact);
    }

    #[test]
    fn test_bound_can_cutoff() {
        let (alpha, beta) = (Value::new(-50), Value::new(50));
        assert!(Bound::Exact.can_cutoff(Value::new(0), alpha, beta));
        assert!(Bound::Lower.can_cutoff(Value::new(50), alpha, beta));
        assert!(!Bound::Lower.can_cutoff(Value::new(49), alpha, beta));
        assert!(Bound::Upper.can_cutoff(Value::new(-60), alpha, beta));
        assert!(!Bound::None.can_cutoff(Value::new(0), alpha, beta));
    }
}
