//! 探索スタックの1手分（SearchNode）

use smallvec::SmallVec;

use super::movepicker::MovePicker;
use crate::eval::Evaluation;
use crate::types::Move;

/// 読み筋
pub type PvLine = SmallVec<[Move; 16]>;

/// 取る手のキラー（成功回数つき）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CaptureSlot {
    pub mv: Move,
    pub count: u32,
}

/// Tree の各 ply の状態
///
/// 手を進めるたびに `enter` で再初期化する。キラーと取る手のスロットは
/// 同じ ply の兄弟ノード間で引き継ぐ。
pub(crate) struct Node {
    pub picker: MovePicker,
    pub killers: [Move; 2],
    pub capture_slots: [CaptureSlot; 2],
    /// このノード以下の読み筋（先頭がこのノードで指す手）
    pub pv: PvLine,
    /// 先手から見た評価値（差分更新）
    pub eval: Evaluation,
    /// singular extension の確認で除外する手
    pub excluded: Move,
    /// SHEK や中断など経路に依存する結果で、置換表に格納できない
    pub historical: bool,
    pub in_check: bool,
    /// このノードに至った手（ルートでは NONE、パスでは NULL）
    pub mv: Move,
    /// パスの後の部分木
    pub null: bool,
}

impl Node {
    pub fn new() -> Node {
        Node {
            picker: MovePicker::new(),
            killers: [Move::NONE; 2],
            capture_slots: [CaptureSlot::default(); 2],
            pv: PvLine::new(),
            eval: Evaluation::default(),
            excluded: Move::NONE,
            historical: false,
            in_check: false,
            mv: Move::NONE,
            null: false,
        }
    }

    /// ノードに入ったときの初期化
    pub fn enter(&mut self, mv: Move, eval: Evaluation, in_check: bool, null: bool) {
        self.pv.clear();
        self.eval = eval;
        self.excluded = Move::NONE;
        self.historical = false;
        self.in_check = in_check;
        self.mv = mv;
        self.null = null;
    }

    /// キラーと取る手のスロットを消す
    pub fn clear_heuristics(&mut self) {
        self.killers = [Move::NONE; 2];
        self.capture_slots = [CaptureSlot::default(); 2];
    }

    /// 静かな手の beta cutoff を記録する
    pub fn update_killers(&mut self, mv: Move) {
        if self.killers[0] != mv {
            self.killers[1] = self.killers[0];
            self.killers[0] = mv;
        }
    }

    /// 取る手の beta cutoff を記録する
    ///
    /// 既にあれば回数を増やし、なければ回数の少ない方を置き換える。
    pub fn update_capture_slots(&mut self, mv: Move) {
        if let Some(slot) = self.capture_slots.iter_mut().find(|s| s.mv == mv) {
            slot.count += 1;
        } else {
            let weaker = usize::from(self.capture_slots[1].count <= self.capture_slots[0].count);
            self.capture_slots[weaker] = CaptureSlot { mv, count: 1 };
        }
        if self.capture_slots[1].count > self.capture_slots[0].count {
            self.capture_slots.swap(0, 1);
        }
    }

    pub fn capture_slot_moves(&self) -> [Move; 2] {
        [self.capture_slots[0].mv, self.capture_slots[1].mv]
    }

    /// 読み筋を mv + 子の読み筋にする
    pub fn set_pv(&mut self, mv: Move, child: &[Move]) {
        self.pv.clear();
        self.pv.push(mv);
        self.pv.extend_from_slice(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PieceType, Square};

    fn mv(file: u8) -> Move {
        Move::new_move(PieceType::Silver, Square::new(file, 8), Square::new(file, 7), false, None)
    }

    #[test]
    fn test_killers_shift() {
        let mut node = Node::new();
        node.update_killers(mv(1));
        node.update_killers(mv(1));
        assert_eq!(node.killers, [mv(1), Move::NONE]);
        node.update_killers(mv(2));
        assert_eq!(node.killers, [mv(2), mv(1)]);
        assert!(node.killers.contains(&mv(1)));
        node.clear_heuristics();
        assert!(!node.killers.contains(&mv(1)));
    }

    #[test]
    fn test_capture_slots_keep_frequent_moves() {
        let mut node = Node::new();
        node.update_capture_slots(mv(1));
        node.update_capture_slots(mv(2));
        node.update_capture_slots(mv(2));
        assert_eq!(node.capture_slot_moves(), [mv(2), mv(1)]);
        // 回数の少ない方が置き換わる
        node.update_capture_slots(mv(3));
        assert_eq!(node.capture_slot_moves(), [mv(2), mv(3)]);
        assert_eq!(node.capture_slots[0].count, 2);
    }

    #[test]
    fn test_enter_keeps_heuristics() {
        let mut node = Node::new();
        node.update_killers(mv(4));
        node.set_pv(mv(4), &[mv(5)]);
        node.historical = true;
        node.enter(mv(6), Evaluation::default(), true, false);
        assert!(node.pv.is_empty());
        assert!(!node.historical);
        assert!(node.in_check);
        assert_eq!(node.killers[0], mv(4));
    }
}
