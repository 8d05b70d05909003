//! 局面（Position）本体

use std::sync::Arc;

use crate::bitboard::{AttackTables, Bitboard};
use crate::types::{Color, Hand, Move, Piece, PieceType, Square};

/// do_move で退避する状態
#[derive(Clone, Copy, Debug)]
pub(super) struct StateInfo {
    /// 指した手（取った駒種を埋めたもの）
    pub mv: Move,
    /// 取った駒
    pub captured: Piece,
    pub board_key: u64,
    pub hand_key: u64,
    pub checkers: Bitboard,
}

/// 局面
#[derive(Clone)]
pub struct Position {
    pub(super) tables: Arc<AttackTables>,
    pub(super) board: [Piece; Square::NUM],
    pub(super) by_color: [Bitboard; Color::NUM],
    pub(super) by_type: [Bitboard; PieceType::NUM],
    pub(super) hands: [Hand; Color::NUM],
    pub(super) side_to_move: Color,
    pub(super) king_square: [Option<Square>; Color::NUM],
    /// 盤上の駒のみのキー（手番を含まない）
    pub(super) board_key: u64,
    /// 手駒のキー（加算型）
    pub(super) hand_key: u64,
    pub(super) checkers: Bitboard,
    pub(super) game_ply: u32,
    pub(super) history: Vec<StateInfo>,
}

impl Position {
    /// 空の局面
    pub fn empty(tables: Arc<AttackTables>) -> Position {
        Position {
            tables,
            board: [Piece::NONE; Square::NUM],
            by_color: [Bitboard::EMPTY; Color::NUM],
            by_type: [Bitboard::EMPTY; PieceType::NUM],
            hands: [Hand::EMPTY; Color::NUM],
            side_to_move: Color::Black,
            king_square: [None; Color::NUM],
            board_key: 0,
            hand_key: 0,
            checkers: Bitboard::EMPTY,
            game_ply: 1,
            history: Vec::with_capacity(256),
        }
    }

    // =========================================================================
    // 参照
    // =========================================================================

    #[inline]
    pub fn tables(&self) -> &AttackTables {
        &self.tables
    }

    #[inline]
    pub fn shared_tables(&self) -> &Arc<AttackTables> {
        &self.tables
    }

    #[inline]
    pub fn piece_on(&self, sq: Square) -> Piece {
        self.board[sq.index()]
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.by_color[0] | self.by_color[1]
    }

    #[inline]
    pub fn pieces_c(&self, color: Color) -> Bitboard {
        self.by_color[color.index()]
    }

    #[inline]
    pub fn pieces_pt(&self, pt: PieceType) -> Bitboard {
        self.by_type[pt.index()]
    }

    #[inline]
    pub fn pieces(&self, color: Color, pt: PieceType) -> Bitboard {
        self.by_color[color.index()] & self.by_type[pt.index()]
    }

    /// 金と同じ動きの駒（金・と・成香・成桂・成銀）
    #[inline]
    pub fn golds(&self, color: Color) -> Bitboard {
        self.pieces_c(color)
            & (self.pieces_pt(PieceType::Gold)
                | self.pieces_pt(PieceType::ProPawn)
                | self.pieces_pt(PieceType::ProLance)
                | self.pieces_pt(PieceType::ProKnight)
                | self.pieces_pt(PieceType::ProSilver))
    }

    #[inline]
    pub fn hand(&self, color: Color) -> Hand {
        self.hands[color.index()]
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.king_square[color.index()]
    }

    /// 手番側に王手をかけている駒
    #[inline]
    pub fn checkers(&self) -> Bitboard {
        self.checkers
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        self.checkers.is_not_empty()
    }

    /// 局面のハッシュキー（盤面 + 手駒 + 手番）
    #[inline]
    pub fn key(&self) -> u64 {
        let side = match self.side_to_move {
            Color::Black => 0,
            Color::White => self.tables.zobrist.side,
        };
        self.board_key ^ self.hand_key ^ side
    }

    /// 盤上の駒のみのキー（手番を含まない）
    #[inline]
    pub fn board_key(&self) -> u64 {
        self.board_key
    }

    /// 手駒のみのキー
    #[inline]
    pub fn hand_key(&self) -> u64 {
        self.hand_key
    }

    #[inline]
    pub fn game_ply(&self) -> u32 {
        self.game_ply
    }

    /// 直前の指し手（取った駒種つき）
    #[inline]
    pub fn last_move(&self) -> Option<Move> {
        self.history.last().map(|st| st.mv)
    }

    // =========================================================================
    // 利き
    // =========================================================================

    /// color の駒で sq に利いているもの
    pub fn attackers_to(&self, color: Color, sq: Square, occupied: Bitboard) -> Bitboard {
        let t = &*self.tables;
        // color の駒が sq に利く ⇔ 相手側の同じ駒が sq から利く
        let them = !color;
        let kings = self.pieces_pt(PieceType::King);
        let silver_like = self.pieces_pt(PieceType::Silver) | kings | self.pieces_pt(PieceType::Dragon);
        let gold_like = self.by_type[PieceType::Gold.index()]
            | self.pieces_pt(PieceType::ProPawn)
            | self.pieces_pt(PieceType::ProLance)
            | self.pieces_pt(PieceType::ProKnight)
            | self.pieces_pt(PieceType::ProSilver)
            | kings
            | self.pieces_pt(PieceType::Horse);
        let bishops = self.pieces_pt(PieceType::Bishop) | self.pieces_pt(PieceType::Horse);
        let rooks = self.pieces_pt(PieceType::Rook) | self.pieces_pt(PieceType::Dragon);

        let attackers = (t.step_effect(them, PieceType::Pawn, sq) & self.pieces_pt(PieceType::Pawn))
            | (t.step_effect(them, PieceType::Knight, sq) & self.pieces_pt(PieceType::Knight))
            | (t.step_effect(them, PieceType::Silver, sq) & silver_like)
            | (t.step_effect(them, PieceType::Gold, sq) & gold_like)
            | (t.lance_effect(them, sq, occupied) & self.pieces_pt(PieceType::Lance))
            | (t.bishop_effect(sq, occupied) & bishops)
            | (t.rook_effect(sq, occupied) & rooks);
        attackers & self.pieces_c(color)
    }

    /// sq に利いている両陣営の駒
    #[inline]
    pub fn attackers_to_both(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        self.attackers_to(Color::Black, sq, occupied) | self.attackers_to(Color::White, sq, occupied)
    }

    fn compute_checkers(&self) -> Bitboard {
        match self.king_square(self.side_to_move) {
            Some(ksq) => self.attackers_to(!self.side_to_move, ksq, self.occupied()),
            None => Bitboard::EMPTY,
        }
    }

    pub(super) fn refresh_checkers(&mut self) {
        self.checkers = self.compute_checkers();
    }

    // =========================================================================
    // 駒の配置
    // =========================================================================

    pub(super) fn put_piece(&mut self, pc: Piece, sq: Square) {
        let Some(pt) = pc.piece_type() else {
            return;
        };
        self.board[sq.index()] = pc;
        self.by_color[pc.color().index()].set(sq);
        self.by_type[pt.index()].set(sq);
        self.board_key ^= self.tables.zobrist.psq(pc, sq);
        if pt == PieceType::King {
            self.king_square[pc.color().index()] = Some(sq);
        }
    }

    pub(super) fn remove_piece(&mut self, sq: Square) -> Piece {
        let pc = self.board[sq.index()];
        if let Some(pt) = pc.piece_type() {
            self.board[sq.index()] = Piece::NONE;
            self.by_color[pc.color().index()].clear(sq);
            self.by_type[pt.index()].clear(sq);
            self.board_key ^= self.tables.zobrist.psq(pc, sq);
        }
        pc
    }

    pub(super) fn add_hand(&mut self, color: Color, pt: PieceType) {
        self.hands[color.index()] = self.hands[color.index()].add(pt);
        self.hand_key = self.hand_key.wrapping_add(self.tables.zobrist.hand(color, pt));
    }

    pub(super) fn sub_hand(&mut self, color: Color, pt: PieceType) {
        self.hands[color.index()] = self.hands[color.index()].sub(pt);
        self.hand_key = self.hand_key.wrapping_sub(self.tables.zobrist.hand(color, pt));
    }

    // =========================================================================
    // 指し手の実行
    // =========================================================================

    /// 指し手を実行する
    ///
    /// 自玉を取られる手と打ち歩詰めは取り消して false を返す。
    /// 呼び出し側は疑似合法手（生成手または `is_pseudo_legal` 済みの手）を渡すこと。
    pub fn do_move(&mut self, mv: Move) -> bool {
        debug_assert!(mv.is_normal());
        let us = self.side_to_move;
        let them = !us;
        let to = mv.to();
        let mut state = StateInfo {
            mv,
            captured: Piece::NONE,
            board_key: self.board_key,
            hand_key: self.hand_key,
            checkers: self.checkers,
        };

        match mv.from() {
            None => {
                let pt = mv.piece_type();
                self.sub_hand(us, pt);
                self.put_piece(Piece::new(us, pt), to);
                state.mv = mv.with_captured(None);
            }
            Some(from) => {
                let captured = self.remove_piece(to);
                let captured_pt = captured.piece_type();
                if let Some(cpt) = captured_pt {
                    self.add_hand(us, cpt.unpromote());
                }
                let moved = self.remove_piece(from);
                let pt = moved.piece_type().unwrap_or(mv.piece_type());
                let after = if mv.is_promote() { pt.promote().unwrap_or(pt) } else { pt };
                self.put_piece(Piece::new(us, after), to);
                state.captured = captured;
                state.mv = mv.with_captured(captured_pt);
            }
        }

        self.side_to_move = them;
        self.game_ply += 1;
        self.history.push(state);

        // 自玉が取られる手は非合法
        if let Some(ksq) = self.king_square(us)
            && self.attackers_to(them, ksq, self.occupied()).is_not_empty()
        {
            self.undo_move();
            return false;
        }
        self.refresh_checkers();

        // 打ち歩詰め
        if mv.is_drop()
            && mv.piece_type() == PieceType::Pawn
            && self.in_check()
            && !self.has_legal_move()
        {
            self.undo_move();
            return false;
        }
        true
    }

    /// 直前の do_move / do_null_move を取り消す
    pub fn undo_move(&mut self) {
        let Some(state) = self.history.pop() else {
            return;
        };
        self.side_to_move = !self.side_to_move;
        self.game_ply -= 1;
        let us = self.side_to_move;
        let mv = state.mv;

        if !mv.is_null() {
            let to = mv.to();
            match mv.from() {
                None => {
                    self.remove_piece(to);
                    self.add_hand(us, mv.piece_type());
                }
                Some(from) => {
                    self.remove_piece(to);
                    self.put_piece(Piece::new(us, mv.piece_type()), from);
                    if let Some(cpt) = state.captured.piece_type() {
                        self.put_piece(state.captured, to);
                        self.sub_hand(us, cpt.unpromote());
                    }
                }
            }
        }

        self.board_key = state.board_key;
        self.hand_key = state.hand_key;
        self.checkers = state.checkers;
    }

    /// パス（null move）
    pub fn do_null_move(&mut self) {
        debug_assert!(!self.in_check());
        self.history.push(StateInfo {
            mv: Move::NULL,
            captured: Piece::NONE,
            board_key: self.board_key,
            hand_key: self.hand_key,
            checkers: self.checkers,
        });
        self.side_to_move = !self.side_to_move;
        self.game_ply += 1;
        self.refresh_checkers();
    }

    #[inline]
    pub fn undo_null_move(&mut self) {
        debug_assert!(self.last_move().is_some_and(|m| m.is_null()));
        self.undo_move();
    }
}

impl std::fmt::Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Position({})", self.to_sfen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::SFEN_HIRATE;

    fn startpos() -> Position {
        Position::from_sfen(SFEN_HIRATE, Arc::new(AttackTables::new())).unwrap()
    }

    fn usi(pos: &Position, s: &str) -> Move {
        pos.parse_usi_move(s).unwrap()
    }

    #[test]
    fn test_do_undo_restores_keys() {
        let mut pos = startpos();
        let key = pos.key();
        let sfen = pos.to_sfen();
        for s in ["7g7f", "3c3d", "8h2b+"] {
            let mv = usi(&pos, s);
            assert!(pos.do_move(mv), "{s}");
        }
        assert_eq!(pos.hand(Color::Black).count(PieceType::Bishop), 1);
        for _ in 0..3 {
            pos.undo_move();
        }
        assert_eq!(pos.key(), key);
        assert_eq!(pos.to_sfen(), sfen);
    }

    #[test]
    fn test_incremental_key_matches_fresh_parse() {
        let mut pos = startpos();
        for s in ["7g7f", "3c3d", "8h2b+", "3a2b", "B*4e"] {
            let mv = usi(&pos, s);
            assert!(pos.do_move(mv), "{s}");
        }
        let fresh = Position::from_sfen(&pos.to_sfen(), pos.shared_tables().clone()).unwrap();
        assert_eq!(fresh.key(), pos.key());
        assert_eq!(fresh.board_key(), pos.board_key());
        assert_eq!(fresh.hand_key(), pos.hand_key());
    }

    #[test]
    fn test_rejects_move_into_check() {
        // 後手の飛車が5筋にいる。5八の玉は5筋のまま動けるが、横の飛車利きに入れない
        let mut pos = Position::from_sfen(
            "4k4/9/9/9/9/9/9/r8/4K4 b - 1",
            Arc::new(AttackTables::new()),
        )
        .unwrap();
        let mv = usi(&pos, "5i5h");
        assert!(!pos.do_move(mv));
        assert_eq!(pos.side_to_move(), Color::Black);
        let mv = usi(&pos, "5i4i");
        assert!(pos.do_move(mv));
    }

    #[test]
    fn test_null_move_flips_side_only() {
        let mut pos = startpos();
        let board_key = pos.board_key();
        let key = pos.key();
        pos.do_null_move();
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(pos.board_key(), board_key);
        assert_ne!(pos.key(), key);
        pos.undo_null_move();
        assert_eq!(pos.key(), key);
    }

    #[test]
    fn test_checkers_after_check() {
        let mut pos = Position::from_sfen(
            "4k4/9/9/9/9/9/9/9/4K4 b G 1",
            Arc::new(AttackTables::new()),
        )
        .unwrap();
        let mv = usi(&pos, "G*5b");
        assert!(pos.do_move(mv));
        assert!(pos.in_check());
        assert_eq!(pos.checkers().lsb(), Some(Square::new(4, 1)));
    }
}
