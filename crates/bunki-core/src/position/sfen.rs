//! SFEN形式の入出力とUSI形式の指し手変換

use std::sync::Arc;

use thiserror::Error;

use super::Position;
use crate::bitboard::AttackTables;
use crate::types::{Color, Hand, Move, Piece, PieceType, Square};

/// 平手初期局面
pub const SFEN_HIRATE: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";

/// SFENパースエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SfenError {
    /// 盤面の形式が不正
    #[error("invalid board: {0}")]
    Board(String),
    /// 手番の形式が不正
    #[error("invalid side to move: {0}")]
    SideToMove(String),
    /// 手駒の形式が不正
    #[error("invalid hand: {0}")]
    Hand(String),
    /// 手数の形式が不正
    #[error("invalid ply: {0}")]
    Ply(String),
}

/// USI形式の指し手のパースエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("malformed move text: {0}")]
    Syntax(String),
    #[error("no piece of the side to move on {0}")]
    NoPiece(String),
    #[error("move is not pseudo-legal in this position: {0}")]
    Illegal(String),
}

impl Position {
    /// 平手初期局面
    pub fn startpos(tables: Arc<AttackTables>) -> Position {
        match Position::from_sfen(SFEN_HIRATE, tables.clone()) {
            Ok(pos) => pos,
            // 定数文字列なので到達しない
            Err(_) => Position::empty(tables),
        }
    }

    /// SFEN文字列から局面を生成
    pub fn from_sfen(sfen: &str, tables: Arc<AttackTables>) -> Result<Position, SfenError> {
        let mut pos = Position::empty(tables);
        let parts: Vec<&str> = sfen.split_whitespace().collect();
        let parts = match parts.first() {
            Some(&"sfen") => &parts[1..],
            _ => &parts[..],
        };
        if parts.len() < 3 {
            return Err(SfenError::Board("SFEN must have at least 3 parts".to_string()));
        }

        pos.parse_board(parts[0])?;

        pos.side_to_move = match parts[1] {
            "b" => Color::Black,
            "w" => Color::White,
            other => return Err(SfenError::SideToMove(format!("expected 'b' or 'w', got '{other}'"))),
        };

        pos.parse_hand(parts[2])?;

        pos.game_ply = match parts.get(3) {
            Some(s) => s.parse().map_err(|_| SfenError::Ply((*s).to_string()))?,
            None => 1,
        };

        pos.refresh_checkers();
        Ok(pos)
    }

    fn parse_board(&mut self, board: &str) -> Result<(), SfenError> {
        let rows: Vec<&str> = board.split('/').collect();
        if rows.len() != 9 {
            return Err(SfenError::Board(format!("expected 9 ranks, got {}", rows.len())));
        }
        for (rank, row) in rows.iter().enumerate() {
            // 各段は9筋から1筋の順
            let mut file: i32 = 8;
            let mut promoted = false;
            for c in row.chars() {
                if let Some(n) = c.to_digit(10) {
                    if promoted {
                        return Err(SfenError::Board(format!("'+' before digit in rank {}", rank + 1)));
                    }
                    file -= n as i32;
                    continue;
                }
                if c == '+' {
                    promoted = true;
                    continue;
                }
                let base = PieceType::from_sfen_char(c)
                    .ok_or_else(|| SfenError::Board(format!("unknown piece '{c}'")))?;
                let pt = if promoted {
                    base.promote()
                        .ok_or_else(|| SfenError::Board(format!("piece '{c}' cannot promote")))?
                } else {
                    base
                };
                promoted = false;
                if file < 0 {
                    return Err(SfenError::Board(format!("rank {} is too long", rank + 1)));
                }
                let color = if c.is_ascii_uppercase() { Color::Black } else { Color::White };
                let sq = Square::new(file as u8, rank as u8);
                if pt == PieceType::King && self.king_square(color).is_some() {
                    return Err(SfenError::Board(format!("two kings for {color:?}")));
                }
                self.put_piece(Piece::new(color, pt), sq);
                file -= 1;
            }
            if file != -1 {
                return Err(SfenError::Board(format!("rank {} does not have 9 files", rank + 1)));
            }
        }
        Ok(())
    }

    fn parse_hand(&mut self, hand: &str) -> Result<(), SfenError> {
        if hand == "-" {
            return Ok(());
        }
        let mut count: Option<u32> = None;
        for c in hand.chars() {
            if let Some(d) = c.to_digit(10) {
                let next = count.unwrap_or(0).checked_mul(10).and_then(|n| n.checked_add(d));
                count = Some(next.ok_or_else(|| SfenError::Hand("count overflows".to_string()))?);
                continue;
            }
            let pt = PieceType::from_sfen_char(c)
                .filter(|pt| pt.hand_index().is_some())
                .ok_or_else(|| SfenError::Hand(format!("unknown hand piece '{c}'")))?;
            let color = if c.is_ascii_uppercase() { Color::Black } else { Color::White };
            let n = count.take().unwrap_or(1);
            let total = self.hand(color).count(pt) + n;
            if n == 0 || total > Hand::max_count(pt) {
                return Err(SfenError::Hand(format!("invalid count {n} for '{c}'")));
            }
            for _ in 0..n {
                self.add_hand(color, pt);
            }
        }
        if count.is_some() {
            return Err(SfenError::Hand("trailing count".to_string()));
        }
        Ok(())
    }

    /// SFEN文字列に変換
    pub fn to_sfen(&self) -> String {
        let mut out = String::new();
        for rank in 0..9u8 {
            let mut empty = 0;
            for file in (0..9u8).rev() {
                let pc = self.piece_on(Square::new(file, rank));
                if pc.is_none() {
                    empty += 1;
                    continue;
                }
                if empty > 0 {
                    out.push_str(&empty.to_string());
                    empty = 0;
                }
                out.push_str(&pc.to_sfen());
            }
            if empty > 0 {
                out.push_str(&empty.to_string());
            }
            if rank < 8 {
                out.push('/');
            }
        }
        out.push(' ');
        out.push(match self.side_to_move {
            Color::Black => 'b',
            Color::White => 'w',
        });
        out.push(' ');
        let mut hand = String::new();
        // SFENの慣例順（飛角金銀桂香歩）
        const ORDER: [PieceType; 7] = [
            PieceType::Rook,
            PieceType::Bishop,
            PieceType::Gold,
            PieceType::Silver,
            PieceType::Knight,
            PieceType::Lance,
            PieceType::Pawn,
        ];
        for color in Color::ALL {
            for pt in ORDER {
                let n = self.hand(color).count(pt);
                if n == 0 {
                    continue;
                }
                if n > 1 {
                    hand.push_str(&n.to_string());
                }
                let c = pt.sfen_char();
                hand.push(if color == Color::Black { c } else { c.to_ascii_lowercase() });
            }
        }
        if hand.is_empty() {
            hand.push('-');
        }
        out.push_str(&hand);
        out.push(' ');
        out.push_str(&self.game_ply.to_string());
        out
    }

    /// USI形式の指し手を、この局面の疑似合法手として解釈する
    pub fn parse_usi_move(&self, s: &str) -> Result<Move, MoveParseError> {
        let syntax = || MoveParseError::Syntax(s.to_string());
        let us = self.side_to_move();
        let mv = if let Some((pc, to)) = s.split_once('*') {
            let mut chars = pc.chars();
            let pt = chars.next().and_then(PieceType::from_sfen_char).ok_or_else(syntax)?;
            if chars.next().is_some() {
                return Err(syntax());
            }
            let to = Square::from_usi(to).ok_or_else(syntax)?;
            Move::new_drop(pt, to)
        } else {
            let (body, promote) = match s.strip_suffix('+') {
                Some(body) => (body, true),
                None => (s, false),
            };
            if body.len() != 4 {
                return Err(syntax());
            }
            let from = body.get(..2).and_then(Square::from_usi).ok_or_else(syntax)?;
            let to = body.get(2..).and_then(Square::from_usi).ok_or_else(syntax)?;
            let pc = self.piece_on(from);
            let pt = match pc.piece_type() {
                Some(pt) if pc.color() == us => pt,
                _ => return Err(MoveParseError::NoPiece(from.to_usi())),
            };
            Move::new_move(pt, from, to, promote, self.piece_on(to).piece_type())
        };
        if self.is_pseudo_legal(mv) {
            Ok(mv)
        } else {
            Err(MoveParseError::Illegal(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> Arc<AttackTables> {
        Arc::new(AttackTables::new())
    }

    #[test]
    fn test_hirate_roundtrip() {
        let pos = Position::from_sfen(SFEN_HIRATE, tables()).unwrap();
        assert_eq!(pos.to_sfen(), SFEN_HIRATE);
        assert_eq!(pos.king_square(Color::Black), Some(Square::new(4, 8)));
        assert_eq!(pos.king_square(Color::White), Some(Square::new(4, 0)));
        assert_eq!(pos.occupied().count(), 40);
        assert!(!pos.in_check());
    }

    #[test]
    fn test_hand_and_promoted_roundtrip() {
        let sfen = "l+R5nl/4gk3/p1n1pp1pp/2pp2p2/1p5P1/2P3P2/PPSPPP2P/2G6/LN1GK2NL b BG2Pb2s 41";
        let pos = Position::from_sfen(sfen, tables()).unwrap();
        assert_eq!(pos.to_sfen(), sfen);
        assert_eq!(pos.hand(Color::Black).count(PieceType::Pawn), 2);
        assert_eq!(pos.hand(Color::White).count(PieceType::Silver), 2);
        assert_eq!(pos.game_ply(), 41);
    }

    #[test]
    fn test_sfen_errors() {
        assert!(matches!(Position::from_sfen("9/9 b -", tables()), Err(SfenError::Board(_))));
        assert!(matches!(
            Position::from_sfen("9/9/9/9/9/9/9/9/9 x - 1", tables()),
            Err(SfenError::SideToMove(_))
        ));
        assert!(matches!(
            Position::from_sfen("9/9/9/9/9/9/9/9/9 b K 1", tables()),
            Err(SfenError::Hand(_))
        ));
        assert!(matches!(
            Position::from_sfen("9/9/9/9/9/9/9/9/9 b - x", tables()),
            Err(SfenError::Ply(_))
        ));
        assert!(matches!(
            Position::from_sfen("8/9/9/9/9/9/9/9/9 b - 1", tables()),
            Err(SfenError::Board(_))
        ));
    }

    #[test]
    fn test_hand_counts_are_bounded() {
        let hand = |h: &str| Position::from_sfen(&format!("4k4/9/9/9/9/9/9/9/4K4 b {h} 1"), tables());
        let pos = hand("18P2r").unwrap();
        assert_eq!(pos.hand(Color::Black).count(PieceType::Pawn), 18);
        assert_eq!(pos.hand(Color::White).count(PieceType::Rook), 2);

        // フィールドの幅を超える枚数
        for bad in ["19P", "40P", "3R", "5g", "2BB", "0P", "99999999999P", "2"] {
            assert!(matches!(hand(bad), Err(SfenError::Hand(_))), "{bad}");
        }
    }

    #[test]
    fn test_parse_usi_move() {
        let pos = Position::from_sfen(SFEN_HIRATE, tables()).unwrap();
        let mv = pos.parse_usi_move("7g7f").unwrap();
        assert_eq!(mv.piece_type(), PieceType::Pawn);
        assert_eq!(mv.to_usi(), "7g7f");
        assert!(matches!(pos.parse_usi_move("7g7e"), Err(MoveParseError::Illegal(_))));
        assert!(matches!(pos.parse_usi_move("5e5d"), Err(MoveParseError::NoPiece(_))));
        assert!(matches!(pos.parse_usi_move("P*5e"), Err(MoveParseError::Illegal(_))));
        assert!(matches!(pos.parse_usi_move("zz"), Err(MoveParseError::Syntax(_))));
    }
}
