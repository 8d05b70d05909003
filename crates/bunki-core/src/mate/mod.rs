//! 詰み探索
//!
//! - `mate_1ply`: 1手詰め判定（王手候補を絞り込み、玉の逃げ道・王手駒の除去・
//!   合駒の可否を調べる）
//! - `mate_3ply`: 3手詰め判定（王手に対するすべての応手に1手詰めがあるか）
//! - `MateCache`: Tree ごとの結果キャッシュ
//! - `MateHistory`: 全スレッド共有の「詰みやすさ」統計

mod cache;
mod one_ply;
mod three_ply;

pub use cache::{MateCache, MateEntity, MateHistory};
pub use one_ply::{gives_mate, is_mated, mate_1ply};
pub use three_ply::mate_3ply;

#[cfg(test)]
pub(crate) mod reference {
    use crate::position::{MoveList, Position};
    use crate::types::Move;

    /// 合法手を総当たりする1手詰め判定
    pub fn mate_1ply(pos: &mut Position) -> Option<Move> {
        let mut moves = MoveList::new();
        pos.generate_legal(&mut moves);
        moves.into_iter().find(|&mv| is_mate_after(pos, mv))
    }

    /// mv を指した後、相手に合法手がないか
    pub fn is_mate_after(pos: &mut Position, mv: Move) -> bool {
        if !pos.do_move(mv) {
            return false;
        }
        let mut replies = MoveList::new();
        pos.generate_legal(&mut replies);
        let mate = pos.in_check() && replies.is_empty();
        pos.undo_move();
        mate
    }
}
