//! Mainlines must match what pgn-reader makes of the same input.

use std::io::Cursor;
use std::ops::ControlFlow;

use pgn_reader::{Reader, SanPlus, Skip, Visitor};
use shakmaty::{Chess, Position};

use pgn_analyzer_core::{board, parse_pgn_string};

const TEN_GAMES: &str = include_str!("data/ten_games.pgn");

struct MainlineMoves {
    position: Chess,
    moves: Vec<String>,
}

struct Oracle;

impl Visitor for Oracle {
    type Tags = ();
    type Movetext = MainlineMoves;
    type Output = Vec<String>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(MainlineMoves {
            position: Chess::default(),
            moves: Vec::new(),
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        let mv = san.san.to_move(&movetext.position).unwrap();
        movetext.moves.push(board::move_to_uci(&mv));
        movetext.position = movetext.position.clone().play(mv).unwrap();
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _movetext: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        movetext.moves
    }
}

#[test]
fn mainlines_agree_with_pgn_reader() {
    let mut reader = Reader::new(Cursor::new(TEN_GAMES.as_bytes()));
    let mut expected = Vec::new();
    while let Some(moves) = reader.read_game(&mut Oracle).unwrap() {
        expected.push(moves);
    }

    let games = parse_pgn_string(TEN_GAMES).unwrap();
    assert_eq!(games.len(), expected.len());
    for (game, expected) in games.iter().zip(&expected) {
        let ours: Vec<String> = game.mainline_moves().iter().map(|mv| mv.uci()).collect();
        assert_eq!(&ours, expected, "{}", game.headers.summary());
    }
}
