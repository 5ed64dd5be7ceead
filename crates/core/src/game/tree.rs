//! Arena-backed game tree
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`]. The first
//! child of a node is its mainline continuation, the rest are variations.
//! Boards are never stored; they are replayed from the root on request.

use std::collections::BTreeSet;

use shakmaty::{Chess, Color, Move, Position};

use super::headers::Headers;
use crate::board;
use crate::error::{Error, GameError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A ply as stored in the tree. Unparseable SAN is kept as a null move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlyMove {
    Played(Move),
    Null,
}

impl PlyMove {
    pub fn play(&self, position: &Chess) -> Result<Chess> {
        match self {
            PlyMove::Played(mv) => position
                .clone()
                .play(mv.clone())
                .map_err(|_| Error::IllegalMove(board::move_to_uci(mv))),
            PlyMove::Null => Ok(board::play_null(position)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PlyMove::Null)
    }

    pub fn uci(&self) -> String {
        match self {
            PlyMove::Played(mv) => board::move_to_uci(mv),
            PlyMove::Null => "0000".to_string(),
        }
    }

    /// SAN as written in exported PGN; null moves become `--`.
    pub fn san(&self, position: &Chess) -> String {
        match self {
            PlyMove::Played(mv) => board::san_plus(position, mv),
            PlyMove::Null => "--".to_string(),
        }
    }
}

impl From<Move> for PlyMove {
    fn from(mv: Move) -> Self {
        PlyMove::Played(mv)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub mv: Option<PlyMove>,
    pub comment: String,
    /// Comment in front of the first move of a variation.
    pub starting_comment: String,
    pub nags: BTreeSet<u16>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub struct Game {
    pub headers: Headers,
    nodes: Vec<Node>,
    /// Recoverable problems met while parsing this game.
    pub errors: Vec<GameError>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(Headers::default())
    }
}

impl Game {
    pub fn new(headers: Headers) -> Self {
        Self {
            headers,
            nodes: vec![Node::default()],
            errors: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Mainline continuation of `id`.
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    /// Mainline move nodes, root excluded.
    pub fn mainline(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.mainline_from(self.root())
    }

    pub fn mainline_from(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.next(id), move |&n| self.next(n))
    }

    pub fn mainline_moves(&self) -> Vec<PlyMove> {
        self.mainline()
            .filter_map(|id| self.node(id).mv.clone())
            .collect()
    }

    /// Last node of the mainline (the root for an empty game).
    pub fn end(&self) -> NodeId {
        self.mainline().last().unwrap_or(self.root())
    }

    pub fn ply(&self, id: NodeId) -> usize {
        std::iter::successors(self.parent(id), |&n| self.parent(n)).count()
    }

    pub fn is_mainline(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if self.next(parent) != Some(current) {
                return false;
            }
            current = parent;
        }
        true
    }

    /// Nodes from the root down to `id`, both included.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path: Vec<NodeId> = std::iter::successors(Some(id), |&n| self.parent(n)).collect();
        path.reverse();
        path
    }

    pub fn initial_board(&self) -> Result<Chess> {
        self.headers.initial_board()
    }

    /// Board after the move of `id`, replayed from the starting position.
    pub fn board(&self, id: NodeId) -> Result<Chess> {
        let mut position = self.initial_board()?;
        for node in self.path(id) {
            if let Some(mv) = &self.node(node).mv {
                position = mv.play(&position)?;
            }
        }
        Ok(position)
    }

    pub fn fen(&self, id: NodeId) -> Result<String> {
        Ok(board::fen_of(&self.board(id)?))
    }

    /// Side to move once the move of `id` has been played.
    pub fn turn(&self, id: NodeId) -> Result<Color> {
        Ok(self.board(id)?.turn())
    }

    pub fn san(&self, id: NodeId) -> Result<Option<String>> {
        let Some(mv) = &self.node(id).mv else {
            return Ok(None);
        };
        let parent = self.parent(id).ok_or(Error::UnknownNode(id.0))?;
        Ok(Some(mv.san(&self.board(parent)?)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    fn push_node(&mut self, parent: NodeId, mv: PlyMove) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            mv: Some(mv),
            parent: Some(parent),
            ..Node::default()
        });
        id
    }

    /// Appends `mv` as the last continuation of `parent`.
    pub fn add_variation(&mut self, parent: NodeId, mv: PlyMove) -> NodeId {
        let id = self.push_node(parent, mv);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Inserts `mv` as the new mainline continuation of `parent`.
    pub fn add_main_variation(&mut self, parent: NodeId, mv: PlyMove) -> NodeId {
        let id = self.push_node(parent, mv);
        self.nodes[parent.0].children.insert(0, id);
        id
    }

    /// Chains `moves` below `parent` and returns the last node added.
    pub fn add_line<I>(&mut self, parent: NodeId, moves: I) -> NodeId
    where
        I: IntoIterator<Item = PlyMove>,
    {
        moves
            .into_iter()
            .fold(parent, |node, mv| self.add_variation(node, mv))
    }

    fn sibling_index(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, index))
    }

    /// Moves a variation one place up among its siblings.
    pub fn promote(&mut self, id: NodeId) {
        if let Some((parent, index)) = self.sibling_index(id) {
            if index > 0 {
                self.nodes[parent.0].children.swap(index - 1, index);
            }
        }
    }

    /// Moves a variation one place down among its siblings.
    pub fn demote(&mut self, id: NodeId) {
        if let Some((parent, index)) = self.sibling_index(id) {
            if index + 1 < self.children(parent).len() {
                self.nodes[parent.0].children.swap(index, index + 1);
            }
        }
    }

    pub fn promote_to_main(&mut self, id: NodeId) {
        if let Some((parent, index)) = self.sibling_index(id) {
            let children = &mut self.nodes[parent.0].children;
            let node = children.remove(index);
            children.insert(0, node);
        }
    }

    /// Detaches a variation. Its nodes stay in the arena but are unreachable.
    pub fn remove_variation(&mut self, id: NodeId) {
        if let Some((parent, index)) = self.sibling_index(id) {
            self.nodes[parent.0].children.remove(index);
        }
    }

    /// Walks the mainline clearing comments and/or dropping side variations.
    pub fn strip(&mut self, comments: bool, variations: bool) {
        let mut current = Some(self.root());
        while let Some(id) = current {
            let node = &mut self.nodes[id.0];
            if comments {
                node.comment.clear();
                node.starting_comment.clear();
            }
            if variations {
                node.children.truncate(1);
            }
            current = node.children.first().copied();
        }
    }
}
