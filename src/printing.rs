//! The slice of the card domain model the pipeline actually consumes
//!
//! A full card database is someone else's job. The pipeline only needs enough
//! of a printing to derive a cache path, pick the right crop recipe, and chase
//! the catalog's face indirection: a numeric id, a layout tag, and the names
//! and type lines of its faces.

use std::fmt;

/// Categorical card geometry, as the catalog tags it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layout {
    Standard,
    Split,
    Aftermath,
    Flip,
    Saga,
    Transform,
    Modal,
    Meld,
    Class,
}

/// One face of a printing
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Face {
    name: String,
    type_line: String,
}

impl Face {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, type_line: T) -> Self {
        Self {
            name: name.into(),
            type_line: type_line.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_line(&self) -> &str {
        &self.type_line
    }

    /// Type lines are free text like `"Enchantment — Saga"`, so tags are
    /// matched as substrings
    pub fn has_type(&self, tag: &str) -> bool {
        self.type_line.contains(tag)
    }
}

/// A specific printed instance of a card
///
/// Identity (equality and hashing) covers every field since the whole value
/// participates in request cache keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Printing {
    id: u64,
    layout: Layout,
    front_faces: Vec<Face>,
    back_faces: Vec<Face>,
}

impl Printing {
    pub fn new(id: u64, layout: Layout) -> Self {
        Self {
            id,
            layout,
            front_faces: Vec::new(),
            back_faces: Vec::new(),
        }
    }

    pub fn with_front_face(mut self, face: Face) -> Self {
        self.front_faces.push(face);
        self
    }

    pub fn with_back_face(mut self, face: Face) -> Self {
        self.back_faces.push(face);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn front_face(&self) -> Option<&Face> {
        self.front_faces.first()
    }

    pub fn front_faces(&self) -> &[Face] {
        &self.front_faces
    }

    pub fn back_face(&self) -> Option<&Face> {
        self.back_faces.first()
    }

    pub fn has_front_face(&self) -> bool {
        !self.front_faces.is_empty()
    }

    pub fn has_back_face(&self) -> bool {
        !self.back_faces.is_empty()
    }
}

impl fmt::Display for Printing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.front_face() {
            Some(face) => write!(f, "{} ({})", face.name(), self.id),
            None => write!(f, "#{}", self.id),
        }
    }
}
