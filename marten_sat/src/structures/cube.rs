/*!
Cubes --- paths from the decision root, and their serialized form.

A cube is an ordered sequence of literals read as a conjunction of assumptions, or
equivalently as a partial assignment.
A cube is immutable once produced: expansion creates fresh cubes with an extended path
rather than mutating the original.

# Containment

[includes](Cube::includes) checks containment on the literal *set*: a cube includes
another iff every literal of the other appears somewhere on its path.
Containment drives pruning --- any cube which includes a failed cube is itself failed,
as its assumptions subsume the unsatisfiable conjunction.

# Serialization

Cubes travel as a flat literal stream in which each cube is terminated by the sentinel
`0`.
No length prefix is used for individual cubes, as a receiver knows the total literal
count of the payload it was handed.
*/

use crate::structures::{Lit, STREAM_END};

/// An ordered sequence of literals, read as a conjunction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cube {
    path: Vec<Lit>,
}

impl Cube {
    /// A cube with the given path.
    ///
    /// Literals must be non-zero, and no two literals on a path may contradict.
    pub fn new(path: Vec<Lit>) -> Self {
        debug_assert!(path.iter().all(|literal| *literal != 0));
        debug_assert!(!path.iter().any(|literal| path.contains(&-literal)));

        Cube { path }
    }

    /// The path of the cube, from the decision root.
    pub fn path(&self) -> &[Lit] {
        &self.path
    }

    /// The number of literals on the path.
    pub fn len(&self) -> usize {
        self.path.len()
    }

    /// True iff the path is empty --- the cube of the decision root.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// A fresh cube whose path extends this cube by the given literal.
    pub fn extended(&self, literal: Lit) -> Self {
        debug_assert!(literal != 0);

        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(literal);

        Cube::new(path)
    }

    /// True iff every literal of `other` appears on the path of this cube.
    pub fn includes(&self, other: &Cube) -> bool {
        other
            .path
            .iter()
            .all(|literal| self.path.contains(literal))
    }

    /// The path in canonical (sorted) form, used to key cubes by content.
    pub fn canonical(&self) -> Vec<Lit> {
        let mut path = self.path.clone();
        path.sort_unstable();
        path
    }
}

impl From<Vec<Lit>> for Cube {
    fn from(path: Vec<Lit>) -> Self {
        Cube::new(path)
    }
}

impl std::fmt::Display for Cube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (index, literal) in self.path.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            write!(f, "{literal}")?;
        }
        write!(f, "]")
    }
}

/// Flattens cubes to a literal stream, each cube terminated by the sentinel.
pub fn serialize_cubes(cubes: &[Cube]) -> Vec<Lit> {
    let mut stream = Vec::with_capacity(cubes.iter().map(|cube| cube.len() + 1).sum());

    for cube in cubes {
        stream.extend_from_slice(cube.path());
        stream.push(STREAM_END);
    }

    stream
}

/// Rebuilds cubes from a flat literal stream.
///
/// Literals trailing the final sentinel do not form a cube and are dropped.
pub fn unserialize_cubes(stream: &[Lit]) -> Vec<Cube> {
    let mut cubes = Vec::new();
    let mut path = Vec::new();

    for literal in stream {
        match *literal {
            STREAM_END => cubes.push(Cube::new(std::mem::take(&mut path))),
            non_zero => path.push(non_zero),
        }
    }

    cubes
}

#[cfg(test)]
mod cube_tests {
    use super::*;

    #[test]
    fn containment() {
        let wide = Cube::new(vec![1, -2, 3]);
        let narrow = Cube::new(vec![3, 1]);

        assert!(wide.includes(&narrow));
        assert!(!narrow.includes(&wide));

        assert!(wide.includes(&Cube::default()));
    }

    #[test]
    fn extension_preserves_the_source() {
        let base = Cube::new(vec![4]);
        let child = base.extended(-7);

        assert_eq!(base.path(), &[4]);
        assert_eq!(child.path(), &[4, -7]);
    }

    #[test]
    fn round_trip() {
        let cubes = vec![Cube::new(vec![1, 2]), Cube::new(vec![-3]), Cube::new(vec![4, -5, 6])];

        assert_eq!(unserialize_cubes(&serialize_cubes(&cubes)), cubes);
    }

    #[test]
    fn unterminated_tail_is_dropped() {
        let stream = [1, 2, 0, 3];

        assert_eq!(unserialize_cubes(&stream), vec![Cube::new(vec![1, 2])]);
    }
}
