//! Name trees.
//!
//! A name tree maps strings to objects. Internal nodes have `/Kids` and leaf
//! nodes have `/Names`, an array of alternating keys and values. Every node
//! except the root carries `/Limits`, the smallest and the largest key below it.
//!
//! Children are only materialized when a lookup descends into them, and the
//! keys of a leaf are decrypted once, on the first lookup that reaches it.

use crate::object::dict::keys::{AP, DESTS, EMBEDDED_FILES, JAVA_SCRIPT, KIDS, LIMITS, NAMES};
use crate::object::{Array, Dict, ObjRef, Object};
use crate::xref::XRef;
use log::warn;
use std::cmp::Ordering;
use std::ops::Deref;
use std::sync::OnceLock;

/// The kinds of name trees in the `/Names` dictionary of the document catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameTreeKind {
    /// Named destinations.
    Dests,
    /// Embedded file streams.
    EmbeddedFiles,
    /// Document-level JavaScript actions.
    JavaScript,
    /// Named appearance streams.
    Ap,
}

impl NameTreeKind {
    fn key(&self) -> &'static [u8] {
        match self {
            Self::Dests => DESTS,
            Self::EmbeddedFiles => EMBEDDED_FILES,
            Self::JavaScript => JAVA_SCRIPT,
            Self::Ap => AP,
        }
    }
}

/// A value stored in a name tree.
///
/// Values that were stored indirectly or as arrays remember the object they
/// originate from, so that strings inside them can still be decrypted.
#[derive(Debug, Clone, PartialEq)]
pub struct NameValue {
    object: Object,
    reference: Option<ObjRef>,
}

impl NameValue {
    /// The object the value originates from.
    pub fn reference(&self) -> Option<ObjRef> {
        self.reference
    }

    /// Unwrap the object.
    pub fn into_object(self) -> Object {
        self.object
    }
}

impl Deref for NameValue {
    type Target = Object;

    fn deref(&self) -> &Self::Target {
        &self.object
    }
}

/// A name tree.
pub struct NameTree<'a> {
    root: NameNode<'a>,
}

impl<'a> NameTree<'a> {
    /// Create a name tree from its root node.
    pub fn new(xref: &'a XRef, root: Dict) -> Self {
        Self {
            root: NameNode::new(xref, root, None),
        }
    }

    /// Look up the name tree of the given kind in the catalog's `/Names` dictionary.
    pub fn from_catalog(xref: &'a XRef, catalog: &Dict, kind: NameTreeKind) -> Option<Self> {
        let names = xref.get::<Dict>(catalog, NAMES)?;
        let reference = names.get_ref(kind.key());
        let root = xref.get::<Dict>(&names, kind.key())?;

        Some(Self {
            root: NameNode::new(xref, root, reference),
        })
    }

    /// The root node.
    pub fn root(&self) -> &NameNode<'a> {
        &self.root
    }

    /// Find the value stored under `name`.
    pub fn search(&self, name: &str) -> Option<NameValue> {
        self.root.search(name)
    }

    /// All entries of the tree, in order.
    pub fn entries(&self) -> Vec<(String, NameValue)> {
        let mut entries = vec![];
        self.root.collect_entries(&mut entries, 0);

        entries
    }
}

/// The outcome of searching a single node.
#[derive(Debug)]
enum Probe {
    /// The name was found.
    Hit(NameValue),
    /// The name falls into the node's range but is not present.
    Miss,
    /// The name sorts before the node's lower limit.
    Below,
    /// The name sorts after the node's upper limit.
    Above,
    /// No candidate was left to search.
    Exhausted,
}

/// A node in a name tree.
pub struct NameNode<'a> {
    xref: &'a XRef,
    reference: Option<ObjRef>,
    kids: Option<Array>,
    children: Box<[OnceLock<Option<NameNode<'a>>>]>,
    names: Option<Array>,
    decrypted_names: OnceLock<Vec<(String, Object)>>,
    limits: Option<(String, String)>,
}

impl<'a> NameNode<'a> {
    fn new(xref: &'a XRef, dict: Dict, reference: Option<ObjRef>) -> Self {
        let kids = xref.get::<Array>(&dict, KIDS);
        // A node is either an internal node or a leaf.
        let names = if kids.is_some() {
            None
        } else {
            xref.get::<Array>(&dict, NAMES)
        };

        let children = kids
            .as_ref()
            .map(|k| (0..k.len()).map(|_| OnceLock::new()).collect())
            .unwrap_or_default();

        let limits = xref.get::<Array>(&dict, LIMITS).and_then(|limits| {
            if limits.len() < 2 {
                return None;
            }

            Some((
                key_text(xref, limits.get_raw(0)?),
                key_text(xref, limits.get_raw(1)?),
            ))
        });

        Self {
            xref,
            reference,
            kids,
            children,
            names,
            decrypted_names: OnceLock::new(),
            limits,
        }
    }

    /// The indirect object this node is stored in.
    pub fn reference(&self) -> Option<ObjRef> {
        self.reference
    }

    /// The smallest key below this node.
    pub fn lower_limit(&self) -> Option<&str> {
        self.limits.as_ref().map(|l| l.0.as_str())
    }

    /// The largest key below this node.
    pub fn upper_limit(&self) -> Option<&str> {
        self.limits.as_ref().map(|l| l.1.as_str())
    }

    /// Whether this is a leaf node.
    pub fn is_leaf(&self) -> bool {
        self.kids.is_none()
    }

    /// The number of children of an internal node.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// The child at the given index, materialized on first access.
    pub fn child(&self, index: usize) -> Option<&NameNode<'a>> {
        self.children
            .get(index)?
            .get_or_init(|| {
                let raw = self.kids.as_ref()?.get_raw(index)?;
                let reference = match raw {
                    Object::Reference(r) => Some(*r),
                    _ => None,
                };

                match self.xref.resolve_as::<Dict>(raw) {
                    Some(dict) => Some(NameNode::new(self.xref, dict, reference)),
                    None => {
                        warn!("name tree kid {index} is not a dictionary");

                        None
                    }
                }
            })
            .as_ref()
    }

    /// The keys and raw values of a leaf node, with the keys decrypted.
    pub fn names(&self) -> &[(String, Object)] {
        self.decrypted_names.get_or_init(|| {
            let Some(names) = &self.names else {
                return vec![];
            };

            if names.len() % 2 != 0 {
                warn!("name tree leaf has an odd number of elements");
            }

            names
                .as_slice()
                .chunks_exact(2)
                .map(|pair| (key_text(self.xref, &pair[0]), pair[1].clone()))
                .collect()
        })
    }

    /// Find the value stored under `name` in the subtree of this node.
    pub fn search(&self, name: &str) -> Option<NameValue> {
        match self.probe(name) {
            Probe::Hit(value) => Some(value),
            Probe::Miss | Probe::Below | Probe::Above | Probe::Exhausted => None,
        }
    }

    fn probe(&self, name: &str) -> Probe {
        if self.kids.is_some() {
            if let Some((lower, upper)) = &self.limits {
                match lower.as_str().cmp(name) {
                    Ordering::Greater => return Probe::Below,
                    Ordering::Equal => return self.probe_child(0, name),
                    Ordering::Less => {}
                }

                match upper.as_str().cmp(name) {
                    Ordering::Less => return Probe::Above,
                    Ordering::Equal => {
                        return self.probe_child(self.child_count().saturating_sub(1), name);
                    }
                    Ordering::Greater => {}
                }
            }

            self.search_kids(0, self.child_count() as isize - 1, name)
        } else if self.names.is_some() {
            let names = self.names();

            if let Some((lower, upper)) = &self.limits {
                match lower.as_str().cmp(name) {
                    Ordering::Greater => return Probe::Below,
                    Ordering::Equal => {
                        if let Some((key, value)) = names.first()
                            && key == name
                        {
                            return Probe::Hit(self.wrap(value));
                        }
                    }
                    Ordering::Less => {}
                }

                match upper.as_str().cmp(name) {
                    Ordering::Less => return Probe::Above,
                    Ordering::Equal => {
                        if let Some((key, value)) = names.last()
                            && key == name
                        {
                            return Probe::Hit(self.wrap(value));
                        }
                    }
                    Ordering::Greater => {}
                }
            }

            match self.search_names(0, names.len() as isize * 2 - 1, name) {
                hit @ Probe::Hit(_) => hit,
                _ => Probe::Miss,
            }
        } else {
            Probe::Miss
        }
    }

    fn probe_child(&self, index: usize, name: &str) -> Probe {
        match self.child(index) {
            Some(child) => child.probe(name),
            None => Probe::Exhausted,
        }
    }

    fn search_kids(&self, first: isize, last: isize, name: &str) -> Probe {
        if first > last {
            return Probe::Exhausted;
        }

        let pivot = first + (last - first) / 2;

        match self.probe_child(pivot as usize, name) {
            Probe::Below => self.search_kids(first, pivot - 1, name),
            Probe::Above => self.search_kids(pivot + 1, last, name),
            Probe::Exhausted => {
                // The limits of the kids are inconsistent, fall back to a linear scan.
                warn!("malformed name tree, scanning all kids for {name:?}");

                (first..=last)
                    .filter(|i| *i != pivot)
                    .map(|i| self.probe_child(i as usize, name))
                    .find(|p| matches!(p, Probe::Hit(_) | Probe::Miss))
                    .unwrap_or(Probe::Exhausted)
            }
            found => found,
        }
    }

    /// Binary search over the flattened key/value list. `first` and `last` are
    /// indices into that list, keys are at even indices.
    fn search_names(&self, first: isize, last: isize, name: &str) -> Probe {
        if first > last {
            return Probe::Exhausted;
        }

        let pivot = (first + (last - first) / 2) & !1;
        let Some((key, value)) = self.names().get(pivot as usize / 2) else {
            return Probe::Exhausted;
        };

        match key.as_str().cmp(name) {
            Ordering::Equal => Probe::Hit(self.wrap(value)),
            Ordering::Greater => self.search_names(first, pivot - 1, name),
            Ordering::Less => self.search_names(pivot + 2, last, name),
        }
    }

    fn wrap(&self, value: &Object) -> NameValue {
        match value {
            Object::Reference(r) => NameValue {
                object: self.xref.resolve(value).unwrap_or_default(),
                reference: Some(*r),
            },
            Object::Array(_) => NameValue {
                object: value.clone(),
                reference: self.reference,
            },
            other => NameValue {
                object: other.clone(),
                reference: None,
            },
        }
    }

    fn collect_entries(&self, entries: &mut Vec<(String, NameValue)>, depth: usize) {
        // Guard against cyclic kids.
        if depth > 64 {
            warn!("name tree is too deep");

            return;
        }

        if self.kids.is_some() {
            for i in 0..self.child_count() {
                if let Some(child) = self.child(i) {
                    child.collect_entries(entries, depth + 1);
                }
            }
        } else {
            for (key, value) in self.names() {
                entries.push((key.clone(), self.wrap(value)));
            }
        }
    }
}

fn key_text(xref: &XRef, object: &Object) -> String {
    match xref.resolve(object) {
        Some(Object::String(s)) => s
            .decrypted_literal_string(xref.security())
            .unwrap_or_else(|e| {
                warn!("failed to decrypt name tree key: {e}");

                s.literal_string()
            }),
        _ => {
            warn!("name tree key is not a string");

            String::new()
        }
    }
}
