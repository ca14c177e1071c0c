//! Optional content, also known as layers.

use log::warn;
use rime_syntax::XRef;
use rime_syntax::object::dict::keys::{
    ALL_OFF, ALL_ON, ANY_OFF, ANY_ON, BASE_STATE, D, OCG, OCGS, OCMD, OC_PROPERTIES, OFF, ON, P,
    TYPE,
};
use rime_syntax::object::{Array, Dict, Name, ObjRef, Object};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// The visibility of the optional content groups of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcgConfig {
    hidden: FxHashSet<ObjRef>,
}

impl OcgConfig {
    /// A configuration in which all groups are visible.
    pub fn all_visible() -> Self {
        Self::default()
    }

    /// Read the default configuration from the `/OCProperties` of the
    /// document catalog.
    pub fn from_catalog(catalog: &Dict, xref: &XRef) -> Self {
        let Some(oc_properties) = xref.get_dict(catalog, OC_PROPERTIES) else {
            return Self::default();
        };

        let Some(config) = xref.get_dict(&oc_properties, D) else {
            return Self::default();
        };

        let mut hidden = FxHashSet::default();

        let base_state = xref
            .get::<Name>(&config, BASE_STATE)
            .and_then(|b| BaseState::from_name(&b));

        if base_state.unwrap_or(BaseState::On) == BaseState::Off
            && let Some(ocgs) = xref.get::<Array>(&oc_properties, OCGS)
        {
            hidden.extend(references(&ocgs));
        }

        if let Some(on) = xref.get::<Array>(&config, ON) {
            for group in references(&on) {
                hidden.remove(&group);
            }
        }

        if let Some(off) = xref.get::<Array>(&config, OFF) {
            hidden.extend(references(&off));
        }

        Self { hidden }
    }

    /// Whether a single group is visible.
    pub fn is_group_visible(&self, group: ObjRef) -> bool {
        !self.hidden.contains(&group)
    }

    /// Show or hide a group.
    pub fn set_group_visible(&mut self, group: ObjRef, visible: bool) {
        if visible {
            self.hidden.remove(&group);
        } else {
            self.hidden.insert(group);
        }
    }

    /// Whether content with the given membership is visible.
    pub fn is_visible(&self, membership: &OcMembership) -> bool {
        match membership {
            OcMembership::Group(group) => self.is_group_visible(*group),
            OcMembership::Membership { groups, policy } => {
                if groups.is_empty() {
                    return true;
                }

                let mut visible = groups.iter().map(|g| self.is_group_visible(*g));

                match policy {
                    VisibilityPolicy::AnyOn => visible.any(|v| v),
                    VisibilityPolicy::AllOn => visible.all(|v| v),
                    VisibilityPolicy::AnyOff => visible.any(|v| !v),
                    VisibilityPolicy::AllOff => visible.all(|v| !v),
                }
            }
        }
    }
}

fn references(array: &Array) -> impl Iterator<Item = ObjRef> + '_ {
    array.iter().filter_map(|item| match item {
        Object::Reference(r) => Some(*r),
        _ => None,
    })
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
enum BaseState {
    On,
    Off,
    Unchanged,
}

impl BaseState {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"ON" => Some(Self::On),
            b"OFF" => Some(Self::Off),
            b"Unchanged" => Some(Self::Unchanged),
            _ => None,
        }
    }
}

/// How the visibility of the groups of a membership dictionary is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityPolicy {
    /// Visible if any group is visible.
    #[default]
    AnyOn,
    /// Visible if all groups are visible.
    AllOn,
    /// Visible if any group is hidden.
    AnyOff,
    /// Visible if all groups are hidden.
    AllOff,
}

impl VisibilityPolicy {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            ANY_ON => Some(Self::AnyOn),
            ALL_ON => Some(Self::AllOn),
            ANY_OFF => Some(Self::AnyOff),
            ALL_OFF => Some(Self::AllOff),
            _ => None,
        }
    }
}

/// The optional content that a piece of content belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcMembership {
    /// A single optional content group.
    Group(ObjRef),
    /// An optional content membership dictionary.
    Membership {
        /// The groups.
        groups: SmallVec<[ObjRef; 4]>,
        /// How their visibility is combined.
        policy: VisibilityPolicy,
    },
}

impl OcMembership {
    /// Resolve the value of an `/OC` entry or of a marked content property.
    ///
    /// Groups are identified by their reference, so a group must be an
    /// indirect object.
    pub fn resolve(object: &Object, xref: &XRef) -> Option<Self> {
        let reference = match object {
            Object::Reference(r) => Some(*r),
            _ => None,
        };
        let dict = xref.resolve_as::<Dict>(object)?;
        let kind = dict.get::<Name>(TYPE);

        match kind.as_deref() {
            Some(OCG) => reference.map(Self::Group).or_else(|| {
                warn!("optional content group is not an indirect object");

                None
            }),
            Some(OCMD) => {
                let groups = match dict.get_raw(OCGS) {
                    Some(Object::Reference(r)) => SmallVec::from_iter([*r]),
                    Some(other) => xref
                        .resolve_as::<Array>(other)
                        .map(|a| references(&a).collect())
                        .unwrap_or_default(),
                    None => SmallVec::new(),
                };

                let policy = xref
                    .get::<Name>(&dict, P)
                    .and_then(|p| VisibilityPolicy::from_name(&p))
                    .unwrap_or_default();

                Some(Self::Membership { groups, policy })
            }
            _ => {
                warn!("unknown optional content type {kind:?}");

                None
            }
        }
    }
}

/// The visibility of nested optional content while replaying.
#[derive(Debug, Clone, Default)]
pub struct OptionalContentState {
    visibility_stack: Vec<bool>,
}

impl OptionalContentState {
    /// Create a new state in which everything is visible.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter optional content. It is only visible if the enclosing content is
    /// visible as well.
    pub fn push(&mut self, membership: &OcMembership, config: &OcgConfig) {
        let visible = self.is_visible() && config.is_visible(membership);
        self.visibility_stack.push(visible);
    }

    /// Leave the innermost optional content.
    pub fn pop(&mut self) {
        self.visibility_stack.pop();
    }

    /// Whether content at the current nesting is visible.
    pub fn is_visible(&self) -> bool {
        self.visibility_stack.last().copied().unwrap_or(true)
    }

    /// The nesting depth.
    pub fn depth(&self) -> usize {
        self.visibility_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rime_syntax::parse_object;

    fn dict(data: &[u8]) -> Dict {
        parse_object(data).unwrap().cast::<Dict>().unwrap()
    }

    fn xref() -> XRef {
        let mut xref = XRef::new();
        for i in 1..=3 {
            xref.insert(ObjRef::new(i, 0), dict(b"<< /Type /OCG /Name (layer) >>"));
        }

        xref
    }

    const G1: ObjRef = ObjRef::new(1, 0);
    const G2: ObjRef = ObjRef::new(2, 0);
    const G3: ObjRef = ObjRef::new(3, 0);

    #[test]
    fn off_array() {
        let catalog = dict(
            b"<< /OCProperties << /OCGs [1 0 R 2 0 R 3 0 R] /D << /OFF [2 0 R] >> >> >>",
        );
        let config = OcgConfig::from_catalog(&catalog, &xref());

        assert!(config.is_group_visible(G1));
        assert!(!config.is_group_visible(G2));
        assert!(config.is_group_visible(G3));
    }

    #[test]
    fn base_state_off() {
        let catalog = dict(
            b"<< /OCProperties << /OCGs [1 0 R 2 0 R 3 0 R]
                  /D << /BaseState /OFF /ON [3 0 R] >> >> >>",
        );
        let config = OcgConfig::from_catalog(&catalog, &xref());

        assert!(!config.is_group_visible(G1));
        assert!(!config.is_group_visible(G2));
        assert!(config.is_group_visible(G3));
    }

    #[test]
    fn missing_properties() {
        let config = OcgConfig::from_catalog(&Dict::new(), &xref());

        assert_eq!(config, OcgConfig::all_visible());
    }

    #[test]
    fn membership_policies() {
        let mut config = OcgConfig::all_visible();
        config.set_group_visible(G2, false);

        let membership = |policy| OcMembership::Membership {
            groups: SmallVec::from_iter([G1, G2]),
            policy,
        };

        assert!(config.is_visible(&membership(VisibilityPolicy::AnyOn)));
        assert!(!config.is_visible(&membership(VisibilityPolicy::AllOn)));
        assert!(config.is_visible(&membership(VisibilityPolicy::AnyOff)));
        assert!(!config.is_visible(&membership(VisibilityPolicy::AllOff)));
    }

    #[test]
    fn resolve_membership() {
        let mut xref = xref();
        xref.insert(
            ObjRef::new(4, 0),
            dict(b"<< /Type /OCMD /OCGs [1 0 R 3 0 R] /P /AllOn >>"),
        );

        assert_eq!(
            OcMembership::resolve(&Object::Reference(G2), &xref),
            Some(OcMembership::Group(G2))
        );
        assert_eq!(
            OcMembership::resolve(&Object::Reference(ObjRef::new(4, 0)), &xref),
            Some(OcMembership::Membership {
                groups: SmallVec::from_iter([G1, G3]),
                policy: VisibilityPolicy::AllOn,
            })
        );

        let direct = parse_object(b"<< /Type /OCMD /OCGs 2 0 R >>").unwrap();
        assert_eq!(
            OcMembership::resolve(&direct, &xref),
            Some(OcMembership::Membership {
                groups: SmallVec::from_iter([G2]),
                policy: VisibilityPolicy::AnyOn,
            })
        );

        assert_eq!(OcMembership::resolve(&Object::Null, &xref), None);
    }

    #[test]
    fn nested_visibility() {
        let mut config = OcgConfig::all_visible();
        config.set_group_visible(G1, false);

        let mut state = OptionalContentState::new();
        state.push(&OcMembership::Group(G1), &config);
        assert!(!state.is_visible());

        // Nested content of a hidden group stays hidden.
        state.push(&OcMembership::Group(G2), &config);
        assert!(!state.is_visible());

        state.pop();
        state.pop();
        assert!(state.is_visible());
        assert_eq!(state.depth(), 0);
    }
}
