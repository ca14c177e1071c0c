//! Resources of pages and form XObjects.

use crate::color::ColorSpace;
use rime_syntax::XRef;
use rime_syntax::object::dict::keys::{COLOR_SPACE, EXT_G_STATE, PROPERTIES, XOBJECT};
use rime_syntax::object::{Dict, Name, Object, Stream};
use std::sync::Arc;

/// The resources of a page or form XObject, together with the object store
/// they live in.
#[derive(Debug, Clone)]
pub struct Resources {
    xref: Arc<XRef>,
    parent: Option<Arc<Resources>>,
    /// The raw dictionary of color spaces.
    pub color_spaces: Dict,
    /// The raw dictionary of XObjects.
    pub x_objects: Dict,
    /// The raw dictionary of external graphics states.
    pub ext_g_states: Dict,
    /// The raw dictionary of properties.
    pub properties: Dict,
}

impl Resources {
    /// Create a new `Resources` object from a resource dictionary.
    pub fn new(resources: &Dict, xref: Arc<XRef>) -> Self {
        let sub_dict = |key| xref.get::<Dict>(resources, key).unwrap_or_default();

        Self {
            color_spaces: sub_dict(COLOR_SPACE),
            x_objects: sub_dict(XOBJECT),
            ext_g_states: sub_dict(EXT_G_STATE),
            properties: sub_dict(PROPERTIES),
            parent: None,
            xref,
        }
    }

    /// Create a new `Resources` object that falls back to `parent` for
    /// names it doesn't define.
    pub fn from_parent(resources: &Dict, parent: Self) -> Self {
        let mut resources = Self::new(resources, parent.xref.clone());
        resources.parent = Some(Arc::new(parent));

        resources
    }

    /// The object store.
    pub fn xref(&self) -> &XRef {
        &self.xref
    }

    /// Get the parent in the resource chain, if available.
    pub fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }

    /// Get the raw color space object with the given name.
    pub fn get_color_space(&self, name: &Name) -> Option<Object> {
        self.color_spaces
            .get_raw(name)
            .and_then(|o| self.xref.resolve(o))
            .or_else(|| self.parent.as_ref().and_then(|p| p.get_color_space(name)))
    }

    /// Get an XObject by name.
    pub fn get_x_object(&self, name: &Name) -> Option<Stream> {
        self.xref
            .get::<Stream>(&self.x_objects, name)
            .or_else(|| self.parent.as_ref().and_then(|p| p.get_x_object(name)))
    }

    /// Get an external graphics state by name.
    pub fn get_ext_g_state(&self, name: &Name) -> Option<Dict> {
        self.xref
            .get::<Dict>(&self.ext_g_states, name)
            .or_else(|| self.parent.as_ref().and_then(|p| p.get_ext_g_state(name)))
    }

    /// Get a property list, like an optional content group, by name.
    pub fn get_property(&self, name: &Name) -> Option<Object> {
        self.properties
            .get_raw(name)
            .cloned()
            .or_else(|| self.parent.as_ref().and_then(|p| p.get_property(name)))
    }

    /// Resolve a color space operand, which is either one of the names that
    /// can be used directly, a name in the resources or a color space array.
    pub fn resolve_color_space(&self, object: &Object) -> Option<ColorSpace> {
        if let Object::Name(name) = object
            && let Some(cs) = ColorSpace::from_name(name)
        {
            return Some(cs);
        }

        if let Object::Name(name) = object {
            return ColorSpace::new(&self.get_color_space(name)?, &self.xref);
        }

        ColorSpace::new(object, &self.xref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rime_syntax::object::ObjRef;
    use rime_syntax::parse_object;

    fn dict(source: &[u8]) -> Dict {
        parse_object(source).unwrap().cast::<Dict>().unwrap()
    }

    #[test]
    fn lookup_falls_back_to_parent() {
        let mut xref = XRef::new();
        xref.insert(ObjRef::new(3, 0), dict(b"<< /CA 0.5 >>"));
        let xref = Arc::new(xref);

        let parent = Resources::new(
            &dict(b"<< /ExtGState << /GS0 3 0 R >> /ColorSpace << /CS0 /DeviceRGB >> >>"),
            xref,
        );
        let child = Resources::from_parent(
            &dict(b"<< /ColorSpace << /CS0 [/ICCBased 9 0 R] /CS1 /DeviceCMYK >> >>"),
            parent,
        );

        assert_eq!(
            child.get_ext_g_state(&Name::new(b"GS0")).unwrap().get::<f32>(b"CA"),
            Some(0.5)
        );
        assert!(matches!(
            child.resolve_color_space(&Object::Name(Name::new(b"CS1"))),
            Some(ColorSpace::DeviceCmyk)
        ));
        // Names are resolved in the child first, even if they are broken there.
        assert!(child.resolve_color_space(&Object::Name(Name::new(b"CS0"))).is_none());
        assert!(child.parent().is_some());
        assert!(child.get_x_object(&Name::new(b"Im0")).is_none());
    }

    #[test]
    fn device_names_need_no_resources() {
        let resources = Resources::new(&Dict::new(), Arc::new(XRef::new()));

        assert!(matches!(
            resources.resolve_color_space(&Object::Name(Name::new(b"DeviceGray"))),
            Some(ColorSpace::DeviceGray)
        ));
    }
}
