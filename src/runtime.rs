//! Runtime helpers.
//!
//! Bundles that mix module systems need a few lines of glue: lazy
//! CommonJS closures, getter-based namespace objects, and conversions
//! between ESM namespaces and CommonJS `exports` objects. Each helper is
//! emitted at most once per chunk and only when something in the chunk
//! calls it; [`Helpers::with_dependencies`] adds the helpers a helper is
//! built from.

use bitflags::bitflags;

bitflags! {
    /// Runtime helpers a chunk needs.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Helpers: u16 {
        const CREATE = 1 << 0;
        const DEF_PROP = 1 << 1;
        const GET_PROTO_OF = 1 << 2;
        const HAS_OWN_PROP = 1 << 3;
        const GET_OWN_PROP_NAMES = 1 << 4;
        const GET_OWN_PROP_DESC = 1 << 5;
        const MARK_AS_MODULE = 1 << 6;
        const COMMON_JS = 1 << 7;
        const EXPORT = 1 << 8;
        const COPY_PROPS = 1 << 9;
        const RE_EXPORT = 1 << 10;
        const TO_ESM = 1 << 11;
        const TO_COMMON_JS = 1 << 12;
        const REQUIRE = 1 << 13;
    }
}

/// Emission order, name and text of every helper. Later helpers only
/// refer to earlier ones.
const HELPERS: &[(Helpers, &str, &str)] = &[
    (Helpers::CREATE, "__create", "var __create = Object.create;"),
    (
        Helpers::DEF_PROP,
        "__defProp",
        "var __defProp = Object.defineProperty;",
    ),
    (
        Helpers::GET_PROTO_OF,
        "__getProtoOf",
        "var __getProtoOf = Object.getPrototypeOf;",
    ),
    (
        Helpers::HAS_OWN_PROP,
        "__hasOwnProp",
        "var __hasOwnProp = Object.prototype.hasOwnProperty;",
    ),
    (
        Helpers::GET_OWN_PROP_NAMES,
        "__getOwnPropNames",
        "var __getOwnPropNames = Object.getOwnPropertyNames;",
    ),
    (
        Helpers::GET_OWN_PROP_DESC,
        "__getOwnPropDesc",
        "var __getOwnPropDesc = Object.getOwnPropertyDescriptor;",
    ),
    (
        Helpers::MARK_AS_MODULE,
        "__markAsModule",
        "var __markAsModule = (target) => __defProp(target, \"__esModule\", { value: true });",
    ),
    (
        Helpers::COMMON_JS,
        "__commonJS",
        "var __commonJS = (cb, mod) => function __require() {
  return mod || (0, cb[__getOwnPropNames(cb)[0]])((mod = { exports: {} }).exports, mod), mod.exports;
};",
    ),
    (
        Helpers::EXPORT,
        "__export",
        "var __export = (target, all) => {
  for (var name in all)
    __defProp(target, name, { get: all[name], enumerable: true });
};",
    ),
    (
        Helpers::COPY_PROPS,
        "__copyProps",
        "var __copyProps = (to, from, except, desc) => {
  if (from && typeof from === \"object\" || typeof from === \"function\") {
    for (let key of __getOwnPropNames(from))
      if (!__hasOwnProp.call(to, key) && key !== except)
        __defProp(to, key, { get: () => from[key], enumerable: !(desc = __getOwnPropDesc(from, key)) || desc.enumerable });
  }
  return to;
};",
    ),
    (
        Helpers::RE_EXPORT,
        "__reExport",
        "var __reExport = (target, mod) => __copyProps(target, mod, \"default\");",
    ),
    (
        Helpers::TO_ESM,
        "__toESM",
        "var __toESM = (mod, isNodeMode, target) => (target = mod != null ? __create(__getProtoOf(mod)) : {}, __copyProps(
  isNodeMode || !mod || !mod.__esModule ? __defProp(target, \"default\", { value: mod, enumerable: true }) : target,
  mod
));",
    ),
    (
        Helpers::TO_COMMON_JS,
        "__toCommonJS",
        "var __toCommonJS = (mod) => __copyProps(__defProp({}, \"__esModule\", { value: true }), mod);",
    ),
    (
        Helpers::REQUIRE,
        "__require",
        "var __require = typeof require !== \"undefined\" ? require : (x) => {
  throw Error('Dynamic require of \"' + x + '\" is not supported');
};",
    ),
];

impl Helpers {
    /// `self` plus every helper the selected ones call.
    pub fn with_dependencies(self) -> Helpers {
        let mut all = self;
        if all.contains(Helpers::TO_ESM) {
            all |= Helpers::CREATE | Helpers::GET_PROTO_OF | Helpers::DEF_PROP | Helpers::COPY_PROPS;
        }
        if all.intersects(Helpers::RE_EXPORT | Helpers::TO_COMMON_JS) {
            all |= Helpers::COPY_PROPS;
        }
        if all.contains(Helpers::TO_COMMON_JS) {
            all |= Helpers::DEF_PROP;
        }
        if all.contains(Helpers::COPY_PROPS) {
            all |= Helpers::DEF_PROP
                | Helpers::HAS_OWN_PROP
                | Helpers::GET_OWN_PROP_NAMES
                | Helpers::GET_OWN_PROP_DESC;
        }
        if all.contains(Helpers::COMMON_JS) {
            all |= Helpers::GET_OWN_PROP_NAMES;
        }
        if all.intersects(Helpers::EXPORT | Helpers::MARK_AS_MODULE) {
            all |= Helpers::DEF_PROP;
        }
        all
    }

    /// Source text of the selected helpers and their dependencies, one
    /// declaration per line group, in a fixed order.
    pub fn source(self) -> String {
        let all = self.with_dependencies();
        let mut out = String::new();
        for (flag, _, text) in HELPERS {
            if all.contains(*flag) {
                out.push_str(text);
                out.push('\n');
            }
        }
        out
    }
}

/// Names the helpers occupy in every chunk. User bindings are renamed
/// around them.
pub fn helper_names() -> impl Iterator<Item = &'static str> {
    HELPERS.iter().map(|(_, name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_helpers_no_text() {
        assert_eq!(Helpers::empty().source(), "");
    }

    #[test]
    fn test_to_esm_pulls_in_its_building_blocks() {
        let all = Helpers::TO_ESM.with_dependencies();
        assert!(all.contains(Helpers::COPY_PROPS));
        assert!(all.contains(Helpers::CREATE));
        assert!(all.contains(Helpers::GET_OWN_PROP_DESC));
        assert!(!all.contains(Helpers::COMMON_JS));
    }

    #[test]
    fn test_dependencies_are_declared_first() {
        let text = (Helpers::COMMON_JS | Helpers::EXPORT).source();
        let props = text.find("var __getOwnPropNames").unwrap();
        let common = text.find("var __commonJS").unwrap();
        let def = text.find("var __defProp").unwrap();
        let export = text.find("var __export").unwrap();
        assert!(props < common);
        assert!(def < export);
        assert!(!text.contains("__toESM"));
    }

    #[test]
    fn test_every_helper_name_is_declared_by_its_text() {
        for (_, name, text) in HELPERS {
            assert!(text.starts_with(&format!("var {} = ", name)), "{}", name);
        }
        assert!(helper_names().any(|name| name == "__require"));
    }
}
