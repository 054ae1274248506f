//! Resolver tests against an in-memory file tree.
//!
//! Sections:
//! - Relative paths, extensions and directories
//! - Packages: main fields, exports, imports, self-reference
//! - Browser map and built-ins
//! - Aliases, externals and tsconfig paths

use super::*;
use crate::config::BuildOptions;
use crate::fs::MemoryFileSystem;

// =============================================================================
// Test Helpers
// =============================================================================

fn resolver_with(fs: MemoryFileSystem, configure: impl FnOnce(&mut BuildOptions)) -> ModuleResolver {
    let mut options = BuildOptions::new("/proj", vec![PathBuf::from("src/index.js")]);
    configure(&mut options);
    ModuleResolver::new(Arc::new(fs), ResolverOptions::from_build_options(&options)).unwrap()
}

fn resolve(resolver: &mut ModuleResolver, specifier: &str, importer: &str) -> Result<Resolution, ResolutionFailure> {
    resolver.resolve(
        specifier,
        Some(Path::new(importer)),
        ImportKind::ImportStatement,
        Span::dummy(),
    )
}

fn internal(path: &str) -> Resolution {
    Resolution::Internal(ModulePath::file(path))
}

// =============================================================================
// Relative paths
// =============================================================================

#[test]
fn test_relative_exact_then_extensions_then_index() {
    let fs = MemoryFileSystem::new()
        .with_file("/proj/src/index.js", "")
        .with_file("/proj/src/a.ts", "")
        .with_file("/proj/src/a.js", "")
        .with_file("/proj/src/dir/index.jsx", "")
        .with_file("/proj/src/data", "");
    let mut resolver = resolver_with(fs, |_| {});

    // .ts comes before .js in the default extension order
    assert_eq!(resolve(&mut resolver, "./a", "/proj/src/index.js"), Ok(internal("/proj/src/a.ts")));
    assert_eq!(resolve(&mut resolver, "./a.js", "/proj/src/index.js"), Ok(internal("/proj/src/a.js")));
    assert_eq!(resolve(&mut resolver, "./dir", "/proj/src/index.js"), Ok(internal("/proj/src/dir/index.jsx")));
    assert_eq!(resolve(&mut resolver, "./data", "/proj/src/index.js"), Ok(internal("/proj/src/data")));
    assert_eq!(resolve(&mut resolver, "/proj/src/a.js", "/proj/src/index.js"), Ok(internal("/proj/src/a.js")));
}

#[test]
fn test_js_extension_rewrites_to_typescript() {
    let fs = MemoryFileSystem::new().with_file("/proj/src/util.ts", "");
    let mut resolver = resolver_with(fs, |_| {});
    assert_eq!(
        resolve(&mut resolver, "./util.js", "/proj/src/index.ts"),
        Ok(internal("/proj/src/util.ts"))
    );
}

#[test]
fn test_query_and_fragment_are_part_of_identity() {
    let fs = MemoryFileSystem::new().with_file("/proj/src/a.js", "");
    let mut resolver = resolver_with(fs, |_| {});
    let Ok(Resolution::Internal(with_query)) = resolve(&mut resolver, "./a.js?raw#top", "/proj/src/index.js") else {
        panic!("expected internal module");
    };
    assert_eq!(with_query.path, PathBuf::from("/proj/src/a.js"));
    assert_eq!(with_query.query.as_deref(), Some("raw"));
    assert_eq!(with_query.fragment.as_deref(), Some("top"));
    assert_ne!(with_query, ModulePath::file("/proj/src/a.js"));
    assert_eq!(with_query.display(Path::new("/proj")), "src/a.js?raw#top");
}

#[test]
fn test_missing_relative_file_is_not_found() {
    let mut resolver = resolver_with(MemoryFileSystem::new(), |_| {});
    let err = resolve(&mut resolver, "./nope", "/proj/src/index.js").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.containing_file(), "src/index.js");
    let diag = err.to_diagnostic();
    assert_eq!(diag.code, codes::CANNOT_RESOLVE);
    assert_eq!(diag.kind, ErrorKind::Resolution);
    assert!(diag.message.contains("\"./nope\""));
}

// =============================================================================
// Packages
// =============================================================================

#[test]
fn test_main_fields_follow_platform_order() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "/proj/node_modules/pkg/package.json",
            r#"{ "main": "./cjs.js", "module": "./esm.js" }"#,
        )
        .with_file("/proj/node_modules/pkg/cjs.js", "")
        .with_file("/proj/node_modules/pkg/esm.js", "");

    let mut browser = resolver_with(fs.clone(), |_| {});
    assert_eq!(
        resolve(&mut browser, "pkg", "/proj/src/index.js"),
        Ok(internal("/proj/node_modules/pkg/esm.js"))
    );

    let mut node = resolver_with(fs, |o| o.platform = Platform::Node);
    assert_eq!(
        resolve(&mut node, "pkg", "/proj/src/index.js"),
        Ok(internal("/proj/node_modules/pkg/cjs.js"))
    );
}

#[test]
fn test_node_modules_walks_up() {
    let fs = MemoryFileSystem::new()
        .with_file("/proj/node_modules/up/index.js", "")
        .with_file("/proj/src/deep/node_modules/near/index.js", "");
    let mut resolver = resolver_with(fs, |_| {});
    assert_eq!(
        resolve(&mut resolver, "up", "/proj/src/deep/file.js"),
        Ok(internal("/proj/node_modules/up/index.js"))
    );
    assert_eq!(
        resolve(&mut resolver, "near", "/proj/src/deep/file.js"),
        Ok(internal("/proj/src/deep/node_modules/near/index.js"))
    );
    assert!(resolve(&mut resolver, "near", "/proj/src/file.js").is_err());
}

#[test]
fn test_exports_conditions_by_record_kind() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "/proj/node_modules/dual/package.json",
            r#"{ "exports": { ".": { "require": "./index.cjs", "import": "./index.mjs" }, "./feature": "./lib/feature.js" } }"#,
        )
        .with_file("/proj/node_modules/dual/index.cjs", "")
        .with_file("/proj/node_modules/dual/index.mjs", "")
        .with_file("/proj/node_modules/dual/lib/feature.js", "");
    let mut resolver = resolver_with(fs, |o| o.conditions = Some(Vec::new()));

    assert_eq!(
        resolve(&mut resolver, "dual", "/proj/index.js"),
        Ok(internal("/proj/node_modules/dual/index.mjs"))
    );
    assert_eq!(
        resolver.resolve("dual", Some(Path::new("/proj/index.js")), ImportKind::RequireCall, Span::dummy()),
        Ok(internal("/proj/node_modules/dual/index.cjs"))
    );
    assert_eq!(
        resolve(&mut resolver, "dual/feature", "/proj/index.js"),
        Ok(internal("/proj/node_modules/dual/lib/feature.js"))
    );

    let err = resolve(&mut resolver, "dual/lib/feature.js", "/proj/index.js").unwrap_err();
    assert!(matches!(err, ResolutionFailure::NotExported { .. }));
    assert_eq!(err.to_diagnostic().code, codes::NOT_EXPORTED_BY_PACKAGE);
}

#[test]
fn test_custom_conditions_win() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "/proj/node_modules/c/package.json",
            r#"{ "exports": { "import": "./import.js", "custom": "./custom.js" } }"#,
        )
        .with_file("/proj/node_modules/c/import.js", "")
        .with_file("/proj/node_modules/c/custom.js", "");
    let mut resolver = resolver_with(fs, |o| o.conditions = Some(vec!["custom".to_string()]));
    assert_eq!(
        resolve(&mut resolver, "c", "/proj/index.js"),
        Ok(internal("/proj/node_modules/c/custom.js"))
    );
}

#[test]
fn test_exports_target_must_exist_and_be_valid() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "/proj/node_modules/bad/package.json",
            r#"{ "exports": { ".": "./missing.js", "./evil": "./../outside.js", "./dir/": "./lib" } }"#,
        );
    let mut resolver = resolver_with(fs, |_| {});
    assert!(resolve(&mut resolver, "bad", "/proj/index.js").unwrap_err().is_not_found());
    assert!(matches!(
        resolve(&mut resolver, "bad/evil", "/proj/index.js"),
        Err(ResolutionFailure::InvalidPackageTarget { .. })
    ));
    assert!(matches!(
        resolve(&mut resolver, "bad/dir/x.js", "/proj/index.js"),
        Err(ResolutionFailure::InvalidPackageTarget { .. })
    ));
}

#[test]
fn test_package_imports_field() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "/proj/package.json",
            r##"{ "name": "app", "imports": { "#util/*": "./src/util/*.js", "#dep": "dep" } }"##,
        )
        .with_file("/proj/src/util/str.js", "")
        .with_file("/proj/node_modules/dep/index.js", "");
    let mut resolver = resolver_with(fs, |_| {});
    assert_eq!(
        resolve(&mut resolver, "#util/str", "/proj/src/index.js"),
        Ok(internal("/proj/src/util/str.js"))
    );
    assert_eq!(
        resolve(&mut resolver, "#dep", "/proj/src/index.js"),
        Ok(internal("/proj/node_modules/dep/index.js"))
    );
    assert!(resolve(&mut resolver, "#nope", "/proj/src/index.js").is_err());
}

#[test]
fn test_self_reference_uses_exports() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "/proj/package.json",
            r#"{ "name": "my-lib", "exports": { "./helpers": "./src/helpers.js" } }"#,
        )
        .with_file("/proj/src/helpers.js", "");
    let mut resolver = resolver_with(fs, |_| {});
    assert_eq!(
        resolve(&mut resolver, "my-lib/helpers", "/proj/src/index.js"),
        Ok(internal("/proj/src/helpers.js"))
    );
}

#[test]
fn test_invalid_package_json_is_reported() {
    let fs = MemoryFileSystem::new()
        .with_file("/proj/node_modules/broken/package.json", "{ not json")
        .with_file("/proj/node_modules/broken/index.js", "");
    let mut resolver = resolver_with(fs, |_| {});
    let err = resolve(&mut resolver, "broken", "/proj/index.js").unwrap_err();
    assert!(matches!(err, ResolutionFailure::PackageJsonError { .. }));
}

// =============================================================================
// Browser map and built-ins
// =============================================================================

#[test]
fn test_browser_map_remaps_and_disables() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "/proj/node_modules/b/package.json",
            r#"{ "main": "./node.js", "browser": { "./node.js": "./browser.js", "fs": false, "./server.js": false } }"#,
        )
        .with_file("/proj/node_modules/b/node.js", "")
        .with_file("/proj/node_modules/b/browser.js", "")
        .with_file("/proj/node_modules/b/server.js", "");

    let mut browser = resolver_with(fs.clone(), |_| {});
    assert_eq!(
        resolve(&mut browser, "b", "/proj/index.js"),
        Ok(internal("/proj/node_modules/b/browser.js"))
    );
    let Ok(Resolution::Internal(disabled)) = resolve(&mut browser, "fs", "/proj/node_modules/b/browser.js") else {
        panic!("expected disabled module");
    };
    assert!(disabled.disabled);
    let Ok(Resolution::Internal(server)) = resolve(&mut browser, "./server", "/proj/node_modules/b/browser.js") else {
        panic!("expected disabled module");
    };
    assert!(server.disabled);
    assert_eq!(server.path, PathBuf::from("/proj/node_modules/b/server.js"));

    let mut node = resolver_with(fs, |o| o.platform = Platform::Node);
    assert_eq!(
        resolve(&mut node, "b", "/proj/index.js"),
        Ok(internal("/proj/node_modules/b/node.js"))
    );
}

#[test]
fn test_browser_map_ignored_when_exports_present() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "/proj/node_modules/e/package.json",
            r#"{ "exports": "./main.js", "browser": { "./main.js": "./other.js" } }"#,
        )
        .with_file("/proj/node_modules/e/main.js", "")
        .with_file("/proj/node_modules/e/other.js", "");
    let mut resolver = resolver_with(fs, |_| {});
    assert_eq!(
        resolve(&mut resolver, "e", "/proj/index.js"),
        Ok(internal("/proj/node_modules/e/main.js"))
    );
}

#[test]
fn test_builtins_preferred_on_node_only() {
    let fs = MemoryFileSystem::new().with_file("/proj/node_modules/fs/index.js", "");

    let mut node = resolver_with(fs.clone(), |o| o.platform = Platform::Node);
    assert_eq!(
        resolve(&mut node, "fs", "/proj/index.js"),
        Ok(Resolution::External("fs".to_string()))
    );
    assert_eq!(
        resolve(&mut node, "node:path", "/proj/index.js"),
        Ok(Resolution::External("node:path".to_string()))
    );

    let mut browser = resolver_with(fs, |_| {});
    assert_eq!(
        resolve(&mut browser, "fs", "/proj/index.js"),
        Ok(internal("/proj/node_modules/fs/index.js"))
    );
    let err = resolve(&mut browser, "path", "/proj/index.js").unwrap_err();
    assert!(err.to_diagnostic().message.contains("built-in"));
}

#[test]
fn test_bun_prefix_is_builtin() {
    assert!(is_builtin("bun:sqlite", Platform::Bun));
    assert!(!is_builtin("bun:sqlite", Platform::Node));
    assert!(!is_builtin("fs", Platform::Neutral));
}

// =============================================================================
// Aliases, externals and tsconfig paths
// =============================================================================

#[test]
fn test_alias_longest_prefix() {
    let fs = MemoryFileSystem::new()
        .with_file("/proj/node_modules/preact/compat/index.js", "")
        .with_file("/proj/node_modules/preact-dom/index.js", "")
        .with_file("/proj/lib/shim.js", "");
    let mut resolver = resolver_with(fs, |o| {
        o.alias.insert("react".to_string(), "preact/compat".to_string());
        o.alias.insert("react-dom".to_string(), "preact-dom".to_string());
        o.alias.insert("@scope/shim".to_string(), "./lib/shim.js".to_string());
    });
    assert_eq!(
        resolve(&mut resolver, "react", "/proj/src/index.js"),
        Ok(internal("/proj/node_modules/preact/compat/index.js"))
    );
    assert_eq!(
        resolve(&mut resolver, "react-dom", "/proj/src/index.js"),
        Ok(internal("/proj/node_modules/preact-dom/index.js"))
    );
    assert_eq!(
        resolve(&mut resolver, "@scope/shim", "/proj/src/index.js"),
        Ok(internal("/proj/lib/shim.js"))
    );
}

#[test]
fn test_external_patterns() {
    let mut resolver = resolver_with(MemoryFileSystem::new(), |o| {
        o.external = vec!["lodash".to_string(), "@acme/*".to_string(), "https://*".to_string()];
    });
    for specifier in ["lodash", "lodash/fp", "@acme/ui", "https://cdn.example/x.js"] {
        assert_eq!(
            resolve(&mut resolver, specifier, "/proj/index.js"),
            Ok(Resolution::External(specifier.to_string())),
            "{} should be external",
            specifier
        );
    }
    assert!(resolve(&mut resolver, "lodash-es", "/proj/index.js").is_err());
}

#[test]
fn test_tsconfig_paths_in_order_with_fallback() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "/proj/tsconfig.json",
            r#"{ "compilerOptions": { "baseUrl": ".", "paths": { "@lib/*": ["missing/*", "src/lib/*"], "pkg": ["nowhere"] } } }"#,
        )
        .with_file("/proj/src/lib/math.ts", "")
        .with_file("/proj/node_modules/pkg/index.js", "")
        .with_file("/proj/src/plain.js", "");
    let mut resolver = resolver_with(fs, |_| {});
    assert_eq!(
        resolve(&mut resolver, "@lib/math", "/proj/src/index.ts"),
        Ok(internal("/proj/src/lib/math.ts"))
    );
    // Unmatched candidates fall through to node_modules
    assert_eq!(
        resolve(&mut resolver, "pkg", "/proj/src/index.ts"),
        Ok(internal("/proj/node_modules/pkg/index.js"))
    );
    // baseUrl
    assert_eq!(
        resolve(&mut resolver, "src/plain", "/proj/src/index.ts"),
        Ok(internal("/proj/src/plain.js"))
    );
    let err = resolve(&mut resolver, "@lib/none", "/proj/src/index.ts").unwrap_err();
    assert!(matches!(err, ResolutionFailure::PathMappingFailed { .. }));
}

#[test]
fn test_module_suffixes() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "/proj/tsconfig.json",
            r#"{ "compilerOptions": { "moduleSuffixes": [".ios", ""] } }"#,
        )
        .with_file("/proj/src/button.ios.ts", "")
        .with_file("/proj/src/button.ts", "");
    let mut resolver = resolver_with(fs, |_| {});
    assert_eq!(
        resolve(&mut resolver, "./button", "/proj/src/index.ts"),
        Ok(internal("/proj/src/button.ios.ts"))
    );
}

#[test]
fn test_manifest_side_effects_lookup() {
    let fs = MemoryFileSystem::new()
        .with_file("/proj/node_modules/pure/package.json", r#"{ "sideEffects": false }"#)
        .with_file("/proj/node_modules/pure/index.js", "");
    let mut resolver = resolver_with(fs, |_| {});
    assert!(!resolver.manifest_side_effects(Path::new("/proj/node_modules/pure/index.js")));
    assert!(resolver.manifest_side_effects(Path::new("/proj/src/index.js")));
}
