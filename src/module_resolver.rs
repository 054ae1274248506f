//! Module specifier resolution.
//!
//! Turns an import specifier plus the importing file into a module identity:
//! an absolute path with optional query/fragment, an external reference, or a
//! disabled (stubbed-out) module. Steps, in order:
//!
//! 1. Aliases (longest matching key) and externals
//! 2. tsconfig `paths` / `baseUrl`
//! 3. Relative and absolute paths: exact file, configured extensions, the
//!    `.js` → `.ts` rewrite, directory main fields, `index.*`
//! 4. `#imports`, runtime built-ins, self-references, then `node_modules`
//!    walking with `exports` conditions, the `browser` map and main fields
//!
//! Manifests and tsconfig files are cached per directory for the lifetime of
//! one build.

use crate::config::{BuildOptions, Platform};
use crate::diagnostics::{Diagnostic, ErrorKind, codes};
use crate::fs::{FileSystem, normalize_path, relative_display};
use crate::module_graph::ImportKind;
use crate::package_json::{
    BrowserTarget, ExportsResolution, PackageJson, PackageType, parse_package_specifier,
    resolve_exports,
};
use crate::span::Span;
use crate::tsconfig::{TsConfig, load_tsconfig};
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Runtime built-in modules of Node-compatible platforms.
const NODE_BUILTINS: &[&str] = &[
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "sys",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

/// Whether `specifier` names a runtime built-in on `platform`.
pub fn is_builtin(specifier: &str, platform: Platform) -> bool {
    if !platform.has_builtins() {
        return false;
    }
    if specifier.starts_with("node:") {
        return true;
    }
    if platform == Platform::Bun && specifier.starts_with("bun:") {
        return true;
    }
    NODE_BUILTINS.contains(&specifier)
}

/// Identity of a module in the graph. Each distinct combination of path,
/// query and fragment is a distinct module.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath {
    pub path: PathBuf,
    pub query: Option<String>,
    pub fragment: Option<String>,
    /// Stubbed out by a `browser` map `false` entry
    pub disabled: bool,
}

impl ModulePath {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        ModulePath {
            path: path.into(),
            query: None,
            fragment: None,
            disabled: false,
        }
    }

    fn disabled(path: impl Into<PathBuf>) -> Self {
        ModulePath {
            disabled: true,
            ..ModulePath::file(path)
        }
    }

    /// Query and fragment as written (`?raw#top`), or empty.
    pub fn suffix(&self) -> String {
        let mut out = String::new();
        if let Some(query) = &self.query {
            out.push('?');
            out.push_str(query);
        }
        if let Some(fragment) = &self.fragment {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }

    /// Display name relative to `base`.
    pub fn display(&self, base: &Path) -> String {
        let name = format!("{}{}", relative_display(&self.path, base), self.suffix());
        if self.disabled {
            format!("(disabled):{}", name)
        } else {
            name
        }
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.disabled {
            write!(f, "(disabled):")?;
        }
        write!(f, "{}{}", self.path.display(), self.suffix())
    }
}

/// A successful resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Bundled module
    Internal(ModulePath),
    /// Left as a runtime import of this path
    External(String),
}

/// Why a specifier could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// Nothing on disk matched
    NotFound {
        /// Module specifier that was not found
        specifier: String,
        /// File containing the import
        containing_file: String,
        /// Span of the module specifier in source
        span: Span,
        /// Extra explanation, e.g. a disabled built-in
        hint: Option<String>,
    },
    /// The package has an `exports` map that does not expose the subpath
    NotExported {
        specifier: String,
        package: String,
        subpath: String,
        containing_file: String,
        span: Span,
    },
    /// An `exports`/`imports` target is malformed
    InvalidPackageTarget {
        message: String,
        containing_file: String,
        span: Span,
    },
    /// package.json could not be read or parsed
    PackageJsonError {
        message: String,
        containing_file: String,
        span: Span,
    },
    /// A tsconfig `paths` entry matched but no candidate (and no fallback) exists
    PathMappingFailed {
        specifier: String,
        containing_file: String,
        span: Span,
    },
}

impl ResolutionFailure {
    /// Convert a resolution failure to a diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolutionFailure::NotFound {
                specifier,
                containing_file,
                span,
                hint,
            } => {
                let mut message = format!("Could not resolve \"{}\"", specifier);
                if let Some(hint) = hint {
                    message.push_str(&format!(" ({})", hint));
                }
                Diagnostic::error(
                    ErrorKind::Resolution,
                    containing_file,
                    *span,
                    message,
                    codes::CANNOT_RESOLVE,
                )
            }
            ResolutionFailure::NotExported {
                specifier,
                package,
                subpath,
                containing_file,
                span,
            } => Diagnostic::error(
                ErrorKind::Resolution,
                containing_file,
                *span,
                format!(
                    "Could not resolve \"{}\": the path \"{}\" is not exported by package \"{}\"",
                    specifier, subpath, package
                ),
                codes::NOT_EXPORTED_BY_PACKAGE,
            ),
            ResolutionFailure::InvalidPackageTarget {
                message,
                containing_file,
                span,
            } => Diagnostic::error(
                ErrorKind::Resolution,
                containing_file,
                *span,
                message.clone(),
                codes::INVALID_PACKAGE_TARGET,
            ),
            ResolutionFailure::PackageJsonError {
                message,
                containing_file,
                span,
            } => Diagnostic::error(
                ErrorKind::Resolution,
                containing_file,
                *span,
                message.clone(),
                codes::PACKAGE_JSON_ERROR,
            ),
            ResolutionFailure::PathMappingFailed {
                specifier,
                containing_file,
                span,
            } => Diagnostic::error(
                ErrorKind::Resolution,
                containing_file,
                *span,
                format!(
                    "Could not resolve \"{}\": no tsconfig \"paths\" target exists",
                    specifier
                ),
                codes::CANNOT_RESOLVE,
            ),
        }
    }

    pub fn containing_file(&self) -> &str {
        match self {
            ResolutionFailure::NotFound {
                containing_file, ..
            }
            | ResolutionFailure::NotExported {
                containing_file, ..
            }
            | ResolutionFailure::InvalidPackageTarget {
                containing_file, ..
            }
            | ResolutionFailure::PackageJsonError {
                containing_file, ..
            }
            | ResolutionFailure::PathMappingFailed {
                containing_file, ..
            } => containing_file,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolutionFailure::NotFound { .. })
    }
}

/// A specifier pattern from the `external` option.
#[derive(Clone, Debug)]
enum ExternalPattern {
    /// Exact name; also covers subpaths of a package name
    Exact(String),
    /// One `*` wildcard
    Wildcard { prefix: String, suffix: String },
}

impl ExternalPattern {
    fn parse(pattern: &str) -> Self {
        match pattern.split_once('*') {
            Some((prefix, suffix)) => ExternalPattern::Wildcard {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            },
            None => ExternalPattern::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, specifier: &str) -> bool {
        match self {
            ExternalPattern::Exact(name) => {
                specifier == name
                    || (!name.starts_with('.')
                        && !name.starts_with('/')
                        && specifier.len() > name.len()
                        && specifier.starts_with(name.as_str())
                        && specifier.as_bytes()[name.len()] == b'/')
            }
            ExternalPattern::Wildcard { prefix, suffix } => {
                specifier.len() >= prefix.len() + suffix.len()
                    && specifier.starts_with(prefix.as_str())
                    && specifier.ends_with(suffix.as_str())
            }
        }
    }
}

/// Resolution settings derived from [`BuildOptions`].
#[derive(Clone, Debug)]
pub struct ResolverOptions {
    pub platform: Platform,
    pub working_dir: PathBuf,
    externals: Vec<ExternalPattern>,
    /// Sorted longest key first
    aliases: Vec<(String, String)>,
    pub custom_conditions: Vec<String>,
    pub main_fields: Vec<String>,
    pub extensions: Vec<String>,
    pub node_paths: Vec<PathBuf>,
    pub tsconfig: Option<PathBuf>,
}

impl ResolverOptions {
    pub fn from_build_options(options: &BuildOptions) -> Self {
        let mut aliases: Vec<(String, String)> = options
            .alias
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        ResolverOptions {
            platform: options.platform,
            working_dir: options.working_dir.clone(),
            externals: options
                .external
                .iter()
                .map(|pattern| ExternalPattern::parse(pattern))
                .collect(),
            aliases,
            custom_conditions: options.custom_conditions(),
            main_fields: options.main_fields(),
            extensions: options.resolve_extensions.clone(),
            node_paths: options
                .node_paths
                .iter()
                .map(|path| options.absolute(path))
                .collect(),
            tsconfig: options.tsconfig.as_ref().map(|path| options.absolute(path)),
        }
    }

    fn is_external(&self, specifier: &str) -> bool {
        self.externals.iter().any(|pattern| pattern.matches(specifier))
    }
}

type ManifestResult = Result<Option<Arc<PackageJson>>, String>;

/// Resolver state for one build.
pub struct ModuleResolver {
    fs: Arc<dyn FileSystem>,
    options: ResolverOptions,
    /// Cache of resolved modules keyed by importer directory, specifier and
    /// whether the `require` condition applies
    resolution_cache: FxHashMap<(PathBuf, String, bool), Result<Resolution, ResolutionFailure>>,
    /// package.json per directory (`Ok(None)` when the directory has none)
    manifest_cache: FxHashMap<PathBuf, ManifestResult>,
    /// Nearest tsconfig per directory
    tsconfig_cache: FxHashMap<PathBuf, Option<Arc<TsConfig>>>,
    explicit_tsconfig: Option<Arc<TsConfig>>,
}

impl fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("options", &self.options)
            .field("cached", &self.resolution_cache.len())
            .finish()
    }
}

/// Per-request context threaded through the resolution steps.
struct Request<'r> {
    specifier: &'r str,
    containing_file: String,
    span: Span,
    conditions: Vec<String>,
}

impl Request<'_> {
    fn not_found(&self, hint: Option<String>) -> ResolutionFailure {
        ResolutionFailure::NotFound {
            specifier: self.specifier.to_string(),
            containing_file: self.containing_file.clone(),
            span: self.span,
            hint,
        }
    }
}

impl ModuleResolver {
    /// Create a resolver. An explicit tsconfig that fails to load is an error.
    pub fn new(fs: Arc<dyn FileSystem>, options: ResolverOptions) -> anyhow::Result<Self> {
        let explicit_tsconfig = match &options.tsconfig {
            Some(path) => Some(Arc::new(load_tsconfig(fs.as_ref(), path)?)),
            None => None,
        };
        Ok(ModuleResolver {
            fs,
            options,
            resolution_cache: FxHashMap::default(),
            manifest_cache: FxHashMap::default(),
            tsconfig_cache: FxHashMap::default(),
            explicit_tsconfig,
        })
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve `specifier` imported from `importer` (`None` for entry points,
    /// which resolve from the working directory).
    pub fn resolve(
        &mut self,
        specifier: &str,
        importer: Option<&Path>,
        kind: ImportKind,
        span: Span,
    ) -> Result<Resolution, ResolutionFailure> {
        let containing_dir = match importer {
            Some(file) => file
                .parent()
                .unwrap_or(Path::new("/"))
                .to_path_buf(),
            None => self.options.working_dir.clone(),
        };
        let is_require = kind.is_require();

        let cache_key = (containing_dir.clone(), specifier.to_string(), is_require);
        if let Some(cached) = self.resolution_cache.get(&cache_key) {
            return cached.clone();
        }

        let containing_file = match importer {
            Some(file) => relative_display(file, &self.options.working_dir),
            None => "<entry point>".to_string(),
        };
        let mut conditions = self.options.custom_conditions.clone();
        conditions.push(if is_require { "require" } else { "import" }.to_string());
        if let Some(platform) = self.options.platform.condition() {
            conditions.push(platform.to_string());
        }
        let request = Request {
            specifier,
            containing_file,
            span,
            conditions,
        };

        let result = self.resolve_uncached(&request, &containing_dir, importer);
        trace!(
            specifier,
            dir = %containing_dir.display(),
            ok = result.is_ok(),
            "resolved"
        );
        self.resolution_cache.insert(cache_key, result.clone());
        result
    }

    fn resolve_uncached(
        &mut self,
        request: &Request<'_>,
        containing_dir: &Path,
        importer: Option<&Path>,
    ) -> Result<Resolution, ResolutionFailure> {
        // Step 1: aliases, longest key first
        let aliased = self.apply_alias(request.specifier);
        let specifier = aliased.as_deref().unwrap_or(request.specifier);
        if let Some(rewritten) = &aliased {
            trace!(from = request.specifier, to = %rewritten, "alias");
        }

        if self.options.is_external(specifier) {
            return Ok(Resolution::External(specifier.to_string()));
        }

        // Step 2: tsconfig paths
        let is_relative = specifier.starts_with("./")
            || specifier.starts_with("../")
            || specifier == "."
            || specifier == "..";
        let is_absolute = specifier.starts_with('/');
        let mut path_mapping_attempted = false;
        if !is_relative && !is_absolute {
            if let Some(tsconfig) = self.tsconfig_for(containing_dir) {
                let candidates = tsconfig.path_candidates(specifier);
                path_mapping_attempted = !candidates.is_empty();
                for candidate in candidates {
                    trace!(candidate = %candidate.display(), "tsconfig paths candidate");
                    if let Some(found) = self.load_as_file_or_directory(&candidate) {
                        return Ok(Resolution::Internal(self.apply_browser_remap(found)?));
                    }
                }
                if let Some(base_url) = &tsconfig.base_url
                    && !specifier.starts_with('#')
                    && let Some(found) =
                        self.load_as_file_or_directory(&normalize_path(&base_url.join(specifier)))
                {
                    return Ok(Resolution::Internal(self.apply_browser_remap(found)?));
                }
            }
        }

        // Step 3: relative and absolute paths
        if is_relative || is_absolute {
            let base = if is_absolute {
                PathBuf::from(specifier)
            } else {
                containing_dir.join(specifier)
            };
            return self
                .resolve_path_specifier(specifier, &base)
                .map(Resolution::Internal)
                .ok_or_else(|| request.not_found(None));
        }

        // Step 4: package specifiers
        let result = self.resolve_bare(request, specifier, containing_dir, importer);
        match result {
            Err(err) if err.is_not_found() && path_mapping_attempted => {
                Err(ResolutionFailure::PathMappingFailed {
                    specifier: specifier.to_string(),
                    containing_file: request.containing_file.clone(),
                    span: request.span,
                })
            }
            other => other,
        }
    }

    fn apply_alias(&self, specifier: &str) -> Option<String> {
        for (key, value) in &self.options.aliases {
            let rest = if specifier == key {
                ""
            } else if specifier.len() > key.len()
                && specifier.starts_with(key.as_str())
                && specifier.as_bytes()[key.len()] == b'/'
            {
                &specifier[key.len()..]
            } else {
                continue;
            };
            let target = if value.starts_with("./") || value.starts_with("../") {
                normalize_path(&self.options.working_dir.join(value))
                    .to_string_lossy()
                    .into_owned()
            } else {
                value.clone()
            };
            return Some(format!("{}{}", target, rest));
        }
        None
    }

    /// Resolve a path specifier, retrying without a query/fragment suffix.
    fn resolve_path_specifier(&mut self, specifier: &str, base: &Path) -> Option<ModulePath> {
        let base = normalize_path(base);
        if let Some(found) = self.load_as_file_or_directory(&base) {
            return self.apply_browser_remap(found).ok();
        }

        let split_at = specifier.find(['?', '#'])?;
        let (path_part, suffix) = specifier.split_at(split_at);
        let (query, fragment) = match suffix.strip_prefix('?') {
            Some(rest) => match rest.split_once('#') {
                Some((query, fragment)) => (Some(query.to_string()), Some(fragment.to_string())),
                None => (Some(rest.to_string()), None),
            },
            None => (None, Some(suffix[1..].to_string())),
        };
        let stripped_base = {
            let text = base.to_string_lossy();
            let cut = text.len().saturating_sub(suffix.len());
            PathBuf::from(&text[..cut])
        };
        trace!(path = path_part, "retrying without query/fragment");
        let mut found = self.load_as_file_or_directory(&stripped_base)?;
        found.query = query;
        found.fragment = fragment;
        self.apply_browser_remap(found).ok()
    }

    fn resolve_bare(
        &mut self,
        request: &Request<'_>,
        specifier: &str,
        containing_dir: &Path,
        importer: Option<&Path>,
    ) -> Result<Resolution, ResolutionFailure> {
        if specifier.starts_with('#') {
            return self.resolve_package_imports(request, specifier, containing_dir);
        }

        if is_builtin(specifier, self.options.platform) {
            return Ok(Resolution::External(specifier.to_string()));
        }

        // Module-name entries of the importer's `browser` map.
        if self.options.platform == Platform::Browser
            && let Some(importer) = importer
            && let Some(pkg) = self.nearest_package(importer)
            && pkg.exports.is_none()
            && let Some(map) = pkg.browser_map()
            && let Some(target) = map.get(specifier)
        {
            match target {
                BrowserTarget::Disabled(false) => {
                    return Ok(Resolution::Internal(ModulePath::disabled(specifier)));
                }
                BrowserTarget::Disabled(true) => {}
                BrowserTarget::Path(path) if path.starts_with("./") || path.starts_with("../") => {
                    let base = pkg.dir.join(path);
                    return self
                        .resolve_path_specifier(path, &base)
                        .map(Resolution::Internal)
                        .ok_or_else(|| request.not_found(None));
                }
                BrowserTarget::Path(module) => {
                    let module = module.clone();
                    let dir = pkg.dir.clone();
                    return self.resolve_node_modules(request, &module, &dir);
                }
            }
        }

        let Some((package_name, subpath)) = parse_package_specifier(specifier) else {
            return Err(request.not_found(None));
        };

        // Self-reference through the enclosing package's own exports.
        if let Some(pkg) = self.nearest_package_in_dir(containing_dir)
            && pkg.name.as_deref() == Some(package_name.as_str())
            && pkg.exports.is_some()
        {
            return self
                .resolve_package_dir(request, &pkg.dir.clone(), &package_name, &subpath)
                .map(Resolution::Internal);
        }

        let result = self.resolve_node_modules(request, specifier, containing_dir);
        if let Err(err) = &result
            && err.is_not_found()
            && self.options.platform == Platform::Browser
            && NODE_BUILTINS.contains(&specifier.trim_start_matches("node:"))
        {
            return Err(request.not_found(Some(format!(
                "\"{}\" is a built-in module of Node; set the platform to \"node\" to leave it external",
                specifier
            ))));
        }
        result
    }

    fn resolve_node_modules(
        &mut self,
        request: &Request<'_>,
        specifier: &str,
        containing_dir: &Path,
    ) -> Result<Resolution, ResolutionFailure> {
        if self.options.is_external(specifier) {
            return Ok(Resolution::External(specifier.to_string()));
        }
        let Some((package_name, subpath)) = parse_package_specifier(specifier) else {
            return Err(request.not_found(None));
        };

        let mut roots: Vec<PathBuf> = containing_dir
            .ancestors()
            .filter(|dir| dir.file_name().is_none_or(|name| name != "node_modules"))
            .map(|dir| dir.join("node_modules"))
            .collect();
        roots.extend(self.options.node_paths.iter().cloned());

        for root in roots {
            if !self.fs.is_dir(&root) {
                continue;
            }
            let package_dir = root.join(&package_name);
            if self.fs.is_dir(&package_dir) {
                trace!(package = %package_dir.display(), "found package");
                return self
                    .resolve_package_dir(request, &package_dir, &package_name, &subpath)
                    .map(Resolution::Internal);
            }
            // A loose file such as node_modules/foo.js
            if let Some(found) = self.load_as_file(&root.join(specifier)) {
                return Ok(Resolution::Internal(self.apply_browser_remap(found)?));
            }
        }

        Err(request.not_found(None))
    }

    fn resolve_package_dir(
        &mut self,
        request: &Request<'_>,
        package_dir: &Path,
        package_name: &str,
        subpath: &str,
    ) -> Result<ModulePath, ResolutionFailure> {
        let pkg = self
            .read_manifest(package_dir)
            .map_err(|message| ResolutionFailure::PackageJsonError {
                message,
                containing_file: request.containing_file.clone(),
                span: request.span,
            })?;

        if let Some(pkg) = &pkg
            && let Some(exports) = &pkg.exports
        {
            return match resolve_exports(exports, subpath, &request.conditions, false) {
                ExportsResolution::Target(target) => {
                    self.resolve_package_target(request, package_dir, &target)
                }
                ExportsResolution::NotExported | ExportsResolution::Excluded => {
                    Err(ResolutionFailure::NotExported {
                        specifier: request.specifier.to_string(),
                        package: package_name.to_string(),
                        subpath: subpath.to_string(),
                        containing_file: request.containing_file.clone(),
                        span: request.span,
                    })
                }
                ExportsResolution::InvalidTarget(message) => {
                    Err(ResolutionFailure::InvalidPackageTarget {
                        message: format!("{} in package \"{}\"", message, package_name),
                        containing_file: request.containing_file.clone(),
                        span: request.span,
                    })
                }
            };
        }

        let found = if subpath == "." {
            self.load_as_directory(package_dir)
        } else {
            self.load_as_file_or_directory(&normalize_path(
                &package_dir.join(subpath.trim_start_matches("./")),
            ))
        };
        match found {
            Some(found) => self.apply_browser_remap(found),
            None => Err(request.not_found(None)),
        }
    }

    /// Map an `exports`/`imports` target onto the file system. Targets must
    /// stay inside the package root and name an existing file.
    fn resolve_package_target(
        &mut self,
        request: &Request<'_>,
        package_dir: &Path,
        target: &str,
    ) -> Result<ModulePath, ResolutionFailure> {
        let path = normalize_path(&package_dir.join(target.trim_start_matches("./")));
        if !path.starts_with(package_dir) {
            return Err(ResolutionFailure::InvalidPackageTarget {
                message: format!(
                    "package target \"{}\" resolves outside of {}",
                    target,
                    package_dir.display()
                ),
                containing_file: request.containing_file.clone(),
                span: request.span,
            });
        }
        if self.fs.is_file(&path) {
            return Ok(ModulePath::file(path));
        }
        if let Some(rewritten) = self.try_typescript_rewrite(&path) {
            return Ok(ModulePath::file(rewritten));
        }
        Err(request.not_found(Some(format!(
            "the package target \"{}\" does not exist",
            target
        ))))
    }

    fn resolve_package_imports(
        &mut self,
        request: &Request<'_>,
        specifier: &str,
        containing_dir: &Path,
    ) -> Result<Resolution, ResolutionFailure> {
        let Some(pkg) = self.nearest_package_in_dir(containing_dir) else {
            return Err(request.not_found(None));
        };
        let Some(imports) = &pkg.imports else {
            return Err(request.not_found(None));
        };
        match resolve_exports(imports, specifier, &request.conditions, true) {
            ExportsResolution::Target(target) if target.starts_with("./") => self
                .resolve_package_target(request, &pkg.dir, &target)
                .map(Resolution::Internal),
            ExportsResolution::Target(target) => {
                if is_builtin(&target, self.options.platform) {
                    return Ok(Resolution::External(target));
                }
                self.resolve_node_modules(request, &target, &pkg.dir)
            }
            ExportsResolution::InvalidTarget(message) => {
                Err(ResolutionFailure::InvalidPackageTarget {
                    message,
                    containing_file: request.containing_file.clone(),
                    span: request.span,
                })
            }
            ExportsResolution::NotExported | ExportsResolution::Excluded => {
                Err(request.not_found(Some(format!(
                    "\"{}\" is not defined by \"imports\" in {}",
                    specifier,
                    pkg.dir.join("package.json").display()
                ))))
            }
        }
    }

    // =========================================================================
    // File system probing
    // =========================================================================

    fn load_as_file_or_directory(&mut self, path: &Path) -> Option<ModulePath> {
        self.load_as_file(path).or_else(|| self.load_as_directory(path))
    }

    /// Exact file, then each configured extension (with tsconfig module
    /// suffixes), then the `.js` → `.ts` rewrite.
    fn load_as_file(&mut self, path: &Path) -> Option<ModulePath> {
        if self.fs.is_file(path) {
            return Some(ModulePath::file(path));
        }
        let suffixes = path
            .parent()
            .and_then(|dir| self.tsconfig_for(dir))
            .map(|tsconfig| tsconfig.module_suffixes.clone())
            .filter(|suffixes| !suffixes.is_empty())
            .unwrap_or_else(|| vec![String::new()]);
        let text = path.to_string_lossy().into_owned();
        for ext in &self.options.extensions {
            for suffix in &suffixes {
                let candidate = PathBuf::from(format!("{}{}{}", text, suffix, ext));
                if self.fs.is_file(&candidate) {
                    return Some(ModulePath::file(candidate));
                }
            }
        }
        self.try_typescript_rewrite(path).map(ModulePath::file)
    }

    /// `./file.js` may refer to `./file.ts` in TypeScript projects.
    fn try_typescript_rewrite(&self, path: &Path) -> Option<PathBuf> {
        let text = path.to_string_lossy();
        let (stem, replacements): (&str, &[&str]) = if let Some(stem) = text.strip_suffix(".js") {
            (stem, &[".ts", ".tsx"])
        } else if let Some(stem) = text.strip_suffix(".jsx") {
            (stem, &[".ts", ".tsx"])
        } else if let Some(stem) = text.strip_suffix(".mjs") {
            (stem, &[".mts"])
        } else if let Some(stem) = text.strip_suffix(".cjs") {
            (stem, &[".cts"])
        } else {
            return None;
        };
        replacements
            .iter()
            .map(|ext| PathBuf::from(format!("{}{}", stem, ext)))
            .find(|candidate| self.fs.is_file(candidate))
    }

    /// Main fields in configured order, then `index.*`.
    fn load_as_directory(&mut self, dir: &Path) -> Option<ModulePath> {
        if !self.fs.is_dir(dir) {
            return None;
        }
        if let Ok(Some(pkg)) = self.read_manifest(dir) {
            for field in self.options.main_fields.clone() {
                let Some(main) = pkg.main_field(&field) else {
                    continue;
                };
                let target = normalize_path(&dir.join(main));
                trace!(field = %field, target = %target.display(), "main field");
                if let Some(found) = self.load_as_file(&target) {
                    return Some(found);
                }
                if target != dir
                    && self.fs.is_dir(&target)
                    && let Some(found) = self.load_as_file(&target.join("index"))
                {
                    return Some(found);
                }
            }
        }
        self.load_as_file(&dir.join("index"))
    }

    /// Apply file entries of the `browser` map of the package that contains
    /// `found`. Only the browser platform honors the map, and only for
    /// packages without `exports`.
    fn apply_browser_remap(&mut self, found: ModulePath) -> Result<ModulePath, ResolutionFailure> {
        if self.options.platform != Platform::Browser || found.disabled {
            return Ok(found);
        }
        let Some(pkg) = self.nearest_package(&found.path) else {
            return Ok(found);
        };
        if pkg.exports.is_some() {
            return Ok(found);
        }
        let Some(map) = pkg.browser_map() else {
            return Ok(found);
        };

        for (key, target) in map {
            if !(key.starts_with("./") || key.starts_with("../") || key.starts_with('/')) {
                continue;
            }
            let key_path = normalize_path(&pkg.dir.join(key));
            let key_text = key_path.to_string_lossy().into_owned();
            let matches = key_path == found.path
                || self
                    .options
                    .extensions
                    .iter()
                    .any(|ext| PathBuf::from(format!("{}{}", key_text, ext)) == found.path)
                || found.path == key_path.join("index.js");
            if !matches {
                continue;
            }
            trace!(key = %key, "browser map");
            return match target {
                BrowserTarget::Disabled(false) => Ok(ModulePath::disabled(found.path)),
                BrowserTarget::Disabled(true) => Ok(found),
                BrowserTarget::Path(path) => {
                    let replacement = normalize_path(&pkg.dir.join(path));
                    Ok(self
                        .load_as_file_or_directory(&replacement)
                        .unwrap_or(found))
                }
            };
        }
        Ok(found)
    }

    // =========================================================================
    // Manifests
    // =========================================================================

    fn read_manifest(&mut self, dir: &Path) -> ManifestResult {
        if let Some(cached) = self.manifest_cache.get(dir) {
            return cached.clone();
        }
        let path = dir.join("package.json");
        let result = if self.fs.is_file(&path) {
            self.fs
                .read_to_string(&path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))
                .and_then(|source| {
                    PackageJson::parse(dir, &source)
                        .map(|pkg| Some(Arc::new(pkg)))
                        .map_err(|e| format!("{:#}", e))
                })
        } else {
            Ok(None)
        };
        self.manifest_cache.insert(dir.to_path_buf(), result.clone());
        result
    }

    /// Nearest package.json above a file.
    pub fn nearest_package(&mut self, file: &Path) -> Option<Arc<PackageJson>> {
        let dir = file.parent()?.to_path_buf();
        self.nearest_package_in_dir(&dir)
    }

    fn nearest_package_in_dir(&mut self, dir: &Path) -> Option<Arc<PackageJson>> {
        for ancestor in dir.ancestors() {
            if let Ok(Some(pkg)) = self.read_manifest(ancestor) {
                return Some(pkg);
            }
        }
        None
    }

    /// Manifest verdict on whether `path` may have side effects.
    pub fn manifest_side_effects(&mut self, path: &Path) -> bool {
        match self.nearest_package(path) {
            Some(pkg) => pkg.file_has_side_effects(path),
            None => true,
        }
    }

    /// `"type"` of the nearest package.json.
    pub fn package_type(&mut self, path: &Path) -> Option<PackageType> {
        self.nearest_package(path).and_then(|pkg| pkg.package_type)
    }

    fn tsconfig_for(&mut self, dir: &Path) -> Option<Arc<TsConfig>> {
        if let Some(explicit) = &self.explicit_tsconfig {
            return Some(explicit.clone());
        }
        if let Some(cached) = self.tsconfig_cache.get(dir) {
            return cached.clone();
        }
        let candidate = dir.join("tsconfig.json");
        let found = if self.fs.is_file(&candidate) {
            match load_tsconfig(self.fs.as_ref(), &candidate) {
                Ok(config) => Some(Arc::new(config)),
                Err(err) => {
                    trace!(path = %candidate.display(), error = %err, "ignoring tsconfig");
                    None
                }
            }
        } else {
            match dir.parent() {
                Some(parent) if !dir.ends_with("node_modules") => self.tsconfig_for(parent),
                _ => None,
            }
        };
        self.tsconfig_cache.insert(dir.to_path_buf(), found.clone());
        found
    }

    /// Clear the resolution cache
    pub fn clear_cache(&mut self) {
        self.resolution_cache.clear();
        self.manifest_cache.clear();
        self.tsconfig_cache.clear();
    }
}

#[cfg(test)]
#[path = "tests/module_resolver_tests.rs"]
mod tests;
