//! Fixed migration tables.
//!
//! Operator and factory name sets, the rename tables, and the deprecated
//! module paths and symbols of the 5.x layout. Module paths are stored
//! relative to the library root so [`ModulePaths`] can resolve them for any
//! configured root module name.

use std::sync::LazyLock;

use regex::Regex;

// ============================================================================
// Operators
// ============================================================================

/// Patched instance operators of the 5.x prototype, including the names
/// that changed when they became pipeable functions.
pub const INSTANCE_OPERATORS: &[&str] = &[
    "audit",
    "auditTime",
    "buffer",
    "bufferCount",
    "bufferTime",
    "bufferToggle",
    "bufferWhen",
    "catchError",
    "combineAll",
    "combineLatest",
    "concat",
    "concatAll",
    "concatMap",
    "concatMapTo",
    "count",
    "debounce",
    "debounceTime",
    "defaultIfEmpty",
    "delay",
    "delayWhen",
    "dematerialize",
    "distinct",
    "distinctUntilChanged",
    "distinctUntilKeyChanged",
    "elementAt",
    "every",
    "exhaust",
    "exhaustMap",
    "expand",
    "filter",
    "finalize",
    "find",
    "findIndex",
    "first",
    "groupBy",
    "ignoreElements",
    "isEmpty",
    "last",
    "map",
    "mapTo",
    "materialize",
    "max",
    "merge",
    "mergeAll",
    "mergeMap",
    "mergeMapTo",
    "mergeScan",
    "min",
    "multicast",
    "observeOn",
    "onErrorResumeNext",
    "pairwise",
    "partition",
    "pluck",
    "publish",
    "publishBehavior",
    "publishLast",
    "publishReplay",
    "race",
    "reduce",
    "refCount",
    "repeat",
    "repeatWhen",
    "retry",
    "retryWhen",
    "sample",
    "sampleTime",
    "scan",
    "sequenceEqual",
    "share",
    "shareReplay",
    "single",
    "skip",
    "skipLast",
    "skipUntil",
    "skipWhile",
    "startWith",
    "subscribeOn",
    "switchAll",
    "switchMap",
    "switchMapTo",
    "take",
    "takeLast",
    "takeUntil",
    "takeWhile",
    "tap",
    "throttle",
    "throttleTime",
    "timeInterval",
    "timeout",
    "timeoutWith",
    "timestamp",
    "toArray",
    "window",
    "windowCount",
    "windowTime",
    "windowToggle",
    "windowWhen",
    "withLatestFrom",
    "zip",
    "zipAll",
    "do",
    "catch",
    "flatMap",
    "flatMapTo",
    "finally",
    "switch",
];

/// Operators whose pipeable function has a different name.
pub const OPERATOR_RENAMES: &[(&str, &str)] = &[
    ("do", "tap"),
    ("catch", "catchError"),
    ("flatMap", "mergeMap"),
    ("flatMapTo", "mergeMapTo"),
    ("finally", "finalize"),
    ("switch", "switchAll"),
];

pub fn is_instance_operator(name: &str) -> bool {
    INSTANCE_OPERATORS.contains(&name)
}

/// Name of the pipeable function for a patched operator.
pub fn pipeable_name(name: &str) -> &str {
    OPERATOR_RENAMES
        .iter()
        .find(|(old, _)| *old == name)
        .map(|(_, new)| *new)
        .unwrap_or(name)
}

// ============================================================================
// Static factories
// ============================================================================

/// Static creation methods patched onto the stream class.
pub const STATIC_FACTORIES: &[&str] = &[
    "bindCallback",
    "bindNodeCallback",
    "combineLatest",
    "concat",
    "defer",
    "empty",
    "forkJoin",
    "from",
    "fromEvent",
    "fromEventPattern",
    "fromPromise",
    "generate",
    "if",
    "interval",
    "merge",
    "never",
    "of",
    "onErrorResumeNext",
    "pairs",
    "race",
    "range",
    "throw",
    "timer",
    "using",
    "zip",
];

/// Factories whose standalone function has a different name.
pub const FACTORY_RENAMES: &[(&str, &str)] = &[
    ("throw", "throwError"),
    ("if", "iif"),
    ("fromPromise", "from"),
];

pub fn is_static_factory(name: &str) -> bool {
    STATIC_FACTORIES.contains(&name)
}

/// Name of the standalone creation function for a static factory.
pub fn factory_name(name: &str) -> &str {
    FACTORY_RENAMES
        .iter()
        .find(|(old, _)| *old == name)
        .map(|(_, new)| *new)
        .unwrap_or(name)
}

/// Local alias a factory is imported under: `of` becomes `observableOf`.
pub fn factory_alias(canonical: &str) -> String {
    let mut chars = canonical.chars();
    match chars.next() {
        Some(first) => format!("observable{}{}", first.to_uppercase(), chars.as_str()),
        None => "observable".to_string(),
    }
}

// ============================================================================
// Module paths
// ============================================================================

/// Whole-path renames, relative to the library root. An empty replacement
/// means the root module itself.
pub const DEPRECATED_PATHS: &[(&str, &str)] = &[
    ("interfaces", ""),
    ("AsyncSubject", ""),
    ("BehaviorSubject", ""),
    ("Notification", ""),
    ("Observable", ""),
    ("Observer", ""),
    ("Operator", ""),
    ("ReplaySubject", ""),
    ("Subject", ""),
    ("Subscriber", ""),
    ("Scheduler", ""),
    ("Subscription", ""),
    ("observable/bindCallback", ""),
    ("observable/combineLatest", ""),
    ("observable/concat", ""),
    ("observable/ConnectableObservable", ""),
    ("observable/defer", ""),
    ("observable/forkJoin", ""),
    ("observable/from", ""),
    ("observable/fromEvent", ""),
    ("observable/fromEventPattern", ""),
    ("observable/interval", ""),
    ("observable/merge", ""),
    ("observable/of", ""),
    ("observable/race", ""),
    ("observable/range", ""),
    ("observable/timer", ""),
    ("observable/zip", ""),
    ("observable/fromPromise", ""),
    ("observable/if", ""),
    ("observable/throw", ""),
    ("observable/never", ""),
    ("observable/empty", ""),
    ("observable/FromEventObservable", "internal/observable/fromEvent"),
];

/// Directory moves: the prefix is swapped, the rest of the path kept.
pub const DEPRECATED_PATH_PREFIXES: &[(&str, &str)] = &[
    ("util/", "internal/util/"),
    ("testing/", "internal/testing/"),
    ("scheduler/", "internal/scheduler/"),
];

/// Per-operator module paths, relative to the library root.
static OPERATOR_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^operators/.+$").expect("operator path pattern is valid"));

/// Relative path of the pipeable operators module.
pub const OPERATORS_MODULE: &str = "operators";

/// Prefixes of imports that only patch the prototype with an operator.
pub const PATCH_OPERATOR_PREFIXES: &[&str] = &["operator/", "add/operator/"];

/// Prefix of imports that only patch the class with a static factory.
pub const PATCH_FACTORY_PREFIX: &str = "add/observable/";

/// An import whose exported name changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeprecatedSymbol {
    /// Module path relative to the library root.
    pub path: &'static str,
    pub symbol: &'static str,
    pub new_symbol: &'static str,
}

pub const DEPRECATED_SYMBOLS: &[DeprecatedSymbol] = &[
    DeprecatedSymbol {
        path: "observable/empty",
        symbol: "empty",
        new_symbol: "EMPTY",
    },
    DeprecatedSymbol {
        path: "observable/never",
        symbol: "never",
        new_symbol: "NEVER",
    },
    DeprecatedSymbol {
        path: "Subscription",
        symbol: "AnonymousSubscription",
        new_symbol: "Unsubscribable",
    },
    DeprecatedSymbol {
        path: "Subscription",
        symbol: "ISubscription",
        new_symbol: "SubscriptionLike",
    },
];

/// Module path resolution for one library root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulePaths<'a> {
    library: &'a str,
}

impl<'a> ModulePaths<'a> {
    pub fn new(library: &'a str) -> Self {
        ModulePaths { library }
    }

    /// The root module, e.g. `rxjs`.
    pub fn library(&self) -> &'a str {
        self.library
    }

    /// The pipeable operators module, e.g. `rxjs/operators`.
    pub fn operators(&self) -> String {
        self.join(OPERATORS_MODULE)
    }

    fn join(&self, relative: &str) -> String {
        if relative.is_empty() {
            self.library.to_string()
        } else {
            format!("{}/{}", self.library, relative)
        }
    }

    /// `path` relative to the library root, when it is below it.
    pub fn relative<'p>(&self, path: &'p str) -> Option<&'p str> {
        path.strip_prefix(self.library)?.strip_prefix('/')
    }

    /// The root module or a module below it.
    pub fn is_library_module(&self, path: &str) -> bool {
        path == self.library || self.relative(path).is_some()
    }

    /// Replacement path for a deprecated module path.
    pub fn migrated(&self, path: &str) -> Option<String> {
        let relative = self.relative(path)?;
        if let Some((_, new)) = DEPRECATED_PATHS.iter().find(|(old, _)| *old == relative) {
            return Some(self.join(new));
        }
        for (old, new) in DEPRECATED_PATH_PREFIXES {
            if let Some(rest) = relative.strip_prefix(old) {
                return Some(format!("{}/{}{}", self.library, new, rest));
            }
        }
        if OPERATOR_PATH.is_match(relative) {
            return Some(self.operators());
        }
        None
    }

    /// The module a per-operator path is an alias of, for registry seeding.
    pub fn canonical_module(&self, path: &str) -> String {
        match self.relative(path) {
            Some(relative) if OPERATOR_PATH.is_match(relative) => self.operators(),
            _ => path.to_string(),
        }
    }

    /// `rxjs/operator/*` and `rxjs/add/operator/*`.
    pub fn is_patch_operator_import(&self, path: &str) -> bool {
        self.relative(path)
            .is_some_and(|rel| PATCH_OPERATOR_PREFIXES.iter().any(|p| rel.starts_with(p)))
    }

    /// `rxjs/add/observable/*`.
    pub fn is_patch_factory_import(&self, path: &str) -> bool {
        self.relative(path)
            .is_some_and(|rel| rel.starts_with(PATCH_FACTORY_PREFIX))
    }

    /// Paths some rule rewrites or removes.
    pub fn is_deprecated(&self, path: &str) -> bool {
        self.migrated(path).is_some()
            || self.is_patch_operator_import(path)
            || self.is_patch_factory_import(path)
    }

    /// New exported name for `symbol` imported from `path`.
    pub fn renamed_symbol(&self, path: &str, symbol: &str) -> Option<&'static str> {
        let relative = self.relative(path)?;
        DEPRECATED_SYMBOLS
            .iter()
            .find(|d| d.path == relative && d.symbol == symbol)
            .map(|d| d.new_symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod name_tests {
        use super::*;

        #[test]
        fn operator_renames_are_fixed() {
            let renamed: Vec<&str> = ["do", "catch", "flatMap", "flatMapTo", "finally", "switch"]
                .iter()
                .map(|n| pipeable_name(n))
                .collect();
            assert_eq!(
                renamed,
                vec!["tap", "catchError", "mergeMap", "mergeMapTo", "finalize", "switchAll"]
            );
            assert_eq!(pipeable_name("switchMap"), "switchMap");
        }

        #[test]
        fn every_renamed_operator_is_an_operator() {
            for (old, new) in OPERATOR_RENAMES {
                assert!(is_instance_operator(old));
                assert!(is_instance_operator(new));
            }
            assert!(!is_instance_operator("subscribe"));
            assert!(!is_instance_operator("pipe"));
        }

        #[test]
        fn factory_names_and_aliases() {
            assert_eq!(factory_name("throw"), "throwError");
            assert_eq!(factory_name("if"), "iif");
            assert_eq!(factory_name("fromPromise"), "from");
            assert_eq!(factory_name("of"), "of");
            assert_eq!(factory_alias("throwError"), "observableThrowError");
            assert_eq!(factory_alias("of"), "observableOf");
            assert!(is_static_factory("race"));
        }
    }

    mod path_tests {
        use super::*;

        #[test]
        fn exact_paths_map_to_root_or_internal() {
            let paths = ModulePaths::new("rxjs");
            assert_eq!(paths.migrated("rxjs/Observable").as_deref(), Some("rxjs"));
            assert_eq!(
                paths.migrated("rxjs/observable/FromEventObservable").as_deref(),
                Some("rxjs/internal/observable/fromEvent")
            );
            assert_eq!(paths.migrated("rxjs"), None);
            assert_eq!(paths.migrated("rxjs/operators"), None);
        }

        #[test]
        fn prefix_paths_keep_their_tail() {
            let paths = ModulePaths::new("rxjs");
            assert_eq!(
                paths.migrated("rxjs/scheduler/async").as_deref(),
                Some("rxjs/internal/scheduler/async")
            );
            assert_eq!(
                paths.migrated("rxjs/util/isArray").as_deref(),
                Some("rxjs/internal/util/isArray")
            );
        }

        #[test]
        fn operator_pattern_matches_any_operator() {
            let paths = ModulePaths::new("rxjs");
            for path in ["rxjs/operators/map", "rxjs/operators/switchMap", "rxjs/operators/x/y"] {
                assert_eq!(paths.migrated(path).as_deref(), Some("rxjs/operators"));
                assert_eq!(paths.canonical_module(path), "rxjs/operators");
            }
            assert_eq!(paths.canonical_module("rxjs"), "rxjs");
        }

        #[test]
        fn other_roots_and_lookalikes() {
            let paths = ModulePaths::new("rxjs");
            assert!(!paths.is_library_module("rxjs-compat"));
            assert!(paths.is_library_module("rxjs"));
            assert_eq!(paths.migrated("rxjs-compat/Observable"), None);

            let custom = ModulePaths::new("rx");
            assert_eq!(custom.migrated("rx/Subject").as_deref(), Some("rx"));
            assert_eq!(custom.operators(), "rx/operators");
        }

        #[test]
        fn patch_imports() {
            let paths = ModulePaths::new("rxjs");
            assert!(paths.is_patch_operator_import("rxjs/add/operator/map"));
            assert!(paths.is_patch_operator_import("rxjs/operator/map"));
            assert!(!paths.is_patch_operator_import("rxjs/operators/map"));
            assert!(paths.is_patch_factory_import("rxjs/add/observable/of"));
            assert!(paths.is_deprecated("rxjs/add/observable/of"));
            assert!(!paths.is_deprecated("rxjs/operators"));
        }

        #[test]
        fn renamed_symbols() {
            let paths = ModulePaths::new("rxjs");
            assert_eq!(paths.renamed_symbol("rxjs/observable/empty", "empty"), Some("EMPTY"));
            assert_eq!(
                paths.renamed_symbol("rxjs/Subscription", "ISubscription"),
                Some("SubscriptionLike")
            );
            assert_eq!(paths.renamed_symbol("rxjs/Subscription", "Subscription"), None);
            assert_eq!(paths.renamed_symbol("rxjs", "empty"), None);
        }
    }
}
