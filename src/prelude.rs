//! Type declarations for the library itself.
//!
//! Enough of the 5.x surface for stream detection to work on code that only
//! declares its own bindings: the stream class with every patched operator
//! and static factory, and the subject family deriving from it.

use rxmigrate_ts::{TypeDecl, TypeFacts};

use crate::config::MigrationConfig;
use crate::tables::{INSTANCE_OPERATORS, STATIC_FACTORIES};

const SUBJECTS: &[(&str, &str)] = &[
    ("Subject", ""),
    ("BehaviorSubject", "Subject"),
    ("ReplaySubject", "Subject"),
    ("AsyncSubject", "Subject"),
    ("ConnectableObservable", ""),
];

/// Declarations for the configured namespace type and its subclasses.
pub fn library_types(config: &MigrationConfig) -> TypeFacts {
    let stream = config.namespace.as_str();
    let instance = format!("{stream}<any>");

    let mut decl = TypeDecl::new()
        .with_method("pipe", instance.as_str())
        .with_method("lift", instance.as_str())
        .with_method("subscribe", "Subscription")
        .with_method("toPromise", "Promise<any>")
        .with_static("create", instance.as_str());
    for operator in INSTANCE_OPERATORS {
        decl = decl.with_method(*operator, instance.as_str());
    }
    for factory in STATIC_FACTORIES {
        decl = decl.with_static(*factory, instance.as_str());
    }

    let mut facts = TypeFacts::new()
        .with_type(stream, decl)
        .with_type("Subscription", TypeDecl::new())
        .with_type("Promise", TypeDecl::new());
    for (name, base) in SUBJECTS {
        let base = if base.is_empty() {
            instance.clone()
        } else {
            format!("{base}<any>")
        };
        facts = facts.with_type(*name, TypeDecl::new().with_base(base));
    }
    facts
}

/// Library declarations overlaid with `user` facts.
pub fn with_library_types(user: &TypeFacts, config: &MigrationConfig) -> TypeFacts {
    if !config.include_library_types {
        return user.clone();
    }
    let mut facts = library_types(config);
    facts.merge(user.clone());
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamTypes;
    use rxmigrate_ts::{parse, DeclaredTypes, NodeKind};

    #[test]
    fn subject_operators_return_streams() {
        let config = MigrationConfig::default();
        let user = TypeFacts::new().with_binding("s", "BehaviorSubject<number>");
        let facts = with_library_types(&user, &config);

        let tree = parse("s.map(f);").unwrap();
        let oracle = DeclaredTypes::new(&tree, &facts);
        let streams = StreamTypes::new(&oracle, &config.stream_roots);
        let call = tree
            .descendants(tree.root())
            .find(|&id| tree.kind(id) == NodeKind::CallExpression)
            .unwrap();
        assert!(streams.returns_stream_like(call));
    }

    #[test]
    fn user_facts_win() {
        let config = MigrationConfig::default();
        let user = TypeFacts::new()
            .with_type("Observable", TypeDecl::new().with_method("map", "number"));
        let facts = with_library_types(&user, &config);
        assert_eq!(facts.types["Observable"].methods["map"], "number");
        assert!(facts.types["Observable"].statics.contains_key("of"));
    }

    #[test]
    fn can_be_disabled() {
        let config = MigrationConfig {
            include_library_types: false,
            ..MigrationConfig::default()
        };
        let facts = with_library_types(&TypeFacts::new(), &config);
        assert!(facts.types.is_empty());
    }
}
