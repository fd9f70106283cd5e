//! Parser and oracle together on realistic TypeScript.

use rxmigrate_ts::{parse, DeclaredTypes, NodeKind, SyntaxTree, TypeFacts, TypeKind, TypeOracle};

const SERVICE: &str = r#"/**
 * Search service.
 */

import { Injectable } from '@angular/core';
import { Http, Response } from '@angular/http';
import { Observable } from 'rxjs/Observable';
import 'rxjs/add/operator/map';
import * as fromStore from './store';

export interface Hit {
  id: number;
  title?: string;
}

type Query = { text: string; limit: number };

@Injectable()
export class SearchService {
  private readonly base = `/api/search`;
  private cache = new Map<string, Hit[]>();

  constructor(private http: Http) {}

  search(query: Query): Observable<Hit[]> {
    const url = `${this.base}?q=${query.text}`;
    return this.http
      .get(url)
      .map((res: Response) => res.json() as Hit[])
      .filter(hits => hits.length > 0 && /\w+/.test(query.text));
  }

  async warm(keys: string[]): Promise<void> {
    for (const key of keys) {
      if (!this.cache.has(key)) {
        this.cache.set(key, []);
      }
    }
  }
}
"#;

fn calls_named(tree: &SyntaxTree, name: &str) -> Vec<rxmigrate_ts::NodeId> {
    tree.descendants(tree.root())
        .filter(|&id| {
            tree.call_parts(id)
                .and_then(|(callee, _)| tree.property_access_parts(callee))
                .is_some_and(|(_, n)| tree.text(n) == name)
        })
        .collect()
}

#[test]
fn service_file_parses() {
    let tree = parse(SERVICE).unwrap();
    let imports = tree.imports();
    let modules: Vec<&str> = imports.iter().map(|i| i.module.as_str()).collect();
    assert_eq!(
        modules,
        vec![
            "@angular/core",
            "@angular/http",
            "rxjs/Observable",
            "rxjs/add/operator/map",
            "./store"
        ]
    );
    assert!(imports[3].specifiers.is_empty() && imports[3].named_bindings.is_none());
    assert!(imports[4].namespace.is_some());
    assert_eq!(imports[1].specifiers.len(), 2);
    assert_eq!(tree.comments().len(), 1);
}

#[test]
fn chain_calls_nest_left_to_right() {
    let tree = parse(SERVICE).unwrap();
    let map = calls_named(&tree, "map");
    let filter = calls_named(&tree, "filter");
    assert_eq!(map.len(), 1);
    assert_eq!(filter.len(), 1);

    // filter(...) is called on the result of map(...)
    let access = tree.parent(map[0]).unwrap();
    assert_eq!(tree.kind(access), NodeKind::PropertyAccess);
    assert_eq!(tree.parent(access), Some(filter[0]));
    assert!(tree.text(map[0]).starts_with("this.http"));
}

#[test]
fn facts_resolve_through_members() {
    let facts = TypeFacts::from_json(
        r#"{
            "types": {
                "Observable": { "methods": { "map": "Observable<any>", "filter": "Observable<any>" } },
                "Http": { "methods": { "get": "Observable<Response>" } },
                "SearchService": { "properties": { "http": "Http" } }
            },
            "bindings": { "this": "SearchService" }
        }"#,
    )
    .unwrap();
    let tree = parse(SERVICE).unwrap();
    let oracle = DeclaredTypes::new(&tree, &facts);

    let filter = calls_named(&tree, "filter")[0];
    let ty = oracle.resolved_return_type(filter).unwrap();
    let TypeKind::Reference { target } = oracle.type_kind(ty) else {
        panic!("expected a generic instantiation");
    };
    assert_eq!(oracle.symbol_name(target), Some("Observable"));

    let set = calls_named(&tree, "set")[0];
    assert_eq!(oracle.resolved_return_type(set), None);
}
